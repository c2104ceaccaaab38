//! Permission hierarchy scenarios across kinds, sets and the registry

use keystone_authorization::{
    code_of, PermissionCode, PermissionDescriptor, PermissionKind, PermissionRegistry,
    PermissionSet, PERMISSION_ROOT, SEPARATOR,
};

static PLATFORM: PermissionKind =
    PermissionKind::new(&PERMISSION_ROOT, "acme::perms::Platform", "Platform", None);
static ADMIN: PermissionKind =
    PermissionKind::new(&PLATFORM, "acme::perms::Admin", "Administrator", None);
static SUPER_ADMIN: PermissionKind = PermissionKind::new(
    &ADMIN,
    "acme::perms::SuperAdmin",
    "Super administrator",
    None,
);

#[test]
fn three_level_chain_produces_three_segments() {
    let code = code_of(&SUPER_ADMIN).unwrap();
    assert_eq!(code.depth(), 3);
    assert_eq!(code.as_str().matches(SEPARATOR).count(), 2);
    assert!(code.is_descendant_of(&code_of(&ADMIN).unwrap()));
    assert!(code.is_descendant_of(&code_of(&PLATFORM).unwrap()));
}

#[test]
fn full_name_breadcrumb_substitutes_unregistered_levels() {
    let registry = PermissionRegistry::new();
    registry.register_kind(&PLATFORM).unwrap();
    registry.register_kind(&SUPER_ADMIN).unwrap();

    let code = code_of(&SUPER_ADMIN).unwrap();
    let admin_code = code_of(&ADMIN).unwrap();

    assert_eq!(
        registry.get_full_name(code.as_str()),
        format!("Platform.{}.Super administrator", admin_code.as_str()),
        "unregistered ancestor shows its raw code"
    );
    assert_eq!(registry.get(admin_code.as_str()).name, admin_code.as_str());
}

#[test]
fn full_name_with_every_level_registered() {
    let registry = PermissionRegistry::new();
    registry
        .register_kinds(&[&PLATFORM, &ADMIN, &SUPER_ADMIN])
        .unwrap();
    let code = code_of(&SUPER_ADMIN).unwrap();
    assert_eq!(
        registry.get_full_name(code.as_str()),
        "Platform.Administrator.Super administrator"
    );
}

#[test]
fn registration_is_first_write_wins() {
    let registry = PermissionRegistry::new();
    let code = code_of(&ADMIN).unwrap();

    assert!(registry.register(PermissionDescriptor::new(code.clone(), "Administrator", None)));
    assert!(!registry.register(PermissionDescriptor::new(
        code.clone(),
        "Renamed administrator",
        None
    )));
    assert_eq!(registry.get(code.as_str()).name, "Administrator");
}

#[test]
fn sets_built_from_equal_members_are_equal() {
    let a = PermissionSet::from_codes(["X", "Y"]);
    let b = PermissionSet::from_codes(["y", "x"]);
    assert_eq!(a, b);
    assert_eq!(a.thumbprint(), b.thumbprint());
}

#[test]
fn kind_codes_work_as_set_members() {
    let set = PermissionSet::read_only([code_of(&SUPER_ADMIN).unwrap()]);
    let admin = code_of(&ADMIN).unwrap();
    assert!(!set.contains(admin.as_str()));
    assert!(set.contains_descendant_of(admin.as_str()));
    assert!(set
        .check(code_of(&SUPER_ADMIN).unwrap().as_str(), None)
        .is_ok());
}

#[test]
fn global_registry_is_shared() {
    let code = PermissionCode::new("GLOBAL-REGISTRY-TEST");
    PermissionRegistry::global().register(PermissionDescriptor::new(
        code.clone(),
        "Shared",
        None,
    ));
    assert_eq!(PermissionRegistry::global().get(code.as_str()).name, "Shared");
}
