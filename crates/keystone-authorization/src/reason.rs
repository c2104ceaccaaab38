//! Denial reason lookup hook.

/// Supplies the human-readable reason attached to an access denial.
///
/// Returning `None` falls back to the default message keyed by the code.
pub trait ReasonProvider: Send + Sync {
    /// Reason for denying `code` to a caller whose culture is `culture`.
    fn denial_reason(&self, code: &str, culture: Option<&str>) -> Option<String>;
}

impl<F> ReasonProvider for F
where
    F: Fn(&str, Option<&str>) -> Option<String> + Send + Sync,
{
    fn denial_reason(&self, code: &str, culture: Option<&str>) -> Option<String> {
        self(code, culture)
    }
}

/// Tries each provider in order and returns the first answer.
pub struct ReasonChain<'a> {
    providers: Vec<&'a dyn ReasonProvider>,
}

impl<'a> ReasonChain<'a> {
    /// Empty chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a provider.
    pub fn then(mut self, provider: &'a dyn ReasonProvider) -> Self {
        self.providers.push(provider);
        self
    }
}

impl Default for ReasonChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl ReasonProvider for ReasonChain<'_> {
    fn denial_reason(&self, code: &str, culture: Option<&str>) -> Option<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.denial_reason(code, culture))
    }
}
