//! Session identifiers.
//!
//! An id is `(counter << 32) | r` where `counter` is a process-wide value
//! advanced by a random step in `[3, 13)` on every request and `r` is a
//! non-zero random 32-bit value. The random step hides the exact number of
//! sessions issued from a client that sees roughly sequential ids; the low
//! half keeps ids from being enumerable.
//!
//! The counter is 32 bits wide and wraps on overflow, so the high half only
//! grows until roughly 2^32 / 8 ids have been minted by one generator.

use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const MIN_STEP: u32 = 3;
const MAX_STEP: u32 = 13;

static GLOBAL: Lazy<Arc<SessionIdGenerator>> = Lazy::new(|| Arc::new(SessionIdGenerator::new()));

/// 64-bit session identifier. `0` is reserved for the Empty session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Identifier of the Empty session.
    pub const EMPTY: SessionId = SessionId(0);

    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the Empty session id.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Counter half of the id.
    pub const fn sequence(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Mints session ids.
///
/// The counter is a single atomic; randomness comes from the calling thread's
/// generator, so concurrent callers never contend on a shared RNG.
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    counter: AtomicU32,
}

impl SessionIdGenerator {
    /// Generator starting from zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide generator.
    pub fn global() -> Arc<SessionIdGenerator> {
        Arc::clone(&GLOBAL)
    }

    /// Mint the next id. The counter wraps past `u32::MAX`.
    pub fn next_id(&self) -> SessionId {
        let mut rng = rand::thread_rng();
        let step = rng.gen_range(MIN_STEP..MAX_STEP);
        let sequence = self.counter.fetch_add(step, Ordering::Relaxed).wrapping_add(step);
        let low: u32 = rng.gen_range(1..=u32::MAX);
        SessionId((u64::from(sequence) << 32) | u64::from(low))
    }
}
