use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of every callback code handed to the host.
pub const CALLBACK_PREFIX: &str = "callback";

/// Correlation token for one outgoing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallToken(u64);

impl CallToken {
    pub fn get(self) -> u64 {
        self.0
    }

    /// Name the host invokes to complete this call, e.g. `callback12`.
    pub fn callback_code(self) -> String {
        format!("{CALLBACK_PREFIX}{}", self.0)
    }

    /// Recover the token from a callback code produced by [`callback_code`].
    ///
    /// [`callback_code`]: CallToken::callback_code
    pub fn from_callback_code(code: &str) -> Option<Self> {
        let digits = code.strip_prefix(CALLBACK_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for CallToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.callback_code())
    }
}

/// Monotonic token source. Tokens start at 1 and are never reused for the
/// lifetime of the allocator.
#[derive(Debug)]
pub struct TokenAllocator {
    next: AtomicU64,
}

impl TokenAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_token(&self) -> CallToken {
        CallToken(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TokenAllocator {
    fn default() -> Self {
        Self::new()
    }
}
