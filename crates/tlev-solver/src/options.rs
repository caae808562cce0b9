//! Evaluation mode flags.

use std::time::{Duration, Instant};
use tlev_common::limits::DEFAULT_RECURSION_LIMIT;

/// Options threaded through one evaluation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvalOptions {
    /// Reject properties the target shape does not declare when checking an
    /// object literal directly against it.
    pub excess_property_check: bool,
    /// Maximum nesting of alias expansions.
    pub recursion_limit: u32,
    /// Expand nested alias applications eagerly instead of deferring a
    /// re-entrant expansion. Recursive aliases then hit `recursion_limit`.
    pub full_expansion: bool,
    /// Let `keyof` report index signature key types.
    pub keyof_includes_index_signatures: bool,
    /// Cooperative cancellation point checked at every evaluation step.
    pub deadline: Option<Instant>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            excess_property_check: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            full_expansion: false,
            keyof_includes_index_signatures: false,
            deadline: None,
        }
    }
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excess_property_check(mut self, enabled: bool) -> Self {
        self.excess_property_check = enabled;
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_full_expansion(mut self, enabled: bool) -> Self {
        self.full_expansion = enabled;
        self
    }

    pub fn with_keyof_index_signatures(mut self, enabled: bool) -> Self {
        self.keyof_includes_index_signatures = enabled;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bits of the options that change what an alias expands to.
    /// Part of the shared expansion cache key.
    pub(crate) fn expansion_mode(&self) -> u64 {
        u64::from(self.full_expansion)
            | (u64::from(self.keyof_includes_index_signatures) << 1)
            | (u64::from(self.recursion_limit) << 8)
    }

    #[inline]
    pub(crate) fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
