//! Guards for the solver's recursive walks.
//!
//! Subtype checks and `infer` pattern matching walk pairs of types that can
//! refer back to themselves through aliases. A [`RecursionGuard`] keeps the
//! keys currently on the walk stack (seeing one again is a cycle), caps the
//! nesting depth and counts every step so a pathological input stops after
//! a bounded amount of work.
//!
//! Substitution only needs the depth cap, which [`DepthCounter`] provides.

use rustc_hash::FxHashSet;
use std::hash::Hash;
use tlev_common::limits;

/// Limits for one kind of walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Pairs of types under structural comparison.
    SubtypeCheck,
    /// Pattern/subject pairs while collecting inference candidates.
    InferenceMatch,
    /// Substituting type arguments through a body.
    Instantiation,
    Custom { max_depth: u32, max_steps: u32 },
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::SubtypeCheck | Self::InferenceMatch => limits::MAX_SUBTYPE_DEPTH,
            Self::Instantiation => limits::MAX_INSTANTIATION_DEPTH,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    pub const fn max_steps(self) -> u32 {
        match self {
            Self::Custom { max_steps, .. } => max_steps,
            _ => limits::MAX_TOTAL_ITERATIONS,
        }
    }
}

/// Outcome of [`RecursionGuard::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// The key is already on the walk stack.
    Cycle,
    DepthExceeded,
    StepsExhausted,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        self == Self::Entered
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        self == Self::Cycle
    }

    /// Depth or step budget ran out.
    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::StepsExhausted)
    }
}

/// Cycle, depth and step tracking for a walk keyed by `K`.
///
/// Every `Entered` must be paired with a [`leave`](Self::leave) of the same
/// key; debug builds panic when a guard is dropped with keys still active.
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    active: FxHashSet<K>,
    depth: u32,
    steps: u32,
    profile: RecursionProfile,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    pub fn with_profile(profile: RecursionProfile) -> Self {
        RecursionGuard {
            active: FxHashSet::default(),
            depth: 0,
            steps: 0,
            profile,
        }
    }

    pub fn new(max_depth: u32, max_steps: u32) -> Self {
        Self::with_profile(RecursionProfile::Custom { max_depth, max_steps })
    }

    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.steps = self.steps.saturating_add(1);
        if self.steps > self.profile.max_steps() {
            return RecursionResult::StepsExhausted;
        }
        if self.active.contains(&key) {
            return RecursionResult::Cycle;
        }
        if self.depth >= self.profile.max_depth() {
            return RecursionResult::DepthExceeded;
        }
        self.active.insert(key);
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: K) {
        let removed = self.active.remove(&key);
        debug_assert!(removed, "RecursionGuard::leave without a matching enter");
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` with `key` entered, or report why entry was refused.
    pub fn scope<T>(&mut self, key: K, f: impl FnOnce() -> T) -> Result<T, RecursionResult> {
        match self.enter(key) {
            RecursionResult::Entered => {
                let value = f();
                self.leave(key);
                Ok(value)
            }
            refused => Err(refused),
        }
    }

    #[inline]
    pub fn is_active(&self, key: &K) -> bool {
        self.active.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn steps(&self) -> u32 {
        self.steps
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.active.is_empty() {
            panic!("RecursionGuard dropped with {} keys still entered", self.active.len());
        }
    }
}

/// Depth-only guard for walks that legitimately revisit the same node.
pub struct DepthCounter {
    depth: u32,
    max_depth: u32,
}

impl DepthCounter {
    pub fn with_profile(profile: RecursionProfile) -> Self {
        DepthCounter {
            depth: 0,
            max_depth: profile.max_depth(),
        }
    }

    /// `false` (without descending) once the cap is reached.
    #[inline]
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            return false;
        }
        self.depth += 1;
        true
    }

    #[inline]
    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "DepthCounter::leave at depth 0");
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

#[cfg(test)]
#[path = "../tests/recursion_tests.rs"]
mod tests;
