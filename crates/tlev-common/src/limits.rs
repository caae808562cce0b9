//! Centralized limits and thresholds for the evaluator.
//!
//! Recursion limits for individual solver walks (subtype checking,
//! evaluation, instantiation) are expressed through
//! `tlev_solver::recursion::RecursionProfile`, which reads its defaults from
//! the constants below.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Default maximum depth for nested alias expansion.
///
/// Exceeding this depth reports `RecursionLimitExceeded` (TS2589 in the
/// familiar numbering). Callers can override it per evaluation through
/// `EvalOptions::recursion_limit`.
///
/// ```text
/// type R<T> = { next: R<T> };   // fully expanded: fails at depth 50
/// ```
pub const DEFAULT_RECURSION_LIMIT: u32 = 50;

/// Maximum nesting depth when substituting type arguments through a body.
/// Past this, substitution fails with `RecursionLimitExceeded`.
pub const MAX_INSTANTIATION_DEPTH: u32 = 128;

/// Maximum depth for structural subtype comparison.
///
/// Deeper than evaluation because comparing two recursive structures can
/// legitimately nest before a repeated pair is found.
pub const MAX_SUBTYPE_DEPTH: u32 = 100;

/// Shallow walks that only collect or test for references.
pub const MAX_TRAVERSAL_DEPTH: u32 = 20;

// =============================================================================
// Operation Counts
// =============================================================================

/// Total number of guarded steps one walk may take before giving up.
pub const MAX_TOTAL_ITERATIONS: u32 = 100_000;

/// Upper bound on the members produced by template literal expansion.
///
/// Past this, the template widens to `string` instead of materializing
/// the full cartesian product.
pub const TEMPLATE_LITERAL_EXPANSION_LIMIT: usize = 10_000;

/// Upper bound on the members produced when an intersection is distributed
/// over unions. Larger products are kept as an undistributed intersection.
pub const INTERSECTION_DISTRIBUTION_LIMIT: usize = 256;

/// Number of entries the shared expansion cache holds before it is cleared.
pub const EXPANSION_CACHE_CAPACITY: usize = 65_536;
