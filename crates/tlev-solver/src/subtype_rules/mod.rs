//! Per-kind subtype rules.
//!
//! Each file extends `SubtypeChecker` with the rules for one family of
//! types. The dispatcher in `subtype.rs` decides which rule applies.

mod functions;
mod generics;
mod intrinsics;
mod literals;
mod objects;
mod tuples;
mod unions;

pub(crate) use literals::{capture_candidates, split_template_text};
