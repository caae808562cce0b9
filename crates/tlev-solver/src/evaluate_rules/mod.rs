//! Per-kind evaluation rules for `TypeEvaluator`.
//!
//! Each module adds an `impl TypeEvaluator` block for one meta type.

mod application;
mod conditional;
pub(crate) mod index_access;
pub(crate) mod infer_pattern;
mod keyof;
mod mapped;
pub(crate) mod string_intrinsic;
mod template_literal;
