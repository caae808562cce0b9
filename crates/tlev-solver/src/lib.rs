//! Structural type-level evaluator.
//!
//! Types are interned into `TypeId` handles and reduced by a set of
//! cooperating components:
//!
//! - **Subtype relation**: structural assignability with coinductive cycle
//!   handling (`SubtypeChecker`)
//! - **Unifier**: binds `infer` slots by matching a pattern against a
//!   subject, backed by an `ena` union-find table
//! - **Evaluator**: expands aliases, conditional, mapped and template
//!   literal types, `keyof` and indexed access (`TypeEvaluator`)
//! - **Instantiator**: binds generic parameters from explicit arguments,
//!   contextual hints and defaults
//!
//! `Engine` bundles the interner, the alias definitions and the shared
//! expansion cache behind one entry point.
mod db;
pub mod def;
mod diagnostics;
mod engine;
mod evaluate;
pub mod evaluate_rules;
pub mod expansion_cache;
pub mod expr;
mod format;
mod infer;
mod instantiate;
mod intern;
pub mod lower;
pub mod options;
pub mod prelude;
pub mod recursion;
mod subtype;
mod subtype_rules;
pub mod types;
pub mod variance;
pub mod visitor;

pub use db::TypeDatabase;
pub use def::{AliasDef, DefId, DefinitionStore};
pub use diagnostics::{Diagnostic, PathSegment, SubtypeFailureReason, TypePath};
pub use engine::{Engine, Resolved};
pub use evaluate::{TypeEvaluator, evaluate_type};
pub use evaluate_rules::infer_pattern::{InferBindings, MatchError};
pub use evaluate_rules::string_intrinsic::apply_string_intrinsic;
pub use expansion_cache::{ExpansionCache, ExpansionKey};
pub use expr::{AliasDecl, Document, Query, QueryOptions, TypeExpr};
pub use format::TypeFormatter;
pub use infer::{InferenceContext, InferenceValue, InferenceVar, Polarity};
pub use instantiate::{
    ContextualHint, GenericDecl, GenericFunction, Instantiation, TypeSubstitution, instantiate_generic,
    instantiate_type,
};
pub use intern::TypeInterner;
pub use lower::{Lowerer, infer_names, lower_type};
pub use options::EvalOptions;
pub use prelude::install_prelude;
pub use subtype::{NoopResolver, SubtypeChecker, SubtypeResult, TypeResolver, is_subtype_of};
pub use types::*;
pub use variance::{Variance, compute_variance, param_variance};

pub use tlev_common::diagnostics::DiagnosticKind;
pub use tlev_common::interner::Atom;
