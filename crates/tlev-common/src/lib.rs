//! Common types and utilities for the tlev type-level evaluator.
//!
//! This crate provides foundational types used across all tlev crates:
//! - String interning (`Atom`, `AtomTable`)
//! - Evaluator limits and thresholds
//! - Diagnostic kinds, codes and message templates

// String interning for property names and string literal values
pub mod interner;
pub use interner::{Atom, AtomTable};

// Centralized limits and thresholds
pub mod limits;

// Diagnostic catalog
pub mod diagnostics;
pub use diagnostics::{DiagnosticCategory, DiagnosticKind, DiagnosticMessage, format_message};
