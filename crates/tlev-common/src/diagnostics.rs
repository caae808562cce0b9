//! Diagnostic catalog: kinds, stable codes and message templates.
//!
//! Codes follow the familiar TypeScript numbering where an equivalent
//! error exists, so users can search for them. Kinds without a counterpart
//! use the 9xxx range.

use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Message,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

pub mod diagnostic_codes {
    pub const TYPE_NOT_ASSIGNABLE: u32 = 2322;
    pub const TYPE_DOES_NOT_SATISFY_CONSTRAINT: u32 = 2344;
    pub const GENERIC_TYPE_REQUIRES_TYPE_ARGUMENTS: u32 = 2314;
    pub const PROPERTY_DOES_NOT_EXIST: u32 = 2339;
    pub const OBJECT_LITERAL_KNOWN_PROPERTIES_ONLY: u32 = 2353;
    pub const TYPE_INSTANTIATION_EXCESSIVELY_DEEP: u32 = 2589;
    pub const CANNOT_FIND_NAME: u32 = 2304;
    pub const AMBIGUOUS_INFERENCE: u32 = 9001;
    pub const EVALUATION_TIMED_OUT: u32 = 9002;
}

pub mod diagnostic_messages {
    use super::{DiagnosticCategory, DiagnosticMessage, diagnostic_codes};

    pub const TYPE_NOT_ASSIGNABLE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::TYPE_NOT_ASSIGNABLE,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' is not assignable to type '{1}'.",
    };
    pub const TYPE_DOES_NOT_SATISFY_CONSTRAINT: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::TYPE_DOES_NOT_SATISFY_CONSTRAINT,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' does not satisfy the constraint '{1}'.",
    };
    pub const GENERIC_TYPE_REQUIRES_TYPE_ARGUMENTS: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::GENERIC_TYPE_REQUIRES_TYPE_ARGUMENTS,
        category: DiagnosticCategory::Error,
        message: "Type parameter '{0}' has no argument, no inference candidate and no default.",
    };
    pub const PROPERTY_DOES_NOT_EXIST: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::PROPERTY_DOES_NOT_EXIST,
        category: DiagnosticCategory::Error,
        message: "Property '{0}' does not exist on type '{1}'.",
    };
    pub const OBJECT_LITERAL_KNOWN_PROPERTIES_ONLY: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::OBJECT_LITERAL_KNOWN_PROPERTIES_ONLY,
        category: DiagnosticCategory::Error,
        message: "Object literal may only specify known properties, and '{0}' does not exist in type '{1}'.",
    };
    pub const TYPE_INSTANTIATION_EXCESSIVELY_DEEP: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::TYPE_INSTANTIATION_EXCESSIVELY_DEEP,
        category: DiagnosticCategory::Error,
        message: "Type instantiation is excessively deep and possibly infinite (limit {0}).",
    };
    pub const CANNOT_FIND_NAME: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::CANNOT_FIND_NAME,
        category: DiagnosticCategory::Error,
        message: "Cannot find name '{0}'.",
    };
    pub const AMBIGUOUS_INFERENCE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::AMBIGUOUS_INFERENCE,
        category: DiagnosticCategory::Error,
        message: "Conflicting candidates for '{0}' in contravariant positions: {1}.",
    };
    pub const EVALUATION_TIMED_OUT: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::EVALUATION_TIMED_OUT,
        category: DiagnosticCategory::Error,
        message: "Type evaluation exceeded its deadline.",
    };
}

/// The kinds of diagnostics the evaluator reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    TypeMismatch,
    ConstraintViolation,
    MissingTypeArgument,
    UnknownProperty,
    ExcessProperty,
    AmbiguousInference,
    RecursionLimitExceeded,
    Timeout,
    /// A generic parameter or alias name survived evaluation unbound.
    UnresolvedReference,
}

impl DiagnosticKind {
    pub const fn message(self) -> DiagnosticMessage {
        use diagnostic_messages as m;
        match self {
            Self::TypeMismatch => m::TYPE_NOT_ASSIGNABLE,
            Self::ConstraintViolation => m::TYPE_DOES_NOT_SATISFY_CONSTRAINT,
            Self::MissingTypeArgument => m::GENERIC_TYPE_REQUIRES_TYPE_ARGUMENTS,
            Self::UnknownProperty => m::PROPERTY_DOES_NOT_EXIST,
            Self::ExcessProperty => m::OBJECT_LITERAL_KNOWN_PROPERTIES_ONLY,
            Self::AmbiguousInference => m::AMBIGUOUS_INFERENCE,
            Self::RecursionLimitExceeded => m::TYPE_INSTANTIATION_EXCESSIVELY_DEEP,
            Self::Timeout => m::EVALUATION_TIMED_OUT,
            Self::UnresolvedReference => m::CANNOT_FIND_NAME,
        }
    }

    #[inline]
    pub const fn code(self) -> u32 {
        self.message().code
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::TypeMismatch => "TypeMismatch",
            Self::ConstraintViolation => "ConstraintViolation",
            Self::MissingTypeArgument => "MissingTypeArgument",
            Self::UnknownProperty => "UnknownProperty",
            Self::ExcessProperty => "ExcessProperty",
            Self::AmbiguousInference => "AmbiguousInference",
            Self::RecursionLimitExceeded => "RecursionLimitExceeded",
            Self::Timeout => "Timeout",
            Self::UnresolvedReference => "UnresolvedReference",
        }
    }

    /// Render this kind's message template with positional arguments.
    pub fn format(self, args: &[&str]) -> String {
        format_message(self.message().message, args)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TL{}", self.code())
    }
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}
