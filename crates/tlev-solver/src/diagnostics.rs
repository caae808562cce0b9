//! Evaluation diagnostics and structured subtype failure reasons.
//!
//! A [`Diagnostic`] carries its kind, the structural [`TypePath`] at which it
//! arose and a rendered message. Paths are built innermost-first as errors
//! bubble out of nested evaluation, by prefixing one segment per level.
//!
//! [`SubtypeFailureReason`] is the "why" of a failed subtype check. The
//! checker only produces it on the slow path (`explain_failure`), after the
//! fast boolean check already failed.

use crate::db::TypeDatabase;
use crate::format::TypeFormatter;
use crate::subtype::TypeResolver;
use crate::types::TypeId;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tlev_common::diagnostics::DiagnosticKind;
use tlev_common::interner::Atom;

/// One step in the structural location of a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PathSegment {
    Property(Arc<str>),
    UnionMember(usize),
    TypeArgument(usize),
    TupleElement(usize),
    Parameter(usize),
    ReturnType,
    ArrayElement,
    IndexSignature,
    TemplateSpan(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) => write!(f, ".{name}"),
            Self::UnionMember(i) => write!(f, "|{i}"),
            Self::TypeArgument(i) => write!(f, "<{i}>"),
            Self::TupleElement(i) => write!(f, "[{i}]"),
            Self::Parameter(i) => write!(f, "({i})"),
            Self::ReturnType => write!(f, "=>"),
            Self::ArrayElement => write!(f, "[]"),
            Self::IndexSignature => write!(f, "[key]"),
            Self::TemplateSpan(i) => write!(f, "${{{i}}}"),
        }
    }
}

/// Structural location: property chain, union member index, type argument
/// position and so on, outermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypePath(SmallVec<[PathSegment; 4]>);

impl Serialize for TypePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl TypePath {
    pub fn new() -> Self {
        TypePath(SmallVec::new())
    }

    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        TypePath(segments.into_iter().collect())
    }

    pub fn prepend(&mut self, segment: PathSegment) {
        self.0.insert(0, segment);
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A reported evaluation problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: TypePath,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            path: TypePath::new(),
            message: message.into(),
        }
    }

    /// Prefix the path with the segment of the enclosing structure.
    pub fn at(mut self, segment: PathSegment) -> Self {
        self.path.prepend(segment);
        self
    }

    pub fn with_path(mut self, path: TypePath) -> Self {
        self.path = path;
        self
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    pub fn type_mismatch(db: &dyn TypeDatabase, source: TypeId, target: TypeId) -> Self {
        let mut fmt = TypeFormatter::new(db);
        Diagnostic::new(
            DiagnosticKind::TypeMismatch,
            DiagnosticKind::TypeMismatch.format(&[&fmt.format(source), &fmt.format(target)]),
        )
    }

    pub fn unknown_property(db: &dyn TypeDatabase, key: &str, object: TypeId) -> Self {
        let mut fmt = TypeFormatter::new(db);
        Diagnostic::new(
            DiagnosticKind::UnknownProperty,
            DiagnosticKind::UnknownProperty.format(&[key, &fmt.format(object)]),
        )
        .at(PathSegment::Property(Arc::from(key)))
    }

    pub fn recursion_limit(limit: u32) -> Self {
        Diagnostic::new(
            DiagnosticKind::RecursionLimitExceeded,
            DiagnosticKind::RecursionLimitExceeded.format(&[&limit.to_string()]),
        )
    }

    pub fn timeout() -> Self {
        Diagnostic::new(DiagnosticKind::Timeout, DiagnosticKind::Timeout.format(&[]))
    }

    pub fn unresolved(name: &str) -> Self {
        Diagnostic::new(
            DiagnosticKind::UnresolvedReference,
            DiagnosticKind::UnresolvedReference.format(&[name]),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.message)?;
        if !self.path.is_empty() {
            write!(f, " (at {})", self.path)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Detailed reason for a subtype check failure.
#[derive(Clone, Debug, PartialEq)]
pub enum SubtypeFailureReason {
    /// A required property is missing in the source type.
    MissingProperty {
        property_name: Atom,
        source_type: TypeId,
        target_type: TypeId,
    },
    /// Property types are incompatible.
    PropertyTypeMismatch {
        property_name: Atom,
        source_property_type: TypeId,
        target_property_type: TypeId,
        nested_reason: Option<Box<SubtypeFailureReason>>,
    },
    /// Optional property cannot satisfy required property.
    OptionalPropertyRequired { property_name: Atom },
    /// Assignment to a readonly property.
    ReadonlyPropertyWrite { property_name: Atom },
    /// An object literal names a property the target does not declare.
    ExcessProperty {
        property_name: Atom,
        target_type: TypeId,
    },
    ReturnTypeMismatch {
        source_return: TypeId,
        target_return: TypeId,
        nested_reason: Option<Box<SubtypeFailureReason>>,
    },
    ParameterTypeMismatch {
        param_index: usize,
        source_param: TypeId,
        target_param: TypeId,
    },
    /// The source requires more parameters than the target provides.
    TooManyParameters {
        source_count: usize,
        target_count: usize,
    },
    TupleElementMismatch {
        source_count: usize,
        target_count: usize,
    },
    TupleElementTypeMismatch {
        index: usize,
        source_element: TypeId,
        target_element: TypeId,
        nested_reason: Option<Box<SubtypeFailureReason>>,
    },
    ArrayElementMismatch {
        source_element: TypeId,
        target_element: TypeId,
        nested_reason: Option<Box<SubtypeFailureReason>>,
    },
    IndexSignatureMismatch {
        source_value_type: TypeId,
        target_value_type: TypeId,
    },
    /// No union member matches.
    NoUnionMemberMatches {
        source_type: TypeId,
        target_union_members: Vec<TypeId>,
    },
    /// One member of a source union is not assignable.
    UnionMemberMismatch {
        index: usize,
        member: TypeId,
        nested_reason: Option<Box<SubtypeFailureReason>>,
    },
    /// Generic type mismatch (no more specific reason).
    TypeMismatch {
        source_type: TypeId,
        target_type: TypeId,
    },
    RecursionLimitExceeded,
}

impl SubtypeFailureReason {
    fn nested(&self) -> Option<&SubtypeFailureReason> {
        match self {
            Self::PropertyTypeMismatch { nested_reason, .. }
            | Self::ReturnTypeMismatch { nested_reason, .. }
            | Self::TupleElementTypeMismatch { nested_reason, .. }
            | Self::ArrayElementMismatch { nested_reason, .. }
            | Self::UnionMemberMismatch { nested_reason, .. } => nested_reason.as_deref(),
            _ => None,
        }
    }

    fn segment(&self, db: &dyn TypeDatabase) -> Option<PathSegment> {
        match self {
            Self::MissingProperty { property_name, .. }
            | Self::PropertyTypeMismatch { property_name, .. }
            | Self::OptionalPropertyRequired { property_name }
            | Self::ReadonlyPropertyWrite { property_name }
            | Self::ExcessProperty { property_name, .. } => {
                Some(PathSegment::Property(db.resolve_atom_ref(*property_name)))
            }
            Self::ReturnTypeMismatch { .. } => Some(PathSegment::ReturnType),
            Self::ParameterTypeMismatch { param_index, .. } => {
                Some(PathSegment::Parameter(*param_index))
            }
            Self::TupleElementTypeMismatch { index, .. } => Some(PathSegment::TupleElement(*index)),
            Self::ArrayElementMismatch { .. } => Some(PathSegment::ArrayElement),
            Self::IndexSignatureMismatch { .. } => Some(PathSegment::IndexSignature),
            Self::UnionMemberMismatch { index, .. } => Some(PathSegment::UnionMember(*index)),
            _ => None,
        }
    }

    /// Structural location of the innermost failure.
    pub fn to_path(&self, db: &dyn TypeDatabase) -> TypePath {
        let mut path = TypePath::new();
        let mut current = Some(self);
        while let Some(reason) = current {
            if let Some(segment) = reason.segment(db) {
                path.push(segment);
            }
            current = reason.nested();
        }
        path
    }

    /// One-sentence detail for the innermost failure.
    pub fn detail(&self, db: &dyn TypeDatabase, resolver: Option<&dyn TypeResolver>) -> String {
        let mut innermost = self;
        while let Some(next) = innermost.nested() {
            innermost = next;
        }
        let mut fmt = TypeFormatter::new(db);
        if let Some(resolver) = resolver {
            fmt = fmt.with_resolver(resolver);
        }
        match innermost {
            Self::MissingProperty {
                property_name,
                source_type,
                target_type,
            } => format!(
                "Property '{}' is missing in type '{}' but required in type '{}'.",
                db.resolve_atom(*property_name),
                fmt.format(*source_type),
                fmt.format(*target_type)
            ),
            Self::PropertyTypeMismatch {
                property_name,
                source_property_type,
                target_property_type,
                ..
            } => format!(
                "Types of property '{}' are incompatible: '{}' is not assignable to '{}'.",
                db.resolve_atom(*property_name),
                fmt.format(*source_property_type),
                fmt.format(*target_property_type)
            ),
            Self::OptionalPropertyRequired { property_name } => format!(
                "Property '{}' is optional in the source but required in the target.",
                db.resolve_atom(*property_name)
            ),
            Self::ReadonlyPropertyWrite { property_name } => format!(
                "Cannot assign to '{}' because it is a read-only property.",
                db.resolve_atom(*property_name)
            ),
            Self::ExcessProperty {
                property_name,
                target_type,
            } => format!(
                "Object literal may only specify known properties, and '{}' does not exist in type '{}'.",
                db.resolve_atom(*property_name),
                fmt.format(*target_type)
            ),
            Self::ReturnTypeMismatch {
                source_return,
                target_return,
                ..
            } => format!(
                "Return type '{}' is not assignable to '{}'.",
                fmt.format(*source_return),
                fmt.format(*target_return)
            ),
            Self::ParameterTypeMismatch {
                param_index,
                source_param,
                target_param,
            } => format!(
                "Parameter {} of type '{}' does not accept '{}'.",
                param_index,
                fmt.format(*source_param),
                fmt.format(*target_param)
            ),
            Self::TooManyParameters {
                source_count,
                target_count,
            } => format!(
                "Source requires {source_count} parameters but the target provides {target_count}."
            ),
            Self::TupleElementMismatch {
                source_count,
                target_count,
            } => format!(
                "Source has {source_count} element(s) but target allows {target_count}."
            ),
            Self::TupleElementTypeMismatch {
                source_element,
                target_element,
                ..
            }
            | Self::ArrayElementMismatch {
                source_element,
                target_element,
                ..
            } => format!(
                "Element type '{}' is not assignable to '{}'.",
                fmt.format(*source_element),
                fmt.format(*target_element)
            ),
            Self::IndexSignatureMismatch {
                source_value_type,
                target_value_type,
            } => format!(
                "Index signature value '{}' is not assignable to '{}'.",
                fmt.format(*source_value_type),
                fmt.format(*target_value_type)
            ),
            Self::NoUnionMemberMatches {
                source_type,
                target_union_members,
            } => {
                let members: Vec<String> =
                    target_union_members.iter().map(|m| fmt.format(*m)).collect();
                format!(
                    "'{}' matches none of: {}.",
                    fmt.format(*source_type),
                    members.join(", ")
                )
            }
            Self::UnionMemberMismatch { member, .. } => {
                format!("Union member '{}' is not assignable.", fmt.format(*member))
            }
            Self::TypeMismatch {
                source_type,
                target_type,
            } => format!(
                "'{}' is not assignable to '{}'.",
                fmt.format(*source_type),
                fmt.format(*target_type)
            ),
            Self::RecursionLimitExceeded => {
                "Comparison exceeded the recursion limit.".to_string()
            }
        }
    }

    /// Turn the failure into a diagnostic about assigning `source` to `target`.
    pub fn to_diagnostic(
        &self,
        db: &dyn TypeDatabase,
        resolver: Option<&dyn TypeResolver>,
        source: TypeId,
        target: TypeId,
    ) -> Diagnostic {
        let kind = match self {
            Self::ExcessProperty { .. } => DiagnosticKind::ExcessProperty,
            Self::RecursionLimitExceeded => DiagnosticKind::RecursionLimitExceeded,
            _ => DiagnosticKind::TypeMismatch,
        };
        let mut fmt = TypeFormatter::new(db);
        if let Some(resolver) = resolver {
            fmt = fmt.with_resolver(resolver);
        }
        let headline = match kind {
            DiagnosticKind::ExcessProperty => String::new(),
            _ => DiagnosticKind::TypeMismatch.format(&[&fmt.format(source), &fmt.format(target)]),
        };
        let detail = self.detail(db, resolver);
        let message = if headline.is_empty() {
            detail
        } else {
            format!("{headline} {detail}")
        };
        Diagnostic::new(kind, message).with_path(self.to_path(db))
    }
}
