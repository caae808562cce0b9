//! Type representation for the evaluator.
//!
//! Types are represented as lightweight `TypeId` handles that point into an
//! interning table. The actual structure is stored in `TypeData`.

use crate::def::DefId;
use serde::Serialize;
use std::fmt;
use tlev_common::interner::Atom;

/// A lightweight handle to an interned type.
/// Equality check is O(1) - just compare the u32 values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Internal placeholder - no valid type.
    pub const NONE: TypeId = TypeId(0);

    /// Error type - produced by interner overflow, treated permissively.
    pub const ERROR: TypeId = TypeId(1);

    /// The bottom type.
    pub const NEVER: TypeId = TypeId(2);

    /// The top type.
    pub const UNKNOWN: TypeId = TypeId(3);

    /// Opt-out of type checking, compatible in both directions.
    pub const ANY: TypeId = TypeId(4);

    pub const VOID: TypeId = TypeId(5);
    pub const UNDEFINED: TypeId = TypeId(6);
    pub const NULL: TypeId = TypeId(7);
    pub const BOOLEAN: TypeId = TypeId(8);
    pub const NUMBER: TypeId = TypeId(9);
    pub const STRING: TypeId = TypeId(10);
    pub const BIGINT: TypeId = TypeId(11);
    pub const SYMBOL: TypeId = TypeId(12);

    /// The literal `true`, pre-interned so `true | false` can collapse cheaply.
    pub const BOOLEAN_TRUE: TypeId = TypeId(13);
    /// The literal `false`.
    pub const BOOLEAN_FALSE: TypeId = TypeId(14);

    /// First user-defined type ID (after built-in intrinsics)
    pub const FIRST_USER: u32 = 100;

    #[inline]
    pub fn is_intrinsic(self) -> bool {
        self.0 < Self::FIRST_USER
    }

    #[inline]
    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }

    /// `null`, `undefined` and `void`: the values `{}` does not accept.
    #[inline]
    pub fn is_nullish(self) -> bool {
        matches!(self, Self::NULL | Self::UNDEFINED | Self::VOID)
    }

    #[inline]
    pub fn is_any_or_unknown(self) -> bool {
        matches!(self, Self::ANY | Self::UNKNOWN)
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => write!(f, "TypeId(none)"),
            Self::ERROR => write!(f, "TypeId(error)"),
            Self::NEVER => write!(f, "TypeId(never)"),
            Self::UNKNOWN => write!(f, "TypeId(unknown)"),
            Self::ANY => write!(f, "TypeId(any)"),
            Self::STRING => write!(f, "TypeId(string)"),
            Self::NUMBER => write!(f, "TypeId(number)"),
            Self::BOOLEAN => write!(f, "TypeId(boolean)"),
            other => write!(f, "TypeId({})", other.0),
        }
    }
}

/// Interned list of TypeIds (union and intersection members).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeListId(pub u32);

/// Interned list of tuple elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TupleListId(pub u32);

/// Interned list of template literal spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TemplateLiteralId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectShapeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShapeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConditionalTypeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MappedTypeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeApplicationId(pub u32);

/// The structural representation of a type.
///
/// Every variant is matched exhaustively by the evaluator, the subtype
/// checker, the instantiator and the formatter, so a new kind of type is a
/// compile-time touch-point list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    /// Built-in primitive and special types.
    Intrinsic(IntrinsicKind),

    /// A single concrete value of a primitive kind.
    Literal(LiteralValue),

    /// Object shape: properties sorted by name plus an optional index signature.
    Object(ObjectShapeId),

    /// `T[]`
    Array(TypeId),

    /// `[A, B?, ...C[]]`
    Tuple(TupleListId),

    /// Normalized union (flattened, sorted, deduplicated, at least two members).
    Union(TypeListId),

    /// Normalized intersection.
    Intersection(TypeListId),

    /// `(a: A, b?: B, ...rest: R[]) => Ret`
    Function(FunctionShapeId),

    /// Reference to a generic parameter or infer slot by name.
    TypeRef(Atom),

    /// Instantiation of a named alias: `Alias<Args>`.
    Application(TypeApplicationId),

    /// `T extends U ? X : Y`
    Conditional(ConditionalTypeId),

    /// `{ [P in K as N]: T }`
    Mapped(MappedTypeId),

    /// `` `prefix${T}suffix` ``
    TemplateLiteral(TemplateLiteralId),

    /// `Uppercase<T>` and friends, deferred until `T` is concrete.
    StringIntrinsic {
        kind: StringIntrinsicKind,
        type_arg: TypeId,
    },

    /// `T[K]`
    IndexAccess(TypeId, TypeId),

    /// `keyof T`
    KeyOf(TypeId),

    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IntrinsicKind {
    Never,
    Unknown,
    Any,
    Void,
    Null,
    Undefined,
    Boolean,
    Number,
    String,
    Bigint,
    Symbol,
}

impl IntrinsicKind {
    pub const fn to_type_id(self) -> TypeId {
        match self {
            Self::Never => TypeId::NEVER,
            Self::Unknown => TypeId::UNKNOWN,
            Self::Any => TypeId::ANY,
            Self::Void => TypeId::VOID,
            Self::Null => TypeId::NULL,
            Self::Undefined => TypeId::UNDEFINED,
            Self::Boolean => TypeId::BOOLEAN,
            Self::Number => TypeId::NUMBER,
            Self::String => TypeId::STRING,
            Self::Bigint => TypeId::BIGINT,
            Self::Symbol => TypeId::SYMBOL,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Unknown => "unknown",
            Self::Any => "any",
            Self::Void => "void",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Bigint => "bigint",
            Self::Symbol => "symbol",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "never" => Self::Never,
            "unknown" => Self::Unknown,
            "any" => Self::Any,
            "void" => Self::Void,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            "boolean" => Self::Boolean,
            "number" => Self::Number,
            "string" => Self::String,
            "bigint" => Self::Bigint,
            "symbol" => Self::Symbol,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    String(Atom),
    Number(OrderedFloat),
    Boolean(bool),
    BigInt(Atom),
}

impl LiteralValue {
    /// The primitive this literal widens to.
    pub const fn primitive(&self) -> TypeId {
        match self {
            Self::String(_) => TypeId::STRING,
            Self::Number(_) => TypeId::NUMBER,
            Self::Boolean(_) => TypeId::BOOLEAN,
            Self::BigInt(_) => TypeId::BIGINT,
        }
    }
}

/// f64 wrapper with total equality and hashing, so number literals can be
/// interned. `-0` and `0` compare equal; all NaNs are one value.
#[derive(Clone, Copy, Debug)]
pub struct OrderedFloat(pub f64);

impl OrderedFloat {
    fn canonical_bits(self) -> u64 {
        if self.0 == 0.0 {
            0
        } else if self.0.is_nan() {
            f64::NAN.to_bits()
        } else {
            self.0.to_bits()
        }
    }
}

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_bits() == other.canonical_bits()
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical_bits().hash(state);
    }
}

/// Render a number the way a string template would print it.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyInfo {
    pub name: Atom,
    pub type_id: TypeId,
    pub optional: bool,
    pub readonly: bool,
}

impl PropertyInfo {
    pub fn new(name: Atom, type_id: TypeId) -> Self {
        PropertyInfo {
            name,
            type_id,
            optional: false,
            readonly: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexSignature {
    /// `string` or `number` (or a union of them).
    pub key_type: TypeId,
    pub value_type: TypeId,
    pub readonly: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ObjectShape {
    /// Sorted by name; the interner enforces this.
    pub properties: Vec<PropertyInfo>,
    pub index: Option<IndexSignature>,
}

impl ObjectShape {
    pub fn find(&self, name: Atom) -> Option<&PropertyInfo> {
        self.properties
            .binary_search_by_key(&name, |p| p.name)
            .ok()
            .map(|i| &self.properties[i])
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.index.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TupleElement {
    pub type_id: TypeId,
    pub optional: bool,
    /// Spread element: `type_id` is the array or tuple being spread.
    pub rest: bool,
}

impl TupleElement {
    pub fn required(type_id: TypeId) -> Self {
        TupleElement {
            type_id,
            optional: false,
            rest: false,
        }
    }

    pub fn optional(type_id: TypeId) -> Self {
        TupleElement {
            type_id,
            optional: true,
            rest: false,
        }
    }

    pub fn rest(type_id: TypeId) -> Self {
        TupleElement {
            type_id,
            optional: false,
            rest: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    pub name: Option<Atom>,
    pub type_id: TypeId,
    pub optional: bool,
}

impl ParamInfo {
    pub fn unnamed(type_id: TypeId) -> Self {
        ParamInfo {
            name: None,
            type_id,
            optional: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShape {
    pub params: Vec<ParamInfo>,
    /// Array type of the rest parameter (`...args: T[]`), or a type
    /// reference bound to a tuple during inference.
    pub rest: Option<TypeId>,
    pub return_type: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConditionalType {
    pub check_type: TypeId,
    pub extends_type: TypeId,
    /// Names introduced by `infer X` inside `extends_type`.
    pub infer_slots: Vec<Atom>,
    pub true_type: TypeId,
    pub false_type: TypeId,
    /// The check type was a naked type parameter at the declaration site.
    /// Substitution keeps the flag, so a union argument distributes.
    pub is_distributive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MappedModifier {
    Add,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MappedType {
    /// The iteration variable (`P` in `[P in K]`).
    pub type_param: Atom,
    pub constraint: TypeId,
    /// The `as` clause.
    pub name_type: Option<TypeId>,
    pub template: TypeId,
    pub optional_modifier: Option<MappedModifier>,
    pub readonly_modifier: Option<MappedModifier>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TemplateSpan {
    Text(Atom),
    Type(TypeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StringIntrinsicKind {
    Uppercase,
    Lowercase,
    Capitalize,
    Uncapitalize,
}

impl StringIntrinsicKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uppercase => "Uppercase",
            Self::Lowercase => "Lowercase",
            Self::Capitalize => "Capitalize",
            Self::Uncapitalize => "Uncapitalize",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Uppercase" => Some(Self::Uppercase),
            "Lowercase" => Some(Self::Lowercase),
            "Capitalize" => Some(Self::Capitalize),
            "Uncapitalize" => Some(Self::Uncapitalize),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeApplication {
    pub def: DefId,
    pub args: Vec<TypeId>,
}

/// `in` / `out` annotation on a generic parameter declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceAnnotation {
    In,
    Out,
    #[serde(rename = "in out", alias = "inout")]
    InOut,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParamInfo {
    pub name: Atom,
    pub constraint: Option<TypeId>,
    pub default: Option<TypeId>,
    pub variance: Option<VarianceAnnotation>,
}

impl TypeParamInfo {
    pub fn new(name: Atom) -> Self {
        TypeParamInfo {
            name,
            constraint: None,
            default: None,
            variance: None,
        }
    }

    pub fn with_constraint(mut self, constraint: TypeId) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_default(mut self, default: TypeId) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_variance(mut self, variance: VarianceAnnotation) -> Self {
        self.variance = Some(variance);
        self
    }
}
