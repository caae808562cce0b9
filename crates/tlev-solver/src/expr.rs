//! Owned type expression trees, as handed over by a front-end.
//!
//! `TypeExpr` mirrors the type algebra one-to-one and deserializes from
//! JSON tagged by `kind`:
//!
//! ```json
//! { "kind": "union", "members": [
//!     { "kind": "string", "value": "active" },
//!     { "kind": "string", "value": "inactive" } ] }
//! ```
//!
//! `Document` bundles alias declarations with queries to run against them.

use crate::options::EvalOptions;
use crate::types::VarianceAnnotation;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// `never`, `unknown`, `any`, `void`, `null`, `undefined`, `boolean`,
    /// `number`, `string`, `bigint` or `symbol`.
    Primitive { name: String },
    String { value: String },
    Number { value: f64 },
    Boolean { value: bool },
    /// Digits without the `n` suffix.
    Bigint { value: String },
    Object {
        #[serde(default)]
        properties: Vec<PropertyExpr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<Box<IndexExpr>>,
    },
    Array { element: Box<TypeExpr> },
    Tuple { elements: Vec<TupleElementExpr> },
    Union { members: Vec<TypeExpr> },
    Intersection { members: Vec<TypeExpr> },
    Function {
        #[serde(default)]
        params: Vec<ParamExpr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rest: Option<Box<TypeExpr>>,
        returns: Box<TypeExpr>,
    },
    /// A type parameter, an alias (with `args`), `Array<T>` or a case
    /// intrinsic such as `Uppercase<T>`.
    Ref {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeExpr>,
    },
    /// `infer X`, only meaningful inside a conditional's `extends`.
    Infer { name: String },
    Conditional {
        check: Box<TypeExpr>,
        extends: Box<TypeExpr>,
        /// Extra infer slots besides the `infer` nodes found in `extends`.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        infer: Vec<String>,
        #[serde(rename = "true")]
        true_type: Box<TypeExpr>,
        #[serde(rename = "false")]
        false_type: Box<TypeExpr>,
    },
    Mapped {
        param: String,
        constraint: Box<TypeExpr>,
        #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
        name_type: Option<Box<TypeExpr>>,
        template: Box<TypeExpr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        optional: Option<ModifierExpr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        readonly: Option<ModifierExpr>,
    },
    Template { parts: Vec<TemplatePart> },
    Index { object: Box<TypeExpr>, index: Box<TypeExpr> },
    Keyof { target: Box<TypeExpr> },
}

impl TypeExpr {
    pub fn primitive(name: &str) -> Self {
        TypeExpr::Primitive {
            name: name.to_string(),
        }
    }

    pub fn string(value: &str) -> Self {
        TypeExpr::String {
            value: value.to_string(),
        }
    }

    pub fn reference(name: &str) -> Self {
        TypeExpr::Ref {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn apply(name: &str, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Ref {
            name: name.to_string(),
            args,
        }
    }

    pub fn union(members: Vec<TypeExpr>) -> Self {
        TypeExpr::Union { members }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyExpr {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexExpr {
    pub key: TypeExpr,
    pub value: TypeExpr,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TupleElementExpr {
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub rest: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamExpr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierExpr {
    #[serde(rename = "+", alias = "add")]
    Add,
    #[serde(rename = "-", alias = "remove")]
    Remove,
}

/// Fixed text or an interpolated type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
    Text(String),
    Type(TypeExpr),
}

/// A generic parameter declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<TypeExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TypeExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<VarianceAnnotation>,
}

impl ParamDecl {
    pub fn new(name: &str) -> Self {
        ParamDecl {
            name: name.to_string(),
            constraint: None,
            default: None,
            variance: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AliasDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    pub body: TypeExpr,
}

/// Per-query overrides of the evaluation options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub excess_property_check: Option<bool>,
    #[serde(default)]
    pub recursion_limit: Option<u32>,
    #[serde(default)]
    pub full_expansion: Option<bool>,
    #[serde(default)]
    pub keyof_includes_index_signatures: Option<bool>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl QueryOptions {
    /// `base` with the fields set here overridden.
    pub fn apply(&self, base: EvalOptions) -> EvalOptions {
        let mut options = base;
        if let Some(check) = self.excess_property_check {
            options = options.with_excess_property_check(check);
        }
        if let Some(limit) = self.recursion_limit {
            options = options.with_recursion_limit(limit);
        }
        if let Some(full) = self.full_expansion {
            options = options.with_full_expansion(full);
        }
        if let Some(include) = self.keyof_includes_index_signatures {
            options = options.with_keyof_index_signatures(include);
        }
        if let Some(ms) = self.timeout_ms {
            options = options.with_timeout(Duration::from_millis(ms));
        }
        options
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HintExpr {
    pub pattern: TypeExpr,
    pub actual: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    Evaluate {
        #[serde(default)]
        name: Option<String>,
        expr: TypeExpr,
        /// Known generic arguments, by parameter name.
        #[serde(default)]
        env: IndexMap<String, TypeExpr>,
        #[serde(default)]
        options: QueryOptions,
    },
    Assignable {
        #[serde(default)]
        name: Option<String>,
        source: TypeExpr,
        target: TypeExpr,
        #[serde(default)]
        options: QueryOptions,
    },
    Instantiate {
        #[serde(default)]
        name: Option<String>,
        alias: String,
        #[serde(default)]
        args: Vec<TypeExpr>,
        #[serde(default)]
        hints: Vec<HintExpr>,
        #[serde(default)]
        options: QueryOptions,
    },
    Match {
        #[serde(default)]
        name: Option<String>,
        pattern: TypeExpr,
        subject: TypeExpr,
        #[serde(default)]
        infer: Vec<String>,
        #[serde(default)]
        options: QueryOptions,
    },
    Call {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        type_params: Vec<ParamDecl>,
        params: Vec<ParamExpr>,
        returns: TypeExpr,
        args: Vec<TypeExpr>,
        #[serde(default)]
        options: QueryOptions,
    },
    WriteProperty {
        #[serde(default)]
        name: Option<String>,
        object: TypeExpr,
        property: String,
        value: TypeExpr,
        #[serde(default)]
        options: QueryOptions,
    },
}

impl Query {
    pub fn name(&self) -> Option<&str> {
        match self {
            Query::Evaluate { name, .. }
            | Query::Assignable { name, .. }
            | Query::Instantiate { name, .. }
            | Query::Match { name, .. }
            | Query::Call { name, .. }
            | Query::WriteProperty { name, .. } => name.as_deref(),
        }
    }

    pub fn options(&self) -> &QueryOptions {
        match self {
            Query::Evaluate { options, .. }
            | Query::Assignable { options, .. }
            | Query::Instantiate { options, .. }
            | Query::Match { options, .. }
            | Query::Call { options, .. }
            | Query::WriteProperty { options, .. } => options,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Query::Evaluate { .. } => "evaluate",
            Query::Assignable { .. } => "assignable",
            Query::Instantiate { .. } => "instantiate",
            Query::Match { .. } => "match",
            Query::Call { .. } => "call",
            Query::WriteProperty { .. } => "write_property",
        }
    }
}

/// A batch of alias declarations and queries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub aliases: Vec<AliasDecl>,
    #[serde(default)]
    pub queries: Vec<Query>,
}
