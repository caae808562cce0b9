//! Built-in utility aliases: `Partial`, `Required`, `Readonly`, `Pick`,
//! `Record`, `Exclude`, `Extract`, `NonNullable`, `ReturnType` and
//! `Parameters`.
//!
//! They are ordinary aliases over the type algebra and are registered like
//! user declarations, so a user alias of the same name shadows them.

use crate::db::TypeDatabase;
use crate::def::{DefId, DefinitionStore};
use crate::diagnostics::Diagnostic;
use crate::expr::{AliasDecl, ModifierExpr, ParamDecl, ParamExpr, TypeExpr};
use crate::lower::Lowerer;

fn r(name: &str) -> TypeExpr {
    TypeExpr::reference(name)
}

fn prim(name: &str) -> TypeExpr {
    TypeExpr::primitive(name)
}

fn index(object: TypeExpr, key: TypeExpr) -> TypeExpr {
    TypeExpr::Index {
        object: Box::new(object),
        index: Box::new(key),
    }
}

fn keyof(target: TypeExpr) -> TypeExpr {
    TypeExpr::Keyof {
        target: Box::new(target),
    }
}

fn conditional(check: TypeExpr, extends: TypeExpr, true_type: TypeExpr, false_type: TypeExpr) -> TypeExpr {
    TypeExpr::Conditional {
        check: Box::new(check),
        extends: Box::new(extends),
        infer: Vec::new(),
        true_type: Box::new(true_type),
        false_type: Box::new(false_type),
    }
}

fn mapped(
    constraint: TypeExpr,
    template: TypeExpr,
    optional: Option<ModifierExpr>,
    readonly: Option<ModifierExpr>,
) -> TypeExpr {
    TypeExpr::Mapped {
        param: "P".to_string(),
        constraint: Box::new(constraint),
        name_type: None,
        template: Box::new(template),
        optional,
        readonly,
    }
}

/// `(...args: rest) => returns`
fn variadic_fn(rest: TypeExpr, returns: TypeExpr) -> TypeExpr {
    TypeExpr::Function {
        params: Vec::<ParamExpr>::new(),
        rest: Some(Box::new(rest)),
        returns: Box::new(returns),
    }
}

fn alias(name: &str, params: Vec<ParamDecl>, body: TypeExpr) -> AliasDecl {
    AliasDecl {
        name: name.to_string(),
        params,
        body,
    }
}

fn constrained(name: &str, constraint: TypeExpr) -> ParamDecl {
    ParamDecl {
        constraint: Some(constraint),
        ..ParamDecl::new(name)
    }
}

fn homomorphic(optional: Option<ModifierExpr>, readonly: Option<ModifierExpr>) -> TypeExpr {
    mapped(keyof(r("T")), index(r("T"), r("P")), optional, readonly)
}

pub fn prelude_aliases() -> Vec<AliasDecl> {
    let any_fn = || variadic_fn(prim("any"), prim("any"));
    let property_key = || TypeExpr::union(vec![prim("string"), prim("number"), prim("symbol")]);
    vec![
        alias(
            "Partial",
            vec![ParamDecl::new("T")],
            homomorphic(Some(ModifierExpr::Add), None),
        ),
        alias(
            "Required",
            vec![ParamDecl::new("T")],
            homomorphic(Some(ModifierExpr::Remove), None),
        ),
        alias(
            "Readonly",
            vec![ParamDecl::new("T")],
            homomorphic(None, Some(ModifierExpr::Add)),
        ),
        alias(
            "Pick",
            vec![ParamDecl::new("T"), constrained("K", keyof(r("T")))],
            mapped(r("K"), index(r("T"), r("P")), None, None),
        ),
        alias(
            "Record",
            vec![constrained("K", property_key()), ParamDecl::new("V")],
            mapped(r("K"), r("V"), None, None),
        ),
        alias(
            "Exclude",
            vec![ParamDecl::new("T"), ParamDecl::new("U")],
            conditional(r("T"), r("U"), prim("never"), r("T")),
        ),
        alias(
            "Extract",
            vec![ParamDecl::new("T"), ParamDecl::new("U")],
            conditional(r("T"), r("U"), r("T"), prim("never")),
        ),
        alias(
            "NonNullable",
            vec![ParamDecl::new("T")],
            conditional(
                r("T"),
                TypeExpr::union(vec![prim("null"), prim("undefined")]),
                prim("never"),
                r("T"),
            ),
        ),
        alias(
            "ReturnType",
            vec![constrained("T", any_fn())],
            conditional(
                r("T"),
                variadic_fn(prim("any"), TypeExpr::Infer { name: "R".to_string() }),
                r("R"),
                prim("any"),
            ),
        ),
        alias(
            "Parameters",
            vec![constrained("T", any_fn())],
            conditional(
                r("T"),
                variadic_fn(TypeExpr::Infer { name: "P".to_string() }, prim("any")),
                r("P"),
                prim("never"),
            ),
        ),
    ]
}

/// Register the utility aliases in `defs`.
pub fn install_prelude(db: &dyn TypeDatabase, defs: &DefinitionStore) -> Result<Vec<DefId>, Diagnostic> {
    Lowerer::new(db, defs).declare_aliases(&prelude_aliases())
}
