use super::*;
use crate::TypeInterner;
use serde_json::json;
use tlev_common::diagnostics::DiagnosticKind;

fn expr(value: serde_json::Value) -> TypeExpr {
    serde_json::from_value(value).expect("valid type expression")
}

fn prim(name: &str) -> serde_json::Value {
    json!({ "kind": "primitive", "name": name })
}

#[test]
fn test_lower_primitives_and_literals() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    assert_eq!(lower_type(&interner, &defs, &expr(prim("string"))), Ok(TypeId::STRING));
    assert_eq!(
        lower_type(&interner, &defs, &expr(json!({ "kind": "bigint", "value": "12n" }))),
        Ok(interner.literal_bigint("12"))
    );
    assert_eq!(
        lower_type(&interner, &defs, &TypeExpr::string("active")),
        Ok(interner.literal_string("active"))
    );

    let err = lower_type(&interner, &defs, &expr(prim("str"))).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::UnresolvedReference);
}

#[test]
fn test_lower_object_sorts_properties_and_locates_errors() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    let object = expr(json!({
        "kind": "object",
        "properties": [
            { "name": "name", "type": prim("string"), "optional": true },
            { "name": "id", "type": prim("number"), "readonly": true }
        ]
    }));
    let expected = interner.object(vec![
        PropertyInfo::new(interner.intern_string("id"), TypeId::NUMBER).readonly(),
        PropertyInfo::new(interner.intern_string("name"), TypeId::STRING).optional(),
    ]);
    assert_eq!(lower_type(&interner, &defs, &object), Ok(expected));

    let broken = expr(json!({
        "kind": "object",
        "properties": [{
            "name": "items",
            "type": { "kind": "array", "element": { "kind": "ref", "name": "Missing", "args": [prim("string")] } }
        }]
    }));
    let err = lower_type(&interner, &defs, &broken).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::UnresolvedReference);
    assert_eq!(err.path.to_string(), ".items[]");
}

#[test]
fn test_lower_ref_resolution_order() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();

    let free = lower_type(&interner, &defs, &TypeExpr::reference("T"));
    assert_eq!(free, Ok(interner.type_param("T")));

    let array = TypeExpr::apply("Array", vec![TypeExpr::primitive("number")]);
    assert_eq!(lower_type(&interner, &defs, &array), Ok(interner.array(TypeId::NUMBER)));

    let upper = TypeExpr::apply("Uppercase", vec![TypeExpr::string("a")]);
    assert_eq!(
        lower_type(&interner, &defs, &upper),
        Ok(interner.string_intrinsic(StringIntrinsicKind::Uppercase, interner.literal_string("a")))
    );

    let box_def = defs.declare(interner.intern_string("Box"), vec![]);
    let applied = TypeExpr::apply("Box", vec![TypeExpr::primitive("string")]);
    assert_eq!(
        lower_type(&interner, &defs, &applied),
        Ok(interner.application(box_def, vec![TypeId::STRING]))
    );

    let scoped = Lowerer::new(&interner, &defs)
        .with_scope(["Box"])
        .lower(&TypeExpr::reference("Box"));
    assert_eq!(scoped, Ok(interner.type_param("Box")));
}

#[test]
fn test_lower_conditional_collects_infer_slots() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    let cond = expr(json!({
        "kind": "conditional",
        "check": { "kind": "ref", "name": "T" },
        "extends": { "kind": "array", "element": { "kind": "infer", "name": "U" } },
        "true": { "kind": "ref", "name": "U" },
        "false": prim("never")
    }));
    let lowered = Lowerer::new(&interner, &defs).with_scope(["T"]).lower(&cond);
    let Ok(lowered) = lowered else {
        panic!("lowering failed: {lowered:?}");
    };
    let Some(TypeData::Conditional(id)) = interner.lookup(lowered) else {
        panic!("expected conditional");
    };
    let cond = interner.conditional_type(id);
    let u = interner.intern_string("U");
    assert_eq!(cond.infer_slots, vec![u]);
    assert!(cond.is_distributive);
    assert_eq!(cond.extends_type, interner.array(interner.type_ref(u)));
    assert_eq!(cond.true_type, interner.type_ref(u));
}

#[test]
fn test_lower_conditional_over_concrete_check_is_not_distributive() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    let cond = expr(json!({
        "kind": "conditional",
        "check": { "kind": "union", "members": [prim("string"), prim("number")] },
        "extends": prim("string"),
        "true": { "kind": "string", "value": "yes" },
        "false": { "kind": "string", "value": "no" }
    }));
    let Ok(lowered) = lower_type(&interner, &defs, &cond) else {
        panic!("lowering failed");
    };
    let Some(TypeData::Conditional(id)) = interner.lookup(lowered) else {
        panic!("expected conditional");
    };
    assert!(!interner.conditional_type(id).is_distributive);
}

#[test]
fn test_declare_recursive_alias() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    let list: AliasDecl = serde_json::from_value(json!({
        "name": "List",
        "params": [{ "name": "T" }],
        "body": {
            "kind": "object",
            "properties": [
                { "name": "value", "type": { "kind": "ref", "name": "T" } },
                { "name": "next", "optional": true,
                  "type": { "kind": "ref", "name": "List", "args": [{ "kind": "ref", "name": "T" }] } }
            ]
        }
    }))
    .expect("valid alias");

    let ids = Lowerer::new(&interner, &defs).declare_aliases(&[list]);
    let Ok(ids) = ids else {
        panic!("declaration failed: {ids:?}");
    };
    let list_def = ids[0];
    assert_eq!(defs.find_by_name(interner.intern_string("List")), Some(list_def));
    let Some(body) = defs.get_body(list_def) else {
        panic!("alias body missing");
    };
    let Some(TypeData::Object(shape)) = interner.lookup(body) else {
        panic!("expected object body");
    };
    let shape = interner.object_shape(shape);
    let next = shape.find(interner.intern_string("next")).map(|p| p.type_id);
    assert_eq!(
        next,
        Some(interner.application(list_def, vec![interner.type_param("T")]))
    );
}

#[test]
fn test_later_params_see_earlier_ones() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    let mut t = ParamDecl::new("T");
    t.default = Some(TypeExpr::primitive("string"));
    let mut k = ParamDecl::new("K");
    k.constraint = Some(expr(json!({ "kind": "keyof", "target": { "kind": "ref", "name": "T" } })));

    let params = Lowerer::new(&interner, &defs).lower_params(&[t, k]);
    let Ok(params) = params else {
        panic!("lowering failed: {params:?}");
    };
    assert_eq!(params[0].default, Some(TypeId::STRING));
    assert_eq!(params[1].constraint, Some(interner.keyof(interner.type_param("T"))));
}

#[test]
fn test_infer_names_in_first_seen_order() {
    let pattern = expr(json!({
        "kind": "function",
        "params": [
            { "type": { "kind": "infer", "name": "A" } },
            { "type": { "kind": "array", "element": { "kind": "infer", "name": "B" } } },
            { "type": { "kind": "infer", "name": "A" } }
        ],
        "returns": {
            "kind": "conditional",
            "check": prim("string"),
            "extends": { "kind": "infer", "name": "Inner" },
            "true": prim("string"),
            "false": prim("never")
        }
    }));
    assert_eq!(infer_names(&pattern), vec!["A".to_string(), "B".to_string()]);
}
