use super::*;
use rayon::prelude::*;
use serde_json::{Value, json};
use tlev_common::diagnostics::DiagnosticKind;

fn expr(value: Value) -> TypeExpr {
    serde_json::from_value(value).expect("valid type expression")
}

fn prim(name: &str) -> Value {
    json!({ "kind": "primitive", "name": name })
}

fn s(value: &str) -> Value {
    json!({ "kind": "string", "value": value })
}

fn r(name: &str) -> Value {
    json!({ "kind": "ref", "name": name })
}

fn app(name: &str, args: Vec<Value>) -> Value {
    json!({ "kind": "ref", "name": name, "args": args })
}

fn union(members: Vec<Value>) -> Value {
    json!({ "kind": "union", "members": members })
}

fn object(props: &[(&str, Value)]) -> Value {
    let properties: Vec<Value> = props
        .iter()
        .map(|(name, ty)| json!({ "name": name, "type": ty }))
        .collect();
    json!({ "kind": "object", "properties": properties })
}

fn declare(engine: &Engine, alias: Value) {
    let alias: AliasDecl = serde_json::from_value(alias).expect("valid alias");
    engine.declare_aliases(&[alias]).expect("alias declares");
}

fn eval(engine: &Engine, value: Value) -> TypeId {
    match engine.evaluate_expr(&expr(value), &IndexMap::new(), engine.options()) {
        Ok(resolved) => resolved.type_id,
        Err(diagnostic) => panic!("evaluation failed: {diagnostic:?}"),
    }
}

fn eval_text(engine: &Engine, value: Value) -> String {
    engine.format_type(eval(engine, value))
}

fn lower(engine: &Engine, value: Value) -> TypeId {
    engine.lower(&expr(value)).expect("lowers")
}

fn user_shape() -> Value {
    json!({
        "kind": "object",
        "properties": [
            { "name": "id", "type": prim("number") },
            { "name": "name", "type": prim("string"), "optional": true }
        ]
    })
}

#[test]
fn test_engine_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Engine>();
}

#[test]
fn test_literal_in_union() {
    let engine = Engine::new();
    let status = lower(&engine, union(vec![s("active"), s("inactive")]));
    assert!(engine.is_subtype(lower(&engine, s("active")), status));
    assert!(!engine.is_subtype(lower(&engine, s("deleted")), status));
    assert!(!engine.is_subtype(TypeId::STRING, status));
}

#[test]
fn test_distributive_alias() {
    let engine = Engine::new();
    declare(
        &engine,
        json!({
            "name": "ToArray",
            "params": [{ "name": "T" }],
            "body": {
                "kind": "conditional",
                "check": r("T"),
                "extends": prim("any"),
                "true": { "kind": "array", "element": r("T") },
                "false": prim("never")
            }
        }),
    );
    let result = eval(&engine, app("ToArray", vec![union(vec![prim("string"), prim("number")])]));
    let interner = engine.interner();
    assert_eq!(
        result,
        interner.union2(interner.array(TypeId::STRING), interner.array(TypeId::NUMBER))
    );
}

#[test]
fn test_infer_return_type() {
    let engine = Engine::new();
    declare(
        &engine,
        json!({
            "name": "GetReturnType",
            "params": [{ "name": "T" }],
            "body": {
                "kind": "conditional",
                "check": r("T"),
                "extends": { "kind": "function", "returns": { "kind": "infer", "name": "R" } },
                "true": r("R"),
                "false": prim("never")
            }
        }),
    );
    let thunk = json!({ "kind": "function", "returns": prim("number") });
    assert_eq!(eval(&engine, app("GetReturnType", vec![thunk])), TypeId::NUMBER);
    assert_eq!(eval(&engine, app("GetReturnType", vec![prim("string")])), TypeId::NEVER);
}

#[test]
fn test_readonly_write_is_rejected() {
    let engine = Engine::new();
    declare(
        &engine,
        json!({
            "name": "Frozen",
            "params": [{ "name": "T" }],
            "body": {
                "kind": "mapped",
                "param": "P",
                "constraint": { "kind": "keyof", "target": r("T") },
                "template": { "kind": "index", "object": r("T"), "index": r("P") },
                "readonly": "+"
            }
        }),
    );
    let frozen = eval(&engine, app("Frozen", vec![user_shape()]));
    assert_eq!(
        engine.format_type(frozen),
        "{ readonly id: number; readonly name?: string }"
    );

    let Err(diagnostic) = engine.check_property_write(frozen, "id", TypeId::NUMBER, engine.options()) else {
        panic!("readonly write accepted");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::TypeMismatch);
    assert_eq!(diagnostic.path.to_string(), ".id");
}

#[test]
fn test_property_writes() {
    let engine = Engine::new();
    let user = lower(&engine, user_shape());
    let options = engine.options();

    assert_eq!(engine.check_property_write(user, "id", TypeId::NUMBER, options), Ok(()));
    assert_eq!(engine.check_property_write(user, "name", TypeId::UNDEFINED, options), Ok(()));

    let Err(wrong) = engine.check_property_write(user, "id", TypeId::STRING, options) else {
        panic!("string written to a number property");
    };
    assert_eq!(wrong.kind, DiagnosticKind::TypeMismatch);
    assert_eq!(wrong.path.to_string(), ".id");

    let Err(unknown) = engine.check_property_write(user, "email", TypeId::STRING, options) else {
        panic!("unknown property accepted");
    };
    assert_eq!(unknown.kind, DiagnosticKind::UnknownProperty);
    assert_eq!(unknown.path.to_string(), ".email");

    assert_eq!(engine.check_property_write(TypeId::ANY, "x", TypeId::STRING, options), Ok(()));
}

#[test]
fn test_template_cross_product() {
    let engine = Engine::new();
    let template = json!({
        "kind": "template",
        "parts": [
            { "kind": "union", "members": [s("a"), s("b")] },
            "-",
            { "kind": "union", "members": [s("x"), s("y")] }
        ]
    });
    let result = eval(&engine, template);
    let expected = lower(&engine, union(vec![s("a-x"), s("a-y"), s("b-x"), s("b-y")]));
    assert_eq!(result, expected);
}

#[test]
fn test_recursive_alias_full_expansion() {
    let engine = Engine::new();
    declare(
        &engine,
        json!({
            "name": "Chain",
            "params": [{ "name": "T" }],
            "body": object(&[("next", app("Chain", vec![r("T")]))])
        }),
    );
    let chain = expr(app("Chain", vec![prim("string")]));

    let lazy = engine.evaluate_expr(&chain, &IndexMap::new(), engine.options());
    assert!(lazy.is_ok());

    let full = engine.evaluate_expr(&chain, &IndexMap::new(), EvalOptions::default().with_full_expansion(true));
    let Err(diagnostic) = full else {
        panic!("full expansion of an infinite type succeeded");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::RecursionLimitExceeded);
}

#[test]
fn test_relation_reports_expansion_failure() {
    let engine = Engine::new().with_options(EvalOptions::default().with_full_expansion(true));
    declare(
        &engine,
        json!({
            "name": "Chain",
            "params": [{ "name": "T" }],
            "body": object(&[("next", app("Chain", vec![r("T")]))])
        }),
    );
    let chain = lower(&engine, app("Chain", vec![prim("string")]));
    let other = lower(&engine, object(&[("other", prim("number"))]));

    let Err(diagnostic) = engine.check_assignable(chain, other, engine.options()) else {
        panic!("infinite expansion was assignable");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::RecursionLimitExceeded);

    let u = engine.interner().intern_string("U");
    let pattern = lower(&engine, object(&[("next", json!({ "kind": "infer", "name": "U" }))]));
    let Err(MatchError::Failed(diagnostic)) = engine.try_match(pattern, chain, &[u]) else {
        panic!("match on an infinite expansion did not fail");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::RecursionLimitExceeded);
}

#[test]
fn test_deeply_nested_expression() {
    let engine = Engine::new();
    let deep = (0..1000).fold(TypeExpr::primitive("string"), |inner, _| TypeExpr::Array {
        element: Box::new(inner),
    });
    let lowered = engine.lower(&deep).expect("deep nesting lowers");
    let expected = (0..1000).fold(TypeId::STRING, |inner, _| engine.interner().array(inner));
    assert_eq!(lowered, expected);

    let resolved = engine.evaluate(lowered, &TypeSubstitution::new(), engine.options());
    assert_eq!(resolved.map(|r| r.type_id), Ok(expected));
}

#[test]
fn test_substitution_depth_overflow_is_reported() {
    let engine = Engine::new();
    let interner = engine.interner();
    let t = interner.intern_string("T");
    let deep = (0..140).fold(interner.type_ref(t), |inner, _| interner.array(inner));
    let mut env = TypeSubstitution::new();
    env.insert(t, TypeId::STRING);

    let Err(diagnostic) = engine.evaluate(deep, &env, engine.options()) else {
        panic!("substitution past the depth limit succeeded");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::RecursionLimitExceeded);
}

#[test]
fn test_unbound_index_signature_key_is_reported() {
    let engine = Engine::new();
    let keyed = json!({
        "kind": "object",
        "index": { "key": r("K"), "value": prim("string") }
    });
    let type_id = engine.lower_in_scope(&expr(keyed.clone()), &["K"]).expect("lowers");
    let Err(diagnostic) = engine.evaluate(type_id, &TypeSubstitution::new(), engine.options()) else {
        panic!("dangling index key accepted");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::UnresolvedReference);
    assert_eq!(diagnostic.path.to_string(), "[key]");

    let mut env = IndexMap::new();
    env.insert("K".to_string(), expr(prim("string")));
    let bound = engine.evaluate_expr(&expr(keyed), &env, engine.options());
    assert!(bound.is_ok(), "{bound:?}");
}

#[test]
fn test_evaluate_with_environment() {
    let engine = Engine::new();
    declare(
        &engine,
        json!({ "name": "Box", "params": [{ "name": "T" }], "body": object(&[("value", r("T"))]) }),
    );
    let mut env = IndexMap::new();
    env.insert("T".to_string(), expr(prim("string")));
    let boxed = engine.evaluate_expr(&expr(app("Box", vec![r("T")])), &env, engine.options());
    let Ok(boxed) = boxed else {
        panic!("evaluation failed: {boxed:?}");
    };
    assert_eq!(engine.format_type(boxed.type_id), "{ value: string }");
    assert!(boxed.provenance.is_empty());

    let free = engine.evaluate_expr(&expr(object(&[("value", r("T"))])), &IndexMap::new(), engine.options());
    let Err(diagnostic) = free else {
        panic!("unbound parameter accepted");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::UnresolvedReference);
    assert_eq!(diagnostic.path.to_string(), ".value");
}

#[test]
fn test_check_assignable_locates_failures() {
    let engine = Engine::new();
    let user = lower(&engine, user_shape());
    let bad = lower(&engine, object(&[("id", prim("string"))]));
    let Err(diagnostic) = engine.check_assignable(bad, user, engine.options()) else {
        panic!("mismatched id accepted");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::TypeMismatch);
    assert_eq!(diagnostic.path.to_string(), ".id");
}

#[test]
fn test_excess_property_check_is_opt_in() {
    let engine = Engine::new();
    let user = lower(&engine, user_shape());
    let literal = lower(&engine, object(&[("id", json!({ "kind": "number", "value": 1 })), ("extra", s("x"))]));

    assert_eq!(engine.check_assignable(literal, user, engine.options()), Ok(()));

    let strict = EvalOptions::default().with_excess_property_check(true);
    let Err(diagnostic) = engine.check_assignable(literal, user, strict) else {
        panic!("excess property accepted");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::ExcessProperty);
    assert_eq!(diagnostic.path.to_string(), ".extra");
}

#[test]
fn test_try_match_binds_slots() {
    let engine = Engine::new();
    let u = engine.interner().intern_string("U");
    let pattern = lower(&engine, json!({ "kind": "array", "element": { "kind": "infer", "name": "U" } }));
    let subject = engine.interner().array(TypeId::BOOLEAN);

    let Ok(bindings) = engine.try_match(pattern, subject, &[u]) else {
        panic!("array pattern did not match");
    };
    assert_eq!(bindings.get(u), Some(TypeId::BOOLEAN));
    assert_eq!(engine.try_match(pattern, TypeId::STRING, &[u]), Err(MatchError::Mismatch));
}

#[test]
fn test_instantiate_alias_with_default() {
    let engine = Engine::new();
    declare(
        &engine,
        json!({
            "name": "Pair",
            "params": [{ "name": "T" }, { "name": "U", "default": r("T") }],
            "body": { "kind": "tuple", "elements": [{ "type": r("T") }, { "type": r("U") }] }
        }),
    );
    let Some(pair) = engine.alias("Pair") else {
        panic!("Pair not declared");
    };
    let decl = engine.generic_decl(pair).expect("declared alias has a body");
    let result = engine.instantiate(&decl, &[TypeId::NUMBER], &[], engine.options());
    let Ok(result) = result else {
        panic!("instantiation failed: {result:?}");
    };
    assert_eq!(engine.format_type(result.type_id), "[number, number]");
}

#[test]
fn test_infer_call_checks_arguments() {
    let engine = Engine::new();
    let interner = engine.interner();
    let t = TypeParamInfo::new(interner.intern_string("T"));
    let t_ref = interner.type_ref(t.name);
    let func = GenericFunction {
        type_params: vec![t],
        params: vec![ParamInfo::unnamed(t_ref), ParamInfo::unnamed(TypeId::STRING)],
        return_type: interner.array(t_ref),
    };

    let ok = engine.infer_call(&func, &[TypeId::NUMBER, TypeId::STRING], engine.options());
    assert_eq!(ok.map(|i| i.type_id), Ok(interner.array(TypeId::NUMBER)));

    let Err(diagnostic) = engine.infer_call(&func, &[TypeId::NUMBER, TypeId::NUMBER], engine.options()) else {
        panic!("number passed for a string parameter");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::TypeMismatch);
    assert_eq!(diagnostic.path.to_string(), "(1)");
}

#[test]
fn test_prelude_homomorphic_utilities() {
    let engine = Engine::with_prelude().expect("prelude installs");
    assert_eq!(
        eval_text(&engine, app("Partial", vec![object(&[("a", prim("string"))])])),
        "{ a?: string }"
    );
    assert_eq!(
        eval_text(&engine, app("Required", vec![user_shape()])),
        "{ id: number; name: string }"
    );
    assert_eq!(
        eval_text(&engine, app("Readonly", vec![user_shape()])),
        "{ readonly id: number; readonly name?: string }"
    );
}

#[test]
fn test_prelude_pick_and_record() {
    let engine = Engine::with_prelude().expect("prelude installs");
    let abc = object(&[("a", prim("string")), ("b", prim("number")), ("c", prim("boolean"))]);
    assert_eq!(
        eval_text(&engine, app("Pick", vec![abc.clone(), union(vec![s("a"), s("c")])])),
        "{ a: string; c: boolean }"
    );

    let bad = engine.evaluate_expr(&expr(app("Pick", vec![abc, s("z")])), &IndexMap::new(), engine.options());
    let Err(diagnostic) = bad else {
        panic!("Pick accepted a key outside keyof T");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::ConstraintViolation);
    assert_eq!(diagnostic.path.to_string(), "<1>");

    assert_eq!(
        eval_text(&engine, app("Record", vec![union(vec![s("x"), s("y")]), prim("number")])),
        "{ x: number; y: number }"
    );
    assert_eq!(
        eval_text(&engine, app("Record", vec![prim("string"), prim("boolean")])),
        "{ [key: string]: boolean }"
    );
}

#[test]
fn test_prelude_conditional_utilities() {
    let engine = Engine::with_prelude().expect("prelude installs");
    let abc = union(vec![s("a"), s("b"), s("c")]);
    assert_eq!(
        eval(&engine, app("Exclude", vec![abc, s("a")])),
        lower(&engine, union(vec![s("b"), s("c")]))
    );
    assert_eq!(
        eval(&engine, app("Extract", vec![union(vec![prim("string"), prim("number")]), prim("number")])),
        TypeId::NUMBER
    );
    assert_eq!(
        eval(
            &engine,
            app("NonNullable", vec![union(vec![prim("string"), prim("null"), prim("undefined")])])
        ),
        TypeId::STRING
    );
}

#[test]
fn test_prelude_function_utilities() {
    let engine = Engine::with_prelude().expect("prelude installs");
    let thunk = json!({ "kind": "function", "returns": prim("string") });
    assert_eq!(eval(&engine, app("ReturnType", vec![thunk])), TypeId::STRING);

    let binary = json!({
        "kind": "function",
        "params": [{ "name": "a", "type": prim("string") }, { "name": "b", "type": prim("number") }],
        "returns": prim("void")
    });
    let interner = engine.interner();
    assert_eq!(
        eval(&engine, app("Parameters", vec![binary])),
        interner.tuple(vec![
            TupleElement::required(TypeId::STRING),
            TupleElement::required(TypeId::NUMBER),
        ])
    );
}

#[test]
fn test_user_alias_shadows_prelude() {
    let engine = Engine::with_prelude().expect("prelude installs");
    declare(
        &engine,
        json!({ "name": "Partial", "params": [{ "name": "T" }], "body": prim("string") }),
    );
    assert_eq!(eval(&engine, app("Partial", vec![prim("number")])), TypeId::STRING);
}

#[test]
fn test_concurrent_requests_share_engine() {
    let engine = Engine::with_prelude().expect("prelude installs");
    let source = object(&[("a", prim("string")), ("b", prim("number")), ("c", prim("boolean"))]);
    let pick = expr(app("Pick", vec![source, union(vec![s("a"), s("b")])]));

    let results: Vec<TypeId> = (0..64)
        .into_par_iter()
        .map(|_| {
            engine
                .evaluate_expr(&pick, &IndexMap::new(), engine.options())
                .map(|resolved| resolved.type_id)
                .expect("Pick evaluates")
        })
        .collect();

    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(engine.format_type(results[0]), "{ a: string; b: number }");
    assert!(!engine.expansion_cache().is_empty());
}

#[test]
fn test_lower_signature_scopes_type_params() {
    let engine = Engine::new();
    let type_params: Vec<ParamDecl> = serde_json::from_value(json!([{ "name": "T" }])).expect("valid params");
    let params: Vec<ParamExpr> =
        serde_json::from_value(json!([{ "name": "items", "type": { "kind": "array", "element": r("T") } }]))
            .expect("valid params");
    let Ok(func) = engine.lower_signature(&type_params, &params, &expr(r("T"))) else {
        panic!("signature failed to lower");
    };
    let interner = engine.interner();
    let t_ref = interner.type_param("T");
    assert_eq!(func.type_params.len(), 1);
    assert_eq!(func.params[0].type_id, interner.array(t_ref));
    assert_eq!(func.params[0].name, Some(interner.intern_string("items")));
    assert_eq!(func.return_type, t_ref);

    let result = engine.infer_call(&func, &[interner.array(TypeId::BOOLEAN)], engine.options());
    assert_eq!(result.map(|i| i.type_id), Ok(TypeId::BOOLEAN));

    let missing: Vec<ParamExpr> = serde_json::from_value(json!([
        { "type": { "kind": "array", "element": app("Missing", vec![prim("string")]) } }
    ]))
    .expect("valid params");
    let broken = engine.lower_signature(&[], &missing, &expr(prim("void")));
    assert!(broken.is_err_and(|d| d.kind == DiagnosticKind::UnresolvedReference && d.path.to_string() == "(0)[]"));
}
