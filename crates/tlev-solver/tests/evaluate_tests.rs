use super::*;
use crate::def::DefinitionStore;
use crate::evaluate_rules::infer_pattern::MatchError;
use crate::evaluate_rules::string_intrinsic::apply_string_intrinsic;
use crate::expr::{AliasDecl, TypeExpr};
use crate::intern::TypeInterner;
use crate::lower::{Lowerer, lower_type};
use crate::types::*;
use serde_json::{Value, json};
use std::time::Instant;
use tlev_common::diagnostics::DiagnosticKind;

struct Fixture {
    interner: TypeInterner,
    defs: DefinitionStore,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            interner: TypeInterner::new(),
            defs: DefinitionStore::new(),
        }
    }

    fn declare(&self, aliases: Value) {
        let aliases: Vec<AliasDecl> = serde_json::from_value(aliases).expect("valid aliases");
        Lowerer::new(&self.interner, &self.defs)
            .declare_aliases(&aliases)
            .expect("aliases lower");
    }

    fn lower(&self, value: Value) -> TypeId {
        let expr: TypeExpr = serde_json::from_value(value).expect("valid type expression");
        lower_type(&self.interner, &self.defs, &expr).expect("expression lowers")
    }

    fn evaluator(&self) -> TypeEvaluator<'_> {
        TypeEvaluator::new(&self.interner, &self.defs)
    }

    fn eval(&self, value: Value) -> Result<TypeId, Diagnostic> {
        let type_id = self.lower(value);
        self.evaluator().evaluate(type_id)
    }

    fn lit(&self, value: &str) -> TypeId {
        self.interner.literal_string(value)
    }

    fn prop(&self, name: &str, type_id: TypeId) -> PropertyInfo {
        PropertyInfo::new(self.interner.intern_string(name), type_id)
    }
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

fn cond(check: Value, extends: Value, true_type: Value, false_type: Value) -> Value {
    json!({ "kind": "conditional", "check": check, "extends": extends, "true": true_type, "false": false_type })
}

fn index(object: Value, key: Value) -> Value {
    json!({ "kind": "index", "object": object, "index": key })
}

fn keyof(target: Value) -> Value {
    json!({ "kind": "keyof", "target": target })
}

fn object(props: Vec<(&str, Value)>) -> Value {
    let properties: Vec<Value> = props
        .into_iter()
        .map(|(name, ty)| json!({ "name": name, "type": ty }))
        .collect();
    json!({ "kind": "object", "properties": properties })
}

fn alias(name: &str, params: &[&str], body: Value) -> Value {
    let params: Vec<Value> = params.iter().map(|p| json!({ "name": p })).collect();
    json!({ "name": name, "params": params, "body": body })
}

#[test]
fn test_conditional_picks_branch() {
    let fx = Fixture::new();
    let yes = cond(prim("string"), prim("string"), s("Yes"), s("No"));
    assert_eq!(fx.eval(yes), Ok(fx.lit("Yes")));
    let no = cond(prim("number"), prim("string"), s("Yes"), s("No"));
    assert_eq!(fx.eval(no), Ok(fx.lit("No")));
}

#[test]
fn test_conditional_distributes_over_naked_parameter() {
    let fx = Fixture::new();
    fx.declare(json!([
        alias("IsString", &["T"], cond(r("T"), prim("string"), s("y"), s("n"))),
        alias(
            "IsStringWrapped",
            &["T"],
            cond(
                json!({ "kind": "tuple", "elements": [{ "type": r("T") }] }),
                json!({ "kind": "tuple", "elements": [{ "type": prim("string") }] }),
                s("y"),
                s("n"),
            ),
        ),
    ]));
    let both = union(vec![prim("string"), prim("number")]);
    let yn = fx.interner.union2(fx.lit("y"), fx.lit("n"));

    let distributed = fx.eval(app("IsString", vec![both.clone()]));
    assert_eq!(distributed, Ok(yn));
    let per_member = fx.interner.union2(
        fx.eval(app("IsString", vec![prim("string")])).expect("string member"),
        fx.eval(app("IsString", vec![prim("number")])).expect("number member"),
    );
    assert_eq!(distributed, Ok(per_member));

    assert_eq!(fx.eval(app("IsStringWrapped", vec![both.clone()])), Ok(fx.lit("n")));
    assert_eq!(fx.eval(cond(both, prim("string"), s("y"), s("n"))), Ok(fx.lit("n")));
}

#[test]
fn test_conditional_special_check_types() {
    let fx = Fixture::new();
    fx.declare(json!([alias("IsString", &["T"], cond(r("T"), prim("string"), s("y"), s("n")))]));
    assert_eq!(fx.eval(app("IsString", vec![prim("never")])), Ok(TypeId::NEVER));
    assert_eq!(fx.eval(app("IsString", vec![prim("any")])), Ok(fx.lit("y")));

    let element_of = cond(
        prim("any"),
        json!({ "kind": "array", "element": { "kind": "infer", "name": "E" } }),
        r("E"),
        s("n"),
    );
    assert_eq!(fx.eval(element_of), Ok(TypeId::ANY));
}

#[test]
fn test_return_type_inference() {
    let fx = Fixture::new();
    let returns = |ret: Value| json!({ "kind": "function", "params": [], "returns": ret });
    fx.declare(json!([alias(
        "GetReturnType",
        &["T"],
        cond(r("T"), returns(json!({ "kind": "infer", "name": "R" })), r("R"), prim("never")),
    )]));

    assert_eq!(
        fx.eval(app("GetReturnType", vec![returns(prim("string"))])),
        Ok(TypeId::STRING)
    );
    assert_eq!(fx.eval(app("GetReturnType", vec![prim("number")])), Ok(TypeId::NEVER));

    let r_slot = fx.interner.intern_string("R");
    let pattern = fx.interner.function(FunctionShape {
        params: vec![],
        rest: None,
        return_type: fx.interner.type_ref(r_slot),
    });
    let subject = fx.interner.function(FunctionShape {
        params: vec![],
        rest: None,
        return_type: TypeId::STRING,
    });
    let mut evaluator = fx.evaluator();
    let bindings = evaluator.match_pattern(pattern, subject, &[r_slot]);
    assert_eq!(bindings.map(|b| b.get(r_slot)), Ok(Some(TypeId::STRING)));
    assert_eq!(
        evaluator.match_pattern(pattern, TypeId::NUMBER, &[r_slot]),
        Err(MatchError::Mismatch)
    );
}

#[test]
fn test_infer_tuple_tail_and_template_suffix() {
    let fx = Fixture::new();
    fx.declare(json!([
        alias(
            "Tail",
            &["T"],
            cond(
                r("T"),
                json!({ "kind": "tuple", "elements": [
                    { "type": { "kind": "infer", "name": "H" } },
                    { "type": { "kind": "infer", "name": "R" }, "rest": true }
                ] }),
                r("R"),
                prim("never"),
            ),
        ),
        alias(
            "TrimPrefix",
            &["S"],
            cond(
                r("S"),
                json!({ "kind": "template", "parts": ["prefix-", { "kind": "infer", "name": "Rest" }] }),
                r("Rest"),
                r("S"),
            ),
        ),
    ]));

    let one_two_three = json!({ "kind": "tuple", "elements": [
        { "type": { "kind": "number", "value": 1.0 } },
        { "type": { "kind": "number", "value": 2.0 } },
        { "type": { "kind": "number", "value": 3.0 } }
    ] });
    let two_three = fx.interner.tuple(vec![
        TupleElement::required(fx.interner.literal_number(2.0)),
        TupleElement::required(fx.interner.literal_number(3.0)),
    ]);
    assert_eq!(fx.eval(app("Tail", vec![one_two_three])), Ok(two_three));

    assert_eq!(fx.eval(app("TrimPrefix", vec![s("prefix-abc")])), Ok(fx.lit("abc")));
    assert_eq!(fx.eval(app("TrimPrefix", vec![s("other")])), Ok(fx.lit("other")));
}

#[test]
fn test_conflicting_contravariant_candidates_are_ambiguous() {
    let fx = Fixture::new();
    let takes = |param: Value| {
        json!({ "kind": "function", "params": [{ "name": "x", "type": param }], "returns": prim("void") })
    };
    let infer_i = json!({ "kind": "infer", "name": "I" });
    fx.declare(json!([alias(
        "Param",
        &["T"],
        cond(
            r("T"),
            object(vec![("a", takes(infer_i.clone())), ("b", takes(infer_i))]),
            r("I"),
            prim("never"),
        ),
    )]));

    let conflicting = object(vec![("a", takes(prim("string"))), ("b", takes(prim("number")))]);
    let err = fx.eval(app("Param", vec![conflicting])).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::AmbiguousInference);

    let literal_a = s("a");
    let narrowing = object(vec![
        ("a", takes(union(vec![s("a"), s("b")]))),
        ("b", takes(literal_a)),
    ]);
    assert_eq!(fx.eval(app("Param", vec![narrowing])), Ok(fx.lit("a")));
}

#[test]
fn test_homomorphic_mapping_reproduces_source() {
    let fx = Fixture::new();
    let mapped = json!({
        "kind": "mapped", "param": "P",
        "constraint": keyof(r("S")),
        "template": index(r("S"), r("P"))
    });
    fx.declare(json!([alias("Identity", &["S"], mapped)]));

    let source = json!({ "kind": "object", "properties": [
        { "name": "id", "type": prim("number"), "readonly": true },
        { "name": "name", "type": prim("string"), "optional": true }
    ] });
    let expected = fx.lower(source.clone());
    assert_eq!(fx.eval(app("Identity", vec![source])), Ok(expected));
}

#[test]
fn test_readonly_mapping_marks_every_property() {
    let fx = Fixture::new();
    fx.declare(json!([alias("Frozen", &["T"], json!({
        "kind": "mapped", "param": "P",
        "constraint": keyof(r("T")),
        "template": index(r("T"), r("P")),
        "readonly": "+"
    }))]));

    let user = object(vec![("id", json!({ "kind": "number", "value": 1.0 })), ("name", s("Alice"))]);
    let expected = fx.interner.object(vec![
        fx.prop("id", fx.interner.literal_number(1.0)).readonly(),
        fx.prop("name", fx.lit("Alice")).readonly(),
    ]);
    assert_eq!(fx.eval(app("Frozen", vec![user])), Ok(expected));
}

#[test]
fn test_required_strips_undefined() {
    let fx = Fixture::new();
    fx.declare(json!([alias("Req", &["T"], json!({
        "kind": "mapped", "param": "P",
        "constraint": keyof(r("T")),
        "template": index(r("T"), r("P")),
        "optional": "-"
    }))]));
    let source = json!({ "kind": "object", "properties": [
        { "name": "a", "type": union(vec![prim("string"), prim("undefined")]), "optional": true }
    ] });
    let expected = fx.interner.object(vec![fx.prop("a", TypeId::STRING)]);
    assert_eq!(fx.eval(app("Req", vec![source])), Ok(expected));
}

#[test]
fn test_mapped_key_remapping() {
    let fx = Fixture::new();
    let any_fn = json!({
        "kind": "function",
        "rest": { "kind": "array", "element": prim("any") },
        "returns": prim("any")
    });
    fx.declare(json!([
        alias("Getters", &["T"], json!({
            "kind": "mapped", "param": "P",
            "constraint": keyof(r("T")),
            "as": { "kind": "template", "parts": ["get", app("Capitalize", vec![r("P")])] },
            "template": { "kind": "function", "returns": index(r("T"), r("P")) }
        })),
        alias("DataOnly", &["T"], json!({
            "kind": "mapped", "param": "P",
            "constraint": keyof(r("T")),
            "as": cond(index(r("T"), r("P")), any_fn, prim("never"), r("P")),
            "template": index(r("T"), r("P"))
        })),
    ]));

    let getter = fx.interner.function(FunctionShape {
        params: vec![],
        rest: None,
        return_type: TypeId::STRING,
    });
    let expected = fx.interner.object(vec![fx.prop("getName", getter)]);
    assert_eq!(
        fx.eval(app("Getters", vec![object(vec![("name", prim("string"))])])),
        Ok(expected)
    );

    let mixed = object(vec![
        ("id", prim("number")),
        ("run", json!({ "kind": "function", "returns": prim("void") })),
    ]);
    let expected = fx.interner.object(vec![fx.prop("id", TypeId::NUMBER)]);
    assert_eq!(fx.eval(app("DataOnly", vec![mixed])), Ok(expected));
}

#[test]
fn test_mapped_over_primitive_keys_builds_index_signature() {
    let fx = Fixture::new();
    let record = json!({
        "kind": "mapped", "param": "K",
        "constraint": prim("string"),
        "template": prim("number")
    });
    let expected = fx.interner.object_with_index(ObjectShape {
        properties: vec![],
        index: Some(IndexSignature {
            key_type: TypeId::STRING,
            value_type: TypeId::NUMBER,
            readonly: false,
        }),
    });
    assert_eq!(fx.eval(record), Ok(expected));
}

#[test]
fn test_keyof() {
    let fx = Fixture::new();
    let ab = object(vec![("a", prim("string")), ("b", prim("number"))]);
    assert_eq!(
        fx.eval(keyof(ab)),
        Ok(fx.interner.union2(fx.lit("a"), fx.lit("b")))
    );
    assert_eq!(
        fx.eval(keyof(prim("any"))),
        Ok(fx.interner.union(vec![TypeId::STRING, TypeId::NUMBER, TypeId::SYMBOL]))
    );
    let common = keyof(union(vec![
        object(vec![("a", prim("string")), ("b", prim("string"))]),
        object(vec![("a", prim("number"))]),
    ]));
    assert_eq!(fx.eval(common), Ok(fx.lit("a")));

    let dict = json!({ "kind": "object", "properties": [{ "name": "x", "type": prim("number") }],
        "index": { "key": prim("string"), "value": prim("number") } });
    let dict_id = fx.lower(dict);
    let keys = fx.interner.keyof(dict_id);
    assert_eq!(fx.evaluator().evaluate(keys), Ok(fx.lit("x")));
    let widened = fx
        .evaluator()
        .with_options(EvalOptions::new().with_keyof_index_signatures(true))
        .evaluate(keys);
    assert_eq!(widened, Ok(TypeId::STRING));
}

#[test]
fn test_index_access() {
    let fx = Fixture::new();
    let user = json!({ "kind": "object", "properties": [
        { "name": "id", "type": prim("number") },
        { "name": "nick", "type": prim("string"), "optional": true }
    ] });
    assert_eq!(fx.eval(index(user.clone(), s("id"))), Ok(TypeId::NUMBER));
    assert_eq!(
        fx.eval(index(user.clone(), s("nick"))),
        Ok(fx.interner.union2(TypeId::STRING, TypeId::UNDEFINED))
    );
    assert_eq!(
        fx.eval(index(user.clone(), union(vec![s("id"), s("nick")]))),
        Ok(fx.interner.union(vec![TypeId::NUMBER, TypeId::STRING, TypeId::UNDEFINED]))
    );

    let err = fx.eval(index(user, s("missing"))).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::UnknownProperty);
    assert_eq!(err.path.to_string(), ".missing");

    let pair = json!({ "kind": "tuple", "elements": [{ "type": prim("string") }, { "type": prim("boolean") }] });
    assert_eq!(
        fx.eval(index(pair.clone(), json!({ "kind": "number", "value": 1.0 }))),
        Ok(TypeId::BOOLEAN)
    );
    assert_eq!(
        fx.eval(index(pair.clone(), prim("number"))),
        Ok(fx.interner.union2(TypeId::STRING, TypeId::BOOLEAN))
    );
    assert_eq!(
        fx.eval(index(pair, s("length"))),
        Ok(fx.interner.literal_number(2.0))
    );
    assert_eq!(
        fx.eval(index(json!({ "kind": "array", "element": prim("string") }), prim("number"))),
        Ok(TypeId::STRING)
    );
}

#[test]
fn test_template_expansion_cardinality() {
    let fx = Fixture::new();
    let template = json!({ "kind": "template", "parts": [
        union(vec![s("small"), s("medium")]),
        "-",
        union(vec![s("red"), s("blue")])
    ] });
    let expected = fx.interner.union(vec![
        fx.lit("small-red"),
        fx.lit("small-blue"),
        fx.lit("medium-red"),
        fx.lit("medium-blue"),
    ]);
    let result = fx.eval(template);
    assert_eq!(result, Ok(expected));
    let Some(TypeData::Union(list)) = fx.interner.lookup(expected) else {
        panic!("expected a union");
    };
    assert_eq!(fx.interner.type_list(list).len(), 4);
}

#[test]
fn test_template_placeholder_kinds() {
    let fx = Fixture::new();
    let mixed = json!({ "kind": "template", "parts": [
        "v", union(vec![json!({ "kind": "number", "value": 1.0 }), prim("boolean"), prim("null")])
    ] });
    assert_eq!(
        fx.eval(mixed),
        Ok(fx.interner.union(vec![fx.lit("v1"), fx.lit("vtrue"), fx.lit("vfalse"), fx.lit("vnull")]))
    );

    let pattern = fx.eval(json!({ "kind": "template", "parts": ["id-", prim("number")] }));
    let Ok(pattern) = pattern else {
        panic!("template failed: {pattern:?}");
    };
    assert!(matches!(fx.interner.lookup(pattern), Some(TypeData::TemplateLiteral(_))));

    let bad = fx.eval(json!({ "kind": "template", "parts": ["x", object(vec![])] }));
    assert!(bad.is_err_and(|d| d.kind == DiagnosticKind::TypeMismatch));
}

#[test]
fn test_template_expansion_widens_past_limit() {
    let fx = Fixture::new();
    let letters: Vec<Value> = (0..25).map(|i| s(&format!("k{i}"))).collect();
    let template = json!({ "kind": "template", "parts": [
        union(letters.clone()), union(letters.clone()), union(letters)
    ] });
    assert_eq!(fx.eval(template), Ok(TypeId::STRING));
}

#[test]
fn test_case_intrinsics() {
    let fx = Fixture::new();
    assert_eq!(
        fx.eval(app("Uppercase", vec![union(vec![s("a"), s("b")])])),
        Ok(fx.interner.union2(fx.lit("A"), fx.lit("B")))
    );
    assert_eq!(fx.eval(app("Capitalize", vec![s("hello")])), Ok(fx.lit("Hello")));
    assert_eq!(fx.eval(app("Uncapitalize", vec![s("Hello")])), Ok(fx.lit("hello")));
    assert_eq!(fx.eval(app("Lowercase", vec![prim("never")])), Ok(TypeId::NEVER));
    assert_eq!(apply_string_intrinsic(StringIntrinsicKind::Capitalize, ""), "");
}

#[test]
fn test_case_intrinsics_leave_string_unchanged() {
    let fx = Fixture::new();
    for name in ["Uppercase", "Lowercase", "Capitalize", "Uncapitalize"] {
        assert_eq!(fx.eval(app(name, vec![prim("string")])), Ok(TypeId::STRING), "{name}");
    }
    assert_eq!(
        fx.eval(app("Uppercase", vec![union(vec![s("a"), prim("string")])])),
        Ok(TypeId::STRING)
    );
}

#[test]
fn test_recursive_alias_is_deferred_lazily() {
    let fx = Fixture::new();
    fx.declare(json!([alias("R", &["T"], object(vec![("next", app("R", vec![r("T")]))]))]));
    let applied = fx.lower(app("R", vec![prim("string")]));
    let Ok(result) = fx.evaluator().evaluate(applied) else {
        panic!("lazy expansion failed");
    };
    let expected = fx.interner.object(vec![fx.prop("next", applied)]);
    assert_eq!(result, expected);
}

#[test]
fn test_recursive_alias_full_expansion_hits_limit() {
    let fx = Fixture::new();
    fx.declare(json!([alias("R", &["T"], object(vec![("next", app("R", vec![r("T")]))]))]));
    let applied = fx.lower(app("R", vec![prim("string")]));
    let options = EvalOptions::new().with_full_expansion(true).with_recursion_limit(10);
    let err = fx.evaluator().with_options(options).evaluate(applied).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::RecursionLimitExceeded);
    assert!(err.path.to_string().starts_with(".next.next"));
}

#[test]
fn test_deep_readonly_terminates() {
    let fx = Fixture::new();
    fx.declare(json!([
        alias("DeepReadonly", &["T"], json!({
            "kind": "mapped", "param": "P",
            "constraint": keyof(r("T")),
            "template": app("DeepReadonly", vec![index(r("T"), r("P"))]),
            "readonly": "+"
        })),
        alias("Node", &[], object(vec![("child", r("Node"))])),
    ]));

    let nested = object(vec![("a", object(vec![("b", prim("string"))])), ("n", prim("number"))]);
    let inner = fx.interner.object(vec![fx.prop("b", TypeId::STRING).readonly()]);
    let expected = fx.interner.object(vec![
        fx.prop("a", inner).readonly(),
        fx.prop("n", TypeId::NUMBER).readonly(),
    ]);
    assert_eq!(fx.eval(app("DeepReadonly", vec![nested])), Ok(expected));

    let cyclic = fx.eval(app("DeepReadonly", vec![r("Node")]));
    let Ok(cyclic) = cyclic else {
        panic!("cyclic expansion failed: {cyclic:?}");
    };
    assert!(matches!(fx.interner.lookup(cyclic), Some(TypeData::Object(_))));
}

#[test]
fn test_failed_union_member_is_recorded_in_provenance() {
    let fx = Fixture::new();
    let missing = index(object(vec![("k", prim("string"))]), s("missing"));
    fx.declare(json!([alias(
        "Label",
        &["T"],
        cond(
            r("T"),
            prim("string"),
            json!({ "kind": "template", "parts": ["x", r("T")] }),
            missing,
        ),
    )]));

    let applied = fx.lower(app("Label", vec![union(vec![s("a"), prim("number")])]));
    let mut evaluator = fx.evaluator();
    assert_eq!(evaluator.evaluate(applied), Ok(fx.lit("xa")));
    let provenance = evaluator.take_provenance();
    assert_eq!(provenance.len(), 1);
    assert_eq!(provenance[0].kind, DiagnosticKind::UnknownProperty);

    let err = fx.eval(app("Label", vec![prim("number")])).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::UnknownProperty);
}

#[test]
fn test_deadline_aborts_with_timeout() {
    let fx = Fixture::new();
    let array = fx.interner.array(TypeId::STRING);
    let options = EvalOptions::new().with_deadline(Instant::now());
    let result = fx.evaluator().with_options(options).evaluate(array);
    assert_eq!(result.map_err(|d| d.kind), Err(DiagnosticKind::Timeout));
}

#[test]
fn test_too_many_alias_arguments() {
    let fx = Fixture::new();
    fx.declare(json!([alias("Box", &["T"], object(vec![("value", r("T"))]))]));
    let err = fx.eval(app("Box", vec![prim("string"), prim("number")])).unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::TypeMismatch);
    assert_eq!(err.path.to_string(), "<1>");
}

#[test]
fn test_evaluate_type_without_aliases() {
    let interner = TypeInterner::new();
    let a = interner.intern_string("a");
    let obj = interner.object(vec![PropertyInfo::new(a, TypeId::STRING)]);
    assert_eq!(
        evaluate_type(&interner, interner.keyof(obj)),
        Ok(interner.literal_string("a"))
    );
    let free = interner.type_param("T");
    assert_eq!(evaluate_type(&interner, interner.keyof(free)), Ok(interner.keyof(free)));
}
