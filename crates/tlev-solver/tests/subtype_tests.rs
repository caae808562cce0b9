use super::*;
use crate::TypeInterner;
use crate::def::{AliasDef, DefinitionStore};
use crate::diagnostics::SubtypeFailureReason;
use crate::types::*;

fn prop(interner: &TypeInterner, name: &str, type_id: TypeId) -> PropertyInfo {
    PropertyInfo::new(interner.intern_string(name), type_id)
}

fn check(interner: &TypeInterner, source: TypeId, target: TypeId) -> bool {
    let mut checker = SubtypeChecker::new(interner, &NoopResolver);
    checker.is_subtype_of(source, target)
}

#[test]
fn test_literal_in_union_of_literals() {
    let interner = TypeInterner::new();
    let active = interner.literal_string("active");
    let inactive = interner.literal_string("inactive");
    let status = interner.union2(active, inactive);
    assert!(check(&interner, active, status));
    assert!(!check(&interner, interner.literal_string("deleted"), status));
    assert!(!check(&interner, status, active));
}

#[test]
fn test_top_and_bottom() {
    let interner = TypeInterner::new();
    let obj = interner.object(vec![prop(&interner, "a", TypeId::STRING)]);
    assert!(check(&interner, TypeId::NEVER, obj));
    assert!(check(&interner, obj, TypeId::UNKNOWN));
    assert!(check(&interner, TypeId::ANY, obj));
    assert!(check(&interner, obj, TypeId::ANY));
    assert!(!check(&interner, TypeId::UNKNOWN, obj));
    assert!(!check(&interner, obj, TypeId::NEVER));
}

#[test]
fn test_reflexivity() {
    let interner = TypeInterner::new();
    let samples = [
        TypeId::STRING,
        interner.literal_number(3.0),
        interner.array(TypeId::BOOLEAN),
        interner.object(vec![prop(&interner, "x", TypeId::NUMBER)]),
        interner.union2(TypeId::STRING, TypeId::NULL),
        interner.tuple(vec![TupleElement::required(TypeId::STRING)]),
    ];
    for ty in samples {
        assert!(check(&interner, ty, ty));
    }
}

#[test]
fn test_literals_and_primitives() {
    let interner = TypeInterner::new();
    assert!(check(&interner, interner.literal_string("a"), TypeId::STRING));
    assert!(check(&interner, interner.literal_number(1.0), TypeId::NUMBER));
    assert!(check(&interner, TypeId::BOOLEAN_TRUE, TypeId::BOOLEAN));
    assert!(check(&interner, TypeId::UNDEFINED, TypeId::VOID));
    assert!(!check(&interner, TypeId::STRING, interner.literal_string("a")));
    assert!(!check(&interner, interner.literal_string("1"), TypeId::NUMBER));
    assert!(!check(&interner, TypeId::NULL, TypeId::STRING));
}

#[test]
fn test_width_subtyping() {
    let interner = TypeInterner::new();
    let wide = interner.object(vec![
        prop(&interner, "id", TypeId::NUMBER),
        prop(&interner, "name", TypeId::STRING),
    ]);
    let narrow = interner.object(vec![prop(&interner, "id", TypeId::NUMBER)]);
    assert!(check(&interner, wide, narrow));
    assert!(!check(&interner, narrow, wide));
}

#[test]
fn test_optional_and_readonly_properties() {
    let interner = TypeInterner::new();
    let required = interner.object(vec![prop(&interner, "a", TypeId::STRING)]);
    let optional = interner.object(vec![prop(&interner, "a", TypeId::STRING).optional()]);
    let readonly = interner.object(vec![prop(&interner, "a", TypeId::STRING).readonly()]);
    let empty = interner.object(vec![]);
    assert!(check(&interner, required, optional));
    assert!(!check(&interner, optional, required));
    assert!(check(&interner, empty, optional));
    assert!(check(&interner, readonly, required));
    assert!(check(&interner, required, readonly));
}

#[test]
fn test_empty_object_accepts_non_nullish() {
    let interner = TypeInterner::new();
    let empty = interner.object(vec![]);
    assert!(check(&interner, TypeId::STRING, empty));
    assert!(check(&interner, interner.literal_number(0.0), empty));
    assert!(!check(&interner, TypeId::NULL, empty));
    assert!(!check(&interner, TypeId::UNDEFINED, empty));
}

#[test]
fn test_index_signatures() {
    let interner = TypeInterner::new();
    let dict = interner.object_with_index(ObjectShape {
        properties: vec![],
        index: Some(IndexSignature {
            key_type: TypeId::STRING,
            value_type: TypeId::NUMBER,
            readonly: false,
        }),
    });
    let good = interner.object(vec![prop(&interner, "a", TypeId::NUMBER)]);
    let bad = interner.object(vec![prop(&interner, "a", TypeId::STRING)]);
    assert!(check(&interner, good, dict));
    assert!(!check(&interner, bad, dict));

    let wants_a = interner.object(vec![prop(&interner, "a", TypeId::NUMBER)]);
    assert!(check(&interner, dict, wants_a));
}

#[test]
fn test_arrays_and_tuples() {
    let interner = TypeInterner::new();
    let strings = interner.array(TypeId::STRING);
    let pair = interner.tuple(vec![
        TupleElement::required(TypeId::STRING),
        TupleElement::required(interner.literal_string("x")),
    ]);
    let single = interner.tuple(vec![TupleElement::required(TypeId::STRING)]);
    let with_optional = interner.tuple(vec![
        TupleElement::required(TypeId::STRING),
        TupleElement::optional(TypeId::STRING),
    ]);
    assert!(check(&interner, pair, strings));
    assert!(!check(&interner, strings, pair));
    assert!(!check(&interner, pair, single));
    assert!(check(&interner, single, with_optional));
    assert!(check(&interner, pair, with_optional));

    let rest = interner.tuple(vec![
        TupleElement::required(TypeId::STRING),
        TupleElement::rest(strings),
    ]);
    assert!(check(&interner, pair, rest));
    assert!(!check(&interner, rest, pair));
}

#[test]
fn test_function_parameters_and_return() {
    let interner = TypeInterner::new();
    let param = |ty| ParamInfo::unnamed(ty);
    let takes_string = interner.function(FunctionShape {
        params: vec![param(TypeId::STRING)],
        rest: None,
        return_type: TypeId::VOID,
    });
    let takes_literal = interner.function(FunctionShape {
        params: vec![param(interner.literal_string("a"))],
        rest: None,
        return_type: TypeId::VOID,
    });
    let takes_nothing = interner.function(FunctionShape {
        params: vec![],
        rest: None,
        return_type: TypeId::NUMBER,
    });
    let takes_two = interner.function(FunctionShape {
        params: vec![param(TypeId::STRING), param(TypeId::NUMBER)],
        rest: None,
        return_type: TypeId::VOID,
    });

    // Parameters are contravariant.
    assert!(check(&interner, takes_string, takes_literal));
    assert!(!check(&interner, takes_literal, takes_string));
    // Fewer parameters are fine, extra required ones are not.
    assert!(check(&interner, takes_nothing, takes_string));
    assert!(check(&interner, takes_string, takes_two));
    assert!(!check(&interner, takes_two, takes_string));
}

#[test]
fn test_function_tuple_rest_spreads() {
    let interner = TypeInterner::new();
    let positional = interner.function(FunctionShape {
        params: vec![ParamInfo::unnamed(TypeId::STRING), ParamInfo::unnamed(TypeId::NUMBER)],
        rest: None,
        return_type: TypeId::VOID,
    });
    let tuple_rest = interner.function(FunctionShape {
        params: vec![],
        rest: Some(interner.tuple(vec![
            TupleElement::required(TypeId::STRING),
            TupleElement::required(TypeId::NUMBER),
        ])),
        return_type: TypeId::VOID,
    });
    assert!(check(&interner, positional, tuple_rest));
    assert!(check(&interner, tuple_rest, positional));
}

#[test]
fn test_template_literal_patterns() {
    let interner = TypeInterner::new();
    let prefixed = interner.template_literal(vec![
        TemplateSpan::Text(interner.intern_string("get")),
        TemplateSpan::Type(TypeId::STRING),
    ]);
    assert!(check(&interner, interner.literal_string("getName"), prefixed));
    assert!(!check(&interner, interner.literal_string("setName"), prefixed));
    assert!(check(&interner, prefixed, TypeId::STRING));

    let px = interner.template_literal(vec![
        TemplateSpan::Type(TypeId::NUMBER),
        TemplateSpan::Text(interner.intern_string("px")),
    ]);
    assert!(check(&interner, interner.literal_string("12px"), px));
    assert!(!check(&interner, interner.literal_string("bigpx"), px));
}

#[test]
fn test_void_return_is_covariant() {
    let interner = TypeInterner::new();
    let thunk = |return_type| {
        interner.function(FunctionShape {
            params: vec![],
            rest: None,
            return_type,
        })
    };
    assert!(!check(&interner, TypeId::NUMBER, TypeId::VOID));
    assert!(!check(&interner, thunk(TypeId::NUMBER), thunk(TypeId::VOID)));
    assert!(check(&interner, thunk(TypeId::UNDEFINED), thunk(TypeId::VOID)));
    assert!(check(&interner, thunk(TypeId::VOID), thunk(TypeId::VOID)));

    let mut checker = SubtypeChecker::new(&interner, &NoopResolver);
    assert!(matches!(
        checker.explain_failure(thunk(TypeId::NUMBER), thunk(TypeId::VOID)),
        Some(SubtypeFailureReason::ReturnTypeMismatch { .. })
    ));
}

#[test]
fn test_deferred_string_intrinsic_over_number() {
    let interner = TypeInterner::new();
    let upper = interner.string_intrinsic(StringIntrinsicKind::Uppercase, TypeId::NUMBER);
    assert!(check(&interner, interner.literal_string("1E5"), upper));
    assert!(check(&interner, interner.literal_string("42"), upper));
    assert!(!check(&interner, interner.literal_string("1e5"), upper));
    assert!(!check(&interner, interner.literal_string("ABC"), upper));
    assert!(check(&interner, upper, TypeId::STRING));
    assert!(!check(&interner, TypeId::STRING, upper));
}

#[test]
fn test_union_and_intersection_rules() {
    let interner = TypeInterner::new();
    let a = interner.object(vec![prop(&interner, "a", TypeId::STRING)]);
    let b = interner.object(vec![prop(&interner, "b", TypeId::NUMBER)]);
    let both = interner.intersection2(a, b);
    assert!(check(&interner, both, a));
    assert!(check(&interner, both, b));
    assert!(!check(&interner, a, both));

    let either = interner.union2(a, b);
    assert!(check(&interner, a, either));
    assert!(!check(&interner, either, a));
}

#[test]
fn test_transitivity_on_objects() {
    let interner = TypeInterner::new();
    let a = interner.object(vec![
        prop(&interner, "x", interner.literal_number(1.0)),
        prop(&interner, "y", TypeId::STRING),
    ]);
    let b = interner.object(vec![prop(&interner, "x", TypeId::NUMBER), prop(&interner, "y", TypeId::STRING)]);
    let c = interner.object(vec![prop(&interner, "x", TypeId::NUMBER)]);
    assert!(check(&interner, a, b));
    assert!(check(&interner, b, c));
    assert!(check(&interner, a, c));
}

#[test]
fn test_recursive_alias_is_coinductive() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    let t = interner.intern_string("T");
    let list = defs.declare(interner.intern_string("List"), vec![TypeParamInfo::new(t)]);
    let body = interner.object(vec![
        prop(&interner, "value", interner.type_ref(t)),
        prop(&interner, "next", interner.application(list, vec![interner.type_ref(t)])).optional(),
    ]);
    defs.set_body(list, body);

    let literal_list = interner.application(list, vec![interner.literal_string("a")]);
    let string_list = interner.application(list, vec![TypeId::STRING]);
    let number_list = interner.application(list, vec![TypeId::NUMBER]);
    let mut checker = SubtypeChecker::new(&interner, &defs);
    assert!(checker.is_subtype_of(literal_list, string_list));
    assert!(!checker.is_subtype_of(string_list, number_list));
}

#[test]
fn test_variance_annotations_on_same_alias() {
    let interner = TypeInterner::new();
    let defs = DefinitionStore::new();
    let t = interner.intern_string("T");
    let setter = defs.register(AliasDef::new(
        interner.intern_string("Setter"),
        vec![TypeParamInfo::new(t).with_variance(VarianceAnnotation::In)],
        interner.function(FunctionShape {
            params: vec![ParamInfo::unnamed(interner.type_ref(t))],
            rest: None,
            return_type: TypeId::VOID,
        }),
    ));
    let string_setter = interner.application(setter, vec![TypeId::STRING]);
    let literal_setter = interner.application(setter, vec![interner.literal_string("a")]);
    let mut checker = SubtypeChecker::new(&interner, &defs);
    assert!(checker.is_subtype_of(string_setter, literal_setter));
    assert!(!checker.is_subtype_of(literal_setter, string_setter));
}

#[test]
fn test_explain_failure_points_at_property() {
    let interner = TypeInterner::new();
    let source = interner.object(vec![prop(&interner, "id", TypeId::STRING)]);
    let target = interner.object(vec![prop(&interner, "id", TypeId::NUMBER)]);
    let mut checker = SubtypeChecker::new(&interner, &NoopResolver);
    let reason = checker.explain_failure(source, target).expect("should fail");
    let diagnostic = reason.to_diagnostic(&interner, None, source, target);
    assert_eq!(diagnostic.kind, tlev_common::diagnostics::DiagnosticKind::TypeMismatch);
    assert_eq!(diagnostic.path.to_string(), ".id");
    assert!(checker.explain_failure(source, source).is_none());

    let missing = interner.object(vec![]);
    let reason = checker.explain_failure(missing, target).expect("should fail");
    assert!(matches!(reason, SubtypeFailureReason::MissingProperty { .. }));
}

#[test]
fn test_excess_property_detection() {
    let interner = TypeInterner::new();
    let source = interner.object(vec![
        prop(&interner, "id", TypeId::NUMBER),
        prop(&interner, "extra", TypeId::STRING),
    ]);
    let target = interner.object(vec![prop(&interner, "id", TypeId::NUMBER)]);
    let mut checker = SubtypeChecker::new(&interner, &NoopResolver);
    assert!(checker.is_subtype_of(source, target));
    let excess = checker.find_excess_property(source, target);
    assert!(matches!(
        excess,
        Some(SubtypeFailureReason::ExcessProperty { property_name, .. })
            if interner.resolve_atom(property_name) == "extra"
    ));
    assert!(checker.find_excess_property(target, target).is_none());
}
