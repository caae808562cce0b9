//! Structural subtype relation.
//!
//! `SubtypeChecker` answers `source <: target` over interned types:
//! - identical ids short-circuit to true (termination on cyclic aliases)
//! - top/bottom fast paths (`any`, `unknown`, `never`, error)
//! - alias applications and other meta types are resolved through the
//!   evaluator before structural comparison
//! - unions and intersections are decomposed before the per-kind rules in
//!   `subtype_rules`
//!
//! A pair already under comparison is assumed to hold (coinductive
//! reasoning), and running past the depth limit answers `false`. A meta type
//! whose evaluation fails makes the check answer `false`; the first such
//! diagnostic is kept and handed out by [`SubtypeChecker::take_failure`].

use crate::db::TypeDatabase;
use crate::def::{AliasDef, DefId};
use crate::diagnostics::{Diagnostic, SubtypeFailureReason};
use crate::evaluate::TypeEvaluator;
use crate::expansion_cache::ExpansionCache;
use crate::options::EvalOptions;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::*;
use std::sync::Arc;
use tlev_common::interner::Atom;
use tracing::debug;

pub(crate) const STACK_RED_ZONE: usize = 64 * 1024;
pub(crate) const STACK_GROWTH: usize = 1024 * 1024;

/// Lookup of named alias declarations.
pub trait TypeResolver {
    fn resolve_alias(&self, def: DefId) -> Option<Arc<AliasDef>>;

    fn alias_name(&self, def: DefId) -> Option<Atom> {
        self.resolve_alias(def).map(|alias| alias.name)
    }
}

/// Resolver with no aliases. Applications stay opaque.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopResolver;

impl TypeResolver for NoopResolver {
    fn resolve_alias(&self, _def: DefId) -> Option<Arc<AliasDef>> {
        None
    }
}

/// Result of a subtype check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubtypeResult {
    True,
    False,
    /// The pair was already being compared further up; assumed to hold.
    CycleDetected,
    /// The depth or iteration budget ran out; treated as false.
    DepthExceeded,
}

impl SubtypeResult {
    #[inline]
    pub fn is_true(self) -> bool {
        matches!(self, SubtypeResult::True | SubtypeResult::CycleDetected)
    }

    #[inline]
    pub fn is_false(self) -> bool {
        !self.is_true()
    }

    #[inline]
    pub fn from_bool(value: bool) -> Self {
        if value {
            SubtypeResult::True
        } else {
            SubtypeResult::False
        }
    }
}

pub struct SubtypeChecker<'a> {
    pub(crate) db: &'a dyn TypeDatabase,
    pub(crate) resolver: &'a dyn TypeResolver,
    pub(crate) options: EvalOptions,
    pub(crate) expansion_cache: Option<&'a ExpansionCache>,
    /// How many evaluator/checker hand-offs enclose this checker.
    pub(crate) nesting: u32,
    guard: RecursionGuard<(TypeId, TypeId)>,
    failure: Option<Diagnostic>,
}

impl<'a> SubtypeChecker<'a> {
    pub fn new(db: &'a dyn TypeDatabase, resolver: &'a dyn TypeResolver) -> Self {
        SubtypeChecker {
            db,
            resolver,
            options: EvalOptions::default(),
            expansion_cache: None,
            nesting: 0,
            guard: RecursionGuard::with_profile(RecursionProfile::SubtypeCheck),
            failure: None,
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_expansion_cache(mut self, cache: &'a ExpansionCache) -> Self {
        self.expansion_cache = Some(cache);
        self
    }

    pub(crate) fn with_nesting(mut self, nesting: u32) -> Self {
        self.nesting = nesting;
        self
    }

    /// The evaluation failure that cut a check short, if any.
    pub fn take_failure(&mut self) -> Option<Diagnostic> {
        self.failure.take()
    }

    fn record_failure(&mut self, diagnostic: Diagnostic) {
        if self.failure.is_none() {
            debug!(%diagnostic, "evaluation failed during a subtype check");
            self.failure = Some(diagnostic);
        }
    }

    pub fn is_subtype_of(&mut self, source: TypeId, target: TypeId) -> bool {
        self.check_subtype(source, target).is_true()
    }

    /// Mutual assignability.
    pub fn is_equivalent(&mut self, a: TypeId, b: TypeId) -> bool {
        a == b || (self.is_subtype_of(a, b) && self.is_subtype_of(b, a))
    }

    pub fn check_subtype(&mut self, source: TypeId, target: TypeId) -> SubtypeResult {
        if source == target {
            return SubtypeResult::True;
        }
        if self.failure.is_some() {
            return SubtypeResult::False;
        }
        if let Some(result) = self.fast_path(source, target) {
            return result;
        }

        let key = (source, target);
        match self.guard.enter(key) {
            RecursionResult::Entered => {
                let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                    self.check_subtype_inner(source, target)
                });
                self.guard.leave(key);
                result
            }
            RecursionResult::Cycle => SubtypeResult::CycleDetected,
            RecursionResult::DepthExceeded | RecursionResult::StepsExhausted => {
                debug!(
                    source = source.0,
                    target = target.0,
                    depth = self.guard.depth(),
                    "subtype check exceeded its budget"
                );
                SubtypeResult::DepthExceeded
            }
        }
    }

    fn fast_path(&self, source: TypeId, target: TypeId) -> Option<SubtypeResult> {
        match (source, target) {
            (_, TypeId::ANY | TypeId::UNKNOWN | TypeId::ERROR) => Some(SubtypeResult::True),
            (TypeId::ANY | TypeId::NEVER | TypeId::ERROR, _) => Some(SubtypeResult::True),
            (TypeId::UNKNOWN, _) => Some(SubtypeResult::False),
            (_, TypeId::NEVER) => Some(SubtypeResult::False),
            _ => None,
        }
    }

    fn check_subtype_inner(&mut self, source: TypeId, target: TypeId) -> SubtypeResult {
        if let Some(result) = self.check_same_alias_applications(source, target) {
            return result;
        }

        let resolved_source = self.resolve_meta(source);
        let resolved_target = self.resolve_meta(target);
        if resolved_source != source || resolved_target != target {
            return self.check_subtype(resolved_source, resolved_target);
        }

        let db = self.db;
        let source_data = db.lookup(source);
        let target_data = db.lookup(target);

        if let Some(TypeData::Union(members)) = &source_data {
            return self.check_union_source_subtype(&db.type_list(*members), target);
        }
        if let Some(TypeData::Union(members)) = &target_data {
            return self.check_union_target_subtype(source, &db.type_list(*members));
        }
        if let Some(TypeData::Intersection(members)) = &target_data {
            return self.check_intersection_target_subtype(source, &db.type_list(*members));
        }
        if let Some(TypeData::Intersection(members)) = &source_data {
            return self.check_intersection_source_subtype(&db.type_list(*members), target);
        }

        let (Some(source_data), Some(target_data)) = (source_data, target_data) else {
            return SubtypeResult::False;
        };

        match (&source_data, &target_data) {
            (_, TypeData::Intrinsic(kind)) => self.check_intrinsic_target(source, &source_data, *kind),
            (_, TypeData::Literal(_)) => SubtypeResult::False,
            (TypeData::Literal(LiteralValue::String(text)), TypeData::TemplateLiteral(spans)) => {
                let text = db.resolve_atom_ref(*text);
                let spans = db.template_list(*spans);
                SubtypeResult::from_bool(self.literal_matches_template(&text, &spans))
            }
            (
                TypeData::Literal(LiteralValue::String(text)),
                TypeData::StringIntrinsic { kind, type_arg },
            ) => {
                let text = db.resolve_atom_ref(*text);
                self.check_literal_against_string_intrinsic(&text, *kind, *type_arg)
            }
            (_, TypeData::Object(target_shape)) => {
                let target_shape = db.object_shape(*target_shape);
                if target_shape.is_empty() {
                    return SubtypeResult::from_bool(self.is_non_nullish(source, &source_data));
                }
                match self.apparent_shape(&source_data) {
                    Some(source_shape) => self.check_object_subtype(&source_shape, &target_shape),
                    None => SubtypeResult::False,
                }
            }
            (TypeData::Array(source_elem), TypeData::Array(target_elem)) => {
                self.check_subtype(*source_elem, *target_elem)
            }
            (TypeData::Tuple(elements), TypeData::Array(target_elem)) => {
                self.check_tuple_to_array_subtype(&db.tuple_list(*elements), *target_elem)
            }
            (TypeData::Tuple(source_elems), TypeData::Tuple(target_elems)) => {
                self.check_tuple_subtype(&db.tuple_list(*source_elems), &db.tuple_list(*target_elems))
            }
            (TypeData::Array(source_elem), TypeData::Tuple(target_elems)) => {
                self.check_array_to_tuple_subtype(*source_elem, &db.tuple_list(*target_elems))
            }
            (TypeData::Function(source_fn), TypeData::Function(target_fn)) => self
                .check_function_subtype(&db.function_shape(*source_fn), &db.function_shape(*target_fn)),
            _ => SubtypeResult::False,
        }
    }

    /// Evaluate a meta type (application, conditional, mapped, keyof,
    /// indexed access, template, case intrinsic) to its structural form.
    /// Types that cannot be resolved yet are returned unchanged, and so are
    /// types whose evaluation fails (the failure is recorded).
    pub(crate) fn resolve_meta(&mut self, type_id: TypeId) -> TypeId {
        let needs_evaluation = matches!(
            self.db.lookup(type_id),
            Some(
                TypeData::Application(_)
                    | TypeData::Conditional(_)
                    | TypeData::Mapped(_)
                    | TypeData::IndexAccess(..)
                    | TypeData::KeyOf(_)
                    | TypeData::StringIntrinsic { .. }
                    | TypeData::TemplateLiteral(_)
            )
        );
        if !needs_evaluation {
            return type_id;
        }
        let mut evaluator = self.evaluator();
        match evaluator.evaluate(type_id) {
            Ok(resolved) => resolved,
            Err(diagnostic) => {
                self.record_failure(diagnostic);
                type_id
            }
        }
    }

    pub(crate) fn evaluator(&self) -> TypeEvaluator<'a> {
        let mut evaluator = TypeEvaluator::new(self.db, self.resolver)
            .with_options(self.options)
            .with_nesting(self.nesting + 1);
        if let Some(cache) = self.expansion_cache {
            evaluator = evaluator.with_expansion_cache(cache);
        }
        evaluator
    }

    /// Structural view of a source type as an object, used when the target
    /// is an object shape. Arrays and tuples expose `length` and their
    /// element positions.
    fn apparent_shape(&self, source: &TypeData) -> Option<Arc<ObjectShape>> {
        let db = self.db;
        match source {
            TypeData::Object(shape) => Some(db.object_shape(*shape)),
            TypeData::Array(element) => Some(Arc::new(ObjectShape {
                properties: vec![PropertyInfo::new(db.intern_string("length"), TypeId::NUMBER)],
                index: Some(IndexSignature {
                    key_type: TypeId::NUMBER,
                    value_type: *element,
                    readonly: false,
                }),
            })),
            TypeData::Tuple(elements) => {
                let elements = db.tuple_list(*elements);
                let fixed = elements.iter().filter(|e| !e.rest && !e.optional).count();
                let has_variadic_tail = elements.iter().any(|e| e.rest || e.optional);
                let length = if has_variadic_tail {
                    TypeId::NUMBER
                } else {
                    db.literal_number(fixed as f64)
                };
                let mut properties = vec![PropertyInfo::new(db.intern_string("length"), length)];
                for (i, element) in elements.iter().enumerate().filter(|(_, e)| !e.rest) {
                    let mut prop = PropertyInfo::new(db.intern_string(&i.to_string()), element.type_id);
                    prop.optional = element.optional;
                    properties.push(prop);
                }
                properties.sort_by_key(|p| p.name);
                let members: Vec<TypeId> = elements
                    .iter()
                    .map(|e| self.element_type_of(e))
                    .collect();
                Some(Arc::new(ObjectShape {
                    properties,
                    index: Some(IndexSignature {
                        key_type: TypeId::NUMBER,
                        value_type: db.union(members),
                        readonly: false,
                    }),
                }))
            }
            _ => None,
        }
    }

    fn is_non_nullish(&self, source: TypeId, data: &TypeData) -> bool {
        !source.is_nullish()
            && source != TypeId::VOID
            && !matches!(data, TypeData::TypeRef(_))
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// First structural location at which `source <: target` fails, or
    /// `None` when it holds.
    pub fn explain_failure(&mut self, source: TypeId, target: TypeId) -> Option<SubtypeFailureReason> {
        if self.is_subtype_of(source, target) {
            return None;
        }
        if self.failure.is_some() {
            return Some(SubtypeFailureReason::TypeMismatch {
                source_type: source,
                target_type: target,
            });
        }
        Some(self.explain_at_depth(source, target, 0))
    }

    fn explain_at_depth(&mut self, source: TypeId, target: TypeId, depth: u32) -> SubtypeFailureReason {
        let mismatch = SubtypeFailureReason::TypeMismatch {
            source_type: source,
            target_type: target,
        };
        if depth >= RecursionProfile::SubtypeCheck.max_depth() {
            return SubtypeFailureReason::RecursionLimitExceeded;
        }
        let source = self.resolve_meta(source);
        let target = self.resolve_meta(target);
        let db = self.db;
        let (Some(source_data), Some(target_data)) = (db.lookup(source), db.lookup(target)) else {
            return mismatch;
        };

        match (&source_data, &target_data) {
            (TypeData::Union(members), _) => {
                let members = db.type_list(*members);
                for (index, &member) in members.iter().enumerate() {
                    if !self.is_subtype_of(member, target) {
                        let nested = self.explain_at_depth(member, target, depth + 1);
                        return SubtypeFailureReason::UnionMemberMismatch {
                            index,
                            member,
                            nested_reason: Some(Box::new(nested)),
                        };
                    }
                }
                mismatch
            }
            (_, TypeData::Union(members)) => SubtypeFailureReason::NoUnionMemberMatches {
                source_type: source,
                target_union_members: db.type_list(*members).to_vec(),
            },
            (_, TypeData::Intersection(members)) => {
                let members = db.type_list(*members);
                match members.iter().find(|&&m| !self.is_subtype_of(source, m)) {
                    Some(&member) => self.explain_at_depth(source, member, depth + 1),
                    None => mismatch,
                }
            }
            (TypeData::Object(s), TypeData::Object(t)) => {
                let (s, t) = (db.object_shape(*s), db.object_shape(*t));
                self.explain_object_failure(&s, &t, depth)
                    .unwrap_or(mismatch)
            }
            (TypeData::Array(s), TypeData::Array(t)) => SubtypeFailureReason::ArrayElementMismatch {
                source_element: *s,
                target_element: *t,
                nested_reason: Some(Box::new(self.explain_at_depth(*s, *t, depth + 1))),
            },
            (TypeData::Tuple(s), TypeData::Tuple(t)) => {
                let (s, t) = (db.tuple_list(*s), db.tuple_list(*t));
                self.explain_tuple_failure(&s, &t, depth).unwrap_or(mismatch)
            }
            (TypeData::Tuple(s), TypeData::Array(t)) => {
                let s = db.tuple_list(*s);
                for (index, element) in s.iter().enumerate() {
                    let element_type = self.element_type_of(element);
                    if !self.is_subtype_of(element_type, *t) {
                        return SubtypeFailureReason::TupleElementTypeMismatch {
                            index,
                            source_element: element_type,
                            target_element: *t,
                            nested_reason: Some(Box::new(self.explain_at_depth(
                                element_type,
                                *t,
                                depth + 1,
                            ))),
                        };
                    }
                }
                mismatch
            }
            (TypeData::Function(s), TypeData::Function(t)) => {
                let (s, t) = (db.function_shape(*s), db.function_shape(*t));
                self.explain_function_failure(&s, &t, depth).unwrap_or(mismatch)
            }
            _ => mismatch,
        }
    }

    fn explain_object_failure(
        &mut self,
        source: &ObjectShape,
        target: &ObjectShape,
        depth: u32,
    ) -> Option<SubtypeFailureReason> {
        for target_prop in &target.properties {
            let Some(source_prop) = source.find(target_prop.name) else {
                if target_prop.optional || self.index_value_for(source, target_prop.name).is_some() {
                    continue;
                }
                return Some(SubtypeFailureReason::MissingProperty {
                    property_name: target_prop.name,
                    source_type: self.db.object_with_index(source.clone()),
                    target_type: self.db.object_with_index(target.clone()),
                });
            };
            if source_prop.optional && !target_prop.optional {
                return Some(SubtypeFailureReason::OptionalPropertyRequired {
                    property_name: target_prop.name,
                });
            }
            if !self.is_subtype_of(source_prop.type_id, target_prop.type_id) {
                let nested = self.explain_at_depth(source_prop.type_id, target_prop.type_id, depth + 1);
                return Some(SubtypeFailureReason::PropertyTypeMismatch {
                    property_name: target_prop.name,
                    source_property_type: source_prop.type_id,
                    target_property_type: target_prop.type_id,
                    nested_reason: Some(Box::new(nested)),
                });
            }
        }
        let target_index = target.index.as_ref()?;
        if let Some(source_index) = &source.index
            && !self.is_subtype_of(source_index.value_type, target_index.value_type)
        {
            return Some(SubtypeFailureReason::IndexSignatureMismatch {
                source_value_type: source_index.value_type,
                target_value_type: target_index.value_type,
            });
        }
        for prop in &source.properties {
            if self.key_matches_index(prop.name, target_index.key_type)
                && !self.is_subtype_of(prop.type_id, target_index.value_type)
            {
                let nested = self.explain_at_depth(prop.type_id, target_index.value_type, depth + 1);
                return Some(SubtypeFailureReason::PropertyTypeMismatch {
                    property_name: prop.name,
                    source_property_type: prop.type_id,
                    target_property_type: target_index.value_type,
                    nested_reason: Some(Box::new(nested)),
                });
            }
        }
        None
    }

    fn explain_tuple_failure(
        &mut self,
        source: &[TupleElement],
        target: &[TupleElement],
        depth: u32,
    ) -> Option<SubtypeFailureReason> {
        if !self.tuple_arity_compatible(source, target) {
            return Some(SubtypeFailureReason::TupleElementMismatch {
                source_count: source.len(),
                target_count: target.len(),
            });
        }
        for (index, (s, t)) in source.iter().zip(target.iter()).enumerate() {
            let (s, t) = (self.element_type_of(s), self.element_type_of(t));
            if !self.is_subtype_of(s, t) {
                return Some(SubtypeFailureReason::TupleElementTypeMismatch {
                    index,
                    source_element: s,
                    target_element: t,
                    nested_reason: Some(Box::new(self.explain_at_depth(s, t, depth + 1))),
                });
            }
        }
        None
    }

    fn explain_function_failure(
        &mut self,
        source: &FunctionShape,
        target: &FunctionShape,
        depth: u32,
    ) -> Option<SubtypeFailureReason> {
        let source_required = source.params.iter().filter(|p| !p.optional).count();
        if source_required > target.params.len() && target.rest.is_none() {
            return Some(SubtypeFailureReason::TooManyParameters {
                source_count: source_required,
                target_count: target.params.len(),
            });
        }
        for (param_index, (s, t)) in source.params.iter().zip(target.params.iter()).enumerate() {
            if !self.is_subtype_of(t.type_id, s.type_id) {
                return Some(SubtypeFailureReason::ParameterTypeMismatch {
                    param_index,
                    source_param: s.type_id,
                    target_param: t.type_id,
                });
            }
        }
        if !self.is_subtype_of(source.return_type, target.return_type) {
            let nested = self.explain_at_depth(source.return_type, target.return_type, depth + 1);
            return Some(SubtypeFailureReason::ReturnTypeMismatch {
                source_return: source.return_type,
                target_return: target.return_type,
                nested_reason: Some(Box::new(nested)),
            });
        }
        None
    }
}

/// Convenience check without alias resolution.
pub fn is_subtype_of(db: &dyn TypeDatabase, source: TypeId, target: TypeId) -> bool {
    SubtypeChecker::new(db, &NoopResolver).is_subtype_of(source, target)
}

#[cfg(test)]
#[path = "../tests/subtype_tests.rs"]
mod tests;
