//! Type evaluation for meta-types.
//!
//! Meta-types are type-level functions that compute output types from input
//! types. `TypeEvaluator` reduces a type to its structural form:
//! - alias applications are expanded (memoized per argument fingerprint)
//! - conditional types are decided, distributing over unions
//! - mapped types, template literals, case intrinsics, `keyof` and
//!   indexed access are expanded
//! - objects, arrays, tuples and functions are evaluated member-wise
//!
//! Anything that still depends on an unbound type parameter is deferred and
//! returned unevaluated.
//!
//! Cost control: a re-entrant expansion of an application already in flight
//! is deferred (lazy mode), nested expansions beyond `recursion_limit` fail
//! with `RecursionLimitExceeded`, and the optional deadline is polled on
//! every step.

use crate::db::TypeDatabase;
use crate::diagnostics::{Diagnostic, PathSegment};
use crate::expansion_cache::{ExpansionCache, ExpansionKey};
use crate::options::EvalOptions;
use crate::subtype::{STACK_GROWTH, STACK_RED_ZONE, SubtypeChecker, TypeResolver};
use crate::types::*;
use crate::visitor::contains_free_type_refs;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tlev_common::limits::MAX_TOTAL_ITERATIONS;
use tracing::{debug, trace};

pub struct TypeEvaluator<'a> {
    db: &'a dyn TypeDatabase,
    resolver: &'a dyn TypeResolver,
    options: EvalOptions,
    expansion_cache: Option<&'a ExpansionCache>,
    /// Completed expansions, keyed by canonical application.
    cache: FxHashMap<TypeId, TypeId>,
    generic_cache: FxHashMap<TypeId, bool>,
    /// Applications being expanded, outermost first.
    expanding: SmallVec<[TypeId; 8]>,
    /// Lowest `expanding` index a deferral pointed at during the current
    /// expansion. Results that depend on an outer in-flight expansion are
    /// not memoized.
    deferred_floor: usize,
    /// Evaluator/checker hand-offs enclosing this evaluator.
    nesting: u32,
    steps: u32,
    provenance: Vec<Diagnostic>,
    /// A failure raised inside a relation check, reported by the enclosing
    /// `evaluate` call.
    failure: Option<Diagnostic>,
}

impl<'a> TypeEvaluator<'a> {
    pub fn new(db: &'a dyn TypeDatabase, resolver: &'a dyn TypeResolver) -> Self {
        TypeEvaluator {
            db,
            resolver,
            options: EvalOptions::default(),
            expansion_cache: None,
            cache: FxHashMap::default(),
            generic_cache: FxHashMap::default(),
            expanding: SmallVec::new(),
            deferred_floor: usize::MAX,
            nesting: 0,
            steps: 0,
            provenance: Vec::new(),
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

    // =========================================================================
    // Accessors for evaluate_rules modules
    // =========================================================================

    #[inline]
    pub(crate) fn db(&self) -> &'a dyn TypeDatabase {
        self.db
    }

    #[inline]
    pub(crate) fn resolver(&self) -> &'a dyn TypeResolver {
        self.resolver
    }

    #[inline]
    pub(crate) fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Diagnostics from sibling branches that failed without failing the
    /// whole evaluation (e.g. one member of a distributed union).
    pub fn provenance(&self) -> &[Diagnostic] {
        &self.provenance
    }

    pub fn take_provenance(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.provenance)
    }

    pub(crate) fn record_provenance(&mut self, diagnostic: Diagnostic) {
        debug!(%diagnostic, "recording sibling failure");
        self.provenance.push(diagnostic);
    }

    pub(crate) fn provenance_mark(&self) -> usize {
        self.provenance.len()
    }

    /// Forget failures recorded since `mark`, when the enclosing
    /// evaluation fails as a whole.
    pub(crate) fn truncate_provenance(&mut self, mark: usize) {
        self.provenance.truncate(mark);
    }

    /// A subtype checker sharing this evaluator's configuration.
    pub(crate) fn subtype_checker(&self) -> SubtypeChecker<'a> {
        let mut checker = SubtypeChecker::new(self.db, self.resolver)
            .with_options(self.options)
            .with_nesting(self.nesting + 1);
        if let Some(cache) = self.expansion_cache {
            checker = checker.with_expansion_cache(cache);
        }
        checker
    }

    pub(crate) fn is_subtype(&mut self, source: TypeId, target: TypeId) -> bool {
        if source == target {
            return true;
        }
        let mut checker = self.subtype_checker();
        let holds = checker.is_subtype_of(source, target);
        if let Some(failure) = checker.take_failure() {
            self.record_failure(failure);
        }
        holds
    }

    pub(crate) fn record_failure(&mut self, diagnostic: Diagnostic) {
        if self.failure.is_none() {
            self.failure = Some(diagnostic);
        }
    }

    pub(crate) fn take_failure(&mut self) -> Option<Diagnostic> {
        self.failure.take()
    }

    /// True when the type still mentions an unbound type parameter.
    pub(crate) fn is_generic(&mut self, type_id: TypeId) -> bool {
        if type_id.is_intrinsic() {
            return false;
        }
        if let Some(&cached) = self.generic_cache.get(&type_id) {
            return cached;
        }
        let generic = contains_free_type_refs(self.db, type_id);
        self.generic_cache.insert(type_id, generic);
        generic
    }

    // =========================================================================
    // Entry point
    // =========================================================================

    /// Evaluate a type to its structural form.
    pub fn evaluate(&mut self, type_id: TypeId) -> Result<TypeId, Diagnostic> {
        if type_id.is_intrinsic() {
            return Ok(type_id);
        }
        if self.nesting > self.options.recursion_limit {
            debug!(nesting = self.nesting, "nested evaluation exceeded the recursion limit");
            return Err(Diagnostic::recursion_limit(self.options.recursion_limit));
        }
        if self.options.deadline_passed() {
            return Err(Diagnostic::timeout());
        }
        self.steps += 1;
        if self.steps > MAX_TOTAL_ITERATIONS {
            debug!(steps = self.steps, "evaluation step budget exhausted");
            return Err(Diagnostic::recursion_limit(self.options.recursion_limit));
        }
        let Some(data) = self.db.lookup(type_id) else {
            return Ok(type_id);
        };
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.evaluate_data(type_id, data)
        });
        match self.failure.take() {
            Some(failure) if result.is_ok() => Err(failure),
            _ => result,
        }
    }

    fn evaluate_data(&mut self, type_id: TypeId, data: TypeData) -> Result<TypeId, Diagnostic> {
        let db = self.db;
        match data {
            TypeData::Intrinsic(_) | TypeData::Literal(_) | TypeData::TypeRef(_) | TypeData::Error => {
                Ok(type_id)
            }
            TypeData::Object(shape) => self.evaluate_object(type_id, &db.object_shape(shape)),
            TypeData::Array(element) => {
                let evaluated = self
                    .evaluate(element)
                    .map_err(|d| d.at(PathSegment::ArrayElement))?;
                Ok(if evaluated == element {
                    type_id
                } else {
                    db.array(evaluated)
                })
            }
            TypeData::Tuple(list) => self.evaluate_tuple(type_id, &db.tuple_list(list)),
            TypeData::Union(list) => self.evaluate_union(type_id, &db.type_list(list)),
            TypeData::Intersection(list) => {
                let members = db.type_list(list);
                let mut evaluated = Vec::with_capacity(members.len());
                for &member in members.iter() {
                    evaluated.push(self.evaluate(member)?);
                }
                Ok(if evaluated[..] == members[..] {
                    type_id
                } else {
                    db.intersection(evaluated)
                })
            }
            TypeData::Function(shape) => self.evaluate_function(type_id, &db.function_shape(shape)),
            TypeData::Application(app) => self.evaluate_application(&db.type_application(app)),
            TypeData::Conditional(cond) => {
                self.evaluate_conditional(type_id, &db.conditional_type(cond))
            }
            TypeData::Mapped(mapped) => self.evaluate_mapped(type_id, &db.mapped_type(mapped)),
            TypeData::TemplateLiteral(spans) => {
                self.evaluate_template_literal(type_id, &db.template_list(spans))
            }
            TypeData::StringIntrinsic { kind, type_arg } => {
                self.evaluate_string_intrinsic(type_id, kind, type_arg)
            }
            TypeData::IndexAccess(object, key) => self.evaluate_index_access(type_id, object, key),
            TypeData::KeyOf(target) => self.evaluate_keyof(type_id, target),
        }
    }

    fn evaluate_object(&mut self, type_id: TypeId, shape: &ObjectShape) -> Result<TypeId, Diagnostic> {
        let db = self.db;
        let mut changed = false;
        let mut properties = Vec::with_capacity(shape.properties.len());
        for prop in &shape.properties {
            let evaluated = self
                .evaluate(prop.type_id)
                .map_err(|d| d.at(PathSegment::Property(db.resolve_atom_ref(prop.name))))?;
            changed |= evaluated != prop.type_id;
            properties.push(PropertyInfo {
                type_id: evaluated,
                ..prop.clone()
            });
        }
        let index = match &shape.index {
            Some(index) => {
                let key_type = self
                    .evaluate(index.key_type)
                    .map_err(|d| d.at(PathSegment::IndexSignature))?;
                let value_type = self
                    .evaluate(index.value_type)
                    .map_err(|d| d.at(PathSegment::IndexSignature))?;
                changed |= key_type != index.key_type || value_type != index.value_type;
                Some(IndexSignature {
                    key_type,
                    value_type,
                    readonly: index.readonly,
                })
            }
            None => None,
        };
        Ok(if changed {
            db.object_with_index(ObjectShape { properties, index })
        } else {
            type_id
        })
    }

    fn evaluate_tuple(
        &mut self,
        type_id: TypeId,
        elements: &[TupleElement],
    ) -> Result<TypeId, Diagnostic> {
        let mut changed = false;
        let mut evaluated = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let element_type = self
                .evaluate(element.type_id)
                .map_err(|d| d.at(PathSegment::TupleElement(index)))?;
            changed |= element_type != element.type_id;
            evaluated.push(TupleElement {
                type_id: element_type,
                ..element.clone()
            });
        }
        Ok(if changed {
            self.db.tuple(evaluated)
        } else {
            type_id
        })
    }

    /// Members evaluate independently: a failing member is recorded in the
    /// provenance and dropped. Only when every member fails does the union
    /// fail, with the first member's diagnostic.
    fn evaluate_union(&mut self, type_id: TypeId, members: &[TypeId]) -> Result<TypeId, Diagnostic> {
        let mark = self.provenance_mark();
        let mut evaluated = Vec::with_capacity(members.len());
        let mut first_failure = None;
        for (index, &member) in members.iter().enumerate() {
            match self.evaluate(member) {
                Ok(result) => evaluated.push(result),
                Err(diagnostic) => {
                    let diagnostic = diagnostic.at(PathSegment::UnionMember(index));
                    if first_failure.is_none() {
                        first_failure = Some(diagnostic.clone());
                    }
                    self.record_provenance(diagnostic);
                }
            }
        }
        if evaluated.is_empty()
            && let Some(failure) = first_failure
        {
            self.truncate_provenance(mark);
            return Err(failure);
        }
        Ok(if evaluated[..] == members[..] {
            type_id
        } else {
            self.db.union(evaluated)
        })
    }

    fn evaluate_function(
        &mut self,
        type_id: TypeId,
        shape: &FunctionShape,
    ) -> Result<TypeId, Diagnostic> {
        let mut changed = false;
        let mut params = Vec::with_capacity(shape.params.len());
        for (index, param) in shape.params.iter().enumerate() {
            let evaluated = self
                .evaluate(param.type_id)
                .map_err(|d| d.at(PathSegment::Parameter(index)))?;
            changed |= evaluated != param.type_id;
            params.push(ParamInfo {
                type_id: evaluated,
                ..param.clone()
            });
        }
        let rest = match shape.rest {
            Some(rest) => {
                let evaluated = self
                    .evaluate(rest)
                    .map_err(|d| d.at(PathSegment::Parameter(shape.params.len())))?;
                changed |= evaluated != rest;
                Some(evaluated)
            }
            None => None,
        };
        let return_type = self
            .evaluate(shape.return_type)
            .map_err(|d| d.at(PathSegment::ReturnType))?;
        changed |= return_type != shape.return_type;
        Ok(if changed {
            self.db.function(FunctionShape {
                params,
                rest,
                return_type,
            })
        } else {
            type_id
        })
    }

    // =========================================================================
    // Expansion bookkeeping (used by evaluate_rules::application)
    // =========================================================================

    pub(crate) fn cached_expansion(&self, canonical: TypeId, key: &ExpansionKey) -> Option<TypeId> {
        if let Some(&hit) = self.cache.get(&canonical) {
            trace!(application = canonical.0, "local expansion cache hit");
            return Some(hit);
        }
        self.expansion_cache.and_then(|cache| cache.get(key))
    }

    /// In lazy mode, an application already being expanded is returned
    /// as-is. Records which outer expansion the result depends on.
    pub(crate) fn defer_if_in_flight(&mut self, canonical: TypeId) -> Option<TypeId> {
        if self.options.full_expansion {
            return None;
        }
        let position = self.expanding.iter().position(|&app| app == canonical)?;
        trace!(application = canonical.0, position, "deferring re-entrant expansion");
        self.deferred_floor = self.deferred_floor.min(position);
        Some(canonical)
    }

    /// Run `expand` with `canonical` on the expansion stack and memoize the
    /// result when it does not depend on an enclosing in-flight expansion.
    pub(crate) fn with_expansion(
        &mut self,
        canonical: TypeId,
        key: ExpansionKey,
        expand: impl FnOnce(&mut Self) -> Result<TypeId, Diagnostic>,
    ) -> Result<TypeId, Diagnostic> {
        let limit = self.options.recursion_limit;
        if self.expanding.len() as u32 >= limit {
            debug!(
                limit,
                application = canonical.0,
                "alias expansion exceeded the recursion limit"
            );
            return Err(Diagnostic::recursion_limit(limit));
        }

        let index = self.expanding.len();
        self.expanding.push(canonical);
        let saved_floor = std::mem::replace(&mut self.deferred_floor, usize::MAX);

        let result = expand(self);

        self.expanding.pop();
        let floor = self.deferred_floor;
        self.deferred_floor = saved_floor.min(if floor < index { floor } else { usize::MAX });

        let result = result?;
        if floor >= index {
            self.cache.insert(canonical, result);
            if let Some(cache) = self.expansion_cache {
                cache.insert(key, result);
            }
        }
        Ok(result)
    }
}

/// Evaluate a type with default options and no aliases.
pub fn evaluate_type(db: &dyn TypeDatabase, type_id: TypeId) -> Result<TypeId, Diagnostic> {
    TypeEvaluator::new(db, &crate::subtype::NoopResolver).evaluate(type_id)
}

#[cfg(test)]
#[path = "../tests/evaluate_tests.rs"]
mod tests;
