//! Generic type instantiation and substitution.
//!
//! `instantiate_type` replaces type parameter references in a body with the
//! bound arguments. Names introduced inside the body shadow outer bindings:
//! the iteration variable of a mapped type, and `infer` slots inside a
//! conditional's `extends` clause and true branch.
//!
//! Substitution deeper than `MAX_INSTANTIATION_DEPTH` fails with
//! `RecursionLimitExceeded` rather than producing a partial type.
//!
//! A distributive conditional whose check type is a parameter bound to a
//! union is instantiated once per member and the results are unioned, so
//! each branch sees the member rather than the whole union.
//!
//! The instantiator (`TypeEvaluator::instantiate`) walks parameters in
//! declaration order. Each parameter takes its explicit argument, else a
//! type inferred from the contextual hints, else its default (which may
//! reference earlier parameters). Constraints are checked against the
//! bindings accumulated so far.

use crate::db::TypeDatabase;
use crate::diagnostics::{Diagnostic, PathSegment};
use crate::evaluate::TypeEvaluator;
use crate::format::TypeFormatter;
use crate::infer::InferenceContext;
use crate::recursion::{DepthCounter, RecursionProfile};
use crate::types::*;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tlev_common::diagnostics::DiagnosticKind;
use tlev_common::interner::Atom;
use tracing::{debug, trace};

/// Mapping from type parameter names to their bound types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeSubstitution {
    map: FxHashMap<Atom, TypeId>,
}

impl TypeSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair declared parameters with arguments position by position.
    pub fn from_args(params: &[TypeParamInfo], args: &[TypeId]) -> Self {
        let mut subst = Self::new();
        for (param, &arg) in params.iter().zip(args.iter()) {
            subst.insert(param.name, arg);
        }
        subst
    }

    pub fn insert(&mut self, name: Atom, type_id: TypeId) {
        self.map.insert(name, type_id);
    }

    pub fn get(&self, name: Atom) -> Option<TypeId> {
        self.map.get(&name).copied()
    }

    pub fn contains(&self, name: Atom) -> bool {
        self.map.contains_key(&name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Atom, TypeId)> + '_ {
        self.map.iter().map(|(&name, &ty)| (name, ty))
    }
}

struct TypeInstantiator<'a> {
    db: &'a dyn TypeDatabase,
    subst: &'a TypeSubstitution,
    shadowed: SmallVec<[Atom; 4]>,
    /// Only valid while nothing is shadowed.
    cache: FxHashMap<TypeId, TypeId>,
    depth: DepthCounter,
    exceeded: bool,
}

impl<'a> TypeInstantiator<'a> {
    fn new(db: &'a dyn TypeDatabase, subst: &'a TypeSubstitution) -> Self {
        TypeInstantiator {
            db,
            subst,
            shadowed: SmallVec::new(),
            cache: FxHashMap::default(),
            depth: DepthCounter::with_profile(RecursionProfile::Instantiation),
            exceeded: false,
        }
    }

    fn instantiate(&mut self, type_id: TypeId) -> TypeId {
        if type_id.is_intrinsic() {
            return type_id;
        }
        if self.shadowed.is_empty()
            && let Some(&cached) = self.cache.get(&type_id)
        {
            return cached;
        }
        if self.exceeded || !self.depth.enter() {
            self.exceeded = true;
            return type_id;
        }
        let result = self.instantiate_inner(type_id);
        self.depth.leave();
        if self.shadowed.is_empty() {
            self.cache.insert(type_id, result);
        }
        result
    }

    fn with_shadowed(&mut self, names: &[Atom], type_id: TypeId) -> TypeId {
        if names.is_empty() {
            return self.instantiate(type_id);
        }
        let mark = self.shadowed.len();
        self.shadowed.extend_from_slice(names);
        let result = self.instantiate(type_id);
        self.shadowed.truncate(mark);
        result
    }

    fn bound(&self, name: Atom) -> Option<TypeId> {
        if self.shadowed.contains(&name) {
            return None;
        }
        self.subst.get(name)
    }

    fn instantiate_inner(&mut self, type_id: TypeId) -> TypeId {
        let db = self.db;
        let Some(data) = db.lookup(type_id) else {
            return type_id;
        };
        match data {
            TypeData::Intrinsic(_) | TypeData::Literal(_) | TypeData::Error => type_id,
            TypeData::TypeRef(name) => self.bound(name).unwrap_or(type_id),
            TypeData::Object(shape) => {
                let shape = db.object_shape(shape);
                let properties = shape
                    .properties
                    .iter()
                    .map(|prop| PropertyInfo {
                        type_id: self.instantiate(prop.type_id),
                        ..prop.clone()
                    })
                    .collect();
                let index = shape.index.as_ref().map(|index| IndexSignature {
                    key_type: self.instantiate(index.key_type),
                    value_type: self.instantiate(index.value_type),
                    readonly: index.readonly,
                });
                db.object_with_index(ObjectShape { properties, index })
            }
            TypeData::Array(element) => db.array(self.instantiate(element)),
            TypeData::Tuple(list) => {
                let elements = db
                    .tuple_list(list)
                    .iter()
                    .map(|e| TupleElement {
                        type_id: self.instantiate(e.type_id),
                        ..e.clone()
                    })
                    .collect();
                db.tuple(elements)
            }
            TypeData::Union(list) => {
                let members = db.type_list(list).iter().map(|&m| self.instantiate(m)).collect();
                db.union(members)
            }
            TypeData::Intersection(list) => {
                let members = db.type_list(list).iter().map(|&m| self.instantiate(m)).collect();
                db.intersection(members)
            }
            TypeData::Function(shape) => {
                let shape = db.function_shape(shape);
                let params = shape
                    .params
                    .iter()
                    .map(|p| ParamInfo {
                        type_id: self.instantiate(p.type_id),
                        ..p.clone()
                    })
                    .collect();
                let rest = shape.rest.map(|rest| self.instantiate(rest));
                let return_type = self.instantiate(shape.return_type);
                db.function(FunctionShape {
                    params,
                    rest,
                    return_type,
                })
            }
            TypeData::Application(app) => {
                let app = db.type_application(app);
                let args = app.args.iter().map(|&a| self.instantiate(a)).collect();
                db.application(app.def, args)
            }
            TypeData::Conditional(cond) => self.instantiate_conditional(&db.conditional_type(cond)),
            TypeData::Mapped(mapped) => {
                let mapped = db.mapped_type(mapped);
                let param = [mapped.type_param];
                let constraint = self.instantiate(mapped.constraint);
                let name_type = mapped.name_type.map(|n| self.with_shadowed(&param, n));
                let template = self.with_shadowed(&param, mapped.template);
                db.mapped(MappedType {
                    constraint,
                    name_type,
                    template,
                    ..(*mapped).clone()
                })
            }
            TypeData::TemplateLiteral(spans) => {
                let spans = db
                    .template_list(spans)
                    .iter()
                    .map(|span| match span {
                        TemplateSpan::Text(text) => TemplateSpan::Text(*text),
                        TemplateSpan::Type(t) => TemplateSpan::Type(self.instantiate(*t)),
                    })
                    .collect();
                db.template_literal(spans)
            }
            TypeData::StringIntrinsic { kind, type_arg } => {
                db.string_intrinsic(kind, self.instantiate(type_arg))
            }
            TypeData::IndexAccess(object, key) => {
                db.index_access(self.instantiate(object), self.instantiate(key))
            }
            TypeData::KeyOf(target) => db.keyof(self.instantiate(target)),
        }
    }

    fn instantiate_conditional(&mut self, cond: &ConditionalType) -> TypeId {
        let db = self.db;
        if cond.is_distributive
            && let Some(TypeData::TypeRef(name)) = db.lookup(cond.check_type)
            && let Some(bound) = self.bound(name)
        {
            if bound == TypeId::NEVER {
                return TypeId::NEVER;
            }
            if let Some(TypeData::Union(members)) = db.lookup(bound) {
                let members = db.type_list(members);
                trace!(members = members.len(), "distributing conditional during substitution");
                let results = members
                    .iter()
                    .map(|&member| {
                        let mut narrowed = self.subst.clone();
                        narrowed.insert(name, member);
                        let mut inner = TypeInstantiator::new(db, &narrowed);
                        inner.shadowed = self.shadowed.clone();
                        let result = inner.instantiate_conditional(cond);
                        self.exceeded |= inner.exceeded;
                        result
                    })
                    .collect();
                return db.union(results);
            }
        }

        let check_type = self.instantiate(cond.check_type);
        let extends_type = self.with_shadowed(&cond.infer_slots, cond.extends_type);
        let true_type = self.with_shadowed(&cond.infer_slots, cond.true_type);
        let false_type = self.instantiate(cond.false_type);
        db.conditional(ConditionalType {
            check_type,
            extends_type,
            infer_slots: cond.infer_slots.clone(),
            true_type,
            false_type,
            is_distributive: cond.is_distributive,
        })
    }
}

/// Substitute `subst` through `type_id`.
pub fn instantiate_type(
    db: &dyn TypeDatabase,
    type_id: TypeId,
    subst: &TypeSubstitution,
) -> Result<TypeId, Diagnostic> {
    if subst.is_empty() {
        return Ok(type_id);
    }
    let mut instantiator = TypeInstantiator::new(db, subst);
    let result = instantiator.instantiate(type_id);
    if instantiator.exceeded {
        let limit = RecursionProfile::Instantiation.max_depth();
        debug!(limit, "substitution exceeded the instantiation depth");
        return Err(Diagnostic::recursion_limit(limit));
    }
    Ok(result)
}

/// Substitute positional arguments for declared parameters.
pub fn instantiate_generic(
    db: &dyn TypeDatabase,
    body: TypeId,
    params: &[TypeParamInfo],
    args: &[TypeId],
) -> Result<TypeId, Diagnostic> {
    instantiate_type(db, body, &TypeSubstitution::from_args(params, args))
}

// =============================================================================
// Instantiator
// =============================================================================

/// A generic declaration: parameters plus the body they scope over.
#[derive(Clone, Debug)]
pub struct GenericDecl {
    pub type_params: Vec<TypeParamInfo>,
    pub body: TypeId,
}

/// A pattern mentioning the declaration's parameters, paired with the type
/// observed at a use site (e.g. a parameter type and its argument's type).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextualHint {
    pub pattern: TypeId,
    pub actual: TypeId,
}

/// Result of instantiating a generic declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instantiation {
    /// Parameter bindings in declaration order.
    pub bindings: IndexMap<Atom, TypeId>,
    /// The evaluated, substituted body.
    pub type_id: TypeId,
}

impl Instantiation {
    pub fn substitution(&self) -> TypeSubstitution {
        let mut subst = TypeSubstitution::new();
        for (&name, &type_id) in &self.bindings {
            subst.insert(name, type_id);
        }
        subst
    }
}

/// A generic function signature for call-site inference.
#[derive(Clone, Debug)]
pub struct GenericFunction {
    pub type_params: Vec<TypeParamInfo>,
    pub params: Vec<ParamInfo>,
    pub return_type: TypeId,
}

impl<'a> TypeEvaluator<'a> {
    /// Bind every declared parameter in order. Diagnostics carry the
    /// parameter position as a `TypeArgument` path segment.
    pub(crate) fn bind_type_params(
        &mut self,
        params: &[TypeParamInfo],
        explicit: &[TypeId],
        hints: &[ContextualHint],
    ) -> Result<(TypeSubstitution, IndexMap<Atom, TypeId>), Diagnostic> {
        let db = self.db();
        let inferable: Vec<Atom> = params.iter().skip(explicit.len()).map(|p| p.name).collect();
        let inferred = if hints.is_empty() || inferable.is_empty() {
            IndexMap::new()
        } else {
            self.infer_from_hints(hints, &inferable)?
        };

        let mut subst = TypeSubstitution::new();
        let mut bindings = IndexMap::new();
        for (index, param) in params.iter().enumerate() {
            let at = PathSegment::TypeArgument(index);
            let (arg, checked) = if let Some(&arg) = explicit.get(index) {
                (arg, true)
            } else if let Some(&arg) = inferred.get(&param.name) {
                (arg, true)
            } else if let Some(default) = param.default {
                let default = instantiate_type(db, default, &subst).map_err(|d| d.at(at.clone()))?;
                (self.evaluate(default).map_err(|d| d.at(at.clone()))?, false)
            } else {
                let name = db.resolve_atom(param.name);
                return Err(Diagnostic::new(
                    DiagnosticKind::MissingTypeArgument,
                    DiagnosticKind::MissingTypeArgument.format(&[&name]),
                )
                .at(at));
            };

            if checked
                && !self.is_generic(arg)
                && let Some(constraint) = param.constraint
            {
                let constraint = instantiate_type(db, constraint, &subst).map_err(|d| d.at(at.clone()))?;
                let constraint = self.evaluate(constraint).map_err(|d| d.at(at.clone()))?;
                let satisfied = self.is_subtype(arg, constraint);
                if let Some(failure) = self.take_failure() {
                    return Err(failure.at(at));
                }
                if !satisfied {
                    let mut fmt = TypeFormatter::new(db).with_resolver(self.resolver());
                    let message = DiagnosticKind::ConstraintViolation
                        .format(&[&fmt.format(arg), &fmt.format(constraint)]);
                    return Err(Diagnostic::new(DiagnosticKind::ConstraintViolation, message).at(at));
                }
            }
            subst.insert(param.name, arg);
            bindings.insert(param.name, arg);
        }
        Ok((subst, bindings))
    }

    /// Candidates for `slots` drawn from every hint that matches
    /// structurally. Hints that fail to align contribute nothing.
    fn infer_from_hints(
        &mut self,
        hints: &[ContextualHint],
        slots: &[Atom],
    ) -> Result<IndexMap<Atom, TypeId>, Diagnostic> {
        let mut merged = InferenceContext::with_slots(slots);
        for hint in hints {
            let mut ctx = InferenceContext::with_slots(slots);
            if self.collect_candidates(hint.pattern, hint.actual, &mut ctx) {
                merged.absorb(&mut ctx);
            }
        }
        let resolved = self
            .resolve_candidates(&mut merged)
            .map_err(|err| err.into_diagnostic(self.db()))?;
        Ok(resolved
            .into_iter()
            .filter_map(|(name, ty)| ty.map(|ty| (name, ty)))
            .collect())
    }

    /// Instantiate a generic declaration: bind parameters, substitute them
    /// through the body and evaluate it.
    pub fn instantiate(
        &mut self,
        decl: &GenericDecl,
        explicit: &[TypeId],
        hints: &[ContextualHint],
    ) -> Result<Instantiation, Diagnostic> {
        if explicit.len() > decl.type_params.len() {
            return Err(Diagnostic::new(
                DiagnosticKind::TypeMismatch,
                format!(
                    "Expected at most {} type arguments, but got {}.",
                    decl.type_params.len(),
                    explicit.len()
                ),
            )
            .at(PathSegment::TypeArgument(decl.type_params.len())));
        }
        let mut args = Vec::with_capacity(explicit.len());
        for (index, &arg) in explicit.iter().enumerate() {
            args.push(
                self.evaluate(arg)
                    .map_err(|d| d.at(PathSegment::TypeArgument(index)))?,
            );
        }
        let (subst, bindings) = self.bind_type_params(&decl.type_params, &args, hints)?;
        let body = instantiate_type(self.db(), decl.body, &subst)?;
        let type_id = self.evaluate(body)?;
        if let Some(failure) = self.take_failure() {
            return Err(failure);
        }
        Ok(Instantiation { bindings, type_id })
    }

    /// Infer a generic function's type parameters from argument types and
    /// return the instantiated return type.
    pub fn infer_call(
        &mut self,
        func: &GenericFunction,
        arg_types: &[TypeId],
    ) -> Result<Instantiation, Diagnostic> {
        let hints: Vec<ContextualHint> = func
            .params
            .iter()
            .zip(arg_types.iter())
            .map(|(param, &actual)| ContextualHint {
                pattern: param.type_id,
                actual,
            })
            .collect();
        let decl = GenericDecl {
            type_params: func.type_params.clone(),
            body: func.return_type,
        };
        self.instantiate(&decl, &[], &hints)
    }
}

#[cfg(test)]
#[path = "../tests/instantiate_tests.rs"]
mod tests;
