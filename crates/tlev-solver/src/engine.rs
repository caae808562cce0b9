//! The evaluation entry point.
//!
//! An `Engine` owns the type interner, the alias definitions and the shared
//! expansion cache. Every request builds a fresh evaluator or checker
//! borrowing those three, so independent requests can run on different
//! threads against the same engine.

use crate::db::TypeDatabase;
use crate::def::{DefId, DefinitionStore};
use crate::diagnostics::{Diagnostic, PathSegment, SubtypeFailureReason};
use crate::evaluate::TypeEvaluator;
use crate::evaluate_rules::infer_pattern::{InferBindings, MatchError};
use crate::expansion_cache::ExpansionCache;
use crate::expr::{AliasDecl, ParamDecl, ParamExpr, TypeExpr};
use crate::format::TypeFormatter;
use crate::instantiate::{
    ContextualHint, GenericDecl, GenericFunction, Instantiation, TypeSubstitution, instantiate_type,
};
use crate::intern::TypeInterner;
use crate::lower::Lowerer;
use crate::options::EvalOptions;
use crate::prelude::install_prelude;
use crate::subtype::SubtypeChecker;
use crate::types::*;
use crate::visitor::find_free_type_ref;
use indexmap::IndexMap;
use serde::Serialize;
use tlev_common::interner::Atom;
use tlev_common::limits::EXPANSION_CACHE_CAPACITY;
use tracing::{debug, instrument};

/// An evaluated type together with the diagnostics of the parts that were
/// dropped on the way (failed union members).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub type_id: TypeId,
    pub provenance: Vec<Diagnostic>,
}

pub struct Engine {
    interner: TypeInterner,
    defs: DefinitionStore,
    expansion_cache: ExpansionCache,
    options: EvalOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            interner: TypeInterner::new(),
            defs: DefinitionStore::new(),
            expansion_cache: ExpansionCache::with_capacity(EXPANSION_CACHE_CAPACITY),
            options: EvalOptions::default(),
        }
    }

    /// An engine with the utility aliases (`Partial`, `Pick`, ...) declared.
    pub fn with_prelude() -> Result<Self, Diagnostic> {
        let engine = Self::new();
        install_prelude(&engine.interner, &engine.defs)?;
        Ok(engine)
    }

    /// Options used when a request does not pass its own.
    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    pub fn interner(&self) -> &TypeInterner {
        &self.interner
    }

    pub fn db(&self) -> &dyn TypeDatabase {
        &self.interner
    }

    pub fn definitions(&self) -> &DefinitionStore {
        &self.defs
    }

    pub fn expansion_cache(&self) -> &ExpansionCache {
        &self.expansion_cache
    }

    pub fn evaluator(&self, options: EvalOptions) -> TypeEvaluator<'_> {
        TypeEvaluator::new(&self.interner, &self.defs)
            .with_options(options)
            .with_expansion_cache(&self.expansion_cache)
    }

    pub fn checker(&self, options: EvalOptions) -> SubtypeChecker<'_> {
        SubtypeChecker::new(&self.interner, &self.defs)
            .with_options(options)
            .with_expansion_cache(&self.expansion_cache)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Declare a group of (possibly mutually recursive) aliases.
    pub fn declare_aliases(&self, aliases: &[AliasDecl]) -> Result<Vec<DefId>, Diagnostic> {
        Lowerer::new(&self.interner, &self.defs).declare_aliases(aliases)
    }

    pub fn alias(&self, name: &str) -> Option<DefId> {
        self.defs.find_by_name(self.interner.intern_string(name))
    }

    /// The declaration behind an alias, for `instantiate`.
    pub fn generic_decl(&self, def: DefId) -> Result<GenericDecl, Diagnostic> {
        let alias = self
            .defs
            .get(def)
            .ok_or_else(|| Diagnostic::unresolved(&def.to_string()))?;
        let body = alias
            .body
            .ok_or_else(|| Diagnostic::unresolved(&self.interner.resolve_atom(alias.name)))?;
        Ok(GenericDecl {
            type_params: alias.type_params.clone(),
            body,
        })
    }

    pub fn lower(&self, expr: &TypeExpr) -> Result<TypeId, Diagnostic> {
        Lowerer::new(&self.interner, &self.defs).lower(expr)
    }

    /// Lower `expr` with `names` bound as type parameters.
    pub fn lower_in_scope(&self, expr: &TypeExpr, names: &[&str]) -> Result<TypeId, Diagnostic> {
        Lowerer::new(&self.interner, &self.defs)
            .with_scope(names.iter().copied())
            .lower(expr)
    }

    /// Lower a generic function signature. The type parameters are in
    /// scope for the parameter and return types.
    pub fn lower_signature(
        &self,
        type_params: &[ParamDecl],
        params: &[ParamExpr],
        returns: &TypeExpr,
    ) -> Result<GenericFunction, Diagnostic> {
        let mut lowerer = Lowerer::new(&self.interner, &self.defs);
        let type_params = lowerer.lower_params(type_params)?;
        let mut lowered = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let type_id = lowerer
                .lower(&param.type_expr)
                .map_err(|d| d.at(PathSegment::Parameter(index)))?;
            lowered.push(ParamInfo {
                name: param.name.as_deref().map(|n| self.interner.intern_string(n)),
                type_id,
                optional: param.optional,
            });
        }
        let return_type = lowerer.lower(returns).map_err(|d| d.at(PathSegment::ReturnType))?;
        Ok(GenericFunction {
            type_params,
            params: lowered,
            return_type,
        })
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate `type_id` with the generic arguments in `env` substituted.
    ///
    /// A type parameter still unbound in the result is reported as an
    /// unresolved reference at the path where it occurs.
    #[instrument(level = "debug", skip(self, env, options), fields(env = env.len()))]
    pub fn evaluate(
        &self,
        type_id: TypeId,
        env: &TypeSubstitution,
        options: EvalOptions,
    ) -> Result<Resolved, Diagnostic> {
        let mut evaluator = self.evaluator(options);
        let mut bound = TypeSubstitution::new();
        for (name, arg) in env.iter() {
            bound.insert(name, evaluator.evaluate(arg)?);
        }
        let type_id = if bound.is_empty() {
            type_id
        } else {
            instantiate_type(&self.interner, type_id, &bound)?
        };
        let type_id = evaluator.evaluate(type_id)?;
        if let Some((name, path)) = find_free_type_ref(&self.interner, type_id) {
            debug!(name = %self.interner.resolve_atom(name), "type parameter left unbound");
            return Err(Diagnostic::unresolved(&self.interner.resolve_atom(name)).with_path(path));
        }
        Ok(Resolved {
            type_id,
            provenance: evaluator.take_provenance(),
        })
    }

    /// Lower and evaluate an expression; `env` names become type
    /// parameters of `expr` bound to the given arguments.
    pub fn evaluate_expr(
        &self,
        expr: &TypeExpr,
        env: &IndexMap<String, TypeExpr>,
        options: EvalOptions,
    ) -> Result<Resolved, Diagnostic> {
        let mut subst = TypeSubstitution::new();
        for (name, arg) in env {
            let arg = self.lower(arg)?;
            subst.insert(self.interner.intern_string(name), arg);
        }
        let names: Vec<&str> = env.keys().map(String::as_str).collect();
        let type_id = self.lower_in_scope(expr, &names)?;
        self.evaluate(type_id, &subst, options)
    }

    // =========================================================================
    // Relations
    // =========================================================================

    /// The plain relation. A meta type that fails to evaluate answers
    /// `false` here; [`check_assignable`](Self::check_assignable) reports it.
    pub fn is_subtype(&self, source: TypeId, target: TypeId) -> bool {
        self.checker(self.options).is_subtype_of(source, target)
    }

    /// Assignability of `source` to `target` with a located diagnostic on
    /// failure. Under `excess_property_check` an object source may not
    /// name properties the target lacks. An evaluation failure met during
    /// the check is returned in place of a mismatch.
    pub fn check_assignable(&self, source: TypeId, target: TypeId, options: EvalOptions) -> Result<(), Diagnostic> {
        let mut checker = self.checker(options);
        let excess = if options.excess_property_check {
            checker.find_excess_property(source, target)
        } else {
            None
        };
        let reason = match excess {
            Some(excess) => Some(excess),
            None => checker.explain_failure(source, target),
        };
        if let Some(failure) = checker.take_failure() {
            return Err(failure);
        }
        match reason {
            Some(reason) => Err(reason.to_diagnostic(&self.interner, Some(&self.defs), source, target)),
            None => Ok(()),
        }
    }

    /// Check a post-hoc write `object.property = value`.
    pub fn check_property_write(
        &self,
        object: TypeId,
        property: &str,
        value: TypeId,
        options: EvalOptions,
    ) -> Result<(), Diagnostic> {
        let db = &self.interner;
        let object = self.evaluator(options).evaluate(object)?;
        let name = db.intern_string(property);
        let target = match db.lookup(object) {
            Some(TypeData::Object(shape)) => {
                let shape = db.object_shape(shape);
                match (shape.find(name), &shape.index) {
                    (Some(prop), _) if prop.readonly => {
                        let reason = SubtypeFailureReason::ReadonlyPropertyWrite { property_name: name };
                        return Err(reason.to_diagnostic(db, Some(&self.defs), value, object));
                    }
                    (Some(prop), _) if prop.optional => db.union2(prop.type_id, TypeId::UNDEFINED),
                    (Some(prop), _) => prop.type_id,
                    (None, Some(index)) if self.is_subtype(db.literal_string(property), index.key_type) => {
                        if index.readonly {
                            let reason = SubtypeFailureReason::ReadonlyPropertyWrite { property_name: name };
                            return Err(reason.to_diagnostic(db, Some(&self.defs), value, object));
                        }
                        index.value_type
                    }
                    (None, _) => return Err(Diagnostic::unknown_property(db, property, object)),
                }
            }
            _ if object == TypeId::ANY => return Ok(()),
            _ => return Err(Diagnostic::unknown_property(db, property, object)),
        };
        self.check_assignable(value, target, options.with_excess_property_check(false))
            .map_err(|d| d.at(PathSegment::Property(property.into())))
    }

    /// Structural match of `subject` against `pattern`, binding `slots`.
    pub fn try_match(&self, pattern: TypeId, subject: TypeId, slots: &[Atom]) -> Result<InferBindings, MatchError> {
        let mut evaluator = self.evaluator(self.options);
        let subject = evaluator.evaluate(subject).map_err(MatchError::Failed)?;
        evaluator.match_pattern(pattern, subject, slots)
    }

    pub fn instantiate(
        &self,
        decl: &GenericDecl,
        explicit: &[TypeId],
        hints: &[ContextualHint],
        options: EvalOptions,
    ) -> Result<Instantiation, Diagnostic> {
        self.evaluator(options).instantiate(decl, explicit, hints)
    }

    /// Infer a call's type arguments from its argument types, then check
    /// every argument against its instantiated parameter.
    pub fn infer_call(
        &self,
        func: &GenericFunction,
        arg_types: &[TypeId],
        options: EvalOptions,
    ) -> Result<Instantiation, Diagnostic> {
        let mut evaluator = self.evaluator(options);
        let instantiation = evaluator.infer_call(func, arg_types)?;
        let subst = instantiation.substitution();
        for (index, (param, &arg)) in func.params.iter().zip(arg_types).enumerate() {
            let expected = instantiate_type(&self.interner, param.type_id, &subst)
                .map_err(|d| d.at(PathSegment::Parameter(index)))?;
            let expected = evaluator
                .evaluate(expected)
                .map_err(|d| d.at(PathSegment::Parameter(index)))?;
            self.check_assignable(arg, expected, options)
                .map_err(|d| d.at(PathSegment::Parameter(index)))?;
        }
        Ok(instantiation)
    }

    pub fn format_type(&self, type_id: TypeId) -> String {
        TypeFormatter::new(&self.interner)
            .with_resolver(&self.defs)
            .format(type_id)
    }
}

#[cfg(test)]
#[path = "../tests/engine_tests.rs"]
mod tests;
