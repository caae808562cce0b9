//! Conditional type evaluation: `T extends U ? X : Y`.
//!
//! A distributive conditional (declared over a naked type parameter) maps
//! over the members of a union check type and unions the results; over
//! `never` it yields `never`. A member that fails is recorded in the
//! provenance and dropped.
//!
//! Otherwise the `extends` pattern is matched against the check type. On a
//! match the true branch is evaluated with the inferred slots substituted;
//! on a mismatch the false branch is evaluated with the slots as `never`.
//! Only the taken branch is evaluated. `any` matches every pattern, so a
//! check type of `any` takes the true branch with its slots bound to `any`.

use crate::diagnostics::{Diagnostic, PathSegment};
use crate::evaluate::TypeEvaluator;
use crate::instantiate::{TypeSubstitution, instantiate_type};
use crate::types::*;
use crate::visitor::collect_type_ref_names;
use tracing::debug;

use super::infer_pattern::MatchError;

impl<'a> TypeEvaluator<'a> {
    pub(crate) fn evaluate_conditional(
        &mut self,
        type_id: TypeId,
        cond: &ConditionalType,
    ) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        let check = self.evaluate(cond.check_type)?;
        if self.is_generic(check) {
            return Ok(self.rebuild_conditional(type_id, cond, check, cond.extends_type));
        }

        if cond.is_distributive {
            if check == TypeId::NEVER {
                return Ok(TypeId::NEVER);
            }
            if let Some(TypeData::Union(list)) = db.lookup(check) {
                let members = db.type_list(list);
                debug!(members = members.len(), "distributing conditional over union");
                let mark = self.provenance_mark();
                let mut results = Vec::with_capacity(members.len());
                let mut first_failure = None;
                for (index, &member) in members.iter().enumerate() {
                    match self.evaluate_conditional_branch(type_id, cond, member) {
                        Ok(result) => results.push(result),
                        Err(diagnostic) => {
                            let diagnostic = diagnostic.at(PathSegment::UnionMember(index));
                            if first_failure.is_none() {
                                first_failure = Some(diagnostic.clone());
                            }
                            self.record_provenance(diagnostic);
                        }
                    }
                }
                if results.is_empty()
                    && let Some(failure) = first_failure
                {
                    self.truncate_provenance(mark);
                    return Err(failure);
                }
                return Ok(db.union(results));
            }
        }

        self.evaluate_conditional_branch(type_id, cond, check)
    }

    fn evaluate_conditional_branch(
        &mut self,
        type_id: TypeId,
        cond: &ConditionalType,
        check: TypeId,
    ) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        let extends = self.evaluate(cond.extends_type)?;
        let outer_refs = collect_type_ref_names(db, extends)
            .into_iter()
            .any(|name| !cond.infer_slots.contains(&name));
        if outer_refs {
            return Ok(self.rebuild_conditional(type_id, cond, check, extends));
        }

        match self.match_pattern(extends, check, &cond.infer_slots) {
            Ok(bindings) => {
                let true_type = instantiate_type(db, cond.true_type, &bindings.to_substitution())?;
                self.evaluate(true_type)
            }
            Err(MatchError::Mismatch) => {
                let false_type = self.false_branch(cond)?;
                self.evaluate(false_type)
            }
            Err(error) => Err(error.into_diagnostic(db)),
        }
    }

    /// The false branch with any slot it mentions as `never`.
    fn false_branch(&self, cond: &ConditionalType) -> Result<TypeId, Diagnostic> {
        if cond.infer_slots.is_empty() {
            return Ok(cond.false_type);
        }
        let mut subst = TypeSubstitution::new();
        for &slot in &cond.infer_slots {
            subst.insert(slot, TypeId::NEVER);
        }
        instantiate_type(self.db(), cond.false_type, &subst)
    }

    /// The conditional with its evaluated operands, left for a later
    /// evaluation once its type parameters are bound.
    fn rebuild_conditional(
        &self,
        type_id: TypeId,
        cond: &ConditionalType,
        check: TypeId,
        extends: TypeId,
    ) -> TypeId {
        if check == cond.check_type && extends == cond.extends_type {
            return type_id;
        }
        self.db().conditional(ConditionalType {
            check_type: check,
            extends_type: extends,
            ..cond.clone()
        })
    }
}
