//! Applications of the same alias.
//!
//! When both sides apply the same alias, the arguments are compared using
//! each parameter's variance instead of expanding both bodies:
//! - `out` (covariant): `S <: T`
//! - `in` (contravariant): `T <: S`
//! - `in out` (invariant): both
//!
//! If every parameter is annotated the answer is final. Otherwise a
//! successful comparison with computed variances short-circuits to true and
//! a failure falls back to full structural comparison of the expanded bodies.

use crate::types::*;
use crate::variance::{Variance, param_variance};

use super::super::{SubtypeChecker, SubtypeResult};

impl<'a> SubtypeChecker<'a> {
    pub(crate) fn check_same_alias_applications(
        &mut self,
        source: TypeId,
        target: TypeId,
    ) -> Option<SubtypeResult> {
        let db = self.db;
        let (Some(TypeData::Application(source_app)), Some(TypeData::Application(target_app))) =
            (db.lookup(source), db.lookup(target))
        else {
            return None;
        };
        let source_app = db.type_application(source_app);
        let target_app = db.type_application(target_app);
        if source_app.def != target_app.def || source_app.args.len() != target_app.args.len() {
            return None;
        }
        let alias = self.resolver.resolve_alias(source_app.def)?;
        if alias.type_params.len() != source_app.args.len() {
            return None;
        }

        let all_annotated = alias.type_params.iter().all(|p| p.variance.is_some());
        for (param, (&s, &t)) in alias
            .type_params
            .iter()
            .zip(source_app.args.iter().zip(target_app.args.iter()))
        {
            let variance = param_variance(db, param, alias.body);
            if !self.check_with_variance(s, t, variance) {
                return all_annotated.then_some(SubtypeResult::False);
            }
        }
        Some(SubtypeResult::True)
    }

    fn check_with_variance(&mut self, source: TypeId, target: TypeId, variance: Variance) -> bool {
        if variance.is_independent() || source == target {
            return true;
        }
        (!variance.contains(Variance::COVARIANT) || self.is_subtype_of(source, target))
            && (!variance.contains(Variance::CONTRAVARIANT) || self.is_subtype_of(target, source))
    }
}
