//! Union and intersection decomposition.
//!
//! - `A1 | .. | An <: B` iff every `Ai <: B`
//! - `A <: B1 | .. | Bn` iff some `A <: Bj`
//! - `A <: B1 & .. & Bn` iff every `A <: Bj`
//! - `A1 & .. & An <: B` iff some `Ai <: B`
//!
//! Object members of an intersection are already merged into one shape by
//! normalization, so the "some member" rule stays precise for the common
//! `{ a } & { b } <: { a; b }` case.

use crate::types::TypeId;

use super::super::{SubtypeChecker, SubtypeResult};

impl<'a> SubtypeChecker<'a> {
    pub(crate) fn check_union_source_subtype(
        &mut self,
        members: &[TypeId],
        target: TypeId,
    ) -> SubtypeResult {
        for &member in members {
            let result = self.check_subtype(member, target);
            if result.is_false() {
                return result;
            }
        }
        SubtypeResult::True
    }

    pub(crate) fn check_union_target_subtype(
        &mut self,
        source: TypeId,
        members: &[TypeId],
    ) -> SubtypeResult {
        // Literal members are the common case; try identity before recursing.
        if members.contains(&source) {
            return SubtypeResult::True;
        }
        for &member in members {
            if self.check_subtype(source, member).is_true() {
                return SubtypeResult::True;
            }
        }
        SubtypeResult::False
    }

    pub(crate) fn check_intersection_target_subtype(
        &mut self,
        source: TypeId,
        members: &[TypeId],
    ) -> SubtypeResult {
        for &member in members {
            let result = self.check_subtype(source, member);
            if result.is_false() {
                return result;
            }
        }
        SubtypeResult::True
    }

    pub(crate) fn check_intersection_source_subtype(
        &mut self,
        members: &[TypeId],
        target: TypeId,
    ) -> SubtypeResult {
        for &member in members {
            if self.check_subtype(member, target).is_true() {
                return SubtypeResult::True;
            }
        }
        SubtypeResult::False
    }
}
