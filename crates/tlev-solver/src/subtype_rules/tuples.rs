//! Array and tuple subtyping.
//!
//! - `S[] <: T[]` iff `S <: T` (covariant)
//! - `[A, B] <: T[]` iff every element type is a subtype of `T`
//! - `S <: T` for tuples: every length the source can have must be a
//!   length the target accepts, and elements compare position by position;
//!   a source rest compares against every remaining target position
//! - `S[] <: [...T[]]` only when the target is a bare rest tuple

use crate::types::*;

use super::super::{SubtypeChecker, SubtypeResult};

impl<'a> SubtypeChecker<'a> {
    /// Element type a tuple position contributes. A rest element reports
    /// the element type of its spread array.
    pub(crate) fn element_type_of(&self, element: &TupleElement) -> TypeId {
        if !element.rest {
            return element.type_id;
        }
        match self.db.lookup(element.type_id) {
            Some(TypeData::Array(inner)) => inner,
            Some(TypeData::Tuple(list)) => {
                let members = self
                    .db
                    .tuple_list(list)
                    .iter()
                    .map(|e| self.element_type_of(e))
                    .collect();
                self.db.union(members)
            }
            _ => element.type_id,
        }
    }

    /// `(min, max)` length of a tuple; `max` is `None` with a rest element.
    fn tuple_length_range(elements: &[TupleElement]) -> (usize, Option<usize>) {
        let min = elements.iter().filter(|e| !e.optional && !e.rest).count();
        let max = if elements.iter().any(|e| e.rest) {
            None
        } else {
            Some(elements.len())
        };
        (min, max)
    }

    pub(crate) fn tuple_arity_compatible(
        &self,
        source: &[TupleElement],
        target: &[TupleElement],
    ) -> bool {
        let (source_min, source_max) = Self::tuple_length_range(source);
        let (target_min, target_max) = Self::tuple_length_range(target);
        if source_min < target_min {
            return false;
        }
        match (source_max, target_max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(s), Some(t)) => s <= t,
        }
    }

    pub(crate) fn check_tuple_subtype(
        &mut self,
        source: &[TupleElement],
        target: &[TupleElement],
    ) -> SubtypeResult {
        if !self.tuple_arity_compatible(source, target) {
            return SubtypeResult::False;
        }

        let target_fixed = target.iter().take_while(|e| !e.rest).count();
        let target_rest = target.iter().find(|e| e.rest).map(|e| self.element_type_of(e));
        let target_at = |checker: &Self, index: usize| -> Option<TypeId> {
            if index < target_fixed {
                Some(checker.element_type_of(&target[index]))
            } else {
                target_rest
            }
        };

        let mut index = 0;
        for element in source {
            if element.rest {
                let source_elem = self.element_type_of(element);
                for position in index..target_fixed {
                    let Some(target_elem) = target_at(self, position) else {
                        return SubtypeResult::False;
                    };
                    let result = self.check_subtype(source_elem, target_elem);
                    if result.is_false() {
                        return result;
                    }
                }
                if let Some(target_elem) = target_rest {
                    let result = self.check_subtype(source_elem, target_elem);
                    if result.is_false() {
                        return result;
                    }
                }
                continue;
            }
            let Some(target_elem) = target_at(self, index) else {
                return SubtypeResult::False;
            };
            let result = self.check_subtype(element.type_id, target_elem);
            if result.is_false() {
                return result;
            }
            index += 1;
        }
        SubtypeResult::True
    }

    pub(crate) fn check_tuple_to_array_subtype(
        &mut self,
        elements: &[TupleElement],
        target_elem: TypeId,
    ) -> SubtypeResult {
        for element in elements {
            let source_elem = self.element_type_of(element);
            let result = self.check_subtype(source_elem, target_elem);
            if result.is_false() {
                return result;
            }
        }
        SubtypeResult::True
    }

    pub(crate) fn check_array_to_tuple_subtype(
        &mut self,
        source_elem: TypeId,
        target: &[TupleElement],
    ) -> SubtypeResult {
        match target {
            [only] if only.rest => {
                let target_elem = self.element_type_of(only);
                self.check_subtype(source_elem, target_elem)
            }
            _ => SubtypeResult::False,
        }
    }
}
