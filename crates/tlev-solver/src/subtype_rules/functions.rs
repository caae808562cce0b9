//! Function subtyping.
//!
//! - parameters are contravariant: each target parameter must be a subtype
//!   of the source parameter at the same position
//! - a source may declare fewer parameters than the target; a required
//!   source parameter with no target counterpart fails
//! - a source rest parameter absorbs the target's extra positions
//! - the return type is covariant (`void` is no exception)
//! - a rest parameter typed as a tuple is compared as positional parameters

use crate::types::*;
use std::borrow::Cow;

use super::super::{SubtypeChecker, SubtypeResult};

impl<'a> SubtypeChecker<'a> {
    /// Element type of a rest parameter's array or tuple type.
    pub(crate) fn rest_element_type(&self, rest: TypeId) -> TypeId {
        self.element_type_of(&TupleElement::rest(rest))
    }

    /// `(...args: [A, B?]) => R` as `(a: A, b?: B) => R`.
    fn spread_tuple_rest<'s>(&self, shape: &'s FunctionShape) -> Cow<'s, FunctionShape> {
        let Some(rest) = shape.rest else {
            return Cow::Borrowed(shape);
        };
        let Some(TypeData::Tuple(list)) = self.db.lookup(rest) else {
            return Cow::Borrowed(shape);
        };
        let mut spread = FunctionShape {
            params: shape.params.clone(),
            rest: None,
            return_type: shape.return_type,
        };
        for element in self.db.tuple_list(list).iter() {
            if element.rest {
                spread.rest = Some(element.type_id);
            } else {
                spread.params.push(ParamInfo {
                    name: None,
                    type_id: element.type_id,
                    optional: element.optional,
                });
            }
        }
        Cow::Owned(spread)
    }

    pub(crate) fn check_function_subtype(
        &mut self,
        source: &FunctionShape,
        target: &FunctionShape,
    ) -> SubtypeResult {
        let source = self.spread_tuple_rest(source);
        let target = self.spread_tuple_rest(target);
        let (source, target) = (source.as_ref(), target.as_ref());
        let target_rest = target.rest.map(|rest| self.rest_element_type(rest));

        for (index, source_param) in source.params.iter().enumerate() {
            let target_param = match target.params.get(index) {
                Some(param) => param.type_id,
                None => match target_rest {
                    Some(rest) => rest,
                    None if source_param.optional => continue,
                    None => return SubtypeResult::False,
                },
            };
            let result = self.check_subtype(target_param, source_param.type_id);
            if result.is_false() {
                return result;
            }
        }

        if let Some(source_rest) = source.rest {
            let source_rest = self.rest_element_type(source_rest);
            for target_param in target.params.iter().skip(source.params.len()) {
                let result = self.check_subtype(target_param.type_id, source_rest);
                if result.is_false() {
                    return result;
                }
            }
            if let Some(target_rest) = target_rest {
                let result = self.check_subtype(target_rest, source_rest);
                if result.is_false() {
                    return result;
                }
            }
        }

        self.check_subtype(source.return_type, target.return_type)
    }
}
