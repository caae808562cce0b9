//! Primitive targets.
//!
//! - `undefined <: void`
//! - a literal is a subtype of its own primitive kind
//! - template literal patterns and case intrinsics are strings

use crate::types::*;

use super::super::{SubtypeChecker, SubtypeResult};

impl<'a> SubtypeChecker<'a> {
    pub(crate) fn check_intrinsic_target(
        &mut self,
        source: TypeId,
        source_data: &TypeData,
        target: IntrinsicKind,
    ) -> SubtypeResult {
        let target_id = target.to_type_id();
        let holds = match target {
            IntrinsicKind::Void => source == TypeId::UNDEFINED,
            IntrinsicKind::String
            | IntrinsicKind::Number
            | IntrinsicKind::Boolean
            | IntrinsicKind::Bigint
            | IntrinsicKind::Symbol => match source_data {
                TypeData::Literal(value) => value.primitive() == target_id,
                TypeData::TemplateLiteral(_) | TypeData::StringIntrinsic { .. } => {
                    target_id == TypeId::STRING
                }
                _ => false,
            },
            _ => false,
        };
        SubtypeResult::from_bool(holds)
    }
}
