//! Object shape subtyping.
//!
//! For every property of the target the source must supply a compatible
//! property:
//! - a required target property needs a source property (own, or through a
//!   matching index signature) whose type is a subtype
//! - an optional source property cannot satisfy a required target one
//! - readonly never blocks reads, so it is ignored here
//! - extra source properties are allowed (width subtyping)
//!
//! A target index signature constrains the source index signature and every
//! source property whose name fits the signature's key type.

use crate::diagnostics::SubtypeFailureReason;
use crate::types::*;
use tlev_common::interner::Atom;

use super::super::{SubtypeChecker, SubtypeResult};

impl<'a> SubtypeChecker<'a> {
    pub(crate) fn check_object_subtype(
        &mut self,
        source: &ObjectShape,
        target: &ObjectShape,
    ) -> SubtypeResult {
        for target_prop in &target.properties {
            match source.find(target_prop.name) {
                Some(source_prop) => {
                    if source_prop.optional && !target_prop.optional {
                        return SubtypeResult::False;
                    }
                    let result = self.check_subtype(source_prop.type_id, target_prop.type_id);
                    if result.is_false() {
                        return result;
                    }
                }
                None => {
                    if let Some(value_type) = self.index_value_for(source, target_prop.name) {
                        let result = self.check_subtype(value_type, target_prop.type_id);
                        if result.is_false() {
                            return result;
                        }
                    } else if !target_prop.optional {
                        return SubtypeResult::False;
                    }
                }
            }
        }

        let Some(target_index) = &target.index else {
            return SubtypeResult::True;
        };
        if let Some(source_index) = &source.index {
            if !self.index_keys_compatible(source_index.key_type, target_index.key_type) {
                return SubtypeResult::False;
            }
            let result = self.check_subtype(source_index.value_type, target_index.value_type);
            if result.is_false() {
                return result;
            }
        }
        for prop in &source.properties {
            if self.key_matches_index(prop.name, target_index.key_type) {
                let result = self.check_subtype(prop.type_id, target_index.value_type);
                if result.is_false() {
                    return result;
                }
            }
        }
        SubtypeResult::True
    }

    /// Value type the source's index signature provides for `name`.
    pub(crate) fn index_value_for(&mut self, shape: &ObjectShape, name: Atom) -> Option<TypeId> {
        let index = shape.index.as_ref()?;
        self.key_matches_index(name, index.key_type)
            .then_some(index.value_type)
    }

    pub(crate) fn key_matches_index(&mut self, name: Atom, key_type: TypeId) -> bool {
        match key_type {
            TypeId::STRING => true,
            TypeId::NUMBER => {
                let text = self.db.resolve_atom_ref(name);
                text.parse::<f64>().is_ok_and(f64::is_finite)
            }
            _ => {
                let literal = self.db.literal_string_atom(name);
                self.is_subtype_of(literal, key_type)
            }
        }
    }

    /// A `string` signature also covers numeric keys.
    fn index_keys_compatible(&mut self, source_key: TypeId, target_key: TypeId) -> bool {
        source_key == TypeId::STRING || self.is_subtype_of(target_key, source_key)
    }

    /// Property of an object literal `source` that no object member of
    /// `target` declares. Only meaningful for fresh object literals checked
    /// directly against a target.
    pub fn find_excess_property(
        &mut self,
        source: TypeId,
        target: TypeId,
    ) -> Option<SubtypeFailureReason> {
        let db = self.db;
        let source = self.resolve_meta(source);
        let target = self.resolve_meta(target);
        let TypeData::Object(source_shape) = db.lookup(source)? else {
            return None;
        };
        let source_shape = db.object_shape(source_shape);

        let target_members: Vec<TypeId> = match db.lookup(target)? {
            TypeData::Union(members) => db.type_list(members).to_vec(),
            _ => vec![target],
        };
        let mut target_shapes = Vec::new();
        for member in target_members {
            let member = self.resolve_meta(member);
            if let Some(TypeData::Object(shape)) = db.lookup(member) {
                let shape = db.object_shape(shape);
                if shape.is_empty() {
                    return None;
                }
                if shape.index.as_ref().is_some_and(|index| index.key_type == TypeId::STRING) {
                    return None;
                }
                target_shapes.push(shape);
            }
        }
        if target_shapes.is_empty() {
            return None;
        }

        source_shape
            .properties
            .iter()
            .find(|prop| {
                !target_shapes.iter().any(|shape| {
                    shape.find(prop.name).is_some()
                        || shape
                            .index
                            .as_ref()
                            .is_some_and(|index| index.key_type == TypeId::NUMBER && {
                                let text = db.resolve_atom_ref(prop.name);
                                text.parse::<f64>().is_ok()
                            })
                })
            })
            .map(|prop| SubtypeFailureReason::ExcessProperty {
                property_name: prop.name,
                target_type: target,
            })
    }
}
