//! Mapped type expansion: `{ [P in K as N]: T }`.
//!
//! The key set `K` is evaluated to literal keys. For each key the iteration
//! variable is bound and the `as` clause (if any) and the template are
//! evaluated. A remapped key of `never` drops the property; `string` or
//! `number` keys produce an index signature instead of a property.
//!
//! Over `keyof S` (homomorphic) the output inherits each source property's
//! modifiers; `+`/`-` modifiers override. A homomorphic mapping over an
//! array or tuple without `as` maps element-wise, and one over a primitive
//! returns the primitive.

use crate::diagnostics::Diagnostic;
use crate::evaluate::TypeEvaluator;
use crate::instantiate::{TypeSubstitution, instantiate_type};
use crate::types::*;
use indexmap::IndexMap;
use std::sync::Arc;
use tlev_common::interner::Atom;
use tracing::trace;

/// Output key produced for one source key.
enum MappedKey {
    Property(Atom),
    Index(TypeId),
}

fn apply_modifier(modifier: Option<MappedModifier>, inherited: bool) -> bool {
    match modifier {
        Some(MappedModifier::Add) => true,
        Some(MappedModifier::Remove) => false,
        None => inherited,
    }
}

impl<'a> TypeEvaluator<'a> {
    pub(crate) fn evaluate_mapped(&mut self, type_id: TypeId, mapped: &MappedType) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        let mut source_shape: Option<Arc<ObjectShape>> = None;
        let mut homomorphic = false;

        if let Some(TypeData::KeyOf(source)) = db.lookup(mapped.constraint) {
            let source = self.evaluate(source)?;
            if self.is_generic(source) {
                return Ok(self.rebuild_mapped(type_id, mapped, db.keyof(source)));
            }
            match db.lookup(source) {
                Some(TypeData::Intrinsic(_) | TypeData::Literal(_)) if source != TypeId::ANY => {
                    return Ok(source);
                }
                Some(TypeData::Union(members)) => {
                    let mut results = Vec::new();
                    for &member in db.type_list(members).iter() {
                        let per_member = MappedType {
                            constraint: db.keyof(member),
                            ..mapped.clone()
                        };
                        results.push(self.evaluate(db.mapped(per_member))?);
                    }
                    return Ok(db.union(results));
                }
                Some(TypeData::Array(_)) if mapped.name_type.is_none() => {
                    let element = self.map_value(mapped, TypeId::NUMBER)?;
                    return Ok(db.array(element));
                }
                Some(TypeData::Tuple(list)) if mapped.name_type.is_none() => {
                    return self.map_tuple(mapped, &db.tuple_list(list));
                }
                Some(TypeData::Object(shape)) => source_shape = Some(db.object_shape(shape)),
                _ => {}
            }
            homomorphic = true;
        }

        let keys = self.evaluate(mapped.constraint)?;
        if self.is_generic(keys) {
            return Ok(self.rebuild_mapped(type_id, mapped, keys));
        }
        let keys: Vec<TypeId> = match db.lookup(keys) {
            Some(TypeData::Union(list)) => db.type_list(list).to_vec(),
            _ => vec![keys],
        };

        let mut properties: IndexMap<Atom, PropertyInfo> = IndexMap::new();
        let mut index: Option<IndexSignature> = None;
        for key in keys {
            let source_prop = source_shape
                .as_ref()
                .and_then(|shape| db.literal_text(key).and_then(|text| shape.find(db.intern_string(&text))))
                .cloned();
            let outputs = self.output_keys(mapped, key)?;
            if outputs.is_empty() {
                continue;
            }
            let value = self.map_value(mapped, key)?;
            for output in outputs {
                match output {
                    MappedKey::Property(name) => {
                        let prop = self.mapped_property(mapped, name, value, source_prop.as_ref());
                        match properties.get_mut(&name) {
                            Some(existing) => existing.type_id = db.union2(existing.type_id, prop.type_id),
                            None => {
                                properties.insert(name, prop);
                            }
                        }
                    }
                    MappedKey::Index(key_type) => {
                        let readonly = apply_modifier(mapped.readonly_modifier, false);
                        index = Some(match index {
                            Some(existing) => IndexSignature {
                                key_type: db.union2(existing.key_type, key_type),
                                value_type: db.union2(existing.value_type, value),
                                readonly: existing.readonly && readonly,
                            },
                            None => IndexSignature {
                                key_type,
                                value_type: value,
                                readonly,
                            },
                        });
                    }
                }
            }
        }

        if index.is_none()
            && mapped.name_type.is_none()
            && let Some(source_index) = source_shape.as_ref().and_then(|s| s.index.clone())
        {
            let value = self.map_value(mapped, source_index.key_type)?;
            index = Some(IndexSignature {
                key_type: source_index.key_type,
                value_type: value,
                readonly: apply_modifier(mapped.readonly_modifier, source_index.readonly),
            });
        }

        trace!(
            properties = properties.len(),
            homomorphic,
            "expanded mapped type"
        );
        Ok(db.object_with_index(ObjectShape {
            properties: properties.into_values().collect(),
            index,
        }))
    }

    fn rebuild_mapped(&self, type_id: TypeId, mapped: &MappedType, constraint: TypeId) -> TypeId {
        if constraint == mapped.constraint {
            return type_id;
        }
        self.db().mapped(MappedType {
            constraint,
            ..mapped.clone()
        })
    }

    fn bind_iteration(
        &self,
        mapped: &MappedType,
        key: TypeId,
        body: TypeId,
    ) -> Result<TypeId, Diagnostic> {
        let mut subst = TypeSubstitution::new();
        subst.insert(mapped.type_param, key);
        instantiate_type(self.db(), body, &subst)
    }

    fn map_value(&mut self, mapped: &MappedType, key: TypeId) -> Result<TypeId, Diagnostic> {
        let template = self.bind_iteration(mapped, key, mapped.template)?;
        self.evaluate(template)
    }

    /// Keys a source key maps to after the `as` clause.
    fn output_keys(&mut self, mapped: &MappedType, key: TypeId) -> Result<Vec<MappedKey>, Diagnostic> {
        let db = self.db();
        let renamed = match mapped.name_type {
            Some(name_type) => {
                let name_type = self.bind_iteration(mapped, key, name_type)?;
                self.evaluate(name_type)?
            }
            None => key,
        };
        let members: Vec<TypeId> = match db.lookup(renamed) {
            Some(TypeData::Union(list)) => db.type_list(list).to_vec(),
            _ => vec![renamed],
        };
        Ok(members
            .into_iter()
            .filter_map(|member| match member {
                TypeId::STRING | TypeId::NUMBER => Some(MappedKey::Index(member)),
                _ => match db.lookup(member) {
                    Some(TypeData::Literal(LiteralValue::String(atom))) => Some(MappedKey::Property(atom)),
                    Some(TypeData::Literal(LiteralValue::Number(n))) => {
                        Some(MappedKey::Property(db.intern_string(&format_number(n.0))))
                    }
                    Some(TypeData::TemplateLiteral(_)) if mapped.name_type.is_some() => {
                        Some(MappedKey::Index(TypeId::STRING))
                    }
                    _ => None,
                },
            })
            .collect())
    }

    fn mapped_property(
        &self,
        mapped: &MappedType,
        name: Atom,
        value: TypeId,
        source: Option<&PropertyInfo>,
    ) -> PropertyInfo {
        let optional = apply_modifier(mapped.optional_modifier, source.is_some_and(|p| p.optional));
        let readonly = apply_modifier(mapped.readonly_modifier, source.is_some_and(|p| p.readonly));
        let strip_undefined = mapped.optional_modifier == Some(MappedModifier::Remove)
            || (optional && source.is_some_and(|p| p.optional && !self.includes_undefined(p.type_id)));
        let type_id = if strip_undefined {
            self.without_undefined(value)
        } else {
            value
        };
        PropertyInfo {
            name,
            type_id,
            optional,
            readonly,
        }
    }

    fn includes_undefined(&self, type_id: TypeId) -> bool {
        let db = self.db();
        type_id == TypeId::UNDEFINED
            || matches!(db.lookup(type_id), Some(TypeData::Union(list)) if db.type_list(list).contains(&TypeId::UNDEFINED))
    }

    fn without_undefined(&self, type_id: TypeId) -> TypeId {
        let db = self.db();
        match db.lookup(type_id) {
            Some(TypeData::Union(list)) => {
                let kept = db
                    .type_list(list)
                    .iter()
                    .copied()
                    .filter(|&m| m != TypeId::UNDEFINED)
                    .collect();
                db.union(kept)
            }
            _ => type_id,
        }
    }

    fn map_tuple(&mut self, mapped: &MappedType, elements: &[TupleElement]) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        let mut mapped_elements = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            if element.rest {
                let value = self.map_value(mapped, TypeId::NUMBER)?;
                mapped_elements.push(TupleElement::rest(db.array(value)));
                continue;
            }
            let value = self.map_value(mapped, db.literal_string(&index.to_string()))?;
            let optional = apply_modifier(mapped.optional_modifier, element.optional);
            let value = if element.optional && (!optional || !self.includes_undefined(element.type_id)) {
                self.without_undefined(value)
            } else {
                value
            };
            mapped_elements.push(TupleElement {
                type_id: value,
                optional,
                rest: false,
            });
        }
        Ok(db.tuple(mapped_elements))
    }
}
