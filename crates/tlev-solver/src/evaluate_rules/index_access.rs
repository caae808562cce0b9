//! Indexed access evaluation: `T[K]`.
//!
//! Union keys and union objects distribute. An optional property reads as
//! `T | undefined`; an absent property falls back to a compatible index
//! signature. Arrays answer `number` keys with their element type, tuples
//! answer numeric literal keys positionally, and `"length"` is the arity.

use crate::db::TypeDatabase;
use crate::diagnostics::Diagnostic;
use crate::evaluate::TypeEvaluator;
use crate::format::TypeFormatter;
use crate::types::*;

/// Element type contributed by a tuple element: the element itself, or the
/// element type of a spread array or tuple.
pub(crate) fn spread_element_type(db: &dyn TypeDatabase, element: &TupleElement) -> TypeId {
    if !element.rest {
        return element.type_id;
    }
    match db.lookup(element.type_id) {
        Some(TypeData::Array(inner)) => inner,
        Some(TypeData::Tuple(list)) => {
            let members = db
                .tuple_list(list)
                .iter()
                .map(|e| spread_element_type(db, e))
                .collect();
            db.union(members)
        }
        _ => element.type_id,
    }
}

/// Property key spelled by a literal key type.
enum KeyName {
    Text(String),
    /// A number literal or a string that reads as a non-negative integer.
    Index(usize, String),
}

fn key_name(db: &dyn TypeDatabase, key: TypeId) -> Option<KeyName> {
    let text = match db.lookup(key)? {
        TypeData::Literal(LiteralValue::String(atom)) => db.resolve_atom(atom),
        TypeData::Literal(LiteralValue::Number(n)) => format_number(n.0),
        _ => return None,
    };
    match text.parse::<usize>() {
        Ok(index) if index.to_string() == text => Some(KeyName::Index(index, text)),
        _ => Some(KeyName::Text(text)),
    }
}

impl KeyName {
    fn text(&self) -> &str {
        match self {
            KeyName::Text(text) | KeyName::Index(_, text) => text,
        }
    }

    fn is_numeric(&self) -> bool {
        match self {
            KeyName::Index(..) => true,
            KeyName::Text(text) => text.parse::<f64>().is_ok(),
        }
    }
}

impl<'a> TypeEvaluator<'a> {
    pub(crate) fn evaluate_index_access(
        &mut self,
        type_id: TypeId,
        object: TypeId,
        key: TypeId,
    ) -> Result<TypeId, Diagnostic> {
        let evaluated_object = self.evaluate(object)?;
        let evaluated_key = self.evaluate(key)?;
        if self.is_generic(evaluated_object) || self.is_generic(evaluated_key) {
            return Ok(if evaluated_object == object && evaluated_key == key {
                type_id
            } else {
                self.db().index_access(evaluated_object, evaluated_key)
            });
        }
        self.index_into(evaluated_object, evaluated_key)
    }

    fn index_into(&mut self, object: TypeId, key: TypeId) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        if object == TypeId::ANY || key == TypeId::ANY {
            return Ok(TypeId::ANY);
        }
        if object == TypeId::NEVER || key == TypeId::NEVER {
            return Ok(TypeId::NEVER);
        }
        if let Some(TypeData::Union(keys)) = db.lookup(key) {
            let mut results = Vec::new();
            for &member in db.type_list(keys).iter() {
                results.push(self.index_into(object, member)?);
            }
            return Ok(db.union(results));
        }

        match db.lookup(object) {
            Some(TypeData::Union(members)) => {
                let mut results = Vec::new();
                for &member in db.type_list(members).iter() {
                    results.push(self.index_into(member, key)?);
                }
                Ok(db.union(results))
            }
            Some(TypeData::Intersection(members)) => {
                let mut results = Vec::new();
                for &member in db.type_list(members).iter() {
                    if let Ok(found) = self.index_into(member, key) {
                        results.push(found);
                    }
                }
                if results.is_empty() {
                    return Err(self.missing_key(object, key));
                }
                Ok(db.intersection(results))
            }
            Some(TypeData::Object(shape)) => self.index_object(object, &db.object_shape(shape), key),
            Some(TypeData::Array(element)) => {
                if key == TypeId::NUMBER {
                    return Ok(element);
                }
                match key_name(db, key) {
                    Some(KeyName::Index(..)) => Ok(element),
                    Some(KeyName::Text(text)) if text == "length" => Ok(TypeId::NUMBER),
                    _ => Err(self.missing_key(object, key)),
                }
            }
            Some(TypeData::Tuple(list)) => self.index_tuple(object, &db.tuple_list(list), key),
            _ => Err(self.missing_key(object, key)),
        }
    }

    fn index_object(
        &mut self,
        object: TypeId,
        shape: &ObjectShape,
        key: TypeId,
    ) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        if key == TypeId::STRING || key == TypeId::NUMBER {
            return match &shape.index {
                Some(index) if index.key_type == TypeId::STRING || index.key_type == key => {
                    Ok(index.value_type)
                }
                _ => Err(self.missing_key(object, key)),
            };
        }
        let Some(name) = key_name(db, key) else {
            return Err(self.missing_key(object, key));
        };
        if let Some(prop) = shape.find(db.intern_string(name.text())) {
            return Ok(if prop.optional {
                db.union2(prop.type_id, TypeId::UNDEFINED)
            } else {
                prop.type_id
            });
        }
        match &shape.index {
            Some(index)
                if index.key_type == TypeId::STRING
                    || (index.key_type == TypeId::NUMBER && name.is_numeric()) =>
            {
                Ok(index.value_type)
            }
            _ => Err(self.missing_key(object, key)),
        }
    }

    fn index_tuple(
        &mut self,
        object: TypeId,
        elements: &[TupleElement],
        key: TypeId,
    ) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        let variadic = elements.iter().any(|e| e.rest);
        if key == TypeId::NUMBER {
            let members = elements.iter().map(|e| spread_element_type(db, e)).collect();
            return Ok(db.union(members));
        }
        match key_name(db, key) {
            Some(KeyName::Index(index, _)) => {
                let rest_at = elements.iter().position(|e| e.rest);
                match elements.get(index) {
                    Some(element) if rest_at.is_none_or(|at| index < at) => Ok(if element.optional {
                        db.union2(element.type_id, TypeId::UNDEFINED)
                    } else {
                        element.type_id
                    }),
                    _ => match rest_at {
                        Some(at) => {
                            let members = elements[at..]
                                .iter()
                                .map(|e| spread_element_type(db, e))
                                .collect();
                            Ok(db.union2(db.union(members), TypeId::UNDEFINED))
                        }
                        None => Err(self.missing_key(object, key)),
                    },
                }
            }
            Some(KeyName::Text(text)) if text == "length" => Ok(if variadic {
                TypeId::NUMBER
            } else if elements.iter().any(|e| e.optional) {
                let required = elements.iter().filter(|e| !e.optional).count();
                let lengths = (required..=elements.len())
                    .map(|n| db.literal_number(n as f64))
                    .collect();
                db.union(lengths)
            } else {
                db.literal_number(elements.len() as f64)
            }),
            _ => Err(self.missing_key(object, key)),
        }
    }

    fn missing_key(&self, object: TypeId, key: TypeId) -> Diagnostic {
        let db = self.db();
        let text = match key_name(db, key) {
            Some(name) => name.text().to_string(),
            None => TypeFormatter::new(db).with_resolver(self.resolver()).format(key),
        };
        Diagnostic::unknown_property(db, &text, object)
    }
}
