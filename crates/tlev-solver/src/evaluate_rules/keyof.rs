//! `keyof T`.

use crate::diagnostics::Diagnostic;
use crate::evaluate::TypeEvaluator;
use crate::types::*;

impl<'a> TypeEvaluator<'a> {
    pub(crate) fn evaluate_keyof(&mut self, type_id: TypeId, target: TypeId) -> Result<TypeId, Diagnostic> {
        let evaluated = self.evaluate(target)?;
        if self.is_generic(evaluated) {
            return Ok(if evaluated == target {
                type_id
            } else {
                self.db().keyof(evaluated)
            });
        }
        Ok(self.keys_of(evaluated))
    }

    /// Key set of an evaluated type. A union's keys are the keys common to
    /// every member; an intersection's are the keys of any member.
    pub(crate) fn keys_of(&mut self, target: TypeId) -> TypeId {
        let db = self.db();
        match target {
            TypeId::ANY | TypeId::NEVER => {
                return db.union(vec![TypeId::STRING, TypeId::NUMBER, TypeId::SYMBOL]);
            }
            TypeId::UNKNOWN => return TypeId::NEVER,
            _ => {}
        }
        match db.lookup(target) {
            Some(TypeData::Object(shape)) => {
                let shape = db.object_shape(shape);
                let mut keys: Vec<TypeId> = shape
                    .properties
                    .iter()
                    .map(|p| db.literal_string_atom(p.name))
                    .collect();
                if self.options().keyof_includes_index_signatures
                    && let Some(index) = &shape.index
                {
                    keys.push(index.key_type);
                }
                db.union(keys)
            }
            Some(TypeData::Array(_)) => db.union2(TypeId::NUMBER, db.literal_string("length")),
            Some(TypeData::Tuple(list)) => {
                let elements = db.tuple_list(list);
                let mut keys: Vec<TypeId> = elements
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !e.rest)
                    .map(|(i, _)| db.literal_string(&i.to_string()))
                    .collect();
                keys.push(TypeId::NUMBER);
                keys.push(db.literal_string("length"));
                db.union(keys)
            }
            Some(TypeData::Union(members)) => {
                let keys = db.type_list(members).iter().map(|&m| self.keys_of(m)).collect();
                db.intersection(keys)
            }
            Some(TypeData::Intersection(members)) => {
                let keys = db.type_list(members).iter().map(|&m| self.keys_of(m)).collect();
                db.union(keys)
            }
            Some(TypeData::Application(_)) => db.keyof(target),
            _ => TypeId::NEVER,
        }
    }
}
