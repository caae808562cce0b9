//! `Uppercase`, `Lowercase`, `Capitalize` and `Uncapitalize`.
//!
//! The transforms are plain string functions applied to literal text. They
//! distribute over unions and pass `any`, `never` and `string` through:
//! text that is not known yet cannot be transformed. Over `number` and
//! `bigint` the application stays deferred, so it can sit in a template
//! placeholder as a pattern. On a template pattern they transform the fixed
//! text and wrap the non-`string` placeholders.

use crate::diagnostics::{Diagnostic, PathSegment};
use crate::evaluate::TypeEvaluator;
use crate::types::*;

pub fn apply_string_intrinsic(kind: StringIntrinsicKind, text: &str) -> String {
    match kind {
        StringIntrinsicKind::Uppercase => text.to_uppercase(),
        StringIntrinsicKind::Lowercase => text.to_lowercase(),
        StringIntrinsicKind::Capitalize => {
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        StringIntrinsicKind::Uncapitalize => {
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

impl<'a> TypeEvaluator<'a> {
    pub(crate) fn evaluate_string_intrinsic(
        &mut self,
        type_id: TypeId,
        kind: StringIntrinsicKind,
        type_arg: TypeId,
    ) -> Result<TypeId, Diagnostic> {
        let arg = self
            .evaluate(type_arg)
            .map_err(|d| d.at(PathSegment::TypeArgument(0)))?;
        if self.is_generic(arg) {
            return Ok(if arg == type_arg {
                type_id
            } else {
                self.db().string_intrinsic(kind, arg)
            });
        }
        self.apply_intrinsic(kind, arg)
    }

    fn apply_intrinsic(&mut self, kind: StringIntrinsicKind, arg: TypeId) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        match arg {
            TypeId::ANY | TypeId::NEVER | TypeId::STRING => return Ok(arg),
            TypeId::NUMBER | TypeId::BIGINT => return Ok(db.string_intrinsic(kind, arg)),
            _ => {}
        }
        match db.lookup(arg) {
            Some(TypeData::Union(members)) => {
                let mut results = Vec::new();
                for &member in db.type_list(members).iter() {
                    results.push(self.apply_intrinsic(kind, member)?);
                }
                Ok(db.union(results))
            }
            Some(TypeData::Literal(LiteralValue::String(atom))) => {
                Ok(db.literal_string(&apply_string_intrinsic(kind, &db.resolve_atom_ref(atom))))
            }
            Some(TypeData::TemplateLiteral(spans)) => {
                let spans = db.template_list(spans);
                let whole = matches!(
                    kind,
                    StringIntrinsicKind::Uppercase | StringIntrinsicKind::Lowercase
                );
                let transformed = spans
                    .iter()
                    .enumerate()
                    .map(|(index, span)| {
                        if !whole && index > 0 {
                            return span.clone();
                        }
                        match span {
                            TemplateSpan::Text(text) => TemplateSpan::Text(db.intern_string(
                                &apply_string_intrinsic(kind, &db.resolve_atom_ref(*text)),
                            )),
                            TemplateSpan::Type(TypeId::STRING) => span.clone(),
                            TemplateSpan::Type(t) => TemplateSpan::Type(db.string_intrinsic(kind, *t)),
                        }
                    })
                    .collect();
                Ok(db.template_literal(transformed))
            }
            Some(TypeData::StringIntrinsic { .. }) => Ok(db.string_intrinsic(kind, arg)),
            _ => Err(Diagnostic::type_mismatch(db, arg, TypeId::STRING).at(PathSegment::TypeArgument(0))),
        }
    }
}
