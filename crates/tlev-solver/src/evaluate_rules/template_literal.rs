//! Template literal expansion.
//!
//! Each placeholder is evaluated and split into its union members. Every
//! combination of member choices is concatenated with the fixed text, and
//! the interner folds each combination into a string literal when all of
//! its parts are literal. Non-literal primitives (`string`, `number`,
//! `bigint`) stay as placeholders, so the combination remains a pattern.
//!
//! The number of combinations is capped at
//! `TEMPLATE_LITERAL_EXPANSION_LIMIT`; past the cap the result widens to
//! `string`.

use crate::diagnostics::{Diagnostic, PathSegment};
use crate::evaluate::TypeEvaluator;
use crate::types::*;
use smallvec::SmallVec;
use tlev_common::limits::TEMPLATE_LITERAL_EXPANSION_LIMIT;
use tracing::debug;

impl<'a> TypeEvaluator<'a> {
    pub(crate) fn evaluate_template_literal(
        &mut self,
        type_id: TypeId,
        spans: &[TemplateSpan],
    ) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        let mut evaluated = Vec::with_capacity(spans.len());
        let mut generic = false;
        for (index, span) in spans.iter().enumerate() {
            match span {
                TemplateSpan::Text(text) => evaluated.push(TemplateSpan::Text(*text)),
                TemplateSpan::Type(t) => {
                    let t = self
                        .evaluate(*t)
                        .map_err(|d| d.at(PathSegment::TemplateSpan(index)))?;
                    generic |= self.is_generic(t);
                    evaluated.push(TemplateSpan::Type(t));
                }
            }
        }
        if generic {
            return Ok(if evaluated[..] == spans[..] {
                type_id
            } else {
                db.template_literal(evaluated)
            });
        }

        let mut choices: Vec<SmallVec<[TemplateSpan; 4]>> = Vec::with_capacity(evaluated.len());
        for (index, span) in evaluated.iter().enumerate() {
            match span {
                TemplateSpan::Text(_) => choices.push(SmallVec::from_elem(span.clone(), 1)),
                TemplateSpan::Type(t) => {
                    let options = self
                        .placeholder_choices(*t)
                        .map_err(|d| d.at(PathSegment::TemplateSpan(index)))?;
                    if options.is_empty() {
                        return Ok(TypeId::NEVER);
                    }
                    choices.push(options);
                }
            }
        }

        let combinations = choices
            .iter()
            .try_fold(1usize, |acc, options| acc.checked_mul(options.len()))
            .unwrap_or(usize::MAX);
        if combinations > TEMPLATE_LITERAL_EXPANSION_LIMIT {
            debug!(combinations, "template literal expansion widened to string");
            return Ok(TypeId::STRING);
        }

        let mut results = Vec::with_capacity(combinations);
        let mut selected = vec![0usize; choices.len()];
        loop {
            let parts = choices
                .iter()
                .zip(selected.iter())
                .map(|(options, &i)| options[i].clone())
                .collect();
            results.push(db.template_literal(parts));

            // Odometer over the choice lists, last position fastest.
            let mut position = choices.len();
            loop {
                if position == 0 {
                    return Ok(db.union(results));
                }
                position -= 1;
                selected[position] += 1;
                if selected[position] < choices[position].len() {
                    break;
                }
                selected[position] = 0;
            }
        }
    }

    /// The spans a placeholder can contribute: literal text for unit types,
    /// the type itself for pattern placeholders.
    fn placeholder_choices(&mut self, placeholder: TypeId) -> Result<SmallVec<[TemplateSpan; 4]>, Diagnostic> {
        let db = self.db();
        let members: Vec<TypeId> = match db.lookup(placeholder) {
            Some(TypeData::Union(list)) => db.type_list(list).to_vec(),
            _ => vec![placeholder],
        };
        let mut choices = SmallVec::new();
        for member in members {
            match member {
                TypeId::NEVER => {}
                TypeId::BOOLEAN => {
                    choices.push(TemplateSpan::Type(TypeId::BOOLEAN_TRUE));
                    choices.push(TemplateSpan::Type(TypeId::BOOLEAN_FALSE));
                }
                TypeId::ANY => choices.push(TemplateSpan::Type(TypeId::STRING)),
                TypeId::STRING | TypeId::NUMBER | TypeId::BIGINT => {
                    choices.push(TemplateSpan::Type(member))
                }
                _ if db.literal_text(member).is_some() => choices.push(TemplateSpan::Type(member)),
                _ => match db.lookup(member) {
                    Some(TypeData::TemplateLiteral(_) | TypeData::StringIntrinsic { .. }) => {
                        choices.push(TemplateSpan::Type(member))
                    }
                    _ => {
                        let accepted = db.union(vec![
                            TypeId::STRING,
                            TypeId::NUMBER,
                            TypeId::BIGINT,
                            TypeId::BOOLEAN,
                            TypeId::NULL,
                            TypeId::UNDEFINED,
                        ]);
                        return Err(Diagnostic::type_mismatch(db, member, accepted));
                    }
                },
            }
        }
        Ok(choices)
    }
}
