//! Literal and template literal subtyping.
//!
//! A string literal is a subtype of a template literal pattern when its
//! text splits into the pattern's fixed text and every capture fits the
//! placeholder type at that position:
//! - leading text must be a prefix and trailing text a suffix
//! - a placeholder followed by text captures up to the first occurrence of
//!   that text (non-greedy, left to right)
//! - two adjacent placeholders: the first captures a single character
//! - the last placeholder captures the remainder

use crate::db::TypeDatabase;
use crate::evaluate_rules::string_intrinsic::apply_string_intrinsic;
use crate::types::*;

use super::super::{SubtypeChecker, SubtypeResult};

/// Split `text` along a template pattern. Returns one capture per
/// placeholder span, or `None` if the fixed text does not line up.
pub(crate) fn split_template_text<'t>(
    db: &dyn TypeDatabase,
    text: &'t str,
    spans: &[TemplateSpan],
) -> Option<Vec<&'t str>> {
    let (body, mut rest) = match spans.last() {
        Some(TemplateSpan::Text(suffix)) => {
            let suffix = db.resolve_atom_ref(*suffix);
            (&spans[..spans.len() - 1], text.strip_suffix(&*suffix)?)
        }
        _ => (spans, text),
    };

    let mut captures = Vec::new();
    for (i, span) in body.iter().enumerate() {
        match span {
            TemplateSpan::Text(fixed) => {
                let fixed = db.resolve_atom_ref(*fixed);
                rest = rest.strip_prefix(&*fixed)?;
            }
            TemplateSpan::Type(_) => match body.get(i + 1) {
                None => {
                    captures.push(rest);
                    rest = "";
                }
                Some(TemplateSpan::Text(delimiter)) => {
                    let delimiter = db.resolve_atom_ref(*delimiter);
                    let end = rest.find(&*delimiter)?;
                    captures.push(&rest[..end]);
                    rest = &rest[end..];
                }
                Some(TemplateSpan::Type(_)) => {
                    let width = rest.chars().next()?.len_utf8();
                    captures.push(&rest[..width]);
                    rest = &rest[width..];
                }
            },
        }
    }
    rest.is_empty().then_some(captures)
}

fn is_numeric_text(text: &str) -> bool {
    !text.is_empty() && text.trim() == text && text.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Types a captured substring can stand for: the string literal itself,
/// plus the number, boolean or nullish literal it spells.
pub(crate) fn capture_candidates(db: &dyn TypeDatabase, capture: &str) -> Vec<TypeId> {
    let mut candidates = vec![db.literal_string(capture)];
    if is_numeric_text(capture)
        && let Ok(value) = capture.parse::<f64>()
    {
        candidates.push(db.literal_number(value));
    }
    match capture {
        "true" => candidates.push(TypeId::BOOLEAN_TRUE),
        "false" => candidates.push(TypeId::BOOLEAN_FALSE),
        "null" => candidates.push(TypeId::NULL),
        "undefined" => candidates.push(TypeId::UNDEFINED),
        _ => {}
    }
    if let Some(digits) = capture.strip_suffix('n')
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        candidates.push(db.literal_bigint(digits));
    }
    candidates
}

impl<'a> SubtypeChecker<'a> {
    pub(crate) fn literal_matches_template(&mut self, text: &str, spans: &[TemplateSpan]) -> bool {
        let Some(captures) = split_template_text(self.db, text, spans) else {
            return false;
        };
        let placeholders = spans.iter().filter_map(|span| match span {
            TemplateSpan::Type(t) => Some(*t),
            TemplateSpan::Text(_) => None,
        });
        captures
            .into_iter()
            .zip(placeholders)
            .all(|(capture, placeholder)| self.capture_fits(capture, placeholder))
    }

    fn capture_fits(&mut self, capture: &str, placeholder: TypeId) -> bool {
        if placeholder == TypeId::STRING || placeholder == TypeId::ANY {
            return true;
        }
        capture_candidates(self.db, capture)
            .into_iter()
            .any(|candidate| self.is_subtype_of(candidate, placeholder))
    }

    /// `"1E5" <: Uppercase<number>` holds because the transform leaves the
    /// text unchanged and the text spells a `number`.
    pub(crate) fn check_literal_against_string_intrinsic(
        &mut self,
        text: &str,
        kind: StringIntrinsicKind,
        type_arg: TypeId,
    ) -> SubtypeResult {
        if apply_string_intrinsic(kind, text) != text {
            return SubtypeResult::False;
        }
        SubtypeResult::from_bool(self.capture_fits(text, type_arg))
    }
}
