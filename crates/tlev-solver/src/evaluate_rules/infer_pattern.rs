//! Structural pattern matching for `infer` slots.
//!
//! `match_pattern` walks an `extends` pattern against a subject in lock-step
//! and collects candidates for each slot, tagged with the polarity of the
//! position it was found in. Candidates are then merged per slot:
//! - covariant only: union of the candidates
//! - contravariant only: intersection; collapsing to `never` without a
//!   `never` candidate is `AmbiguousInference`
//! - both: the covariant union if it is assignable to the contravariant
//!   intersection, else the intersection
//! - none: `unknown`
//!
//! Finally the subject must be assignable to the pattern with the bindings
//! substituted, otherwise the match fails.

use crate::db::TypeDatabase;
use crate::diagnostics::Diagnostic;
use crate::evaluate::TypeEvaluator;
use crate::format::TypeFormatter;
use crate::infer::{InferenceContext, Polarity};
use crate::instantiate::{TypeSubstitution, instantiate_type};
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::subtype_rules::{capture_candidates, split_template_text};
use crate::types::*;
use crate::visitor::collect_type_ref_names;
use indexmap::IndexMap;
use tlev_common::diagnostics::DiagnosticKind;
use tlev_common::interner::Atom;
use tracing::trace;

use super::index_access::spread_element_type;

/// Slot bindings in slot declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InferBindings(IndexMap<Atom, TypeId>);

impl InferBindings {
    pub fn get(&self, slot: Atom) -> Option<TypeId> {
        self.0.get(&slot).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Atom, TypeId)> + '_ {
        self.0.iter().map(|(&name, &ty)| (name, ty))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_substitution(&self) -> TypeSubstitution {
        let mut subst = TypeSubstitution::new();
        for (name, ty) in self.iter() {
            subst.insert(name, ty);
        }
        subst
    }

    pub fn into_inner(self) -> IndexMap<Atom, TypeId> {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchError {
    /// The subject does not have the pattern's shape.
    Mismatch,
    /// Contravariant candidates for `slot` have no common subtype.
    Ambiguous { slot: Atom, candidates: Vec<TypeId> },
    /// Evaluating part of the pattern or subject failed.
    Failed(Diagnostic),
}

impl MatchError {
    pub fn into_diagnostic(self, db: &dyn TypeDatabase) -> Diagnostic {
        match self {
            MatchError::Failed(diagnostic) => diagnostic,
            MatchError::Mismatch => Diagnostic::new(
                DiagnosticKind::TypeMismatch,
                "Type does not match the inference pattern.",
            ),
            MatchError::Ambiguous { slot, candidates } => {
                let mut fmt = TypeFormatter::new(db);
                let listed: Vec<String> = candidates.iter().map(|&c| fmt.format(c)).collect();
                Diagnostic::new(
                    DiagnosticKind::AmbiguousInference,
                    DiagnosticKind::AmbiguousInference
                        .format(&[&db.resolve_atom(slot), &listed.join(", ")]),
                )
            }
        }
    }
}

struct PatternMatcher<'e, 'a> {
    evaluator: &'e mut TypeEvaluator<'a>,
    ctx: &'e mut InferenceContext,
    guard: RecursionGuard<(TypeId, TypeId, Polarity)>,
}

impl<'e, 'a> PatternMatcher<'e, 'a> {
    fn db(&self) -> &'a dyn TypeDatabase {
        self.evaluator.db()
    }

    fn slot_of(&self, type_id: TypeId) -> Option<Atom> {
        match self.db().lookup(type_id) {
            Some(TypeData::TypeRef(name)) if self.ctx.find_slot(name).is_some() => Some(name),
            _ => None,
        }
    }

    fn mentions_slot(&self, pattern: TypeId) -> bool {
        if pattern.is_intrinsic() {
            return false;
        }
        let names = collect_type_ref_names(self.db(), pattern);
        self.ctx.slot_names().any(|slot| names.contains(&slot))
    }

    fn bind_all(&mut self, pattern: TypeId, to: TypeId, polarity: Polarity) {
        let names = collect_type_ref_names(self.db(), pattern);
        let slots: Vec<Atom> = self.ctx.slot_names().filter(|s| names.contains(s)).collect();
        for slot in slots {
            if let Some(var) = self.ctx.find_slot(slot) {
                self.ctx.add_candidate(var, to, polarity);
            }
        }
    }

    /// Meta types (applications, indexed access, ...) in their structural form.
    fn resolve(&mut self, type_id: TypeId) -> TypeId {
        match self.db().lookup(type_id) {
            Some(
                TypeData::Application(_)
                | TypeData::Conditional(_)
                | TypeData::Mapped(_)
                | TypeData::IndexAccess(..)
                | TypeData::KeyOf(_),
            ) => match self.evaluator.evaluate(type_id) {
                Ok(resolved) => resolved,
                Err(diagnostic) => {
                    self.evaluator.record_failure(diagnostic);
                    type_id
                }
            },
            _ => type_id,
        }
    }

    fn walk(&mut self, pattern: TypeId, subject: TypeId, polarity: Polarity) -> bool {
        if let Some(slot) = self.slot_of(pattern) {
            if let Some(var) = self.ctx.find_slot(slot) {
                self.ctx.add_candidate(var, subject, polarity);
            }
            return true;
        }
        if !self.mentions_slot(pattern) {
            return match polarity {
                Polarity::Covariant => self.evaluator.is_subtype(subject, pattern),
                Polarity::Contravariant => self.evaluator.is_subtype(pattern, subject),
            };
        }
        if subject == TypeId::ANY || subject == TypeId::NEVER {
            self.bind_all(pattern, subject, polarity);
            return true;
        }

        let key = (pattern, subject, polarity);
        match self.guard.enter(key) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return true,
            RecursionResult::DepthExceeded | RecursionResult::StepsExhausted => return false,
        }
        let matched = self.walk_structure(pattern, subject, polarity);
        self.guard.leave(key);
        matched
    }

    fn walk_structure(&mut self, pattern: TypeId, subject: TypeId, polarity: Polarity) -> bool {
        let db = self.db();
        if let (Some(TypeData::Application(pattern_app)), Some(TypeData::Application(subject_app))) =
            (db.lookup(pattern), db.lookup(subject))
        {
            let pattern_app = db.type_application(pattern_app);
            let subject_app = db.type_application(subject_app);
            if pattern_app.def == subject_app.def && pattern_app.args.len() == subject_app.args.len() {
                return pattern_app
                    .args
                    .iter()
                    .zip(subject_app.args.iter())
                    .all(|(&p, &s)| self.walk(p, s, polarity));
            }
        }

        let subject = self.resolve(subject);
        let Some(subject_data) = db.lookup(subject) else {
            return false;
        };
        if let TypeData::Union(members) = subject_data {
            return db
                .type_list(members)
                .iter()
                .all(|&member| self.walk(pattern, member, polarity));
        }

        let pattern = self.resolve(pattern);
        let Some(pattern_data) = db.lookup(pattern) else {
            return false;
        };
        match (&pattern_data, &subject_data) {
            (TypeData::Union(members), _) => self.walk_union_pattern(&db.type_list(*members), subject, polarity),
            (TypeData::Intersection(members), _) => db
                .type_list(*members)
                .iter()
                .all(|&member| self.walk(member, subject, polarity)),
            (TypeData::Object(pattern_shape), TypeData::Object(subject_shape)) => self.walk_object(
                &db.object_shape(*pattern_shape),
                &db.object_shape(*subject_shape),
                polarity,
            ),
            (TypeData::Array(pattern_elem), TypeData::Array(subject_elem)) => {
                self.walk(*pattern_elem, *subject_elem, polarity)
            }
            (TypeData::Array(pattern_elem), TypeData::Tuple(list)) => {
                let members = db
                    .tuple_list(*list)
                    .iter()
                    .map(|e| spread_element_type(db, e))
                    .collect();
                self.walk(*pattern_elem, db.union(members), polarity)
            }
            (TypeData::Tuple(pattern_list), TypeData::Tuple(subject_list)) => self.walk_tuple(
                &db.tuple_list(*pattern_list),
                &db.tuple_list(*subject_list),
                polarity,
            ),
            (TypeData::Tuple(pattern_list), TypeData::Array(_)) => {
                match &db.tuple_list(*pattern_list)[..] {
                    [only] if only.rest => self.walk(only.type_id, subject, polarity),
                    _ => false,
                }
            }
            (TypeData::Function(pattern_fn), TypeData::Function(subject_fn)) => self.walk_function(
                &db.function_shape(*pattern_fn),
                &db.function_shape(*subject_fn),
                polarity,
            ),
            (TypeData::TemplateLiteral(spans), TypeData::Literal(LiteralValue::String(text))) => {
                let text = db.resolve_atom_ref(*text);
                self.walk_template(&db.template_list(*spans), &text, polarity)
            }
            (TypeData::StringIntrinsic { kind, type_arg }, TypeData::Literal(LiteralValue::String(text))) => {
                let text = db.resolve_atom_ref(*text);
                super::string_intrinsic::apply_string_intrinsic(*kind, &text) == *text
                    && self.walk(*type_arg, subject, polarity)
            }
            _ => false,
        }
    }

    /// Members without slots are tried as plain supertypes first; the rest
    /// are tried in order, each in a scratch context.
    fn walk_union_pattern(&mut self, members: &[TypeId], subject: TypeId, polarity: Polarity) -> bool {
        let (with_slots, fixed): (Vec<TypeId>, Vec<TypeId>) =
            members.iter().copied().partition(|&m| self.mentions_slot(m));
        if fixed.iter().any(|&m| self.evaluator.is_subtype(subject, m)) {
            return true;
        }
        if let [only] = with_slots[..] {
            return self.walk(only, subject, polarity);
        }
        let slots: Vec<Atom> = self.ctx.slot_names().collect();
        for member in with_slots {
            let saved = std::mem::replace(self.ctx, InferenceContext::with_slots(&slots));
            let matched = self.walk(member, subject, polarity);
            let mut trial = std::mem::replace(self.ctx, saved);
            if matched {
                self.ctx.absorb(&mut trial);
                return true;
            }
        }
        false
    }

    fn walk_object(&mut self, pattern: &ObjectShape, subject: &ObjectShape, polarity: Polarity) -> bool {
        for prop in &pattern.properties {
            let source = match subject.find(prop.name) {
                Some(found) => found.type_id,
                None => match &subject.index {
                    Some(index) => index.value_type,
                    None if prop.optional => continue,
                    None => return false,
                },
            };
            if !self.walk(prop.type_id, source, polarity) {
                return false;
            }
        }
        if let Some(index) = &pattern.index {
            let value = match &subject.index {
                Some(subject_index) => subject_index.value_type,
                None => {
                    let members = subject.properties.iter().map(|p| p.type_id).collect();
                    self.db().union(members)
                }
            };
            if !self.walk(index.value_type, value, polarity) {
                return false;
            }
        }
        true
    }

    /// Fixed elements align from both ends; a rest element in the pattern
    /// takes whatever lies between as a tuple.
    fn walk_tuple(&mut self, pattern: &[TupleElement], subject: &[TupleElement], polarity: Polarity) -> bool {
        let db = self.db();
        let Some(rest_at) = pattern.iter().position(|e| e.rest) else {
            if subject.iter().any(|e| e.rest) || subject.len() > pattern.len() {
                return false;
            }
            for (index, element) in pattern.iter().enumerate() {
                match subject.get(index) {
                    Some(source) => {
                        if source.optional && !element.optional {
                            return false;
                        }
                        if !self.walk(element.type_id, source.type_id, polarity) {
                            return false;
                        }
                    }
                    None if element.optional => {}
                    None => return false,
                }
            }
            return true;
        };

        let leading = &pattern[..rest_at];
        let trailing = &pattern[rest_at + 1..];
        let subject_rest = subject.iter().position(|e| e.rest);
        let fixed_len = subject_rest.unwrap_or(subject.len());
        if fixed_len < leading.len() {
            return false;
        }
        if subject_rest.is_some() && !trailing.is_empty() {
            return false;
        }
        if subject.len() < leading.len() + trailing.len() {
            return false;
        }
        for (element, source) in leading.iter().zip(subject.iter()) {
            if !self.walk(element.type_id, source.type_id, polarity) {
                return false;
            }
        }
        let middle_end = subject.len() - trailing.len();
        for (element, source) in trailing.iter().zip(subject[middle_end..].iter()) {
            if source.rest || !self.walk(element.type_id, source.type_id, polarity) {
                return false;
            }
        }
        let middle = db.tuple(subject[leading.len()..middle_end].to_vec());
        self.walk(pattern[rest_at].type_id, middle, polarity)
    }

    fn walk_function(&mut self, pattern: &FunctionShape, subject: &FunctionShape, polarity: Polarity) -> bool {
        let db = self.db();
        let flipped = polarity.flip();
        for (index, param) in pattern.params.iter().enumerate() {
            let source = match subject.params.get(index) {
                Some(source) => source.type_id,
                None => match subject.rest {
                    Some(rest) => spread_element_type(db, &TupleElement::rest(rest)),
                    None => continue,
                },
            };
            if !self.walk(param.type_id, source, flipped) {
                return false;
            }
        }
        if let Some(rest) = pattern.rest {
            let mut remaining: Vec<TupleElement> = subject
                .params
                .iter()
                .skip(pattern.params.len())
                .map(|p| TupleElement {
                    type_id: p.type_id,
                    optional: p.optional,
                    rest: false,
                })
                .collect();
            if let Some(subject_rest) = subject.rest {
                remaining.push(TupleElement::rest(subject_rest));
            }
            let remaining = match &remaining[..] {
                [only] if only.rest => only.type_id,
                _ => db.tuple(remaining),
            };
            if !self.walk(rest, remaining, flipped) {
                return false;
            }
        }
        self.walk(pattern.return_type, subject.return_type, polarity)
    }

    fn walk_template(&mut self, spans: &[TemplateSpan], text: &str, polarity: Polarity) -> bool {
        let db = self.db();
        let Some(captures) = split_template_text(db, text, spans) else {
            return false;
        };
        let placeholders = spans.iter().filter_map(|span| match span {
            TemplateSpan::Type(t) => Some(*t),
            TemplateSpan::Text(_) => None,
        });
        for (capture, placeholder) in captures.into_iter().zip(placeholders) {
            if self.slot_of(placeholder).is_some() || self.mentions_slot(placeholder) {
                if !self.walk(placeholder, db.literal_string(capture), polarity) {
                    return false;
                }
                continue;
            }
            if placeholder == TypeId::STRING || placeholder == TypeId::ANY {
                continue;
            }
            let fits = capture_candidates(db, capture)
                .into_iter()
                .any(|candidate| self.evaluator.is_subtype(candidate, placeholder));
            if !fits {
                return false;
            }
        }
        true
    }
}

impl<'a> TypeEvaluator<'a> {
    /// Walk `pattern` against `subject`, adding slot candidates to `ctx`.
    /// Returns false when the shapes do not line up.
    pub(crate) fn collect_candidates(
        &mut self,
        pattern: TypeId,
        subject: TypeId,
        ctx: &mut InferenceContext,
    ) -> bool {
        let mut matcher = PatternMatcher {
            evaluator: self,
            ctx,
            guard: RecursionGuard::with_profile(RecursionProfile::InferenceMatch),
        };
        matcher.walk(pattern, subject, Polarity::Covariant)
    }

    /// Merge each slot's candidates into one type. `None` for slots that
    /// collected nothing.
    pub(crate) fn resolve_candidates(
        &mut self,
        ctx: &mut InferenceContext,
    ) -> Result<IndexMap<Atom, Option<TypeId>>, MatchError> {
        let db = self.db();
        let slots: Vec<Atom> = ctx.slot_names().collect();
        let mut resolved = IndexMap::with_capacity(slots.len());
        for slot in slots {
            let Some(var) = ctx.find_slot(slot) else {
                continue;
            };
            let value = ctx.candidates(var);
            let covariant = (!value.covariant.is_empty()).then(|| db.union(value.covariant.to_vec()));
            let contravariant = if value.contravariant.is_empty() {
                None
            } else {
                let narrowed = db.intersection(value.contravariant.to_vec());
                if narrowed == TypeId::NEVER && !value.contravariant.contains(&TypeId::NEVER) {
                    return Err(MatchError::Ambiguous {
                        slot,
                        candidates: value.contravariant.to_vec(),
                    });
                }
                Some(narrowed)
            };
            let binding = match (covariant, contravariant) {
                (None, None) => None,
                (Some(widened), None) => Some(widened),
                (None, Some(narrowed)) => Some(narrowed),
                (Some(widened), Some(narrowed)) => Some(if self.is_subtype(widened, narrowed) {
                    widened
                } else {
                    narrowed
                }),
            };
            resolved.insert(slot, binding);
        }
        Ok(resolved)
    }

    /// Match `subject` against `pattern`, binding `slots`. An evaluation
    /// failure met on the way wins over the match result.
    pub fn match_pattern(
        &mut self,
        pattern: TypeId,
        subject: TypeId,
        slots: &[Atom],
    ) -> Result<InferBindings, MatchError> {
        let matched = self.match_slots(pattern, subject, slots);
        match self.take_failure() {
            Some(failure) => Err(MatchError::Failed(failure)),
            None => matched,
        }
    }

    fn match_slots(
        &mut self,
        pattern: TypeId,
        subject: TypeId,
        slots: &[Atom],
    ) -> Result<InferBindings, MatchError> {
        if slots.is_empty() {
            return if self.is_subtype(subject, pattern) {
                Ok(InferBindings::default())
            } else {
                Err(MatchError::Mismatch)
            };
        }
        let db = self.db();
        let mut ctx = InferenceContext::with_slots(slots);
        if !self.collect_candidates(pattern, subject, &mut ctx) {
            trace!(pattern = pattern.0, subject = subject.0, "pattern shape mismatch");
            return Err(MatchError::Mismatch);
        }
        let bindings: IndexMap<Atom, TypeId> = self
            .resolve_candidates(&mut ctx)?
            .into_iter()
            .map(|(slot, ty)| (slot, ty.unwrap_or(TypeId::UNKNOWN)))
            .collect();
        let bindings = InferBindings(bindings);

        let expected =
            instantiate_type(db, pattern, &bindings.to_substitution()).map_err(MatchError::Failed)?;
        let expected = self.evaluate(expected).map_err(MatchError::Failed)?;
        if !self.is_subtype(subject, expected) {
            trace!(subject = subject.0, "subject not assignable to the inferred pattern");
            return Err(MatchError::Mismatch);
        }
        Ok(bindings)
    }
}
