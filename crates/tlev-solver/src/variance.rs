//! How an alias parameter's position affects assignability of applications.
//!
//! `Box<A>` vs `Box<B>` compares the arguments instead of expanding both
//! bodies. An `out` parameter compares `A` to `B`, an `in` parameter compares
//! `B` to `A`, an invariant one checks both ways, and an unused one is
//! skipped. Declared `in`/`out` modifiers are taken as written; otherwise the
//! body is walked and each occurrence records its polarity. Occurrences under
//! conditionals, indexed access or other applications count as both.

use crate::db::TypeDatabase;
use crate::types::*;
use crate::visitor::TypeVisitor;
use bitflags::bitflags;
use rustc_hash::FxHashSet;
use tlev_common::interner::Atom;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Variance: u8 {
        const COVARIANT = 1 << 0;
        const CONTRAVARIANT = 1 << 1;
        const INVARIANT = Self::COVARIANT.bits() | Self::CONTRAVARIANT.bits();
    }
}

impl Variance {
    pub fn is_independent(self) -> bool {
        self.is_empty()
    }

    pub fn is_covariant(self) -> bool {
        self == Variance::COVARIANT
    }

    pub fn is_contravariant(self) -> bool {
        self == Variance::CONTRAVARIANT
    }

    pub fn is_invariant(self) -> bool {
        self.contains(Variance::INVARIANT)
    }
}

impl From<VarianceAnnotation> for Variance {
    fn from(annotation: VarianceAnnotation) -> Self {
        match annotation {
            VarianceAnnotation::Out => Variance::COVARIANT,
            VarianceAnnotation::In => Variance::CONTRAVARIANT,
            VarianceAnnotation::InOut => Variance::INVARIANT,
        }
    }
}

/// Variance of `param` as used in `body`.
pub fn compute_variance(db: &dyn TypeDatabase, body: TypeId, param: Atom) -> Variance {
    let mut visitor = VarianceVisitor {
        db,
        param,
        result: Variance::empty(),
        visiting: FxHashSet::default(),
        polarity: true,
    };
    visitor.visit_with_polarity(body, true);
    visitor.result
}

/// Variance of a declared parameter: the annotation if present, else the
/// computed one.
pub fn param_variance(db: &dyn TypeDatabase, param: &TypeParamInfo, body: Option<TypeId>) -> Variance {
    match (param.variance, body) {
        (Some(annotation), _) => annotation.into(),
        (None, Some(body)) => compute_variance(db, body, param.name),
        (None, None) => Variance::INVARIANT,
    }
}

struct VarianceVisitor<'a> {
    db: &'a dyn TypeDatabase,
    param: Atom,
    result: Variance,
    /// `(type, polarity)` pairs on the current path.
    visiting: FxHashSet<(TypeId, bool)>,
    /// true = positive (covariant) position.
    polarity: bool,
}

impl<'a> VarianceVisitor<'a> {
    fn visit_with_polarity(&mut self, type_id: TypeId, polarity: bool) {
        if type_id.is_intrinsic() || !self.visiting.insert((type_id, polarity)) {
            return;
        }
        let saved = std::mem::replace(&mut self.polarity, polarity);
        self.visit_type(self.db, type_id);
        self.polarity = saved;
        self.visiting.remove(&(type_id, polarity));
    }

    fn visit_same(&mut self, type_id: TypeId) {
        self.visit_with_polarity(type_id, self.polarity);
    }

    fn visit_flipped(&mut self, type_id: TypeId) {
        self.visit_with_polarity(type_id, !self.polarity);
    }

    /// Every occurrence below counts in both directions.
    fn visit_invariant(&mut self, type_id: TypeId) {
        self.visit_with_polarity(type_id, true);
        self.visit_with_polarity(type_id, false);
    }
}

impl<'a> TypeVisitor for VarianceVisitor<'a> {
    type Output = ();

    fn default_output() -> Self::Output {}

    fn visit_intrinsic(&mut self, _kind: IntrinsicKind) {}

    fn visit_literal(&mut self, _value: &LiteralValue) {}

    fn visit_type_ref(&mut self, name: Atom) {
        if name == self.param {
            self.result |= if self.polarity {
                Variance::COVARIANT
            } else {
                Variance::CONTRAVARIANT
            };
        }
    }

    fn visit_object(&mut self, shape: &ObjectShape) {
        for prop in &shape.properties {
            self.visit_same(prop.type_id);
        }
        if let Some(index) = &shape.index {
            self.visit_same(index.value_type);
        }
    }

    fn visit_union(&mut self, members: &[TypeId]) {
        for &member in members {
            self.visit_same(member);
        }
    }

    fn visit_intersection(&mut self, members: &[TypeId]) {
        for &member in members {
            self.visit_same(member);
        }
    }

    fn visit_array(&mut self, element_type: TypeId) {
        self.visit_same(element_type);
    }

    fn visit_tuple(&mut self, elements: &[TupleElement]) {
        for element in elements {
            self.visit_same(element.type_id);
        }
    }

    fn visit_function(&mut self, shape: &FunctionShape) {
        for param in &shape.params {
            self.visit_flipped(param.type_id);
        }
        if let Some(rest) = shape.rest {
            self.visit_flipped(rest);
        }
        self.visit_same(shape.return_type);
    }

    fn visit_application(&mut self, app: &TypeApplication) {
        for &arg in &app.args {
            self.visit_invariant(arg);
        }
    }

    fn visit_conditional(&mut self, cond: &ConditionalType) {
        if cond.infer_slots.contains(&self.param) {
            self.visit_invariant(cond.check_type);
            self.visit_same(cond.false_type);
            return;
        }
        self.visit_invariant(cond.check_type);
        self.visit_invariant(cond.extends_type);
        self.visit_same(cond.true_type);
        self.visit_same(cond.false_type);
    }

    fn visit_mapped(&mut self, mapped: &MappedType) {
        self.visit_invariant(mapped.constraint);
        if mapped.type_param == self.param {
            return;
        }
        if let Some(name_type) = mapped.name_type {
            self.visit_invariant(name_type);
        }
        self.visit_same(mapped.template);
    }

    fn visit_template_literal(&mut self, spans: &[TemplateSpan]) {
        for span in spans {
            if let TemplateSpan::Type(t) = span {
                self.visit_same(*t);
            }
        }
    }

    fn visit_string_intrinsic(&mut self, _kind: StringIntrinsicKind, type_arg: TypeId) {
        self.visit_same(type_arg);
    }

    fn visit_index_access(&mut self, object_type: TypeId, key_type: TypeId) {
        self.visit_invariant(object_type);
        self.visit_invariant(key_type);
    }

    fn visit_keyof(&mut self, type_id: TypeId) {
        self.visit_flipped(type_id);
    }
}

#[cfg(test)]
#[path = "../tests/variance_tests.rs"]
mod tests;
