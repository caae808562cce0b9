//! Inference variables for `infer` slots and call-site type parameters.
//!
//! Uses the `ena` crate's union-find table. Each slot gets an
//! `InferenceVar`; the value attached to its root collects candidate types
//! tagged with the polarity of the position they were found in. Unifying
//! two variables concatenates their candidate lists.
//!
//! Merging the candidates into a single binding needs the subtype relation
//! and lives with the pattern matcher in `evaluate_rules::infer_pattern`.

use crate::types::TypeId;
use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use smallvec::SmallVec;
use tlev_common::interner::Atom;

/// Position polarity during a structural walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Return types, property reads, array and tuple elements.
    Covariant,
    /// Function parameters.
    Contravariant,
}

impl Polarity {
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Polarity::Covariant => Polarity::Contravariant,
            Polarity::Contravariant => Polarity::Covariant,
        }
    }
}

/// An inference variable standing for one slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InferenceVar(pub u32);

/// Candidates collected for a variable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InferenceValue {
    pub covariant: SmallVec<[TypeId; 4]>,
    pub contravariant: SmallVec<[TypeId; 2]>,
}

impl InferenceValue {
    pub fn is_empty(&self) -> bool {
        self.covariant.is_empty() && self.contravariant.is_empty()
    }

    fn push(&mut self, ty: TypeId, polarity: Polarity) {
        match polarity {
            Polarity::Covariant if !self.covariant.contains(&ty) => self.covariant.push(ty),
            Polarity::Contravariant if !self.contravariant.contains(&ty) => {
                self.contravariant.push(ty)
            }
            _ => {}
        }
    }
}

impl UnifyKey for InferenceVar {
    type Value = InferenceValue;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        InferenceVar(u)
    }

    fn tag() -> &'static str {
        "InferenceVar"
    }
}

impl UnifyValue for InferenceValue {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, Self::Error> {
        let mut merged = a.clone();
        for &ty in &b.covariant {
            merged.push(ty, Polarity::Covariant);
        }
        for &ty in &b.contravariant {
            merged.push(ty, Polarity::Contravariant);
        }
        Ok(merged)
    }
}

/// Inference state for one match or call site.
pub struct InferenceContext {
    table: InPlaceUnificationTable<InferenceVar>,
    /// Slots in declaration order.
    slots: Vec<(Atom, InferenceVar)>,
}

impl Default for InferenceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceContext {
    pub fn new() -> Self {
        InferenceContext {
            table: InPlaceUnificationTable::new(),
            slots: Vec::new(),
        }
    }

    pub fn with_slots(names: &[Atom]) -> Self {
        let mut ctx = Self::new();
        for &name in names {
            ctx.fresh_slot(name);
        }
        ctx
    }

    pub fn fresh_slot(&mut self, name: Atom) -> InferenceVar {
        if let Some(existing) = self.find_slot(name) {
            return existing;
        }
        let var = self.table.new_key(InferenceValue::default());
        self.slots.push((name, var));
        var
    }

    pub fn find_slot(&self, name: Atom) -> Option<InferenceVar> {
        self.slots
            .iter()
            .find(|(slot, _)| *slot == name)
            .map(|(_, var)| *var)
    }

    pub fn slot_names(&self) -> impl Iterator<Item = Atom> + '_ {
        self.slots.iter().map(|(name, _)| *name)
    }

    pub fn add_candidate(&mut self, var: InferenceVar, ty: TypeId, polarity: Polarity) {
        let mut value = InferenceValue::default();
        value.push(ty, polarity);
        self.table.union_value(var, value);
    }

    pub fn candidates(&mut self, var: InferenceVar) -> InferenceValue {
        self.table.probe_value(var)
    }

    /// Copy every candidate of `other` into the matching slots of `self`.
    pub fn absorb(&mut self, other: &mut InferenceContext) {
        let slots: Vec<(Atom, InferenceVar)> = other.slots.clone();
        for (name, other_var) in slots {
            let value = other.candidates(other_var);
            if value.is_empty() {
                continue;
            }
            let var = self.fresh_slot(name);
            self.table.union_value(var, value);
        }
    }
}

#[cfg(test)]
#[path = "../tests/infer_tests.rs"]
mod tests;
