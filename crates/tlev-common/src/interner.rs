//! Interned names and literal text.
//!
//! Property names, string literals, alias names and template text are all
//! stored once in an [`AtomTable`] and passed around as [`Atom`] handles, so
//! interned type keys stay `Copy` and name comparison is an integer compare.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Handle to a string in an [`AtomTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// The empty string. Always slot 0.
    pub const NONE: Atom = Atom(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Spellings interned up front: tuple keys and the usual parameter names.
const PRELOADED: &[&str] = &[
    "length", "0", "1", "2", "3", "T", "U", "K", "P", "R", "V", "S", "undefined", "null", "true",
    "false",
];

/// Concurrent string table.
///
/// Lookups by text go through a `DashMap`; resolution by atom reads an
/// append-only list, so resolving never contends with other resolvers.
pub struct AtomTable {
    ids: DashMap<Arc<str>, Atom, FxBuildHasher>,
    strings: RwLock<Vec<Arc<str>>>,
}

impl AtomTable {
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        let ids = DashMap::with_hasher(FxBuildHasher);
        ids.insert(empty.clone(), Atom::NONE);
        AtomTable {
            ids,
            strings: RwLock::new(vec![empty]),
        }
    }

    /// A table with the common spellings already present.
    pub fn preloaded() -> Self {
        let table = Self::new();
        for text in PRELOADED {
            table.intern(text);
        }
        table
    }

    pub fn intern(&self, text: &str) -> Atom {
        if let Some(atom) = self.lookup(text) {
            return atom;
        }
        self.insert(Arc::from(text))
    }

    /// Like [`intern`](Self::intern) but reuses the buffer for a new entry.
    pub fn intern_owned(&self, text: String) -> Atom {
        if let Some(atom) = self.lookup(&text) {
            return atom;
        }
        self.insert(Arc::from(text))
    }

    fn insert(&self, text: Arc<str>) -> Atom {
        // The entry guard serializes racing inserts of the same text.
        *self.ids.entry(text.clone()).or_insert_with(|| {
            let mut strings = self.strings.write().expect("atom table lock poisoned");
            let atom = Atom(strings.len() as u32);
            strings.push(text);
            atom
        })
    }

    pub fn lookup(&self, text: &str) -> Option<Atom> {
        self.ids.get(text).map(|entry| *entry)
    }

    /// Text for `atom`, or `""` for an atom from another table.
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        self.try_resolve(atom).unwrap_or_else(|| Arc::from(""))
    }

    pub fn try_resolve(&self, atom: Atom) -> Option<Arc<str>> {
        let strings = self.strings.read().expect("atom table lock poisoned");
        strings.get(atom.0 as usize).cloned()
    }

    /// Entry count, counting the empty string.
    pub fn len(&self) -> usize {
        self.strings.read().expect("atom table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}
