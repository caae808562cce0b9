//! Shared memo of alias expansions.
//!
//! Keyed by `(DefId, argument fingerprint, mode)`. The fingerprint is the
//! interned id of the canonical application node, so two structurally equal
//! argument lists always share an entry. Only completed, successful
//! expansions that did not observe an in-flight sibling are stored.

use crate::def::DefId;
use crate::types::TypeId;
use dashmap::DashMap;
use tlev_common::limits::EXPANSION_CACHE_CAPACITY;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExpansionKey {
    pub def: DefId,
    pub fingerprint: TypeId,
    pub mode: u64,
}

/// Concurrent expansion cache shared by every evaluation of one engine.
pub struct ExpansionCache {
    entries: DashMap<ExpansionKey, TypeId>,
    capacity: usize,
}

impl Default for ExpansionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpansionCache {
    pub fn new() -> Self {
        Self::with_capacity(EXPANSION_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ExpansionCache {
            entries: DashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &ExpansionKey) -> Option<TypeId> {
        let hit = self.entries.get(key).map(|entry| *entry);
        if hit.is_some() {
            trace!(def = %key.def, fingerprint = key.fingerprint.0, "expansion cache hit");
        }
        hit
    }

    pub fn insert(&self, key: ExpansionKey, result: TypeId) {
        if self.entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "expansion cache full, clearing");
            self.entries.clear();
        }
        self.entries.insert(key, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
