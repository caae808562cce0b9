//! Named aliases.
//!
//! Types mention an alias only through `TypeData::Application { def, args }`
//! and never inline its body, which keeps self-referential aliases finite.
//! A recursive alias is built in two steps: [`DefinitionStore::declare`]
//! hands out the `DefId` its body will mention, then
//! [`DefinitionStore::define`] (or `set_body`) attaches the body.

use crate::subtype::TypeResolver;
use crate::types::{TypeId, TypeParamInfo};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tlev_common::interner::Atom;
use tracing::trace;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub u32);

impl DefId {
    /// Never handed out by a store.
    pub const INVALID: Self = Self(0);
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def#{}", self.0)
    }
}

/// A generic alias: name, parameters and, once defined, its body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasDef {
    pub name: Atom,
    pub type_params: Vec<TypeParamInfo>,
    /// `None` while declared but not yet defined.
    pub body: Option<TypeId>,
}

impl AliasDef {
    pub fn new(name: Atom, type_params: Vec<TypeParamInfo>, body: TypeId) -> Self {
        AliasDef {
            name,
            type_params,
            body: Some(body),
        }
    }
}

/// Alias table shared by every evaluation of an engine.
///
/// Re-registering a name shadows it for [`find_by_name`](Self::find_by_name)
/// only; applications already built keep their own `DefId`.
pub struct DefinitionStore {
    aliases: DashMap<DefId, Arc<AliasDef>>,
    names: DashMap<Atom, DefId>,
    last_id: AtomicU32,
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionStore {
    pub fn new() -> Self {
        DefinitionStore {
            aliases: DashMap::new(),
            names: DashMap::new(),
            last_id: AtomicU32::new(DefId::INVALID.0),
        }
    }

    pub fn register(&self, alias: AliasDef) -> DefId {
        let id = DefId(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
        trace!(def = %id, params = alias.type_params.len(), "register alias");
        self.names.insert(alias.name, id);
        self.aliases.insert(id, Arc::new(alias));
        id
    }

    pub fn declare(&self, name: Atom, type_params: Vec<TypeParamInfo>) -> DefId {
        self.register(AliasDef {
            name,
            type_params,
            body: None,
        })
    }

    pub fn set_body(&self, id: DefId, body: TypeId) {
        self.update(id, |alias| alias.body = Some(body));
    }

    /// Replace the parameters of a declared alias and attach its body.
    pub fn define(&self, id: DefId, type_params: Vec<TypeParamInfo>, body: TypeId) {
        self.update(id, |alias| {
            alias.type_params = type_params;
            alias.body = Some(body);
        });
    }

    fn update(&self, id: DefId, edit: impl FnOnce(&mut AliasDef)) {
        if let Some(mut slot) = self.aliases.get_mut(&id) {
            edit(Arc::make_mut(&mut *slot));
        }
    }

    pub fn get(&self, id: DefId) -> Option<Arc<AliasDef>> {
        self.aliases.get(&id).map(|slot| Arc::clone(&slot))
    }

    pub fn get_body(&self, id: DefId) -> Option<TypeId> {
        self.aliases.get(&id)?.body
    }

    pub fn find_by_name(&self, name: Atom) -> Option<DefId> {
        self.names.get(&name).map(|slot| *slot)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl TypeResolver for DefinitionStore {
    fn resolve_alias(&self, def: DefId) -> Option<Arc<AliasDef>> {
        self.get(def)
    }

    fn alias_name(&self, def: DefId) -> Option<Atom> {
        self.aliases.get(&def).map(|slot| slot.name)
    }
}
