use std::sync::Arc;

use indexmap::IndexMap;

use crate::arena::{EntityId, ScopeId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScopeFlags {
    pub is_global: bool,
    pub is_file: bool,
    /// Opened by a procedure signature. Lookups that cross it may not see
    /// the enclosing procedure's variables.
    pub is_proc: bool,
}

impl ScopeFlags {
    pub const GLOBAL: Self = Self {
        is_global: true,
        is_file: false,
        is_proc: false,
    };
    pub const FILE: Self = Self {
        is_global: false,
        is_file: true,
        is_proc: false,
    };
    pub const PROC: Self = Self {
        is_global: false,
        is_file: false,
        is_proc: true,
    };
}

/// A lexical environment. Elements keep insertion order so the global
/// table can be enumerated the way it was declared.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub elements: IndexMap<Arc<str>, EntityId>,
    pub flags: ScopeFlags,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, flags: ScopeFlags) -> Self {
        Self {
            parent,
            children: Vec::new(),
            elements: IndexMap::new(),
            flags,
        }
    }

    pub fn lookup_local(&self, name: &str) -> Option<EntityId> {
        self.elements.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(|k| &**k)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
