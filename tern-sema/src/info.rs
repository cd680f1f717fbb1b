use std::collections::HashMap;

use tern_ast::NodeId;

use crate::arena::{EntityId, ScopeId};
use crate::operand::TypeAndValue;

/// Per-node results handed to later compiler stages.
#[derive(Debug, Default)]
pub struct CheckerInfo {
    pub types: HashMap<NodeId, TypeAndValue>,
    /// Identifiers that introduce an entity.
    pub definitions: HashMap<NodeId, EntityId>,
    /// Identifiers that refer to an entity.
    pub uses: HashMap<NodeId, EntityId>,
    pub scopes: HashMap<NodeId, ScopeId>,
}

impl CheckerInfo {
    pub fn merge(&mut self, other: CheckerInfo) {
        self.types.extend(other.types);
        self.definitions.extend(other.definitions);
        self.uses.extend(other.uses);
        self.scopes.extend(other.scopes);
    }

    pub fn entity_of_identifier(&self, id: NodeId) -> Option<EntityId> {
        self.definitions
            .get(&id)
            .or_else(|| self.uses.get(&id))
            .copied()
    }
}
