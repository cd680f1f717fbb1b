use crate::entity::Entity;
use crate::scope::{Scope, ScopeFlags};
use crate::types::Type;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            pub(crate) slab: u32,
            pub(crate) index: u32,
        }

        impl $name {
            pub fn slab(self) -> u32 {
                self.slab
            }
        }
    };
}

handle!(
    /// Handle to a [`Scope`] in the arena.
    ScopeId
);
handle!(
    /// Handle to an [`Entity`] in the arena.
    EntityId
);
handle!(
    /// Handle to a [`Type`] in the arena. Basic types sit at fixed indices
    /// of slab 0.
    TypeId
);

/// One contiguous allocation region. Slab 0 holds the universe and every
/// file-level object; each procedure-body job fills a slab of its own.
#[derive(Debug)]
pub struct Slab {
    id: u32,
    scopes: Vec<Scope>,
    entities: Vec<Entity>,
    types: Vec<Type>,
    // (frozen parent, local child) links applied on merge.
    adopted: Vec<(ScopeId, ScopeId)>,
}

impl Slab {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            scopes: Vec::new(),
            entities: Vec::new(),
            types: Vec::new(),
            adopted: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Read access to scopes, entities and types regardless of which slab
/// they were allocated in.
pub trait Lookup {
    fn scope(&self, id: ScopeId) -> &Scope;
    fn entity(&self, id: EntityId) -> &Entity;
    fn ty(&self, id: TypeId) -> &Type;

    /// Walks the parent chain outward and returns the first match together
    /// with the scope it was found in.
    fn lookup(&self, scope: ScopeId, name: &str) -> Option<(EntityId, ScopeId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(e) = s.lookup_local(name) {
                return Some((e, id));
            }
            current = s.parent;
        }
        None
    }
}

/// Owner of every slab. Dropping it frees the whole scope/entity graph.
#[derive(Debug)]
pub struct Arena {
    pub(crate) slabs: Vec<Slab>,
}

impl Arena {
    pub fn new(universe: Slab) -> Self {
        Self {
            slabs: vec![universe],
        }
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Appends a job slab. Slabs must arrive in id order.
    pub(crate) fn absorb(&mut self, mut slab: Slab) {
        debug_assert_eq!(slab.id as usize, self.slabs.len());
        let adopted = std::mem::take(&mut slab.adopted);
        self.slabs.push(slab);
        for (parent, child) in adopted {
            self.slabs[parent.slab as usize].scopes[parent.index as usize]
                .children
                .push(child);
        }
    }
}

impl Lookup for Arena {
    fn scope(&self, id: ScopeId) -> &Scope {
        &self.slabs[id.slab as usize].scopes[id.index as usize]
    }

    fn entity(&self, id: EntityId) -> &Entity {
        &self.slabs[id.slab as usize].entities[id.index as usize]
    }

    fn ty(&self, id: TypeId) -> &Type {
        &self.slabs[id.slab as usize].types[id.index as usize]
    }
}

/// A read-only view of the frozen slabs plus one slab this unit may write.
pub struct Store<'a> {
    frozen: &'a [Slab],
    local: &'a mut Slab,
}

impl<'a> Store<'a> {
    pub fn new(frozen: &'a [Slab], local: &'a mut Slab) -> Self {
        Self { frozen, local }
    }

    /// A store over a single slab with nothing frozen.
    pub fn detached(local: &'a mut Slab) -> Self {
        Self {
            frozen: Default::default(),
            local,
        }
    }

    fn slab(&self, id: u32) -> &Slab {
        if id == self.local.id {
            &*self.local
        } else {
            &self.frozen[id as usize]
        }
    }

    pub fn is_local(&self, slab: u32) -> bool {
        slab == self.local.id
    }

    pub fn new_type(&mut self, ty: Type) -> TypeId {
        let index = self.local.types.len() as u32;
        self.local.types.push(ty);
        TypeId {
            slab: self.local.id,
            index,
        }
    }

    pub fn new_entity(&mut self, entity: Entity) -> EntityId {
        let index = self.local.entities.len() as u32;
        self.local.entities.push(entity);
        EntityId {
            slab: self.local.id,
            index,
        }
    }

    /// Opens a scope under `parent`. The global scope does not track its
    /// children; a parent living in a frozen slab learns about the child
    /// when this slab is merged.
    pub fn open_scope(&mut self, parent: Option<ScopeId>, flags: ScopeFlags) -> ScopeId {
        let index = self.local.scopes.len() as u32;
        self.local.scopes.push(Scope::new(parent, flags));
        let id = ScopeId {
            slab: self.local.id,
            index,
        };
        if let Some(parent) = parent {
            if !self.scope(parent).flags.is_global {
                if self.is_local(parent.slab) {
                    self.local.scopes[parent.index as usize].children.push(id);
                } else {
                    self.local.adopted.push((parent, id));
                }
            }
        }
        id
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        if id.slab == self.local.id {
            Some(&mut self.local.scopes[id.index as usize])
        } else {
            None
        }
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if id.slab == self.local.id {
            Some(&mut self.local.entities[id.index as usize])
        } else {
            tracing::warn!(?id, "attempt to mutate an entity in a frozen slab");
            None
        }
    }

    pub fn ty_mut(&mut self, id: TypeId) -> Option<&mut Type> {
        if id.slab == self.local.id {
            Some(&mut self.local.types[id.index as usize])
        } else {
            tracing::warn!(?id, "attempt to mutate a type in a frozen slab");
            None
        }
    }

    /// Inserts `entity` under its own name. On collision the existing entity
    /// is returned and nothing changes. The discard name is never inserted.
    pub fn insert(&mut self, scope: ScopeId, entity: EntityId) -> Option<EntityId> {
        let name = self.entity(entity).token.text.clone();
        if &*name == "_" {
            return None;
        }
        if let Some(prev) = self.scope(scope).lookup_local(&name) {
            return Some(prev);
        }
        let Some(s) = self.scope_mut(scope) else {
            tracing::warn!(?scope, name = %name, "attempt to insert into a frozen scope");
            return None;
        };
        s.elements.insert(name.clone(), entity);
        tracing::trace!(name = %name, ?scope, "inserted entity");

        let owning_unset = self.entity(entity).scope.is_none();
        if owning_unset && self.is_local(entity.slab) {
            if let Some(e) = self.entity_mut(entity) {
                e.scope = Some(scope);
            }
        }
        None
    }

    /// Sets an entity's type unless it already has one.
    pub fn set_entity_type(&mut self, id: EntityId, ty: TypeId) {
        if self.entity(id).ty.is_some() {
            return;
        }
        if let Some(e) = self.entity_mut(id) {
            e.ty = Some(ty);
        }
    }
}

impl Lookup for Store<'_> {
    fn scope(&self, id: ScopeId) -> &Scope {
        &self.slab(id.slab).scopes[id.index as usize]
    }

    fn entity(&self, id: EntityId) -> &Entity {
        &self.slab(id.slab).entities[id.index as usize]
    }

    fn ty(&self, id: TypeId) -> &Type {
        &self.slab(id.slab).types[id.index as usize]
    }
}
