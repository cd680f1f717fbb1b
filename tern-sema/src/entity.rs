use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tern_ast::{NodeId, ProcTags, Token};

use crate::arena::{EntityId, ScopeId, TypeId};
use crate::universe::BuiltinId;
use crate::value::ConstValue;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Variable {
    /// Set while the declaration is being checked; re-entry means a cycle.
    pub visited: bool,
    /// Promoted into a scope through `using`.
    pub anonymous: bool,
    pub field: bool,
    pub param: bool,
    pub field_index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Procedure {
    /// Signature scope holding the parameters.
    pub scope: Option<ScopeId>,
    pub tags: ProcTags,
    pub foreign_name: Option<Arc<str>>,
    pub link_name: Option<Arc<str>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportName {
    pub path: Arc<str>,
    pub name: Arc<str>,
    pub scope: ScopeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImplicitId {
    Context,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    Constant { value: Option<ConstValue> },
    Variable(Variable),
    TypeName,
    Procedure(Procedure),
    Builtin(BuiltinId),
    ImportName(ImportName),
    ImplicitValue {
        id: ImplicitId,
        backing: Option<EntityId>,
    },
    Nil,
}

/// A declared symbol.
#[derive(Debug)]
pub struct Entity {
    pub kind: EntityKind,
    /// Scope the entity was first inserted into.
    pub scope: Option<ScopeId>,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub ident: Option<NodeId>,
    /// The variable whose members contributed this entity via `using`.
    pub using_parent: Option<EntityId>,
    used: AtomicBool,
}

impl Entity {
    pub fn new(kind: EntityKind, token: Token, ident: Option<NodeId>) -> Self {
        Self {
            kind,
            scope: None,
            token,
            ty: None,
            ident,
            using_parent: None,
            used: AtomicBool::new(false),
        }
    }

    pub fn with_type(mut self, ty: TypeId) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn variable(token: Token, ident: Option<NodeId>) -> Self {
        Self::new(EntityKind::Variable(Variable::default()), token, ident)
    }

    pub fn name(&self) -> &str {
        &self.token.text
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }

    pub fn mark_used(&self) {
        self.used.store(true, Ordering::Relaxed);
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EntityKind::Constant { .. } => "constant",
            EntityKind::Variable(_) => "variable",
            EntityKind::TypeName => "type name",
            EntityKind::Procedure(_) => "procedure",
            EntityKind::Builtin(_) => "builtin",
            EntityKind::ImportName(_) => "import name",
            EntityKind::ImplicitValue { .. } => "implicit value",
            EntityKind::Nil => "nil",
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            EntityKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut Variable> {
        match &mut self.kind {
            EntityKind::Variable(v) => Some(v),
            _ => None,
        }
    }
}
