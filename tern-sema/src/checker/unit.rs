use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tern_ast::{Block, Expr, Ident, NodeId, Pos, ProcDecl, Token};

use crate::arena::{EntityId, Lookup, ScopeId, Store, TypeId};
use crate::config::CheckerConfig;
use crate::error::{CheckResult, ErrorCollector, ErrorKind, SemanticError};
use crate::info::CheckerInfo;
use crate::operand::Operand;
use crate::scope::ScopeFlags;
use crate::types::type_to_string;
use crate::universe::Universe;

use super::context::CheckerContext;

/// `#link_name` symbols claimed so far, across every unit.
pub(crate) type LinkNames = Mutex<HashMap<Arc<str>, Pos>>;

/// State every unit sees. Only the collector and the link-name table are
/// written to.
#[derive(Clone, Copy)]
pub(crate) struct Env<'s> {
    pub errors: &'s ErrorCollector,
    pub universe: &'s Universe,
    pub config: &'s CheckerConfig,
    pub link_names: &'s LinkNames,
}

/// Everything needed to check one entity's declaration later, out of order.
#[derive(Clone, Debug)]
pub(crate) struct DeclInfo<'a> {
    pub scope: ScopeId,
    /// Entities sharing this declaration, e.g. `a, b := f()`.
    pub entities: Vec<EntityId>,
    pub type_expr: Option<&'a Expr>,
    pub init_exprs: &'a [Expr],
    pub proc_decl: Option<&'a ProcDecl>,
}

/// A procedure body waiting to be checked.
#[derive(Clone, Debug)]
pub(crate) struct ProcBody<'a> {
    pub entity: EntityId,
    pub decl: &'a ProcDecl,
    /// Signature scope holding the parameters.
    pub scope: ScopeId,
    pub ty: TypeId,
    pub body: &'a Block,
}

/// One unit of checking work: the file-level pass, or one procedure body
/// job. `'s` borrows the arena, `'a` the syntax trees.
pub(crate) struct Unit<'s, 'a> {
    pub store: Store<'s>,
    pub env: Env<'s>,
    pub info: CheckerInfo,
    pub ctx: CheckerContext,
    pub decls: HashMap<EntityId, DeclInfo<'a>>,
    /// Declarations already entered by block hoisting.
    pub hoisted: HashSet<NodeId>,
    pub in_progress: Vec<EntityId>,
    pub worklist: Vec<ProcBody<'a>>,
    /// Foreign procedures by external name. Only file-level declarations
    /// land here, so only the file-level unit fills it.
    pub foreigns: HashMap<Arc<str>, EntityId>,
    pub files: IndexMap<Arc<str>, ScopeId>,
    pub imports: Vec<EntityId>,
}

pub(crate) struct UnitOutput<'a> {
    pub info: CheckerInfo,
    pub worklist: Vec<ProcBody<'a>>,
    pub files: IndexMap<Arc<str>, ScopeId>,
    pub imports: Vec<EntityId>,
}

impl<'s, 'a> Unit<'s, 'a> {
    pub fn new(store: Store<'s>, env: Env<'s>, scope: ScopeId) -> Self {
        Self {
            store,
            env,
            info: CheckerInfo::default(),
            ctx: CheckerContext::new(scope),
            decls: HashMap::new(),
            hoisted: HashSet::new(),
            in_progress: Vec::new(),
            worklist: Vec::new(),
            foreigns: HashMap::new(),
            files: IndexMap::new(),
            imports: Vec::new(),
        }
    }

    pub fn finish(self) -> UnitOutput<'a> {
        UnitOutput {
            info: self.info,
            worklist: self.worklist,
            files: self.files,
            imports: self.imports,
        }
    }

    pub fn error(&self, kind: ErrorKind, token: &Token, message: impl Into<String>) -> CheckResult<()> {
        self.env.errors.report(SemanticError::error(kind, token, message))
    }

    pub fn warn(&self, kind: ErrorKind, token: &Token, message: impl Into<String>) {
        self.env.errors.warn(SemanticError::warning(kind, token, message));
    }

    pub fn type_name(&self, ty: TypeId) -> String {
        type_to_string(&self.store, ty)
    }

    /// Opens a child of the current scope, recorded against `node`.
    pub fn open_scope(&mut self, node: Option<NodeId>, flags: ScopeFlags) -> ScopeId {
        let scope = self.store.open_scope(Some(self.ctx.scope), flags);
        if let Some(node) = node {
            self.info.scopes.insert(node, scope);
        }
        scope
    }

    /// Inserts `entity` into `scope`, reporting a redeclaration on collision.
    /// Returns whether the entity went in.
    pub fn add_entity(
        &mut self,
        scope: ScopeId,
        ident: Option<&Ident>,
        entity: EntityId,
    ) -> CheckResult<bool> {
        if let Some(prev) = self.store.insert(scope, entity) {
            let token = self.store.entity(entity).token.clone();
            let prev = self.store.entity(prev);
            let message = match prev.using_parent {
                Some(parent) => {
                    let parent = self.store.entity(parent);
                    format!(
                        "Redeclaration of `{}` in this scope through `using {}`\n\tat {}",
                        token.text,
                        parent.name(),
                        parent.token.pos
                    )
                }
                None => format!(
                    "Redeclaration of `{}` in this scope\n\tat {}",
                    token.text, prev.token.pos
                ),
            };
            self.error(ErrorKind::Redeclaration, &token, message)?;
            return Ok(false);
        }
        if let Some(ident) = ident {
            self.info.definitions.insert(ident.id, entity);
        }
        Ok(true)
    }

    pub fn record(&mut self, node: NodeId, operand: &Operand) {
        self.info.types.insert(node, operand.type_and_value());
    }
}
