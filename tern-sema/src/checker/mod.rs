//! The semantic checker: a file-level pass over slab 0, then one job per
//! procedure body, each writing only to a slab of its own.

mod assign;
mod collect;
mod context;
mod decl;
mod expr;
mod stmt;
mod typexpr;
mod unit;
mod using;

use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use tern_ast::{File, NodeId};
use tracing::{debug, info, instrument};

use crate::arena::{Arena, EntityId, Lookup, ScopeId, Slab, Store, TypeId};
use crate::config::CheckerConfig;
use crate::entity::{Entity, EntityKind};
use crate::error::{CheckResult, ErrorCollector, ErrorKind, SemanticError, TooManyErrors};
use crate::info::CheckerInfo;
use crate::operand::TypeAndValue;
use crate::scope::Scope;
use crate::types::{Type, type_to_string};
use crate::universe::Universe;

use self::unit::{Env, LinkNames, ProcBody, Unit};

/// What one procedure-body job hands back.
struct JobOutcome {
    slab: Slab,
    info: CheckerInfo,
    result: CheckResult<()>,
}

fn run_job(frozen: &[Slab], env: Env<'_>, slab_id: u32, body: ProcBody<'_>) -> JobOutcome {
    let mut slab = Slab::new(slab_id);
    let (info, result) = {
        let mut unit = Unit::new(Store::new(frozen, &mut slab), env, body.scope);
        let result = unit
            .check_proc_body(&body)
            .and_then(|()| unit.drain_worklist());
        (unit.finish().info, result)
    };
    JobOutcome { slab, info, result }
}

/// Checks a set of parsed files and answers queries about the result.
pub struct Checker {
    config: CheckerConfig,
    arena: Arena,
    universe: Universe,
    errors: ErrorCollector,
    info: CheckerInfo,
    file_scopes: IndexMap<Arc<str>, ScopeId>,
    imports: Vec<EntityId>,
    link_names: LinkNames,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    pub fn with_config(config: CheckerConfig) -> Self {
        let mut slab = Slab::new(0);
        let universe = Universe::build(&mut slab);
        Self {
            errors: ErrorCollector::new(config.error_cap),
            config,
            arena: Arena::new(slab),
            universe,
            info: CheckerInfo::default(),
            file_scopes: IndexMap::new(),
            imports: Vec::new(),
            link_names: LinkNames::default(),
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Checks `files` as one program. Every error is also kept in
    /// [`Checker::diagnostics`]; `Err` only means the error cap was hit.
    #[instrument(skip_all, fields(files = files.len(), parallel = self.config.parallel))]
    pub fn check_files(&mut self, files: &[File]) -> Result<(), TooManyErrors> {
        *self = Self::with_config(self.config.clone());

        let (worklist, result) = {
            let env = Env {
                errors: &self.errors,
                universe: &self.universe,
                config: &self.config,
                link_names: &self.link_names,
            };
            let mut unit = Unit::new(
                Store::detached(&mut self.arena.slabs[0]),
                env,
                self.universe.scope,
            );
            let result = unit.check_globals(files);
            let output = unit.finish();
            self.info.merge(output.info);
            self.file_scopes = output.files;
            self.imports = output.imports;
            (output.worklist, result)
        };
        result?;

        let outcomes = self.check_bodies(worklist);
        let mut first_err = None;
        for outcome in outcomes {
            self.arena.absorb(outcome.slab);
            self.info.merge(outcome.info);
            if let Err(e) = outcome.result {
                first_err.get_or_insert(e);
            }
        }
        debug!(slabs = self.arena.slab_count(), "slabs merged");
        if let Some(e) = first_err {
            return Err(e);
        }

        self.warn_unused_imports();
        info!(
            errors = self.errors.error_count(),
            slabs = self.arena.slab_count(),
            "check finished"
        );
        Ok(())
    }

    fn check_bodies(&self, worklist: Vec<ProcBody<'_>>) -> Vec<JobOutcome> {
        let frozen: &[Slab] = &self.arena.slabs;
        let base = frozen.len() as u32;
        let env = Env {
            errors: &self.errors,
            universe: &self.universe,
            config: &self.config,
            link_names: &self.link_names,
        };
        debug!(
            bodies = worklist.len(),
            parallel = self.config.parallel,
            "checking procedure bodies"
        );

        let jobs = worklist
            .into_iter()
            .enumerate()
            .map(|(i, body)| (base + i as u32, body));
        if self.config.parallel {
            jobs.collect::<Vec<_>>()
                .into_par_iter()
                .map(|(id, body)| run_job(frozen, env, id, body))
                .collect()
        } else {
            let mut outcomes = Vec::new();
            for (id, body) in jobs {
                let outcome = run_job(frozen, env, id, body);
                let fatal = outcome.result.is_err();
                outcomes.push(outcome);
                if fatal {
                    break;
                }
            }
            outcomes
        }
    }

    fn warn_unused_imports(&self) {
        if !self.config.warn_unused_imports {
            return;
        }
        for &e in &self.imports {
            let entity = self.arena.entity(e);
            if !entity.is_used() {
                self.errors.warn(SemanticError::warning(
                    ErrorKind::UnusedImport,
                    &entity.token,
                    format!("Unused import name: {}", entity.name()),
                ));
            }
        }
    }

    /// Errors and warnings, in report order.
    pub fn diagnostics(&self) -> Vec<SemanticError> {
        self.errors.diagnostics()
    }

    pub fn errors(&self) -> Vec<SemanticError> {
        self.diagnostics().into_iter().filter(|d| d.is_error()).collect()
    }

    pub fn warnings(&self) -> Vec<SemanticError> {
        self.diagnostics()
            .into_iter()
            .filter(|d| !d.is_error())
            .collect()
    }

    /// Errors reported, including ones not stored because they repeated a
    /// position.
    pub fn error_count(&self) -> usize {
        self.errors.error_count()
    }

    pub fn info(&self) -> &CheckerInfo {
        &self.info
    }

    pub fn global_scope(&self) -> ScopeId {
        self.universe.scope
    }

    pub fn file_scope(&self, path: &str) -> Option<ScopeId> {
        self.file_scopes.get(path).copied()
    }

    /// Scope opened by the node `id`: a block, a statement, a case clause,
    /// a procedure signature or body.
    pub fn scope_of(&self, id: NodeId) -> Option<ScopeId> {
        self.info.scopes.get(&id).copied()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        self.arena.scope(id)
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        self.arena.entity(id)
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        self.arena.ty(id)
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<EntityId> {
        self.arena.lookup(scope, name).map(|(e, _)| e)
    }

    pub fn entity_of_identifier(&self, id: NodeId) -> Option<EntityId> {
        self.info.entity_of_identifier(id)
    }

    /// Type recorded for an expression node, falling back to the type of
    /// the entity an identifier denotes.
    pub fn type_of_expression(&self, id: NodeId) -> Option<TypeId> {
        if let Some(TypeAndValue { ty, .. }) = self.info.types.get(&id) {
            return Some(*ty);
        }
        self.entity_of_identifier(id)
            .and_then(|e| self.arena.entity(e).ty)
    }

    pub fn type_to_string(&self, ty: TypeId) -> String {
        type_to_string(&self.arena, ty)
    }

    /// The constant value bound to a named constant, if it checked.
    pub fn constant_value(&self, e: EntityId) -> Option<&crate::value::ConstValue> {
        match &self.arena.entity(e).kind {
            EntityKind::Constant { value } => value.as_ref(),
            _ => None,
        }
    }
}
