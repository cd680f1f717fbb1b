//! File-level pass: open file scopes, enter every top-level declaration,
//! resolve imports, then check the globals in dependency-friendly order.

use std::path::Path;
use std::slice;
use std::sync::Arc;

use tern_ast::{ConstDecl, Decl, File, ImportDecl, ProcDecl, Stmt, Token, TypeDecl, VarDecl};
use tracing::{debug, instrument};

use crate::arena::{EntityId, Lookup, ScopeId, TypeId};
use crate::entity::{Entity, EntityKind, ImportName, Procedure};
use crate::error::{CheckResult, ErrorKind};
use crate::scope::ScopeFlags;

use super::unit::{DeclInfo, Unit};

/// Order in which file-level entities are checked.
fn check_rank(kind: &EntityKind) -> Option<u8> {
    match kind {
        EntityKind::TypeName => Some(0),
        EntityKind::Constant { .. } => Some(1),
        EntityKind::Procedure(_) => Some(2),
        EntityKind::Variable(_) => Some(3),
        _ => None,
    }
}

impl<'s, 'a> Unit<'s, 'a> {
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn check_globals(&mut self, files: &'a [File]) -> CheckResult<()> {
        let global = self.env.universe.scope;
        for file in files {
            let scope = self.store.open_scope(Some(global), ScopeFlags::FILE);
            self.files.insert(file.path.clone(), scope);
        }
        debug!(files = self.files.len(), "file scopes opened");

        let mut order = Vec::new();
        for file in files {
            let Some(&scope) = self.files.get(&file.path) else {
                continue;
            };
            self.ctx.scope = scope;
            for stmt in &file.decls {
                self.collect_file_decl(stmt, scope, &mut order)?;
            }
        }
        debug!(entities = order.len(), "collected file-level entities");

        for file in files {
            self.resolve_imports(file)?;
        }
        debug!(imports = self.imports.len(), "imports resolved");

        for rank in 0..4 {
            for &e in &order {
                if check_rank(&self.store.entity(e).kind) == Some(rank) {
                    self.check_entity_decl(e)?;
                }
            }
            debug!(rank, "globals checked");
        }
        debug!(bodies = self.worklist.len(), "procedure bodies queued");

        self.check_entry_point(files)
    }

    fn collect_file_decl(
        &mut self,
        stmt: &'a Stmt,
        scope: ScopeId,
        order: &mut Vec<EntityId>,
    ) -> CheckResult<()> {
        let Stmt::Decl(decl) = stmt else {
            return self.error(
                ErrorKind::InvalidDeclaration,
                stmt.token(),
                "Only declarations are allowed at file scope",
            );
        };
        match decl {
            Decl::Var(vd) => order.extend(self.declare_global_vars(vd, scope)?),
            Decl::Const(cd) => order.extend(self.declare_consts(cd, scope)?),
            Decl::Type(td) => order.push(self.declare_type(td, scope)?),
            Decl::Proc(pd) => order.push(self.declare_proc(pd, scope)?),
            Decl::Import(_) => {}
        }
        Ok(())
    }

    fn declare_global_vars(&mut self, vd: &'a VarDecl, scope: ScopeId) -> CheckResult<Vec<EntityId>> {
        if vd.is_using {
            self.error(
                ErrorKind::IllegalUsing,
                &vd.token,
                "`using` is not allowed on file scope variables",
            )?;
        }
        let entities: Vec<EntityId> = vd
            .names
            .iter()
            .map(|name| {
                self.store
                    .new_entity(Entity::variable(name.token.clone(), Some(name.id)))
            })
            .collect();
        let info = DeclInfo {
            scope,
            entities: entities.clone(),
            type_expr: vd.ty.as_ref(),
            init_exprs: &vd.values,
            proc_decl: None,
        };
        for (name, &e) in vd.names.iter().zip(&entities) {
            self.add_entity(scope, Some(name), e)?;
            self.decls.insert(e, info.clone());
        }
        Ok(entities)
    }

    /// Enters the constants of `cd`, each paired with its own initializer.
    pub(crate) fn declare_consts(&mut self, cd: &'a ConstDecl, scope: ScopeId) -> CheckResult<Vec<EntityId>> {
        if let Some(first) = cd.names.first() {
            self.hoisted.insert(first.id);
        }
        let mut entities = Vec::with_capacity(cd.names.len());
        for (i, name) in cd.names.iter().enumerate() {
            let e = self.store.new_entity(Entity::new(
                EntityKind::Constant { value: None },
                name.token.clone(),
                Some(name.id),
            ));
            let init_exprs = match cd.values.get(i) {
                Some(value) => slice::from_ref(value),
                None => {
                    self.error(
                        ErrorKind::ArityMismatch,
                        &name.token,
                        format!("Missing constant value for `{}`", name.name()),
                    )?;
                    &[]
                }
            };
            self.decls.insert(
                e,
                DeclInfo {
                    scope,
                    entities: vec![e],
                    type_expr: cd.ty.as_ref(),
                    init_exprs,
                    proc_decl: None,
                },
            );
            self.add_entity(scope, Some(name), e)?;
            entities.push(e);
        }
        if let Some(extra) = cd.values.get(cd.names.len()) {
            self.error(ErrorKind::ArityMismatch, &extra.token, "Extra initial expression")?;
        }
        Ok(entities)
    }

    pub(crate) fn declare_type(&mut self, td: &'a TypeDecl, scope: ScopeId) -> CheckResult<EntityId> {
        self.hoisted.insert(td.name.id);
        let e = self.store.new_entity(Entity::new(
            EntityKind::TypeName,
            td.name.token.clone(),
            Some(td.name.id),
        ));
        self.decls.insert(
            e,
            DeclInfo {
                scope,
                entities: vec![e],
                type_expr: Some(&td.ty),
                init_exprs: &[],
                proc_decl: None,
            },
        );
        self.add_entity(scope, Some(&td.name), e)?;
        Ok(e)
    }

    pub(crate) fn declare_proc(&mut self, pd: &'a ProcDecl, scope: ScopeId) -> CheckResult<EntityId> {
        let procedure = Procedure {
            scope: None,
            tags: pd.tags,
            foreign_name: pd.foreign_name.as_ref().map(|t| t.text.clone()),
            link_name: pd.link_name.as_ref().map(|t| t.text.clone()),
        };
        let e = self.store.new_entity(Entity::new(
            EntityKind::Procedure(procedure),
            pd.name.token.clone(),
            Some(pd.name.id),
        ));
        self.decls.insert(
            e,
            DeclInfo {
                scope,
                entities: vec![e],
                type_expr: None,
                init_exprs: &[],
                proc_decl: Some(pd),
            },
        );
        self.add_entity(scope, Some(&pd.name), e)?;
        Ok(e)
    }

    fn resolve_imports(&mut self, file: &'a File) -> CheckResult<()> {
        let Some(&scope) = self.files.get(&file.path) else {
            return Ok(());
        };
        for stmt in &file.decls {
            if let Stmt::Decl(Decl::Import(import)) = stmt {
                self.resolve_import(import, scope)?;
            }
        }
        Ok(())
    }

    fn resolve_import(&mut self, import: &ImportDecl, scope: ScopeId) -> CheckResult<()> {
        let path = import.path.text.clone();
        let Some(&target) = self.files.get(&path) else {
            return self.error(
                ErrorKind::InvalidDeclaration,
                &import.path,
                format!("Unable to find imported file `{path}`"),
            );
        };
        if target == scope {
            return self.error(
                ErrorKind::InvalidDeclaration,
                &import.path,
                "A file cannot import itself",
            );
        }

        let already = self.store.scope(scope).elements.values().any(|&e| {
            matches!(&self.store.entity(e).kind, EntityKind::ImportName(i) if i.scope == target)
        });
        if already {
            self.warn(
                ErrorKind::InvalidDeclaration,
                &import.token,
                "Multiple import of the same file within this scope",
            );
        }

        let token = match &import.name {
            Some(name) => name.token.clone(),
            None => {
                let stem = Path::new(&*path)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(&*path);
                Token::new(stem, import.path.pos.clone(), import.path.span)
            }
        };
        let name: Arc<str> = token.text.clone();
        let e = self.store.new_entity(
            Entity::new(
                EntityKind::ImportName(ImportName {
                    path,
                    name,
                    scope: target,
                }),
                token,
                import.name.as_ref().map(|n| n.id),
            )
            .with_type(TypeId::INVALID),
        );
        if self.add_entity(scope, import.name.as_ref(), e)? {
            self.imports.push(e);
        }
        Ok(())
    }

    fn check_entry_point(&mut self, files: &[File]) -> CheckResult<()> {
        let config = self.env.config;
        if !config.require_entry_point {
            return Ok(());
        }
        let found = self.files.values().any(|&scope| {
            self.store
                .scope(scope)
                .lookup_local(&config.entry_point)
                .is_some_and(|e| matches!(self.store.entity(e).kind, EntityKind::Procedure(_)))
        });
        if found {
            return Ok(());
        }
        let Some(first) = files.first() else {
            return Ok(());
        };
        let token = match first.decls.first() {
            Some(stmt) => stmt.token().clone(),
            None => Token::new(
                "",
                tern_ast::Pos {
                    file: first.path.clone(),
                    line: 1,
                    column: 1,
                },
                tern_ast::span(0, 0),
            ),
        };
        self.error(
            ErrorKind::InvalidDeclaration,
            &token,
            format!("Undefined entry point procedure `{}`", config.entry_point),
        )
    }
}
