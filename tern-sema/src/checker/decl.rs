use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::{instrument, trace};

use crate::arena::{EntityId, Lookup, TypeId};
use crate::entity::EntityKind;
use crate::error::{CheckResult, ErrorKind};
use crate::operand::{AddressingMode, Operand};
use crate::scope::ScopeFlags;
use crate::termination::is_terminating_list;
use crate::types::{Type, are_signatures_similar_enough, base_type, default_type, is_invalid};
use crate::universe::BuiltinId;

use super::context::{CheckerContext, StmtFlags};
use super::unit::{DeclInfo, ProcBody, Unit};

impl<'s, 'a> Unit<'s, 'a> {
    /// Checks a pending declaration on first demand. Entities that already
    /// carry a type, or that were declared in statement order, are done.
    pub fn check_entity_decl(&mut self, e: EntityId) -> CheckResult<()> {
        if self.store.entity(e).ty.is_some() {
            return Ok(());
        }
        let Some(decl) = self.decls.get(&e).cloned() else {
            return Ok(());
        };
        if self.in_progress.contains(&e) {
            let token = self.store.entity(e).token.clone();
            self.error(
                ErrorKind::CyclicDeclaration,
                &token,
                format!("Cyclic initialization of `{}`", token.text),
            )?;
            self.store.set_entity_type(e, TypeId::INVALID);
            return Ok(());
        }

        trace!(name = %self.store.entity(e).name(), "checking declaration");
        self.in_progress.push(e);
        let result = {
            let mut c = self.enter();
            c.ctx.scope = decl.scope;
            c.ctx.decl = Some(e);
            let kind = c.store.entity(e).kind.clone();
            match kind {
                EntityKind::Constant { .. } => c.check_const_decl(e, &decl),
                EntityKind::Variable(_) => c.check_var_decl(&decl),
                EntityKind::TypeName => c.check_type_decl(e, &decl),
                EntityKind::Procedure(_) => c.check_proc_decl(e, &decl),
                _ => Ok(()),
            }
        };
        self.in_progress.retain(|&x| x != e);
        result
    }

    pub(crate) fn check_var_decl(&mut self, decl: &DeclInfo<'a>) -> CheckResult<()> {
        let entities = &decl.entities;
        let revisited = entities.iter().any(|&e| {
            self.store
                .entity(e)
                .as_variable()
                .is_some_and(|v| v.visited)
        });
        if revisited {
            if let Some(&first) = entities.first() {
                let token = self.store.entity(first).token.clone();
                self.error(
                    ErrorKind::CyclicDeclaration,
                    &token,
                    format!("Cyclic initialization of `{}`", token.text),
                )?;
            }
            for &e in entities {
                self.store.set_entity_type(e, TypeId::INVALID);
            }
            return Ok(());
        }
        for &e in entities {
            if let Some(v) = self.store.entity_mut(e).and_then(|e| e.as_variable_mut()) {
                v.visited = true;
            }
        }

        if let Some(type_expr) = decl.type_expr {
            let ty = self.check_type(type_expr)?;
            for &e in entities {
                self.store.set_entity_type(e, ty);
            }
        }

        if decl.init_exprs.is_empty() {
            if decl.type_expr.is_none() {
                if let Some(&first) = entities.first() {
                    let token = self.store.entity(first).token.clone();
                    self.error(
                        ErrorKind::InvalidDeclaration,
                        &token,
                        "Missing type or initial expression",
                    )?;
                }
                for &e in entities {
                    self.store.set_entity_type(e, TypeId::INVALID);
                }
            }
            return Ok(());
        }

        let Some(&first) = entities.first() else {
            return Ok(());
        };
        let token = self.store.entity(first).token.clone();
        self.check_init_variables(entities, &token, decl.init_exprs, "variable declaration")
    }

    fn check_const_decl(&mut self, e: EntityId, decl: &DeclInfo<'a>) -> CheckResult<()> {
        if let Some(type_expr) = decl.type_expr {
            let ty = self.check_type(type_expr)?;
            self.store.set_entity_type(e, ty);
        }
        let Some(init) = decl.init_exprs.first() else {
            self.store.set_entity_type(e, TypeId::INVALID);
            return Ok(());
        };
        let mut operand = self.check_expr(init)?;
        self.check_init_constant(e, &mut operand, init)
    }

    fn check_init_constant(
        &mut self,
        e: EntityId,
        operand: &mut Operand,
        init: &tern_ast::Expr,
    ) -> CheckResult<()> {
        let declared = self.store.entity(e).ty;
        if operand.is_invalid()
            || is_invalid(&self.store, operand.ty)
            || declared.is_some_and(|t| is_invalid(&self.store, t))
        {
            self.store.set_entity_type(e, TypeId::INVALID);
            return Ok(());
        }
        if operand.mode != AddressingMode::Constant {
            self.error(
                ErrorKind::InvalidDeclaration,
                &init.token,
                format!("`{init}` is not a constant"),
            )?;
            self.store.set_entity_type(e, TypeId::INVALID);
            return Ok(());
        }

        let target = match declared {
            Some(t) => t,
            None => {
                let t = default_type(&self.store, operand.ty);
                self.store.set_entity_type(e, t);
                t
            }
        };
        self.check_assignment(operand, init, Some(target), "constant declaration")?;
        if operand.is_invalid() {
            return Ok(());
        }
        let value = operand.value.clone();
        if let Some(entity) = self.store.entity_mut(e) {
            if let EntityKind::Constant { value: slot } = &mut entity.kind {
                *slot = value;
            }
        }
        Ok(())
    }

    fn check_type_decl(&mut self, e: EntityId, decl: &DeclInfo<'a>) -> CheckResult<()> {
        let name: Arc<str> = self.store.entity(e).token.text.clone();
        let named = self.store.new_type(Type::Named {
            name,
            base: None,
            entity: e,
        });
        self.store.set_entity_type(e, named);

        let Some(type_expr) = decl.type_expr else {
            return Ok(());
        };
        let depth = self.ctx.indirection;
        self.ctx.type_path.push((e, depth));
        let checked = self.check_type_named(type_expr, Some(named))?;
        self.ctx.type_path.pop();

        let mut base = base_type(&self.store, checked);
        if matches!(self.store.ty(base), Type::Named { .. }) {
            base = TypeId::INVALID;
        }
        if let Some(Type::Named { base: slot, .. }) = self.store.ty_mut(named) {
            *slot = Some(base);
        }
        Ok(())
    }

    fn check_proc_decl(&mut self, e: EntityId, decl: &DeclInfo<'a>) -> CheckResult<()> {
        let Some(pd) = decl.proc_decl else {
            return Ok(());
        };
        let sig_scope = self.store.open_scope(Some(decl.scope), ScopeFlags::PROC);
        self.info.scopes.insert(pd.ty.id, sig_scope);
        let ty = {
            let mut c = self.enter();
            c.ctx.scope = sig_scope;
            c.check_proc_signature(&pd.ty, Some(sig_scope))?
        };
        self.store.set_entity_type(e, ty);
        if let Some(entity) = self.store.entity_mut(e) {
            if let EntityKind::Procedure(p) = &mut entity.kind {
                p.scope = Some(sig_scope);
            }
        }

        let flags = self.store.scope(decl.scope).flags;
        let file_level = flags.is_file || flags.is_global;
        let name = pd.name.name();

        if file_level && name == self.env.config.entry_point {
            if let Type::Proc { params, results } = self.store.ty(ty) {
                if !params.is_empty() || !results.is_empty() {
                    self.error(
                        ErrorKind::InvalidDeclaration,
                        &pd.name.token,
                        format!(
                            "Procedure type of `{name}` was expected to be `proc()`, got {}",
                            self.type_name(ty)
                        ),
                    )?;
                }
            }
        }

        if pd.tags.inline && pd.tags.no_inline {
            self.error(
                ErrorKind::InvalidDeclaration,
                &pd.ty.token,
                "You cannot apply both `inline` and `no_inline` to a procedure",
            )?;
        }
        if pd.tags.foreign && pd.link_name.is_some() {
            self.error(
                ErrorKind::InvalidDeclaration,
                &pd.ty.token,
                "You cannot apply both `foreign` and `link_name` to a procedure",
            )?;
        }

        if pd.tags.foreign {
            if !file_level {
                self.error(
                    ErrorKind::InvalidDeclaration,
                    &pd.token,
                    "Foreign procedures must be declared at file scope",
                )?;
            }
            if let Some(body) = &pd.body {
                self.error(
                    ErrorKind::InvalidDeclaration,
                    &body.open,
                    "A procedure tagged as `#foreign` cannot have a body",
                )?;
            }
            if !file_level {
                return Ok(());
            }
            let external: Arc<str> = match &pd.foreign_name {
                Some(t) => t.text.clone(),
                None => pd.name.token.text.clone(),
            };
            match self.foreigns.get(&external) {
                Some(&prev) => {
                    let prev = self.store.entity(prev);
                    let prev_ty = prev.ty.unwrap_or(TypeId::INVALID);
                    if !are_signatures_similar_enough(&self.store, ty, prev_ty) {
                        let pos = prev.token.pos.clone();
                        self.error(
                            ErrorKind::Redeclaration,
                            &pd.token,
                            format!(
                                "Redeclaration of foreign procedure `{external}` with different type signatures\n\tat {pos}"
                            ),
                        )?;
                    }
                }
                None => {
                    self.foreigns.insert(external, e);
                }
            }
            return Ok(());
        }

        if let Some(link) = &pd.link_name {
            let other = match self.env.link_names.lock().entry(link.text.clone()) {
                Entry::Occupied(claimed) => Some(claimed.get().clone()),
                Entry::Vacant(slot) => {
                    slot.insert(pd.name.token.pos.clone());
                    None
                }
            };
            if let Some(pos) = other {
                self.error(
                    ErrorKind::Redeclaration,
                    link,
                    format!(
                        "Non unique #link_name for procedure `{}`\n\tother at {pos}",
                        link.text
                    ),
                )?;
            }
        }

        match &pd.body {
            Some(body) => self.worklist.push(ProcBody {
                entity: e,
                decl: pd,
                scope: sig_scope,
                ty,
                body,
            }),
            None => self.error(
                ErrorKind::InvalidDeclaration,
                &pd.token,
                format!("Procedure `{name}` has no body; only a procedure tagged as `#foreign` can have no body"),
            )?,
        }
        Ok(())
    }

    /// Checks one procedure body in a fresh context rooted at a new scope
    /// under the signature scope.
    #[instrument(skip_all, fields(name = %body.decl.name.name()))]
    pub fn check_proc_body(&mut self, body: &ProcBody<'a>) -> CheckResult<()> {
        let scope = self.store.open_scope(Some(body.scope), ScopeFlags::default());
        self.info.scopes.insert(body.body.id, scope);
        let params: Vec<EntityId> = self
            .store
            .scope(body.scope)
            .elements
            .values()
            .copied()
            .collect();
        for &p in &params {
            self.store.insert(scope, p);
        }

        let mut c = self.enter();
        c.ctx = CheckerContext::new(scope);
        c.ctx.decl = Some(body.entity);
        c.ctx.proc_sig = Some(body.ty);

        for &p in &params {
            let is_using = c
                .store
                .entity(p)
                .as_variable()
                .is_some_and(|v| v.anonymous);
            if is_using {
                let token = c.store.entity(p).token.clone();
                c.use_variable(p, &token)?;
            }
        }

        c.check_stmt_list(&body.body.stmts, StmtFlags::NONE)?;

        let has_results = matches!(c.store.ty(body.ty), Type::Proc { results, .. } if !results.is_empty());
        let diverges = |callee: &tern_ast::Expr| {
            c.info.uses.get(&callee.id).is_some_and(|&e| {
                matches!(c.store.entity(e).kind, EntityKind::Builtin(BuiltinId::Panic))
            })
        };
        if has_results && !is_terminating_list(&body.body.stmts, &diverges) {
            c.error(
                ErrorKind::MissingReturn,
                &body.body.close,
                "Missing return statement at the end of the procedure",
            )?;
        }
        Ok(())
    }

    /// Checks queued bodies, including the ones they queue in turn.
    pub fn drain_worklist(&mut self) -> CheckResult<()> {
        loop {
            let pending = std::mem::take(&mut self.worklist);
            if pending.is_empty() {
                return Ok(());
            }
            for body in &pending {
                self.check_proc_body(body)?;
            }
        }
    }
}
