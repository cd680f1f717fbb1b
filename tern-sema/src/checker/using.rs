//! `using`: bring the members of an import, an enum type or a record
//! variable into the current scope.

use tern_ast::{Expr, ExprKind, Token};

use crate::arena::{EntityId, Lookup, TypeId};
use crate::entity::{Entity, EntityKind, Variable};
use crate::error::{CheckResult, ErrorKind};
use crate::types::{Type, base_type, deref, is_invalid, record_fields};

use super::unit::Unit;

impl<'s, 'a> Unit<'s, 'a> {
    pub(crate) fn check_using(&mut self, expr: &Expr) -> CheckResult<()> {
        let target = expr.unparen();
        let entity = match &target.kind {
            ExprKind::Ident(name) => {
                let Some((e, _)) = self.store.lookup(self.ctx.scope, name) else {
                    return self.error(
                        ErrorKind::Undeclared,
                        &target.token,
                        format!("Undeclared name: {name}"),
                    );
                };
                self.info.uses.insert(target.id, e);
                self.store.entity(e).mark_used();
                e
            }
            ExprKind::Selector { field, .. } => {
                let x = self.check_expr(target)?;
                if x.is_invalid() {
                    return Ok(());
                }
                match self.info.uses.get(&field.id) {
                    Some(&e) => e,
                    None => {
                        return self.error(
                            ErrorKind::IllegalUsing,
                            &target.token,
                            format!("`using` cannot be applied to `{target}`"),
                        );
                    }
                }
            }
            _ => {
                return self.error(
                    ErrorKind::IllegalUsing,
                    &target.token,
                    "`using` can only be applied to an identifier or a selector",
                );
            }
        };
        self.check_entity_decl(entity)?;

        let kind = self.store.entity(entity).kind.clone();
        match kind {
            EntityKind::ImportName(import) => {
                let members: Vec<EntityId> = self
                    .store
                    .scope(import.scope)
                    .elements
                    .values()
                    .copied()
                    .collect();
                self.promote(&import.name, &target.token, members)
            }
            EntityKind::TypeName => {
                let ty = self.store.entity(entity).ty.unwrap_or(TypeId::INVALID);
                if is_invalid(&self.store, ty) {
                    return Ok(());
                }
                match self.store.ty(base_type(&self.store, ty)) {
                    Type::Enum { members, .. } => {
                        let members = members.clone();
                        let name = self.store.entity(entity).token.text.clone();
                        self.promote(&name, &target.token, members)
                    }
                    _ => self.error(
                        ErrorKind::IllegalUsing,
                        &target.token,
                        format!(
                            "`using` can only be applied to enum type names, got `{}`",
                            self.type_name(ty)
                        ),
                    ),
                }
            }
            EntityKind::Variable(_) | EntityKind::ImplicitValue { .. } => {
                self.use_variable(entity, &target.token)
            }
            _ => {
                let e = self.store.entity(entity);
                self.error(
                    ErrorKind::IllegalUsing,
                    &target.token,
                    format!("`using` applied to {} `{}`", e.kind_name(), e.name()),
                )
            }
        }
    }

    /// Inserts existing entities into the current scope under their own
    /// names. Nothing is inserted if any name is already taken.
    fn promote(&mut self, source: &str, token: &Token, members: Vec<EntityId>) -> CheckResult<()> {
        if let Some(err) = self.first_collision(source, &members) {
            return self.error(ErrorKind::IllegalUsing, token, err);
        }
        let scope = self.ctx.scope;
        for member in members {
            self.store.insert(scope, member);
        }
        Ok(())
    }

    fn first_collision(&self, source: &str, members: &[EntityId]) -> Option<String> {
        let scope = self.store.scope(self.ctx.scope);
        members.iter().find_map(|&m| {
            let name = self.store.entity(m).name();
            if name == "_" {
                return None;
            }
            scope.lookup_local(name).map(|prev| {
                format!(
                    "Namespace collision while `using` `{source}` of: {name}\n\tat {}",
                    self.store.entity(prev).token.pos
                )
            })
        })
    }

    /// Makes each field of a record variable (or pointer to one) visible as
    /// a variable of its own, remembering which variable it came through.
    pub(crate) fn use_variable(&mut self, var: EntityId, token: &Token) -> CheckResult<()> {
        let (name, ty) = {
            let e = self.store.entity(var);
            (e.token.text.clone(), e.ty.unwrap_or(TypeId::INVALID))
        };
        let target = deref(&self.store, ty);
        if is_invalid(&self.store, target) {
            return Ok(());
        }
        let Some(fields) = record_fields(&self.store, target).map(<[EntityId]>::to_vec) else {
            return self.error(
                ErrorKind::IllegalUsing,
                token,
                format!(
                    "`using` can only be applied to variables of struct or union type, `{name}` has type `{}`",
                    self.type_name(ty)
                ),
            );
        };
        if let Some(err) = self.first_collision(&name, &fields) {
            return self.error(ErrorKind::IllegalUsing, token, err);
        }

        let scope = self.ctx.scope;
        for field in fields {
            let source = self.store.entity(field);
            let variable = Variable {
                anonymous: true,
                field: true,
                field_index: source.as_variable().map_or(0, |v| v.field_index),
                ..Variable::default()
            };
            let mut promoted = Entity::new(
                EntityKind::Variable(variable),
                source.token.clone(),
                None,
            )
            .with_type(source.ty.unwrap_or(TypeId::INVALID));
            promoted.using_parent = Some(var);
            let id = self.store.new_entity(promoted);
            self.store.insert(scope, id);
        }
        Ok(())
    }
}
