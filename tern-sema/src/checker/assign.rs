use tern_ast::{Expr, Token};

use crate::arena::{EntityId, Lookup, TypeId};
use crate::error::{CheckResult, ErrorKind};
use crate::operand::{AddressingMode, Operand};
use crate::types::{
    BasicKind, Type, are_identical, base_type, basic_kind, default_type, is_invalid, is_nillable,
    is_pointer, is_untyped, is_untyped_nil,
};

use super::unit::Unit;

impl<'s, 'a> Unit<'s, 'a> {
    fn is_named(&self, t: TypeId) -> bool {
        matches!(self.store.ty(t), Type::Named { .. } | Type::Basic(_))
    }

    pub(crate) fn is_assignable_to(&self, x: &Operand, target: TypeId) -> bool {
        let store = &self.store;
        if x.is_invalid() || is_invalid(store, x.ty) || is_invalid(store, target) {
            return true;
        }
        if are_identical(store, x.ty, target) {
            return true;
        }
        if is_untyped(store, x.ty) {
            return match basic_kind(store, x.ty) {
                Some(BasicKind::UntypedNil) => is_nillable(store, target),
                _ => false,
            };
        }
        let rawptr = TypeId::basic(BasicKind::Rawptr);
        if is_pointer(store, x.ty) && is_pointer(store, target) && (x.ty == rawptr || target == rawptr) {
            return true;
        }
        (!self.is_named(x.ty) || !self.is_named(target))
            && are_identical(store, base_type(store, x.ty), base_type(store, target))
    }

    /// Checks that `x` may be stored into a `target`, converting untyped
    /// operands first. With no target the operand settles on its default
    /// type. On failure `x` is invalidated.
    pub(crate) fn check_assignment(
        &mut self,
        x: &mut Operand,
        expr: &Expr,
        target: Option<TypeId>,
        context: &str,
    ) -> CheckResult<()> {
        match x.mode {
            AddressingMode::Invalid => return Ok(()),
            AddressingMode::NoValue => {
                self.error(
                    ErrorKind::TypeMismatch,
                    &expr.token,
                    format!("`{expr}` used as value in {context}"),
                )?;
                x.invalidate();
                return Ok(());
            }
            AddressingMode::Type => {
                self.error(
                    ErrorKind::InvalidOperation,
                    &expr.token,
                    format!("Type `{expr}` cannot be used as a value in {context}"),
                )?;
                x.invalidate();
                return Ok(());
            }
            AddressingMode::Builtin => {
                self.error(
                    ErrorKind::InvalidOperation,
                    &expr.token,
                    format!("Cannot assign builtin procedure `{expr}` in {context}"),
                )?;
                x.invalidate();
                return Ok(());
            }
            AddressingMode::Value | AddressingMode::Variable | AddressingMode::Constant => {}
        }

        let Some(target) = target else {
            if is_untyped_nil(&self.store, x.ty) {
                self.error(
                    ErrorKind::UntypedNilMisuse,
                    &expr.token,
                    format!("Use of untyped nil in {context}"),
                )?;
                x.invalidate();
                return Ok(());
            }
            if is_untyped(&self.store, x.ty) {
                let default = default_type(&self.store, x.ty);
                self.convert_untyped(x, default, &expr.token)?;
                self.record_if_owned(expr, x);
            }
            return Ok(());
        };
        if is_invalid(&self.store, target) {
            return Ok(());
        }

        if is_untyped(&self.store, x.ty) {
            self.convert_untyped(x, target, &expr.token)?;
            if x.is_invalid() {
                return Ok(());
            }
        }
        if !self.is_assignable_to(x, target) {
            self.error(
                ErrorKind::TypeMismatch,
                &expr.token,
                format!(
                    "Cannot assign value `{expr}` of type `{}` to `{}` in {context}",
                    self.type_name(x.ty),
                    self.type_name(target)
                ),
            )?;
            x.invalidate();
            return Ok(());
        }
        self.record_if_owned(expr, x);
        Ok(())
    }

    fn record_if_owned(&mut self, expr: &Expr, x: &Operand) {
        if x.expr == Some(expr.id) {
            self.record(expr.id, x);
        }
    }

    /// Evaluates a right-hand side list, splicing multi-value calls into
    /// one operand per result.
    pub(crate) fn collect_operands<'e>(
        &mut self,
        exprs: &'e [Expr],
    ) -> CheckResult<Vec<(Operand, &'e Expr)>> {
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let x = self.check_expr(expr)?;
            let spliced = match self.store.ty(x.ty) {
                Type::Tuple(types) if x.mode == AddressingMode::Value => types.clone(),
                _ => {
                    out.push((x, expr));
                    continue;
                }
            };
            for ty in spliced {
                out.push((Operand::new(AddressingMode::Value, ty, expr.id), expr));
            }
        }
        Ok(out)
    }

    /// Pairs `lhs` entities with their initializers, inferring any missing
    /// types.
    pub(crate) fn check_init_variables(
        &mut self,
        lhs: &[EntityId],
        token: &Token,
        inits: &[Expr],
        context: &str,
    ) -> CheckResult<()> {
        let mut operands = self.collect_operands(inits)?;
        let rhs_count = operands.iter().filter(|(x, _)| !x.is_invalid()).count();

        for (&e, (x, expr)) in lhs.iter().zip(operands.iter_mut()) {
            self.check_init_variable(e, x, *expr, context)?;
        }
        for &e in lhs.iter().skip(operands.len()) {
            self.store.set_entity_type(e, TypeId::INVALID);
        }

        if rhs_count > 0 && lhs.len() != rhs_count {
            self.error(
                ErrorKind::ArityMismatch,
                token,
                format!(
                    "Assignment count mismatch `{}` = `{}`",
                    lhs.len(),
                    rhs_count
                ),
            )?;
        }
        Ok(())
    }

    fn check_init_variable(
        &mut self,
        e: EntityId,
        x: &mut Operand,
        expr: &Expr,
        context: &str,
    ) -> CheckResult<()> {
        let declared = self.store.entity(e).ty;
        if declared.is_some_and(|t| is_invalid(&self.store, t)) {
            return Ok(());
        }
        match x.mode {
            AddressingMode::Invalid => {
                self.store.set_entity_type(e, TypeId::INVALID);
                return Ok(());
            }
            AddressingMode::NoValue | AddressingMode::Type | AddressingMode::Builtin => {
                self.check_assignment(x, expr, None, context)?;
                self.store.set_entity_type(e, TypeId::INVALID);
                return Ok(());
            }
            _ => {}
        }

        let target = match declared {
            Some(t) => t,
            None => {
                if is_untyped_nil(&self.store, x.ty) {
                    let token = self.store.entity(e).token.clone();
                    self.error(
                        ErrorKind::UntypedNilMisuse,
                        &token,
                        format!("Use of untyped nil in {context}"),
                    )?;
                    self.store.set_entity_type(e, TypeId::INVALID);
                    return Ok(());
                }
                let t = default_type(&self.store, x.ty);
                self.store.set_entity_type(e, t);
                t
            }
        };
        self.check_assignment(x, expr, Some(target), context)
    }

    /// `lhs = x`. The target must be addressable; assigning to `_` only
    /// evaluates the value.
    pub(crate) fn check_assignment_variable(
        &mut self,
        lhs: &Expr,
        mut x: Operand,
        rhs: &Expr,
    ) -> CheckResult<()> {
        if x.is_invalid() {
            return Ok(());
        }
        if lhs.unparen().as_ident() == Some("_") {
            return self.check_assignment(&mut x, rhs, None, "assignment");
        }

        let target = if lhs.unparen().as_ident().is_some() {
            let mut c = self.enter();
            c.ctx.assign_target = true;
            c.check_expr(lhs)?
        } else {
            self.check_expr(lhs)?
        };

        match target.mode {
            AddressingMode::Invalid => return Ok(()),
            AddressingMode::Variable => {}
            _ => {
                self.error(
                    ErrorKind::InvalidOperation,
                    &lhs.token,
                    format!("Cannot assign to `{lhs}`"),
                )?;
                return Ok(());
            }
        }
        self.check_assignment(&mut x, rhs, Some(target.ty), "assignment")
    }
}
