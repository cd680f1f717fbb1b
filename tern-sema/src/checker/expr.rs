//! Expression evaluation: just enough typing to drive the statement and
//! declaration checks.

use tern_ast::{BinaryOp, Expr, ExprKind, Literal, NodeId, Token, UnaryOp};

use crate::arena::{EntityId, Lookup, ScopeId, TypeId};
use crate::entity::EntityKind;
use crate::error::{CheckResult, ErrorKind};
use crate::operand::{AddressingMode, Operand};
use crate::types::{
    BasicKind, Type, are_identical, base_type, basic_kind, is_boolean, is_enum, is_integer,
    is_invalid, is_nillable, is_numeric, is_pointer, is_string, is_untyped, lookup_field,
};
use crate::universe::BuiltinId;
use crate::value::{ConstValue, ValueError};

use super::unit::Unit;

fn untyped(kind: BasicKind) -> TypeId {
    TypeId::basic(kind)
}

/// Modes an operator can consume.
fn is_value_mode(mode: AddressingMode) -> bool {
    matches!(
        mode,
        AddressingMode::Value | AddressingMode::Variable | AddressingMode::Constant
    )
}

/// Whether an untyped constant of kind `from` may become a `to`.
fn fits_category(from: BasicKind, to: BasicKind) -> bool {
    match from {
        BasicKind::UntypedBool => to.is_boolean(),
        BasicKind::UntypedInt | BasicKind::UntypedFloat => to.is_numeric(),
        BasicKind::UntypedString => to.is_string(),
        _ => false,
    }
}

fn is_zero(value: &ConstValue) -> bool {
    match value {
        ConstValue::Int(v) => *v == 0,
        ConstValue::Float(v) => *v == 0.0,
        _ => false,
    }
}

impl<'s, 'a> Unit<'s, 'a> {
    /// Evaluates `expr` and records the result against its node.
    pub fn check_expr(&mut self, expr: &Expr) -> CheckResult<Operand> {
        let operand = self.check_expr_kind(expr)?;
        self.record(expr.id, &operand);
        Ok(operand)
    }

    fn check_expr_kind(&mut self, expr: &Expr) -> CheckResult<Operand> {
        match &expr.kind {
            ExprKind::Ident(name) => self.check_ident(expr, name),
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Int(v) => Operand::constant(
                    untyped(BasicKind::UntypedInt),
                    ConstValue::Int(*v),
                    expr.id,
                ),
                Literal::Float(v) => Operand::constant(
                    untyped(BasicKind::UntypedFloat),
                    ConstValue::Float(*v),
                    expr.id,
                ),
                Literal::Str(s) => Operand::constant(
                    untyped(BasicKind::UntypedString),
                    ConstValue::String(s.clone()),
                    expr.id,
                ),
            }),
            ExprKind::Paren(inner) => {
                let mut operand = self.check_expr(inner)?;
                operand.expr = Some(expr.id);
                Ok(operand)
            }
            ExprKind::Unary { op, expr: inner } => self.check_unary(expr, *op, inner),
            ExprKind::Binary { op, lhs, rhs } => {
                let x = self.check_expr(lhs)?;
                let y = self.check_expr(rhs)?;
                self.binary_op(&expr.token, *op, x, y, expr.id)
            }
            ExprKind::Call { func, args } => self.check_call(expr, func, args),
            ExprKind::Selector { expr: base, field } => {
                self.check_selector(expr, base, field)
            }
            ExprKind::Pointer(_)
            | ExprKind::Array { .. }
            | ExprKind::Struct(_)
            | ExprKind::Union(_)
            | ExprKind::Enum { .. }
            | ExprKind::Proc(_) => {
                let ty = self.check_type(expr)?;
                Ok(Operand::new(AddressingMode::Type, ty, expr.id))
            }
        }
    }

    fn check_ident(&mut self, expr: &Expr, name: &str) -> CheckResult<Operand> {
        if name == "_" {
            self.error(
                ErrorKind::InvalidOperation,
                &expr.token,
                "`_` cannot be used as a value",
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        }
        let Some((e, found_in)) = self.store.lookup(self.ctx.scope, name) else {
            self.error(
                ErrorKind::Undeclared,
                &expr.token,
                format!("Undeclared name: {name}"),
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        };
        self.info.uses.insert(expr.id, e);
        self.entity_operand(e, expr, Some(found_in))
    }

    /// The operand an identifier or selector naming `e` evaluates to.
    pub(crate) fn entity_operand(
        &mut self,
        e: EntityId,
        expr: &Expr,
        found_in: Option<ScopeId>,
    ) -> CheckResult<Operand> {
        let is_use = !std::mem::take(&mut self.ctx.assign_target);
        let entity = self.store.entity(e);
        if is_use {
            entity.mark_used();
        }
        if let Some(parent) = entity.using_parent {
            self.store.entity(parent).mark_used();
        }
        self.check_entity_decl(e)?;

        let entity = self.store.entity(e);
        let ty = entity.ty.unwrap_or(TypeId::INVALID);
        let name = entity.token.text.clone();
        let invalid = Operand::invalid(Some(expr.id));

        let operand = match &entity.kind {
            EntityKind::Constant { value } => match value {
                Some(v) if !is_invalid(&self.store, ty) => Operand::constant(ty, v.clone(), expr.id),
                _ => invalid,
            },
            EntityKind::Variable(v) => {
                let is_field = v.field;
                if is_invalid(&self.store, ty) {
                    return Ok(invalid);
                }
                if let Some(found_in) = found_in {
                    if !is_field && self.crosses_procedure(self.ctx.scope, found_in) {
                        self.error(
                            ErrorKind::InvalidOperation,
                            &expr.token,
                            format!(
                                "Nested procedures do not capture its parent's variables: `{name}`"
                            ),
                        )?;
                        return Ok(invalid);
                    }
                }
                Operand::new(AddressingMode::Variable, ty, expr.id)
            }
            EntityKind::TypeName => {
                let cyclic = self
                    .ctx
                    .type_path
                    .iter()
                    .any(|&(t, depth)| t == e && depth == self.ctx.indirection);
                if cyclic {
                    self.error(
                        ErrorKind::CyclicDeclaration,
                        &expr.token,
                        format!("Illegal declaration cycle of `{name}`"),
                    )?;
                    return Ok(invalid);
                }
                Operand::new(AddressingMode::Type, ty, expr.id)
            }
            EntityKind::Procedure(_) => {
                if is_invalid(&self.store, ty) {
                    invalid
                } else {
                    Operand::new(AddressingMode::Value, ty, expr.id)
                }
            }
            EntityKind::Builtin(id) => Operand {
                builtin: Some(*id),
                ..Operand::new(AddressingMode::Builtin, TypeId::INVALID, expr.id)
            },
            EntityKind::ImportName(_) => {
                self.error(
                    ErrorKind::InvalidOperation,
                    &expr.token,
                    format!("Use of import `{name}` not in selector"),
                )?;
                invalid
            }
            EntityKind::ImplicitValue { .. } => Operand::new(AddressingMode::Variable, ty, expr.id),
            EntityKind::Nil => Operand::new(AddressingMode::Value, ty, expr.id),
        };
        Ok(operand)
    }

    /// Does the path from `from` out to `to` leave a procedure signature
    /// before reaching a local scope?
    fn crosses_procedure(&self, from: ScopeId, to: ScopeId) -> bool {
        let target = self.store.scope(to).flags;
        if target.is_file || target.is_global {
            return false;
        }
        let mut current = Some(from);
        while let Some(id) = current {
            if id == to {
                return false;
            }
            let scope = self.store.scope(id);
            if scope.flags.is_proc {
                return true;
            }
            current = scope.parent;
        }
        false
    }

    fn check_unary(&mut self, expr: &Expr, op: UnaryOp, inner: &Expr) -> CheckResult<Operand> {
        let mut x = self.check_expr(inner)?;
        x.expr = Some(expr.id);
        if x.is_invalid() {
            return Ok(x);
        }
        if !is_value_mode(x.mode) {
            self.error(
                ErrorKind::InvalidOperation,
                &inner.token,
                format!("`{inner}` is not a value"),
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        }

        match op {
            UnaryOp::AddrOf => {
                if x.mode != AddressingMode::Variable {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &inner.token,
                        format!("Cannot take the address of `{inner}`"),
                    )?;
                    return Ok(Operand::invalid(Some(expr.id)));
                }
                let ty = self.store.new_type(Type::Pointer(x.ty));
                Ok(Operand::new(AddressingMode::Value, ty, expr.id))
            }
            UnaryOp::Neg | UnaryOp::Not => {
                let (symbol, allowed) = match op {
                    UnaryOp::Neg => ("-", is_numeric(&self.store, x.ty)),
                    _ => ("!", is_boolean(&self.store, x.ty)),
                };
                if !allowed {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &expr.token,
                        format!(
                            "Operator `{symbol}` is not defined for `{}`",
                            self.type_name(x.ty)
                        ),
                    )?;
                    return Ok(Operand::invalid(Some(expr.id)));
                }
                if x.mode == AddressingMode::Constant {
                    let folded = match (&x.value, op) {
                        (Some(v), UnaryOp::Neg) => v.negate(),
                        (Some(v), _) => v.not(),
                        (None, _) => Err(ValueError::Unsupported),
                    };
                    return match folded {
                        Ok(v) => self.fit_constant(expr, x.ty, v),
                        Err(_) => {
                            self.error(
                                ErrorKind::InvalidOperation,
                                &expr.token,
                                format!("Constant overflow in `{expr}`"),
                            )?;
                            Ok(Operand::invalid(Some(expr.id)))
                        }
                    };
                }
                Ok(Operand::new(AddressingMode::Value, x.ty, expr.id))
            }
        }
    }

    /// A folded constant of type `ty`, checked against the range of a typed
    /// basic kind.
    fn fit_constant(&mut self, expr: &Expr, ty: TypeId, value: ConstValue) -> CheckResult<Operand> {
        let kind = basic_kind(&self.store, ty);
        let value = match kind {
            Some(k) if !k.is_untyped() => match value.represent_as(k) {
                Some(v) => v,
                None => {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &expr.token,
                        format!("Constant `{value}` overflows `{}`", self.type_name(ty)),
                    )?;
                    return Ok(Operand::invalid(Some(expr.id)));
                }
            },
            _ => value,
        };
        Ok(Operand::constant(ty, value, expr.id))
    }

    /// Gives an untyped operand the type `target` when the two are
    /// compatible, checking that a constant value fits. Incompatible
    /// operands are left untouched for the caller to report.
    pub(crate) fn convert_untyped(
        &mut self,
        x: &mut Operand,
        target: TypeId,
        token: &Token,
    ) -> CheckResult<()> {
        if x.is_invalid() || !is_untyped(&self.store, x.ty) || is_invalid(&self.store, target) {
            return Ok(());
        }
        let Some(from) = basic_kind(&self.store, x.ty) else {
            return Ok(());
        };
        if from == BasicKind::UntypedNil {
            if is_nillable(&self.store, target) {
                x.ty = target;
            } else {
                self.error(
                    ErrorKind::UntypedNilMisuse,
                    token,
                    format!("Cannot use untyped nil as `{}`", self.type_name(target)),
                )?;
                x.invalidate();
            }
            return Ok(());
        }
        let Some(to) = basic_kind(&self.store, target) else {
            return Ok(());
        };
        if to.is_untyped() {
            if from == BasicKind::UntypedInt && to == BasicKind::UntypedFloat {
                x.ty = target;
                x.value = x
                    .value
                    .as_ref()
                    .and_then(|v| v.represent_as(BasicKind::UntypedFloat));
            }
            return Ok(());
        }
        if !fits_category(from, to) {
            return Ok(());
        }
        match x.value.clone() {
            Some(v) => match v.represent_as(to) {
                Some(v) => {
                    x.value = Some(v);
                    x.ty = target;
                }
                None => {
                    self.error(
                        ErrorKind::TypeMismatch,
                        token,
                        format!(
                            "Cannot convert constant `{v}` to `{}`",
                            self.type_name(target)
                        ),
                    )?;
                    x.invalidate();
                }
            },
            None => x.ty = target,
        }
        Ok(())
    }

    /// Checks `x op y`. Shared by binary expressions, compound assignment,
    /// increments and switch case matching.
    pub(crate) fn binary_op(
        &mut self,
        token: &Token,
        op: BinaryOp,
        mut x: Operand,
        mut y: Operand,
        node: NodeId,
    ) -> CheckResult<Operand> {
        let invalid = Operand::invalid(Some(node));
        if x.is_invalid() || y.is_invalid() {
            return Ok(invalid);
        }
        if !is_value_mode(x.mode) || !is_value_mode(y.mode) {
            self.error(
                ErrorKind::InvalidOperation,
                token,
                format!("Operands of `{}` must be values", op.symbol()),
            )?;
            return Ok(invalid);
        }

        let (x_untyped, y_untyped) = (is_untyped(&self.store, x.ty), is_untyped(&self.store, y.ty));
        match (x_untyped, y_untyped) {
            (false, true) => self.convert_untyped(&mut y, x.ty, token)?,
            (true, false) => self.convert_untyped(&mut x, y.ty, token)?,
            (true, true) => {
                let float = Some(BasicKind::UntypedFloat);
                let x_float = basic_kind(&self.store, x.ty) == float;
                let y_float = basic_kind(&self.store, y.ty) == float;
                if y_float {
                    self.convert_untyped(&mut x, y.ty, token)?;
                } else if x_float {
                    self.convert_untyped(&mut y, x.ty, token)?;
                }
            }
            (false, false) => {}
        }
        if x.is_invalid() || y.is_invalid() {
            return Ok(invalid);
        }

        if !are_identical(&self.store, x.ty, y.ty) {
            self.error(
                ErrorKind::TypeMismatch,
                token,
                format!(
                    "Mismatched types in binary expression `{}` {} `{}`",
                    self.type_name(x.ty),
                    op.symbol(),
                    self.type_name(y.ty)
                ),
            )?;
            return Ok(invalid);
        }

        let ty = x.ty;
        let store = &self.store;
        let defined = match op {
            BinaryOp::Eq | BinaryOp::NotEq => {
                is_numeric(store, ty)
                    || is_string(store, ty)
                    || is_boolean(store, ty)
                    || is_pointer(store, ty)
                    || is_enum(store, ty)
                    || is_nillable(store, ty)
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                is_numeric(store, ty) || is_string(store, ty) || is_enum(store, ty)
            }
            BinaryOp::And | BinaryOp::Or => is_boolean(store, ty),
            BinaryOp::Rem => is_integer(store, ty) && !is_enum(store, ty),
            BinaryOp::Add => is_numeric(store, ty) || is_string(store, ty),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => is_numeric(store, ty),
        };
        if !defined {
            self.error(
                ErrorKind::InvalidOperation,
                token,
                format!(
                    "Operator `{}` is not defined for `{}`",
                    op.symbol(),
                    self.type_name(ty)
                ),
            )?;
            return Ok(invalid);
        }

        if matches!(op, BinaryOp::Div | BinaryOp::Rem)
            && y.mode == AddressingMode::Constant
            && y.value.as_ref().is_some_and(is_zero)
        {
            self.error(
                ErrorKind::InvalidOperation,
                token,
                "Division by zero not allowed",
            )?;
            return Ok(invalid);
        }

        let result_ty = if op.is_comparison() {
            untyped(BasicKind::UntypedBool)
        } else {
            ty
        };
        if let (AddressingMode::Constant, AddressingMode::Constant, Some(a), Some(b)) =
            (x.mode, y.mode, &x.value, &y.value)
        {
            match a.binary(op, b) {
                Ok(v) => {
                    let value = match basic_kind(&self.store, result_ty) {
                        Some(k) if !k.is_untyped() => v.represent_as(k),
                        _ => Some(v),
                    };
                    return match value {
                        Some(v) => Ok(Operand::constant(result_ty, v, node)),
                        None => {
                            self.error(
                                ErrorKind::InvalidOperation,
                                token,
                                format!(
                                    "Constant result of `{}` overflows `{}`",
                                    op.symbol(),
                                    self.type_name(result_ty)
                                ),
                            )?;
                            Ok(invalid)
                        }
                    };
                }
                Err(ValueError::Overflow) => {
                    self.error(
                        ErrorKind::InvalidOperation,
                        token,
                        format!("Constant overflow in `{}` expression", op.symbol()),
                    )?;
                    return Ok(invalid);
                }
                Err(_) => {}
            }
        }
        Ok(Operand::new(AddressingMode::Value, result_ty, node))
    }

    fn check_call(&mut self, expr: &Expr, func: &Expr, args: &[Expr]) -> CheckResult<Operand> {
        let f = self.check_expr(func)?;
        match f.mode {
            AddressingMode::Invalid => {
                for arg in args {
                    self.check_expr(arg)?;
                }
                Ok(Operand::invalid(Some(expr.id)))
            }
            AddressingMode::Type => self.check_conversion(expr, f.ty, args),
            AddressingMode::Builtin => match f.builtin {
                Some(id) => self.check_builtin_call(expr, id, args),
                None => Ok(Operand::invalid(Some(expr.id))),
            },
            _ => self.check_proc_call(expr, func, f.ty, args),
        }
    }

    fn check_proc_call(
        &mut self,
        expr: &Expr,
        func: &Expr,
        callee: TypeId,
        args: &[Expr],
    ) -> CheckResult<Operand> {
        let base = base_type(&self.store, callee);
        let Type::Proc { params, results } = self.store.ty(base).clone() else {
            for arg in args {
                self.check_expr(arg)?;
            }
            self.error(
                ErrorKind::InvalidOperation,
                &func.token,
                format!(
                    "Cannot call a non-procedure: `{func}` of type `{}`",
                    self.type_name(callee)
                ),
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        };

        if args.len() != params.len() {
            let which = if args.len() < params.len() {
                "Too few"
            } else {
                "Too many"
            };
            self.error(
                ErrorKind::ArityMismatch,
                &expr.token,
                format!(
                    "{which} arguments for `{func}`, expected {}, got {}",
                    params.len(),
                    args.len()
                ),
            )?;
        }
        for (i, arg) in args.iter().enumerate() {
            let mut operand = self.check_expr(arg)?;
            if let Some(&param) = params.get(i) {
                self.check_assignment(&mut operand, arg, Some(param), "argument")?;
            }
        }

        Ok(match results.as_slice() {
            [] => Operand::new(AddressingMode::NoValue, TypeId::INVALID, expr.id),
            [single] => Operand::new(AddressingMode::Value, *single, expr.id),
            many => {
                let tuple = self.store.new_type(Type::Tuple(many.to_vec()));
                Operand::new(AddressingMode::Value, tuple, expr.id)
            }
        })
    }

    /// `T(x)`.
    fn check_conversion(&mut self, expr: &Expr, target: TypeId, args: &[Expr]) -> CheckResult<Operand> {
        let [arg] = args else {
            for arg in args {
                self.check_expr(arg)?;
            }
            self.error(
                ErrorKind::ArityMismatch,
                &expr.token,
                format!(
                    "Conversion to `{}` takes exactly one argument, got {}",
                    self.type_name(target),
                    args.len()
                ),
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        };
        let mut x = self.check_expr(arg)?;
        if x.is_invalid() || is_invalid(&self.store, target) {
            return Ok(Operand::invalid(Some(expr.id)));
        }
        if !is_value_mode(x.mode) {
            self.error(
                ErrorKind::InvalidOperation,
                &arg.token,
                format!("`{arg}` is not a value"),
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        }

        let target_kind = basic_kind(&self.store, target).filter(|k| !k.is_untyped());
        if x.mode == AddressingMode::Constant {
            if let (Some(k), Some(v)) = (target_kind, x.value.clone()) {
                let numeric = v.as_f64().is_some() && k.is_numeric();
                if numeric || v.represent_as(k).is_some() {
                    return match v.represent_as(k) {
                        Some(v) => Ok(Operand::constant(target, v, expr.id)),
                        None => {
                            self.error(
                                ErrorKind::TypeMismatch,
                                &arg.token,
                                format!(
                                    "Cannot convert constant `{v}` to `{}`",
                                    self.type_name(target)
                                ),
                            )?;
                            Ok(Operand::invalid(Some(expr.id)))
                        }
                    };
                }
            }
        }

        self.convert_untyped(&mut x, target, &arg.token)?;
        if x.is_invalid() {
            return Ok(Operand::invalid(Some(expr.id)));
        }
        let store = &self.store;
        let convertible = self.is_assignable_to(&x, target)
            || (is_numeric(store, x.ty) && is_numeric(store, target))
            || (is_pointer(store, x.ty) && is_pointer(store, target))
            || are_identical(store, base_type(store, x.ty), base_type(store, target));
        if !convertible {
            self.error(
                ErrorKind::TypeMismatch,
                &arg.token,
                format!(
                    "Cannot convert `{arg}` of type `{}` to `{}`",
                    self.type_name(x.ty),
                    self.type_name(target)
                ),
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        }
        Ok(Operand::new(AddressingMode::Value, target, expr.id))
    }

    fn check_builtin_call(&mut self, expr: &Expr, id: BuiltinId, args: &[Expr]) -> CheckResult<Operand> {
        let builtin = id.proc();
        if !builtin.variadic && args.len() != builtin.arity {
            self.error(
                ErrorKind::ArityMismatch,
                &expr.token,
                format!(
                    "Wrong number of arguments for `{}`, expected {}, got {}",
                    builtin.name,
                    builtin.arity,
                    args.len()
                ),
            )?;
            return Ok(Operand::invalid(Some(expr.id)));
        }
        let no_value = Operand::new(AddressingMode::NoValue, TypeId::INVALID, expr.id);
        let int = TypeId::basic(BasicKind::Int);

        match id {
            BuiltinId::Len => {
                let arg = &args[0];
                let x = self.check_expr(arg)?;
                if x.is_invalid() {
                    return Ok(Operand::invalid(Some(expr.id)));
                }
                if let (AddressingMode::Constant, Some(ConstValue::String(s))) = (x.mode, &x.value) {
                    let len = s.len() as i128;
                    return Ok(Operand::constant(
                        untyped(BasicKind::UntypedInt),
                        ConstValue::Int(len),
                        expr.id,
                    ));
                }
                let base = base_type(&self.store, x.ty);
                let ok = is_value_mode(x.mode)
                    && (is_string(&self.store, base)
                        || matches!(self.store.ty(base), Type::Array { .. } | Type::Slice(_)));
                if !ok {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &arg.token,
                        format!("Invalid argument `{arg}` for `len`"),
                    )?;
                    return Ok(Operand::invalid(Some(expr.id)));
                }
                Ok(Operand::new(AddressingMode::Value, int, expr.id))
            }
            BuiltinId::SizeOf | BuiltinId::AlignOf => {
                let t = self.check_type(&args[0])?;
                if is_invalid(&self.store, t) {
                    return Ok(Operand::invalid(Some(expr.id)));
                }
                Ok(Operand::new(AddressingMode::Value, int, expr.id))
            }
            BuiltinId::New => {
                let t = self.check_type(&args[0])?;
                if is_invalid(&self.store, t) {
                    return Ok(Operand::invalid(Some(expr.id)));
                }
                let ptr = self.store.new_type(Type::Pointer(t));
                Ok(Operand::new(AddressingMode::Value, ptr, expr.id))
            }
            BuiltinId::Assert => {
                let arg = &args[0];
                let x = self.check_expr(arg)?;
                if !x.is_invalid() && !(is_value_mode(x.mode) && is_boolean(&self.store, x.ty)) {
                    self.error(
                        ErrorKind::TypeMismatch,
                        &arg.token,
                        format!("Argument `{arg}` of `assert` must be a boolean"),
                    )?;
                }
                Ok(no_value)
            }
            BuiltinId::Panic => {
                let arg = &args[0];
                let mut x = self.check_expr(arg)?;
                let string = TypeId::basic(BasicKind::String);
                self.check_assignment(&mut x, arg, Some(string), "argument")?;
                Ok(no_value)
            }
            BuiltinId::Print => {
                for arg in args {
                    let mut x = self.check_expr(arg)?;
                    self.check_assignment(&mut x, arg, None, "argument")?;
                }
                Ok(no_value)
            }
        }
    }

    fn check_selector(&mut self, expr: &Expr, base: &Expr, field: &tern_ast::Ident) -> CheckResult<Operand> {
        if let Some(name) = base.as_ident() {
            if let Some((e, _)) = self.store.lookup(self.ctx.scope, name) {
                if let EntityKind::ImportName(import) = &self.store.entity(e).kind {
                    let (target, import_name) = (import.scope, import.name.clone());
                    self.store.entity(e).mark_used();
                    self.info.uses.insert(base.id, e);
                    let Some(member) = self.store.scope(target).lookup_local(field.name()) else {
                        self.error(
                            ErrorKind::Undeclared,
                            &field.token,
                            format!("`{}` is not declared by `{import_name}`", field.name()),
                        )?;
                        return Ok(Operand::invalid(Some(expr.id)));
                    };
                    self.info.uses.insert(field.id, member);
                    return self.entity_operand(member, expr, None);
                }
            }
        }

        let x = self.check_expr(base)?;
        if x.is_invalid() {
            return Ok(Operand::invalid(Some(expr.id)));
        }

        if x.mode == AddressingMode::Type {
            let members = match self.store.ty(base_type(&self.store, x.ty)) {
                Type::Enum { members, .. } => members.clone(),
                _ => Vec::new(),
            };
            let found = members
                .into_iter()
                .find(|&m| self.store.entity(m).name() == field.name());
            return match found {
                Some(member) => {
                    self.info.uses.insert(field.id, member);
                    self.entity_operand(member, expr, None)
                }
                None => {
                    self.error(
                        ErrorKind::Undeclared,
                        &field.token,
                        format!(
                            "`{}` has no member `{}`",
                            self.type_name(x.ty),
                            field.name()
                        ),
                    )?;
                    Ok(Operand::invalid(Some(expr.id)))
                }
            };
        }

        match lookup_field(&self.store, x.ty, field.name()) {
            Some(f) => {
                self.info.uses.insert(field.id, f);
                let ty = self.store.entity(f).ty.unwrap_or(TypeId::INVALID);
                let mode = if x.mode == AddressingMode::Variable || is_pointer(&self.store, x.ty) {
                    AddressingMode::Variable
                } else {
                    AddressingMode::Value
                };
                Ok(Operand::new(mode, ty, expr.id))
            }
            None => {
                self.error(
                    ErrorKind::Undeclared,
                    &field.token,
                    format!(
                        "`{base}` of type `{}` has no field `{}`",
                        self.type_name(x.ty),
                        field.name()
                    ),
                )?;
                Ok(Operand::invalid(Some(expr.id)))
            }
        }
    }
}
