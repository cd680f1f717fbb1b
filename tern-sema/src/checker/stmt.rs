use std::collections::HashMap;

use tern_ast::{
    AssignStmt, BinaryOp, Block, BranchKind, BranchStmt, CaseClause, Decl, DeferStmt, Expr,
    ExprKind, ForStmt, IfStmt, IncDec, IncDecStmt, Pos, ReturnStmt, Stmt, SwitchStmt, Token,
    TypeSwitchStmt, VarDecl,
};
use tracing::trace;

use crate::arena::{EntityId, Lookup, TypeId};
use crate::entity::Entity;
use crate::error::{CheckResult, ErrorKind};
use crate::operand::{AddressingMode, Operand};
use crate::scope::ScopeFlags;
use crate::types::{
    BasicKind, Type, are_identical, is_boolean, is_invalid, is_numeric, is_union, record_fields,
};
use crate::value::ConstValue;

use super::context::{Label, StmtFlags};
use super::unit::{DeclInfo, Unit};

/// A constant case already seen in a switch.
struct SeenCase {
    value: ConstValue,
    /// Type before conversion to the tag's type.
    ty: TypeId,
    pos: Pos,
}

fn is_condition(store: &impl Lookup, x: &Operand) -> bool {
    matches!(
        x.mode,
        AddressingMode::Value | AddressingMode::Variable | AddressingMode::Constant
    ) && is_boolean(store, x.ty)
}

impl<'s, 'a> Unit<'s, 'a> {
    /// Checks a statement list. Constant and type declarations are hoisted:
    /// entered and checked before any statement runs. Only the last
    /// statement keeps the `fallthrough` permission.
    pub fn check_stmt_list(&mut self, stmts: &'a [Stmt], flags: StmtFlags) -> CheckResult<()> {
        let scope = self.ctx.scope;
        let mut types = Vec::new();
        let mut consts = Vec::new();
        for stmt in stmts {
            match stmt {
                Stmt::Decl(Decl::Type(td)) => types.push(self.declare_type(td, scope)?),
                Stmt::Decl(Decl::Const(cd)) => consts.extend(self.declare_consts(cd, scope)?),
                _ => {}
            }
        }
        for e in types.into_iter().chain(consts) {
            self.check_entity_decl(e)?;
        }

        let last = stmts.iter().rposition(|s| !matches!(s, Stmt::Empty(_)));
        for (i, stmt) in stmts.iter().enumerate() {
            let stmt_flags = if Some(i) == last {
                flags
            } else {
                flags.without(StmtFlags::FALLTHROUGH)
            };
            self.check_stmt(stmt, stmt_flags)?;
        }
        Ok(())
    }

    pub fn check_stmt(&mut self, stmt: &'a Stmt, flags: StmtFlags) -> CheckResult<()> {
        let inner = flags.without(StmtFlags::FALLTHROUGH);
        match stmt {
            Stmt::Empty(_) | Stmt::Bad(_) => Ok(()),
            Stmt::Expr(expr) => self.check_expr_stmt(expr),
            Stmt::IncDec(s) => self.check_inc_dec(s),
            Stmt::Assign(s) => self.check_assign_stmt(s),
            Stmt::Block(block) => self.check_block(block, flags),
            Stmt::If(s) => self.check_if(s, inner),
            Stmt::For(s) => self.check_for(s, inner),
            Stmt::Switch(s) => self.check_switch(s, inner),
            Stmt::TypeSwitch(s) => self.check_type_switch(s, inner),
            Stmt::Return(s) => self.check_return(s),
            Stmt::Defer(s) => self.check_defer(s),
            Stmt::Branch(s) => self.check_branch(s, flags),
            Stmt::Using(s) => {
                for expr in &s.list {
                    self.check_using(expr)?;
                }
                Ok(())
            }
            Stmt::Decl(decl) => self.check_decl_stmt(decl),
        }
    }

    /// A block in a scope of its own.
    fn check_block(&mut self, block: &'a Block, flags: StmtFlags) -> CheckResult<()> {
        let mut c = self.enter();
        c.ctx.scope = c.open_scope(Some(block.id), ScopeFlags::default());
        c.check_stmt_list(&block.stmts, flags)
    }

    fn check_expr_stmt(&mut self, expr: &'a Expr) -> CheckResult<()> {
        let x = self.check_expr(expr)?;
        match x.mode {
            AddressingMode::Invalid | AddressingMode::NoValue => Ok(()),
            AddressingMode::Type => self.error(
                ErrorKind::UnusedValue,
                &expr.token,
                format!("`{expr}` is not an expression"),
            ),
            _ if matches!(expr.unparen().kind, ExprKind::Call { .. }) => Ok(()),
            _ => self.error(
                ErrorKind::UnusedValue,
                &expr.token,
                format!("Expression `{expr}` is not used"),
            ),
        }
    }

    fn check_inc_dec(&mut self, s: &'a IncDecStmt) -> CheckResult<()> {
        let x = self.check_expr(&s.expr)?;
        if x.is_invalid() {
            return Ok(());
        }
        let symbol = match s.op {
            IncDec::Inc => "++",
            IncDec::Dec => "--",
        };
        if !is_numeric(&self.store, x.ty) {
            return self.error(
                ErrorKind::InvalidOperation,
                &s.token,
                format!("Non numeric type `{}` for `{symbol}`", self.type_name(x.ty)),
            );
        }
        if x.mode != AddressingMode::Variable {
            return self.error(
                ErrorKind::InvalidOperation,
                &s.expr.token,
                format!("Cannot assign to `{}`", s.expr),
            );
        }
        let op = match s.op {
            IncDec::Inc => BinaryOp::Add,
            IncDec::Dec => BinaryOp::Sub,
        };
        let one = Operand::constant(
            TypeId::basic(BasicKind::UntypedInt),
            ConstValue::Int(1),
            s.expr.id,
        );
        let target = x.ty;
        let mut result = self.binary_op(&s.token, op, x, one, s.expr.id)?;
        if result.is_invalid() {
            return Ok(());
        }
        self.check_assignment(&mut result, &s.expr, Some(target), "increment statement")
    }

    fn check_assign_stmt(&mut self, s: &'a AssignStmt) -> CheckResult<()> {
        let Some(op) = s.op else {
            if s.lhs.is_empty() {
                return self.error(
                    ErrorKind::ArityMismatch,
                    &s.token,
                    "Missing lhs in assignment statement",
                );
            }
            let operands = self.collect_operands(&s.rhs)?;
            let rhs_count = operands.len();
            for (lhs, (x, rhs)) in s.lhs.iter().zip(operands) {
                self.check_assignment_variable(lhs, x, rhs)?;
            }
            if s.lhs.len() != rhs_count {
                return self.error(
                    ErrorKind::ArityMismatch,
                    &s.token,
                    format!("Assignment count mismatch `{}` = `{rhs_count}`", s.lhs.len()),
                );
            }
            return Ok(());
        };

        let ([lhs], [rhs]) = (s.lhs.as_slice(), s.rhs.as_slice()) else {
            return self.error(
                ErrorKind::ArityMismatch,
                &s.token,
                format!(
                    "Assignment operation `{}=` requires single-valued expressions",
                    op.symbol()
                ),
            );
        };
        let x = self.check_expr(lhs)?;
        let y = self.check_expr(rhs)?;
        let result = self.binary_op(&s.token, op, x, y, rhs.id)?;
        if result.is_invalid() {
            return Ok(());
        }
        self.check_assignment_variable(lhs, result, rhs)
    }

    fn check_condition(&mut self, cond: &'a Expr, what: &str) -> CheckResult<()> {
        let x = self.check_expr(cond)?;
        if !x.is_invalid() && !is_condition(&self.store, &x) {
            self.error(
                ErrorKind::TypeMismatch,
                &cond.token,
                format!("Non-boolean condition in `{what}` statement"),
            )?;
        }
        Ok(())
    }

    fn check_if(&mut self, s: &'a IfStmt, flags: StmtFlags) -> CheckResult<()> {
        let mut c = self.enter();
        c.ctx.scope = c.open_scope(Some(s.id), ScopeFlags::default());
        if let Some(init) = &s.init {
            c.check_stmt(init, StmtFlags::NONE)?;
        }
        c.check_condition(&s.cond, "if")?;
        c.check_block(&s.body, flags)?;
        match s.else_stmt.as_deref() {
            None => Ok(()),
            Some(e @ (Stmt::If(_) | Stmt::Block(_))) => c.check_stmt(e, flags),
            Some(other) => c.error(
                ErrorKind::IllegalControlFlow,
                other.token(),
                "Invalid `else` statement in `if` statement",
            ),
        }
    }

    fn check_for(&mut self, s: &'a ForStmt, flags: StmtFlags) -> CheckResult<()> {
        let mut c = self.enter();
        c.ctx.scope = c.open_scope(Some(s.id), ScopeFlags::default());
        if let Some(label) = &s.label {
            c.ctx.labels.push(Label {
                name: label.token.text.clone(),
                is_loop: true,
            });
        }
        if let Some(init) = &s.init {
            c.check_stmt(init, StmtFlags::NONE)?;
        }
        if let Some(cond) = &s.cond {
            c.check_condition(cond, "for")?;
        }
        if let Some(post) = &s.post {
            if let Stmt::Decl(_) = post.as_ref() {
                c.error(
                    ErrorKind::InvalidDeclaration,
                    post.token(),
                    "`for` statement post statement cannot be a declaration",
                )?;
            } else {
                c.check_stmt(post, StmtFlags::NONE)?;
            }
        }
        c.check_block(&s.body, flags | StmtFlags::BREAK | StmtFlags::CONTINUE)
    }

    fn check_defaults(&mut self, clauses: &[CaseClause], what: &str) -> CheckResult<()> {
        let mut first: Option<&Token> = None;
        for clause in clauses.iter().filter(|c| c.is_default()) {
            match first {
                Some(prev) => self.error(
                    ErrorKind::DuplicateCase,
                    &clause.token,
                    format!(
                        "Multiple `default` clauses in `{what}` statement\n\tfirst at {}",
                        prev.pos
                    ),
                )?,
                None => first = Some(&clause.token),
            }
        }
        Ok(())
    }

    fn check_switch(&mut self, s: &'a SwitchStmt, flags: StmtFlags) -> CheckResult<()> {
        let mut c = self.enter();
        c.ctx.scope = c.open_scope(Some(s.id), ScopeFlags::default());
        if let Some(label) = &s.label {
            c.ctx.labels.push(Label {
                name: label.token.text.clone(),
                is_loop: false,
            });
        }
        if let Some(init) = &s.init {
            c.check_stmt(init, StmtFlags::NONE)?;
        }

        let mut tag = match &s.tag {
            Some(t) => c.check_expr(t)?,
            None => Operand::constant(
                TypeId::basic(BasicKind::UntypedBool),
                ConstValue::Bool(true),
                s.id,
            ),
        };
        if let Some(t) = &s.tag {
            c.check_assignment(&mut tag, t, None, "switch expression")?;
        }
        c.check_defaults(&s.clauses, "switch")?;

        let mut seen: HashMap<u64, Vec<SeenCase>> = HashMap::new();
        let count = s.clauses.len();
        for (i, clause) in s.clauses.iter().enumerate() {
            for expr in &clause.list {
                let y = c.check_expr(expr)?;
                if y.is_invalid() || tag.is_invalid() {
                    continue;
                }
                let static_ty = y.ty;
                let value = y.value.clone();
                let matched = c.binary_op(&expr.token, BinaryOp::Eq, tag.clone(), y, expr.id)?;
                if matched.is_invalid() {
                    continue;
                }
                let Some(value) = value else {
                    continue;
                };
                let bucket = seen.entry(value.hash_key()).or_default();
                let previous = bucket.iter().find(|p| {
                    p.value.same_value(&value) && are_identical(&c.store, p.ty, static_ty)
                });
                match previous {
                    Some(prev) => c.error(
                        ErrorKind::DuplicateCase,
                        &expr.token,
                        format!("Duplicate case `{expr}`\n\tprevious case at {}", prev.pos),
                    )?,
                    None => bucket.push(SeenCase {
                        value,
                        ty: static_ty,
                        pos: expr.token.pos.clone(),
                    }),
                }
            }

            let mut clause_flags = flags | StmtFlags::BREAK;
            if i + 1 < count {
                clause_flags |= StmtFlags::FALLTHROUGH;
            }
            let mut cc = c.enter();
            cc.ctx.scope = cc.open_scope(Some(clause.id), ScopeFlags::default());
            cc.check_stmt_list(&clause.stmts, clause_flags)?;
        }
        Ok(())
    }

    fn check_type_switch(&mut self, s: &'a TypeSwitchStmt, flags: StmtFlags) -> CheckResult<()> {
        let mut c = self.enter();
        c.ctx.scope = c.open_scope(Some(s.id), ScopeFlags::default());
        if let Some(label) = &s.label {
            c.ctx.labels.push(Label {
                name: label.token.text.clone(),
                is_loop: false,
            });
        }

        let x = c.check_expr(&s.expr)?;
        let union_ty = if x.is_invalid() {
            None
        } else if is_union(&c.store, x.ty) {
            Some(x.ty)
        } else {
            c.error(
                ErrorKind::TypeMismatch,
                &s.expr.token,
                format!("Expected a union for type switch, got `{}`", c.type_name(x.ty)),
            )?;
            None
        };
        let variants: Vec<TypeId> = match union_ty.and_then(|u| record_fields(&c.store, u)) {
            Some(fields) => fields
                .iter()
                .filter_map(|&f| c.store.entity(f).ty)
                .collect(),
            None => Vec::new(),
        };
        c.check_defaults(&s.clauses, "type switch")?;

        let mut seen: Vec<(TypeId, Pos)> = Vec::new();
        for clause in &s.clauses {
            let mut bound = union_ty.unwrap_or(TypeId::INVALID);
            for expr in &clause.list {
                let t = c.check_type(expr)?;
                if is_invalid(&c.store, t) {
                    continue;
                }
                if union_ty.is_some() && !variants.iter().any(|&v| are_identical(&c.store, v, t)) {
                    let union_name = union_ty.map(|u| c.type_name(u)).unwrap_or_default();
                    c.error(
                        ErrorKind::TypeMismatch,
                        &expr.token,
                        format!(
                            "Unknown tag type `{}` for union `{union_name}`",
                            c.type_name(t)
                        ),
                    )?;
                    continue;
                }
                if let Some((_, pos)) = seen.iter().find(|(p, _)| are_identical(&c.store, *p, t)) {
                    c.error(
                        ErrorKind::DuplicateCase,
                        &expr.token,
                        format!(
                            "Duplicate type case `{}`\n\tprevious type case at {pos}",
                            c.type_name(t)
                        ),
                    )?;
                    continue;
                }
                seen.push((t, expr.token.pos.clone()));
                if clause.list.len() == 1 {
                    bound = t;
                }
            }

            let mut cc = c.enter();
            let scope = cc.open_scope(Some(clause.id), ScopeFlags::default());
            cc.ctx.scope = scope;
            let var = cc
                .store
                .new_entity(Entity::variable(s.var.token.clone(), Some(s.var.id)).with_type(bound));
            cc.add_entity(scope, Some(&s.var), var)?;
            cc.store.entity(var).mark_used();
            cc.check_stmt_list(&clause.stmts, flags | StmtFlags::BREAK)?;
        }
        Ok(())
    }

    fn check_return(&mut self, s: &'a ReturnStmt) -> CheckResult<()> {
        if self.ctx.in_defer {
            return self.error(
                ErrorKind::IllegalControlFlow,
                &s.token,
                "You cannot `return` within a defer statement",
            );
        }
        let Some(sig) = self.ctx.proc_sig else {
            return self.error(
                ErrorKind::IllegalControlFlow,
                &s.token,
                "`return` is only allowed inside a procedure",
            );
        };
        let results = match self.store.ty(sig) {
            Type::Proc { results, .. } => results.clone(),
            _ => Vec::new(),
        };

        let operands = self.collect_operands(&s.results)?;
        if operands.len() != results.len() {
            let noun = if results.len() == 1 { "value" } else { "values" };
            return self.error(
                ErrorKind::ArityMismatch,
                &s.token,
                format!(
                    "Expected {} return {noun}, got {}",
                    results.len(),
                    operands.len()
                ),
            );
        }
        for ((mut x, expr), target) in operands.into_iter().zip(results) {
            self.check_assignment(&mut x, expr, Some(target), "return statement")?;
        }
        Ok(())
    }

    fn check_defer(&mut self, s: &'a DeferStmt) -> CheckResult<()> {
        if let Stmt::Decl(_) = s.stmt.as_ref() {
            return self.error(
                ErrorKind::InvalidDeclaration,
                &s.token,
                "You cannot defer a declaration",
            );
        }
        let mut c = self.enter();
        c.ctx.in_defer = true;
        c.check_stmt(&s.stmt, StmtFlags::NONE)
    }

    fn check_branch(&mut self, s: &'a BranchStmt, flags: StmtFlags) -> CheckResult<()> {
        let label = match &s.label {
            Some(ident) => {
                let found = self
                    .ctx
                    .labels
                    .iter()
                    .rev()
                    .find(|l| *l.name == *ident.name())
                    .cloned();
                match found {
                    Some(l) => Some(l),
                    None => {
                        return self.error(
                            ErrorKind::IllegalControlFlow,
                            &ident.token,
                            format!("Unknown label `{}`", ident.name()),
                        );
                    }
                }
            }
            None => None,
        };

        match s.kind {
            BranchKind::Break => {
                if label.is_none() && !flags.contains(StmtFlags::BREAK) {
                    return self.error(
                        ErrorKind::IllegalControlFlow,
                        &s.token,
                        "`break` only allowed in `for` or `switch` statements",
                    );
                }
            }
            BranchKind::Continue => match label {
                Some(l) if !l.is_loop => {
                    return self.error(
                        ErrorKind::IllegalControlFlow,
                        &s.token,
                        format!("`continue` label `{}` does not refer to a `for` statement", l.name),
                    );
                }
                Some(_) => {}
                None if !flags.contains(StmtFlags::CONTINUE) => {
                    return self.error(
                        ErrorKind::IllegalControlFlow,
                        &s.token,
                        "`continue` only allowed in `for` statements",
                    );
                }
                None => {}
            },
            BranchKind::Fallthrough => {
                if !flags.contains(StmtFlags::FALLTHROUGH) {
                    return self.error(
                        ErrorKind::IllegalControlFlow,
                        &s.token,
                        "`fallthrough` statement in illegal position",
                    );
                }
            }
        }
        Ok(())
    }

    fn check_decl_stmt(&mut self, decl: &'a Decl) -> CheckResult<()> {
        let scope = self.ctx.scope;
        match decl {
            Decl::Var(vd) => self.check_local_var_decl(vd),
            // Hoisted by the enclosing list; declared here only when the
            // statement stands alone, e.g. as an `if` initializer.
            Decl::Const(cd) => {
                let hoisted = cd.names.first().is_none_or(|n| self.hoisted.contains(&n.id));
                if !hoisted {
                    for e in self.declare_consts(cd, scope)? {
                        self.check_entity_decl(e)?;
                    }
                }
                Ok(())
            }
            Decl::Type(td) => {
                if !self.hoisted.contains(&td.name.id) {
                    let e = self.declare_type(td, scope)?;
                    self.check_entity_decl(e)?;
                }
                Ok(())
            }
            Decl::Proc(pd) => {
                trace!(name = %pd.name.name(), "nested procedure");
                let e = self.declare_proc(pd, scope)?;
                self.check_entity_decl(e)
            }
            Decl::Import(import) => self.error(
                ErrorKind::InvalidDeclaration,
                &import.token,
                "You can only import at file scope",
            ),
        }
    }

    /// Local variables are checked in statement order: initializers first,
    /// then the names become visible.
    fn check_local_var_decl(&mut self, vd: &'a VarDecl) -> CheckResult<()> {
        let scope = self.ctx.scope;
        let entities: Vec<EntityId> = vd
            .names
            .iter()
            .map(|name| {
                self.store
                    .new_entity(Entity::variable(name.token.clone(), Some(name.id)))
            })
            .collect();
        let decl = DeclInfo {
            scope,
            entities: entities.clone(),
            type_expr: vd.ty.as_ref(),
            init_exprs: &vd.values,
            proc_decl: None,
        };
        self.check_var_decl(&decl)?;

        for (name, &e) in vd.names.iter().zip(&entities) {
            self.add_entity(scope, Some(name), e)?;
        }
        if vd.is_using {
            for &e in &entities {
                let token = self.store.entity(e).token.clone();
                self.use_variable(e, &token)?;
            }
        }
        Ok(())
    }
}
