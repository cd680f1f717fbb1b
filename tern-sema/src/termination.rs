//! Does a statement unconditionally leave the procedure?
//!
//! Pure functions over the syntax tree. Name resolution stays with the
//! caller: `diverges` is asked about the callee of every call statement.

use tern_ast::{BranchKind, CaseClause, Expr, ExprKind, Stmt};

/// `true` when every path through `stmt` ends in a `return` (or a
/// `fallthrough`, which hands control to a clause that must itself
/// terminate).
pub fn is_terminating(stmt: &Stmt, diverges: &dyn Fn(&Expr) -> bool) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Branch(b) => b.kind == BranchKind::Fallthrough,
        Stmt::Block(block) => is_terminating_list(&block.stmts, diverges),
        Stmt::Expr(expr) => match &expr.unparen().kind {
            ExprKind::Call { func, .. } => diverges(func.unparen()),
            _ => false,
        },
        Stmt::If(s) => match &s.else_stmt {
            Some(else_stmt) => {
                is_terminating_list(&s.body.stmts, diverges)
                    && is_terminating(else_stmt, diverges)
            }
            None => false,
        },
        Stmt::For(s) => {
            let label = s.label.as_ref().map(|l| l.name());
            s.cond.is_none() && !has_break_list(&s.body.stmts, label, true)
        }
        Stmt::Switch(s) => {
            let label = s.label.as_ref().map(|l| l.name());
            clauses_terminate(&s.clauses, label, diverges)
        }
        Stmt::TypeSwitch(s) => {
            let label = s.label.as_ref().map(|l| l.name());
            clauses_terminate(&s.clauses, label, diverges)
        }
        Stmt::Empty(_)
        | Stmt::Bad(_)
        | Stmt::IncDec(_)
        | Stmt::Assign(_)
        | Stmt::Defer(_)
        | Stmt::Using(_)
        | Stmt::Decl(_) => false,
    }
}

/// A list terminates when its last non-empty statement does.
pub fn is_terminating_list(stmts: &[Stmt], diverges: &dyn Fn(&Expr) -> bool) -> bool {
    stmts
        .iter()
        .rev()
        .find(|s| !matches!(s, Stmt::Empty(_)))
        .is_some_and(|s| is_terminating(s, diverges))
}

fn clauses_terminate(
    clauses: &[CaseClause],
    label: Option<&str>,
    diverges: &dyn Fn(&Expr) -> bool,
) -> bool {
    let mut has_default = false;
    for clause in clauses {
        if clause.is_default() {
            has_default = true;
        }
        if !is_terminating_list(&clause.stmts, diverges) || has_break_list(&clause.stmts, label, true) {
            return false;
        }
    }
    has_default
}

/// Is there a `break` in `stmt` that leaves the construct labelled `label`?
/// With `implicit` set an unlabelled `break` counts too; nested loops and
/// switches clear it, since an unlabelled break inside them targets them.
pub fn has_break(stmt: &Stmt, label: Option<&str>, implicit: bool) -> bool {
    match stmt {
        Stmt::Branch(b) if b.kind == BranchKind::Break => match &b.label {
            None => implicit,
            Some(l) => label == Some(l.name()),
        },
        Stmt::Block(block) => has_break_list(&block.stmts, label, implicit),
        Stmt::If(s) => {
            has_break_list(&s.body.stmts, label, implicit)
                || s
                    .else_stmt
                    .as_deref()
                    .is_some_and(|e| has_break(e, label, implicit))
        }
        Stmt::For(s) => label.is_some() && has_break_list(&s.body.stmts, label, false),
        Stmt::Switch(s) => {
            label.is_some()
                && s
                    .clauses
                    .iter()
                    .any(|c| has_break_list(&c.stmts, label, false))
        }
        Stmt::TypeSwitch(s) => {
            label.is_some()
                && s
                    .clauses
                    .iter()
                    .any(|c| has_break_list(&c.stmts, label, false))
        }
        _ => false,
    }
}

pub fn has_break_list(stmts: &[Stmt], label: Option<&str>, implicit: bool) -> bool {
    stmts.iter().any(|s| has_break(s, label, implicit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::AstBuilder;

    fn panics(callee: &Expr) -> bool {
        callee.as_ident() == Some("panic")
    }

    #[test]
    fn trailing_empty_statements_are_ignored() {
        let b = AstBuilder::new("t.tern");
        let body = b.block_stmt(vec![b.ret(vec![b.int(1)]), b.empty(), b.empty()]);
        assert!(is_terminating(&body, &panics));
    }

    #[test]
    fn labelled_break_from_inner_loop_escapes_outer() {
        let b = AstBuilder::new("t.tern");
        let inner = b.loop_forever(vec![b.brk(Some("outer"))]);
        let outer = b.for_stmt(Some("outer"), None, None, None, vec![inner]);
        assert!(!is_terminating(&outer, &panics));

        let inner = b.loop_forever(vec![b.brk(None)]);
        let outer = b.for_stmt(Some("outer"), None, None, None, vec![inner]);
        assert!(is_terminating(&outer, &panics));
    }

    #[test]
    fn switch_needs_default_and_no_breaks() {
        let b = AstBuilder::new("t.tern");
        let no_default = b.switch(
            Some(b.name("x")),
            vec![b.case(vec![b.int(1)], vec![b.ret(vec![])])],
        );
        assert!(!is_terminating(&no_default, &panics));

        let full = b.switch(
            Some(b.name("x")),
            vec![
                b.case(vec![b.int(1)], vec![b.fallthrough()]),
                b.default_case(vec![b.ret(vec![])]),
            ],
        );
        assert!(is_terminating(&full, &panics));

        let breaking = b.switch(
            Some(b.name("x")),
            vec![b.default_case(vec![
                b.if_stmt(b.name("c"), vec![b.brk(None)], None),
                b.ret(vec![]),
            ])],
        );
        assert!(!is_terminating(&breaking, &panics));
    }

    #[test]
    fn panic_call_diverges() {
        let b = AstBuilder::new("t.tern");
        let call = b.expr_stmt(b.call(b.name("panic"), vec![b.string("boom")]));
        assert!(is_terminating(&call, &panics));
        assert!(!is_terminating(&call, &|_: &Expr| false));
        let other = b.expr_stmt(b.call(b.name("print"), vec![]));
        assert!(!is_terminating(&other, &panics));
    }
}
