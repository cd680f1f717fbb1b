use std::cell::Cell;
use std::sync::Arc;

use crate::{
    AssignStmt, BinaryOp, Block, BranchKind, BranchStmt, CaseClause, ConstDecl, Decl, DeferStmt,
    EnumField, Expr, ExprKind, Field, File, ForStmt, Ident, IfStmt, ImportDecl, IncDec,
    IncDecStmt, Literal, NodeId, Pos, ProcDecl, ProcTags, ProcTypeExpr, ReturnStmt, Stmt,
    SwitchStmt, Token, TypeDecl, TypeSwitchStmt, UnaryOp, UsingStmt, VarDecl, span,
};

/// Builds syntax trees without a parser.
///
/// Every token gets its own line, so any two tokens have distinct positions
/// and diagnostics can be matched back to the node that produced them.
/// Children are built before their parents, which means a parent's token
/// always sits on a later line than the tokens inside it.
pub struct AstBuilder {
    file: Arc<str>,
    next_id: Cell<u32>,
    next_line: Cell<u32>,
    offset: Cell<usize>,
}

impl AstBuilder {
    pub fn new(file: &str) -> Self {
        Self {
            file: Arc::from(file),
            next_id: Cell::new(0),
            next_line: Cell::new(1),
            offset: Cell::new(0),
        }
    }

    pub fn path(&self) -> &str {
        &self.file
    }

    fn node_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId(id)
    }

    pub fn token(&self, text: &str) -> Token {
        let line = self.next_line.get();
        self.next_line.set(line + 1);
        let start = self.offset.get();
        self.offset.set(start + text.len() + 1);
        Token::new(
            text,
            Pos {
                file: self.file.clone(),
                line,
                column: 1,
            },
            span(start, text.len()),
        )
    }

    fn expr(&self, text: &str, kind: ExprKind) -> Expr {
        Expr {
            id: self.node_id(),
            token: self.token(text),
            kind,
        }
    }

    pub fn file(&self, decls: Vec<Stmt>) -> File {
        File {
            path: self.file.clone(),
            decls,
        }
    }

    pub fn ident(&self, name: &str) -> Ident {
        Ident {
            id: self.node_id(),
            token: self.token(name),
        }
    }

    // Expressions

    pub fn name(&self, name: &str) -> Expr {
        self.expr(name, ExprKind::Ident(Arc::from(name)))
    }

    pub fn int(&self, value: i128) -> Expr {
        self.expr(&value.to_string(), ExprKind::Literal(Literal::Int(value)))
    }

    pub fn float(&self, value: f64) -> Expr {
        self.expr(&value.to_string(), ExprKind::Literal(Literal::Float(value)))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(value, ExprKind::Literal(Literal::Str(Arc::from(value))))
    }

    pub fn paren(&self, inner: Expr) -> Expr {
        self.expr("(", ExprKind::Paren(Box::new(inner)))
    }

    pub fn unary(&self, op: UnaryOp, expr: Expr) -> Expr {
        let text = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::AddrOf => "&",
        };
        self.expr(
            text,
            ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
        )
    }

    pub fn binary(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(
            op.symbol(),
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    pub fn call(&self, func: Expr, args: Vec<Expr>) -> Expr {
        self.expr(
            "(",
            ExprKind::Call {
                func: Box::new(func),
                args,
            },
        )
    }

    pub fn selector(&self, expr: Expr, field: &str) -> Expr {
        let field = self.ident(field);
        self.expr(
            ".",
            ExprKind::Selector {
                expr: Box::new(expr),
                field,
            },
        )
    }

    // Type expressions

    pub fn pointer(&self, elem: Expr) -> Expr {
        self.expr("^", ExprKind::Pointer(Box::new(elem)))
    }

    pub fn array(&self, count: Expr, elem: Expr) -> Expr {
        self.expr(
            "[",
            ExprKind::Array {
                count: Some(Box::new(count)),
                elem: Box::new(elem),
            },
        )
    }

    pub fn slice(&self, elem: Expr) -> Expr {
        self.expr(
            "[",
            ExprKind::Array {
                count: None,
                elem: Box::new(elem),
            },
        )
    }

    pub fn field(&self, name: &str, ty: Expr) -> Field {
        Field {
            names: vec![self.ident(name)],
            ty,
            is_using: false,
        }
    }

    pub fn using_field(&self, name: &str, ty: Expr) -> Field {
        Field {
            is_using: true,
            ..self.field(name, ty)
        }
    }

    pub fn struct_type(&self, fields: Vec<Field>) -> Expr {
        self.expr("struct", ExprKind::Struct(fields))
    }

    pub fn union_type(&self, fields: Vec<Field>) -> Expr {
        self.expr("union", ExprKind::Union(fields))
    }

    pub fn enum_type(&self, base: Option<Expr>, members: Vec<(&str, Option<Expr>)>) -> Expr {
        let fields = members
            .into_iter()
            .map(|(name, value)| EnumField {
                name: self.ident(name),
                value,
            })
            .collect();
        self.expr(
            "enum",
            ExprKind::Enum {
                base: base.map(Box::new),
                fields,
            },
        )
    }

    pub fn proc_type(&self, params: Vec<Field>, results: Vec<Expr>) -> ProcTypeExpr {
        ProcTypeExpr {
            id: self.node_id(),
            token: self.token("proc"),
            params,
            results,
        }
    }

    pub fn proc_type_expr(&self, params: Vec<Field>, results: Vec<Expr>) -> Expr {
        let pt = self.proc_type(params, results);
        Expr {
            id: self.node_id(),
            token: pt.token.clone(),
            kind: ExprKind::Proc(pt),
        }
    }

    // Declarations

    fn idents(&self, names: &[&str]) -> Vec<Ident> {
        names.iter().map(|n| self.ident(n)).collect()
    }

    pub fn var(&self, names: &[&str], ty: Option<Expr>, values: Vec<Expr>) -> Stmt {
        let names = self.idents(names);
        Stmt::Decl(Decl::Var(VarDecl {
            token: self.token(":="),
            names,
            ty,
            values,
            is_using: false,
        }))
    }

    pub fn using_var(&self, name: &str, ty: Expr) -> Stmt {
        let names = vec![self.ident(name)];
        Stmt::Decl(Decl::Var(VarDecl {
            token: self.token("using"),
            names,
            ty: Some(ty),
            values: Vec::new(),
            is_using: true,
        }))
    }

    pub fn constant(&self, names: &[&str], ty: Option<Expr>, values: Vec<Expr>) -> Stmt {
        let names = self.idents(names);
        Stmt::Decl(Decl::Const(ConstDecl {
            token: self.token("::"),
            names,
            ty,
            values,
        }))
    }

    pub fn type_decl(&self, name: &str, ty: Expr) -> Stmt {
        let name = self.ident(name);
        Stmt::Decl(Decl::Type(TypeDecl {
            token: self.token("type"),
            name,
            ty,
        }))
    }

    pub fn proc_decl(&self, name: &str, ty: ProcTypeExpr, body: Option<Block>) -> ProcDecl {
        let name = self.ident(name);
        ProcDecl {
            token: self.token("proc"),
            name,
            ty,
            body,
            tags: ProcTags::default(),
            foreign_name: None,
            link_name: None,
        }
    }

    pub fn proc(&self, name: &str, ty: ProcTypeExpr, body: Vec<Stmt>) -> Stmt {
        let body = self.block(body);
        Stmt::Decl(Decl::Proc(self.proc_decl(name, ty, Some(body))))
    }

    /// `name :: proc(...) #foreign "external"`
    pub fn foreign_proc(&self, name: &str, external: Option<&str>, ty: ProcTypeExpr) -> Stmt {
        let mut decl = self.proc_decl(name, ty, None);
        decl.tags.foreign = true;
        decl.foreign_name = external.map(|e| self.token(e));
        Stmt::Decl(Decl::Proc(decl))
    }

    pub fn import(&self, path: &str, name: Option<&str>) -> Stmt {
        let path = self.token(path);
        let name = name.map(|n| self.ident(n));
        Stmt::Decl(Decl::Import(ImportDecl {
            token: self.token("import"),
            path,
            name,
        }))
    }

    // Statements

    pub fn empty(&self) -> Stmt {
        Stmt::Empty(self.token(";"))
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    pub fn assign(&self, lhs: Vec<Expr>, rhs: Vec<Expr>) -> Stmt {
        Stmt::Assign(AssignStmt {
            token: self.token("="),
            op: None,
            lhs,
            rhs,
        })
    }

    pub fn op_assign(&self, op: BinaryOp, lhs: Vec<Expr>, rhs: Vec<Expr>) -> Stmt {
        Stmt::Assign(AssignStmt {
            token: self.token(&format!("{}=", op.symbol())),
            op: Some(op),
            lhs,
            rhs,
        })
    }

    pub fn inc(&self, expr: Expr) -> Stmt {
        Stmt::IncDec(IncDecStmt {
            token: self.token("++"),
            op: IncDec::Inc,
            expr,
        })
    }

    pub fn dec(&self, expr: Expr) -> Stmt {
        Stmt::IncDec(IncDecStmt {
            token: self.token("--"),
            op: IncDec::Dec,
            expr,
        })
    }

    pub fn block(&self, stmts: Vec<Stmt>) -> Block {
        let open = self.token("{");
        Block {
            id: self.node_id(),
            open,
            close: self.token("}"),
            stmts,
        }
    }

    pub fn block_stmt(&self, stmts: Vec<Stmt>) -> Stmt {
        Stmt::Block(self.block(stmts))
    }

    pub fn if_stmt(&self, cond: Expr, body: Vec<Stmt>, else_stmt: Option<Stmt>) -> Stmt {
        self.if_init(None, cond, body, else_stmt)
    }

    pub fn if_init(
        &self,
        init: Option<Stmt>,
        cond: Expr,
        body: Vec<Stmt>,
        else_stmt: Option<Stmt>,
    ) -> Stmt {
        let body = self.block(body);
        Stmt::If(IfStmt {
            id: self.node_id(),
            token: self.token("if"),
            init: init.map(Box::new),
            cond,
            body,
            else_stmt: else_stmt.map(Box::new),
        })
    }

    pub fn for_stmt(
        &self,
        label: Option<&str>,
        init: Option<Stmt>,
        cond: Option<Expr>,
        post: Option<Stmt>,
        body: Vec<Stmt>,
    ) -> Stmt {
        let label = label.map(|l| self.ident(l));
        let body = self.block(body);
        Stmt::For(ForStmt {
            id: self.node_id(),
            token: self.token("for"),
            label,
            init: init.map(Box::new),
            cond,
            post: post.map(Box::new),
            body,
        })
    }

    /// `for { ... }`
    pub fn loop_forever(&self, body: Vec<Stmt>) -> Stmt {
        self.for_stmt(None, None, None, None, body)
    }

    pub fn case(&self, list: Vec<Expr>, stmts: Vec<Stmt>) -> CaseClause {
        CaseClause {
            id: self.node_id(),
            token: self.token("case"),
            list,
            stmts,
        }
    }

    pub fn default_case(&self, stmts: Vec<Stmt>) -> CaseClause {
        self.case(Vec::new(), stmts)
    }

    pub fn switch(&self, tag: Option<Expr>, clauses: Vec<CaseClause>) -> Stmt {
        self.labeled_switch(None, tag, clauses)
    }

    pub fn labeled_switch(
        &self,
        label: Option<&str>,
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
    ) -> Stmt {
        let label = label.map(|l| self.ident(l));
        Stmt::Switch(SwitchStmt {
            id: self.node_id(),
            token: self.token("switch"),
            label,
            init: None,
            tag,
            clauses,
        })
    }

    pub fn type_switch(&self, var: &str, expr: Expr, clauses: Vec<CaseClause>) -> Stmt {
        let var = self.ident(var);
        Stmt::TypeSwitch(TypeSwitchStmt {
            id: self.node_id(),
            token: self.token("switch"),
            label: None,
            var,
            expr,
            clauses,
        })
    }

    pub fn ret(&self, results: Vec<Expr>) -> Stmt {
        Stmt::Return(ReturnStmt {
            token: self.token("return"),
            results,
        })
    }

    pub fn defer(&self, stmt: Stmt) -> Stmt {
        Stmt::Defer(DeferStmt {
            token: self.token("defer"),
            stmt: Box::new(stmt),
        })
    }

    fn branch(&self, kind: BranchKind, text: &str, label: Option<&str>) -> Stmt {
        let label = label.map(|l| self.ident(l));
        Stmt::Branch(BranchStmt {
            token: self.token(text),
            kind,
            label,
        })
    }

    pub fn brk(&self, label: Option<&str>) -> Stmt {
        self.branch(BranchKind::Break, "break", label)
    }

    pub fn cont(&self, label: Option<&str>) -> Stmt {
        self.branch(BranchKind::Continue, "continue", label)
    }

    pub fn fallthrough(&self) -> Stmt {
        self.branch(BranchKind::Fallthrough, "fallthrough", None)
    }

    pub fn using(&self, list: Vec<Expr>) -> Stmt {
        Stmt::Using(UsingStmt {
            token: self.token("using"),
            list,
        })
    }
}
