#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use miette::SourceSpan;

mod build;
mod display;

pub use build::AstBuilder;

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

/// Stable identity of a syntax node. Annotation maps produced by the
/// checker are keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.file, self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: Arc<str>,
    pub pos: Pos,
    pub span: Span,
}

impl Token {
    pub fn new(text: impl Into<Arc<str>>, pos: Pos, span: Span) -> Self {
        Self {
            text: text.into(),
            pos,
            span,
        }
    }
}

/// A name in declaring position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub id: NodeId,
    pub token: Token,
}

impl Ident {
    pub fn name(&self) -> &str {
        &self.token.text
    }

    pub fn is_discard(&self) -> bool {
        self.name() == "_"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct File {
    pub path: Arc<str>,
    pub decls: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub open: Token,
    pub close: Token,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Empty(Token),
    Bad(Token),
    Expr(Expr),
    IncDec(IncDecStmt),
    Assign(AssignStmt),
    Block(Block),
    If(IfStmt),
    For(ForStmt),
    Switch(SwitchStmt),
    TypeSwitch(TypeSwitchStmt),
    Return(ReturnStmt),
    Defer(DeferStmt),
    Branch(BranchStmt),
    Using(UsingStmt),
    Decl(Decl),
}

impl Stmt {
    pub fn token(&self) -> &Token {
        match self {
            Stmt::Empty(t) | Stmt::Bad(t) => t,
            Stmt::Expr(e) => &e.token,
            Stmt::IncDec(s) => &s.token,
            Stmt::Assign(s) => &s.token,
            Stmt::Block(b) => &b.open,
            Stmt::If(s) => &s.token,
            Stmt::For(s) => &s.token,
            Stmt::Switch(s) => &s.token,
            Stmt::TypeSwitch(s) => &s.token,
            Stmt::Return(s) => &s.token,
            Stmt::Defer(s) => &s.token,
            Stmt::Branch(s) => &s.token,
            Stmt::Using(s) => &s.token,
            Stmt::Decl(d) => d.token(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncDec {
    Inc,
    Dec,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IncDecStmt {
    pub token: Token,
    pub op: IncDec,
    pub expr: Expr,
}

/// `=` when `op` is `None`, otherwise `op=`.
#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub token: Token,
    pub op: Option<BinaryOp>,
    pub lhs: Vec<Expr>,
    pub rhs: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub id: NodeId,
    pub token: Token,
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub body: Block,
    pub else_stmt: Option<Box<Stmt>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub id: NodeId,
    pub token: Token,
    pub label: Option<Ident>,
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub id: NodeId,
    pub token: Token,
    /// Empty for `default`.
    pub list: Vec<Expr>,
    pub stmts: Vec<Stmt>,
}

impl CaseClause {
    pub fn is_default(&self) -> bool {
        self.list.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchStmt {
    pub id: NodeId,
    pub token: Token,
    pub label: Option<Ident>,
    pub init: Option<Box<Stmt>>,
    pub tag: Option<Expr>,
    pub clauses: Vec<CaseClause>,
}

/// `switch v in expr { case T: ... }`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSwitchStmt {
    pub id: NodeId,
    pub token: Token,
    pub label: Option<Ident>,
    pub var: Ident,
    pub expr: Expr,
    pub clauses: Vec<CaseClause>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub token: Token,
    pub results: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeferStmt {
    pub token: Token,
    pub stmt: Box<Stmt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Fallthrough,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BranchStmt {
    pub token: Token,
    pub kind: BranchKind,
    pub label: Option<Ident>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UsingStmt {
    pub token: Token,
    pub list: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Const(ConstDecl),
    Type(TypeDecl),
    Proc(ProcDecl),
    Import(ImportDecl),
}

impl Decl {
    pub fn token(&self) -> &Token {
        match self {
            Decl::Var(d) => &d.token,
            Decl::Const(d) => &d.token,
            Decl::Type(d) => &d.token,
            Decl::Proc(d) => &d.token,
            Decl::Import(d) => &d.token,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub token: Token,
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
    pub is_using: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstDecl {
    pub token: Token,
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    pub token: Token,
    pub name: Ident,
    pub ty: Expr,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcTags {
    pub foreign: bool,
    pub inline: bool,
    pub no_inline: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcDecl {
    pub token: Token,
    pub name: Ident,
    pub ty: ProcTypeExpr,
    pub body: Option<Block>,
    pub tags: ProcTags,
    /// `#foreign "external_name"`
    pub foreign_name: Option<Token>,
    /// `#link_name "symbol"`
    pub link_name: Option<Token>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportDecl {
    pub token: Token,
    pub path: Token,
    pub name: Option<Ident>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub names: Vec<Ident>,
    pub ty: Expr,
    pub is_using: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumField {
    pub name: Ident,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcTypeExpr {
    pub id: NodeId,
    pub token: Token,
    pub params: Vec<Field>,
    pub results: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub token: Token,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i128),
    Float(f64),
    Str(Arc<str>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    AddrOf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Ident(Arc<str>),
    Literal(Literal),
    Paren(Box<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Selector {
        expr: Box<Expr>,
        field: Ident,
    },

    // Type expressions.
    Pointer(Box<Expr>),
    /// `[N]T`, or `[]T` when `count` is `None`.
    Array {
        count: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    Struct(Vec<Field>),
    Union(Vec<Field>),
    Enum {
        base: Option<Box<Expr>>,
        fields: Vec<EnumField>,
    },
    Proc(ProcTypeExpr),
}

impl Expr {
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }
}
