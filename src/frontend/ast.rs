// Surface AST for Source: the shape every later stage is defined over.
// Every node carries a `Span`; spans are diagnostic-only (see SPEC_FULL §3
// ADDITIONS) and must never influence desugaring, flattening or codegen.

use crate::diagnostics::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ctx {
    Load,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    USub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Constant, Span),
    Name(String, Ctx, Span),
    UnaryOp { op: UnaryOp, operand: Box<Expr>, span: Span },
    BinOp { op: BinOp, left: Box<Expr>, right: Box<Expr>, span: Span },
    BoolOp { op: BoolOp, values: Vec<Expr>, span: Span },
    Compare { left: Box<Expr>, ops: Vec<CmpOp>, comparators: Vec<Expr>, span: Span },
    IfExp { test: Box<Expr>, body: Box<Expr>, orelse: Box<Expr>, span: Span },
    Call { callee: String, args: Vec<Expr>, span: Span },
    Lambda { params: Vec<String>, body: Box<Expr>, span: Span },
    List { elts: Vec<Expr>, span: Span },
    Dict { keys: Vec<Expr>, values: Vec<Expr>, span: Span },
    Subscript { value: Box<Expr>, index: Box<Expr>, ctx: Ctx, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Constant(_, s)
            | Expr::Name(_, _, s)
            | Expr::UnaryOp { span: s, .. }
            | Expr::BinOp { span: s, .. }
            | Expr::BoolOp { span: s, .. }
            | Expr::Compare { span: s, .. }
            | Expr::IfExp { span: s, .. }
            | Expr::Call { span: s, .. }
            | Expr::Lambda { span: s, .. }
            | Expr::List { span: s, .. }
            | Expr::Dict { span: s, .. }
            | Expr::Subscript { span: s, .. } => *s,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Expr::Constant(..) | Expr::Name(..))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Name(String, Span),
    Subscript { value: Box<Expr>, index: Box<Expr>, span: Span },
}

impl LValue {
    pub fn span(&self) -> Span {
        match self {
            LValue::Name(_, s) => *s,
            LValue::Subscript { span: s, .. } => *s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { target: LValue, value: Expr, span: Span },
    Expr(Expr),
    If { test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>, span: Span },
    While { test: Expr, body: Vec<Stmt>, span: Span },
    Break(Span),
    Return { value: Option<Expr>, span: Span },
    FunctionDef { name: String, params: Vec<String>, body: Vec<Stmt>, span: Span },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }
}
