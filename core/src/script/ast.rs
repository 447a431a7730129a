//! Abstract Syntax Tree node types

use serde::{Deserialize, Serialize};

/// A parsed script file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Function declarations, bound as globals before `body` runs
    pub functions: Vec<FunctionDecl>,
    /// Top-level statements, in source order
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

/// Statement AST node with its 1-based source line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(flatten)]
    pub kind: StmtKind,
    pub line: usize,
}

impl Stmt {
    pub fn new(kind: StmtKind, line: usize) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum StmtKind {
    Block {
        body: Vec<Stmt>,
    },
    Let {
        name: String,
        init: Option<Expr>,
    },
    Assign {
        target: AssignTarget,
        value: Expr,
    },
    If {
        test: Expr,
        then_s: Box<Stmt>,
        else_s: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        catch_var: String,
        handler: Vec<Stmt>,
    },
    Return {
        value: Option<Expr>,
    },
    Throw {
        value: Expr,
    },
    Break,
    Continue,
    Expr {
        expr: Expr,
    },
}

/// Left-hand side of an assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum AssignTarget {
    Ident { name: String },
    Member { object: Expr, property: String },
    Index { object: Expr, index: Expr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

/// Expression AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    LitNull,
    LitBool { v: bool },
    LitNum { v: f64 },
    LitStr { v: String },
    List { items: Vec<Expr> },
    Obj { props: Vec<(String, Expr)> },
    Ident { name: String },
    Member { object: Box<Expr>, property: String },
    Index { object: Box<Expr>, index: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr>, line: usize },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Logical { op: LogicalOp, left: Box<Expr>, right: Box<Expr> },
}
