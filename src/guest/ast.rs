use std::{fmt, sync::Arc};

use super::token::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Rem => "%",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Integer {
        value: i64,
        position: Position,
    },
    Float {
        value: f64,
        position: Position,
    },
    String {
        value: Arc<str>,
        position: Position,
    },
    Boolean {
        value: bool,
        position: Position,
    },
    /// `nil`, `null` and `undefined`.
    Nil {
        position: Position,
    },
    Identifier {
        name: Arc<str>,
        position: Position,
    },
    Prefix {
        operator: PrefixOp,
        right: Box<Expression>,
        position: Position,
    },
    Infix {
        left: Box<Expression>,
        operator: InfixOp,
        right: Box<Expression>,
        position: Position,
    },
    /// `Math.PI` (JS) or `Math::PI` (Ruby).
    Member {
        object: Box<Expression>,
        member: Arc<str>,
        position: Position,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
        position: Position,
    },
    /// Arrow function (JS) or stabby lambda (Ruby).
    Lambda {
        parameters: Vec<Arc<str>>,
        body: Arc<Block>,
        position: Position,
    },
    /// Ruby `defined?(NAME)`.
    Defined {
        name: Arc<str>,
        position: Position,
    },
}

impl Expression {
    pub fn position(&self) -> Position {
        match self {
            Expression::Integer { position, .. }
            | Expression::Float { position, .. }
            | Expression::String { position, .. }
            | Expression::Boolean { position, .. }
            | Expression::Nil { position }
            | Expression::Identifier { position, .. }
            | Expression::Prefix { position, .. }
            | Expression::Infix { position, .. }
            | Expression::Member { position, .. }
            | Expression::Call { position, .. }
            | Expression::Lambda { position, .. }
            | Expression::Defined { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// JS `const`/`let` declaration or Ruby assignment.
    Assign {
        name: Arc<str>,
        value: Expression,
        position: Position,
    },
    Return {
        value: Option<Expression>,
        position: Position,
    },
    Expression {
        expression: Expression,
    },
    /// Ruby statement modifier: `stmt if cond` / `stmt unless cond`.
    Guarded {
        statement: Box<Statement>,
        condition: Expression,
        negated: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

/// A parsed fragment: its value is the completion value of the last statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}
