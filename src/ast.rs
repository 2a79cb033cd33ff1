//! Expression nodes handed to the evaluator.
//!
//! The statement-level AST belongs to the parser layer; the evaluation core only
//! needs literals, variable references, binary operators and qualified calls.
//! Nodes that can fail at runtime carry the [`SourceLocation`] the parser
//! attached to them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque position supplied by the parser layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, Serialize, Deserialize,
)]
pub enum BinaryOperator {
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Subtract,
    #[strum(to_string = "*")]
    Multiply,
    #[strum(to_string = "/")]
    Divide,
    #[strum(to_string = "%")]
    Modulo,
    #[strum(to_string = "==")]
    Equal,
    #[strum(to_string = "!=")]
    NotEqual,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = "<=")]
    LessThanEqual,
    #[strum(to_string = ">=")]
    GreaterThanEqual,
    #[strum(to_string = "&&")]
    And,
    #[strum(to_string = "||")]
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Variable {
        name: String,
        location: SourceLocation,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        location: SourceLocation,
    },
    /// Call of a native function or connector action by qualified name
    /// (`package:name`).
    Call {
        function: String,
        arguments: Vec<Expression>,
        location: SourceLocation,
    },
}

impl Expression {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Expression::Literal(_) => None,
            Expression::Variable { location, .. }
            | Expression::Binary { location, .. }
            | Expression::Call { location, .. } => Some(location),
        }
    }

    pub fn binary(
        op: BinaryOperator,
        left: Expression,
        right: Expression,
        location: SourceLocation,
    ) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            location,
        }
    }
}
