use thiserror::Error;

use crate::expr::ParseError;

/// Failure to follow a path through a value tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("invalid path: segment '{segment}' does not match")]
    InvalidPath { segment: String },
}

/// Errors raised while turning a [`Rule`](crate::Rule) into a [`Condition`](crate::Condition).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("declared event names must not be empty")]
    EmptyEvent,

    #[error("duplicate declared event '{event}'")]
    DuplicateEvent { event: String },

    #[error("operand {position} of operation {index} must hold either a value or an event field")]
    InvalidOperand { index: usize, position: &'static str },

    #[error("unknown event '{event}' in operation {index}")]
    UnknownEvent { index: usize, event: String },

    #[error("variable '{variable}' is not bound to a declared event")]
    UnboundVariable { variable: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors raised while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("no document supplied for event '{event}'")]
    MissingEvent { event: String },

    #[error("variable '{variable}' has no binding")]
    UndeclaredVariable { variable: String },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("operator '{op}' cannot be applied to {operand}")]
    OperandMismatch {
        op: &'static str,
        operand: &'static str,
    },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("function '{name}' failed: {message}")]
    Function { name: String, message: String },

    #[error("expected a boolean result, got {actual}")]
    NotBoolean { actual: &'static str },
}
