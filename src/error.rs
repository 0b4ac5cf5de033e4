use thiserror::Error;

use crate::{CompileError, EvalError};

/// Unified error type covering rule loading, compilation and evaluation.
///
/// Returned by [`Rule::from_json()`](crate::Rule::from_json) and
/// [`Rule::from_file()`](crate::Rule::from_file); the narrower errors
/// convert into it with `?`.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
