mod condition;
mod documents;
mod error;
mod rule;
mod value;

pub use condition::Condition;
pub use documents::Documents;
pub use error::{CompileError, EvalError, PathError};
pub(crate) use rule::OperandKind;
pub use rule::{Action, Body, ExitPoints, Operand, Operation, Point, Rule};
pub use value::Value;
