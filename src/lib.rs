//! Compile JSON-described boolean rules into reusable predicates evaluated
//! against named event documents.
//!
//! A [`Rule`] body is a flat list of comparisons. [`build`] renders it as an
//! infix formula in which every event field becomes an escaped variable
//! token, the [`expr`] engine parses the formula, and [`bind()`] maps the free
//! variables it reports back to `(event, path)` pairs. The resulting
//! [`Condition`] pulls only the fields an evaluation actually reaches.

mod bind;
mod compile;
mod error;
mod evaluate;
pub mod expr;
pub mod path;
mod token;
mod types;

pub use bind::{bind, Bindings};
pub use compile::{build, Formula, Reference};
pub use error::RuleError;
pub use expr::{CompareOp, Expression, Function, Functions, ParseError};
pub use path::{Path, WILDCARD};
pub use types::{
    Action, Body, CompileError, Condition, Documents, EvalError, ExitPoints, Operand, Operation,
    PathError, Point, Rule, Value,
};
