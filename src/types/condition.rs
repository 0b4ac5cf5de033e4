use std::fmt;

use super::documents::Documents;
use super::error::EvalError;
use super::value::Value;
use crate::expr::Expression;
use crate::Bindings;

/// A compiled rule predicate.
///
/// Immutable once built; evaluate it as often as needed, from any number of
/// threads, against different sets of event documents.
#[derive(Debug, Clone)]
pub struct Condition {
    expression: Expression,
    bindings: Bindings,
}

impl Condition {
    /// Pair a parsed expression with the bindings for its free variables.
    #[must_use]
    pub fn new(expression: Expression, bindings: Bindings) -> Self {
        Self {
            expression,
            bindings,
        }
    }

    /// Evaluate against `documents`, resolving only the variables the
    /// evaluation actually reaches.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if a reached variable has no binding, its event
    /// has no document, its path does not resolve, or an operator or
    /// function rejects its operands.
    pub fn evaluate<D: Documents + ?Sized>(&self, documents: &D) -> Result<Value, EvalError> {
        crate::evaluate::evaluate(&self.expression, &self.bindings, documents)
    }

    /// Evaluate and require a boolean result.
    ///
    /// # Errors
    ///
    /// As [`evaluate`](Self::evaluate), plus [`EvalError::NotBoolean`] when
    /// the result is not a boolean.
    pub fn matches<D: Documents + ?Sized>(&self, documents: &D) -> Result<bool, EvalError> {
        let value = self.evaluate(documents)?;
        value.as_bool().ok_or(EvalError::NotBoolean {
            actual: value.type_name(),
        })
    }

    /// The rendered formula.
    #[must_use]
    pub fn formula(&self) -> &str {
        self.expression.source()
    }

    /// Free variables surviving parsing.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.expression.variables()
    }

    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.formula())
    }
}
