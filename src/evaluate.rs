use tracing::trace;

use crate::expr::Expression;
use crate::{Bindings, Documents, EvalError, Value};

/// Evaluate `expression`, resolving each variable it reaches through
/// `bindings` into the matching document.
pub(crate) fn evaluate<'a, D>(
    expression: &'a Expression,
    bindings: &'a Bindings,
    documents: &'a D,
) -> Result<Value, EvalError>
where
    D: Documents + ?Sized,
{
    expression.eval(|variable| {
        let (event, path) =
            bindings
                .lookup(variable)
                .ok_or_else(|| EvalError::UndeclaredVariable {
                    variable: variable.to_owned(),
                })?;
        let document = documents
            .document(event)
            .ok_or_else(|| EvalError::MissingEvent {
                event: event.to_owned(),
            })?;
        let value = path.resolve(document)?;
        trace!(variable, event, path = %path, "resolved variable");
        Ok(value)
    })
}
