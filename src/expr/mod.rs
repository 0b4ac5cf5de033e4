//! A small infix expression engine.
//!
//! Formulas are parsed once into an [`Expression`], which reports its free
//! variables and can then be evaluated any number of times. Values for
//! variables are pulled lazily through a callback, so a branch skipped by
//! `&&`/`||` never asks for its variables.

mod ast;
mod error;
mod eval;
mod function;
mod grammar;

use std::borrow::Cow;
use std::fmt;

pub use ast::CompareOp;
pub use error::ParseError;
pub use function::{Function, Functions};

use crate::{EvalError, Value};

use ast::Node;

/// A parsed formula.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Node,
    variables: Vec<String>,
    functions: Functions,
}

impl Expression {
    /// Parse `formula`, checking every function call against `functions`.
    ///
    /// Logical connectives whose first operand is a constant that decides
    /// the result are folded away; variables on the discarded side are not
    /// reported by [`variables`](Self::variables). Calls are checked before
    /// folding, so an unknown function is rejected even on a discarded side.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for malformed text or calls to unknown functions.
    pub fn parse(formula: &str, functions: &Functions) -> Result<Self, ParseError> {
        use winnow::Parser;
        let root = grammar::parse_formula.parse(formula).map_err(|e| {
            let message = e.inner().to_string();
            let message = match message.trim() {
                "" => "unexpected input".to_owned(),
                trimmed => trimmed.replace('\n', "; "),
            };
            ParseError::at(message, e.offset())
        })?;
        root.check_calls(functions)?;
        let root = root.fold();

        let mut variables = Vec::new();
        root.collect_variables(&mut variables);

        Ok(Self {
            source: formula.to_owned(),
            root,
            variables,
            functions: functions.clone(),
        })
    }

    /// The formula text this expression was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct free variable names, in order of first appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    /// Evaluate, asking `resolve` for each variable the evaluation reaches.
    /// Each variable is resolved at most once per call.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `resolve`, a function, or an
    /// operator applied to values of the wrong type.
    pub fn eval<'a, F>(&'a self, resolve: F) -> Result<Value, EvalError>
    where
        F: FnMut(&str) -> Result<Cow<'a, Value>, EvalError>,
    {
        eval::Scope::new(&self.functions, resolve)
            .eval(&self.root)
            .map(Cow::into_owned)
    }
}

/// Renders the parsed tree with explicit parentheses.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use super::*;

    fn parse(text: &str) -> Expression {
        Expression::parse(text, &Functions::builtin()).unwrap()
    }

    fn eval_with(expr: &Expression, vars: &HashMap<&str, Value>) -> Result<Value, EvalError> {
        expr.eval(|name| {
            vars.get(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| EvalError::UndeclaredVariable {
                    variable: name.to_owned(),
                })
        })
    }

    fn constant(text: &str) -> Value {
        parse(text).eval(|_| unreachable!()).unwrap()
    }

    #[test]
    fn literal_only_formula_has_no_variables() {
        let expr = parse("1 < 2 && 'a' == 'a'");
        assert_eq!(expr.variables().count(), 0);
        assert_eq!(constant("1 < 2 && 'a' == 'a'"), Value::Bool(true));
    }

    #[test]
    fn variables_are_distinct_in_order() {
        let expr = parse("b > 1 && a < 2 || b == 3");
        assert_eq!(expr.variables().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn folding_drops_unreachable_variables() {
        let expr = parse("false && x == 1 || y == 2");
        assert_eq!(expr.variables().collect::<Vec<_>>(), ["y"]);
        let expr = parse("true || x == 1");
        assert_eq!(expr.variables().count(), 0);
    }

    #[test]
    fn unknown_function_rejected_at_parse() {
        let err = Expression::parse("upper(x) == 'A'", &Functions::builtin()).unwrap_err();
        assert_eq!(err.to_string(), "parse error: unknown function 'upper'");
    }

    #[test]
    fn unknown_function_rejected_in_folded_branch() {
        let err = Expression::parse("false && nope(x) == 1", &Functions::builtin()).unwrap_err();
        assert_eq!(err.to_string(), "parse error: unknown function 'nope'");
        let err = Expression::parse("true || nope(1)", &Functions::builtin()).unwrap_err();
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn syntax_error_reports_offset() {
        let err = Expression::parse("x == 1 )", &Functions::builtin()).unwrap_err();
        assert_eq!(err.offset(), Some(7));
        assert!(err.to_string().starts_with("parse error at byte 7: "));
        assert!(!err.message().is_empty());
    }

    #[test]
    fn int_function_is_a_type_hint() {
        let expr = parse("int(x) > 3");
        let vars = HashMap::from([("x", Value::Number(4.0))]);
        assert_eq!(eval_with(&expr, &vars).unwrap(), Value::Bool(true));
    }

    #[test]
    fn custom_function() {
        let functions = Functions::builtin().with("count", |args| match args {
            [Value::Sequence(items)] => Ok(Value::from(items.len() as i64)),
            _ => Ok(Value::Null),
        });
        let expr = Expression::parse("count(x) == 2", &functions).unwrap();
        let vars = HashMap::from([(
            "x",
            Value::Sequence(vec![Value::Number(1.0), Value::Number(2.0)]),
        )]);
        assert_eq!(eval_with(&expr, &vars).unwrap(), Value::Bool(true));
    }

    #[test]
    fn and_short_circuits() {
        let calls = Cell::new(0);
        let expr = parse("a == 1 && b == 2");
        let result = expr.eval(|name| {
            calls.set(calls.get() + 1);
            match name {
                "a" => Ok(Cow::Owned(Value::Number(0.0))),
                _ => panic!("b must not be resolved"),
            }
        });
        assert_eq!(result.unwrap(), Value::Bool(false));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn or_short_circuits() {
        let expr = parse("a == 1 || b == 2");
        let result = expr.eval(|name| match name {
            "a" => Ok(Cow::Owned(Value::Number(1.0))),
            _ => panic!("b must not be resolved"),
        });
        assert_eq!(result.unwrap(), Value::Bool(true));
    }

    #[test]
    fn variable_resolved_once_per_call() {
        let calls = Cell::new(0);
        let expr = parse("a > 1 && a < 10 && a != 5");
        let result = expr.eval(|_| {
            calls.set(calls.get() + 1);
            Ok(Cow::Owned(Value::Number(3.0)))
        });
        assert_eq!(result.unwrap(), Value::Bool(true));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn resolution_error_aborts_evaluation() {
        let expr = parse("a == 1 || b == 2");
        let result = expr.eval(|name| {
            Err(EvalError::MissingEvent {
                event: name.to_owned(),
            })
        });
        assert_eq!(
            result,
            Err(EvalError::MissingEvent { event: "a".into() })
        );
    }

    #[test]
    fn comparisons_and_arithmetic() {
        assert_eq!(constant("2 + 3 * 4 == 14"), Value::Bool(true));
        assert_eq!(constant("(2 + 3) * 4"), Value::Number(20.0));
        assert_eq!(constant("-3 + 1"), Value::Number(-2.0));
        assert_eq!(constant("'abc' < 'abd'"), Value::Bool(true));
        assert_eq!(constant("'n' + 1"), Value::from("n1"));
        assert_eq!(constant("!(1 > 2)"), Value::Bool(true));
        assert_eq!(constant("null == null"), Value::Bool(true));
    }

    #[test]
    fn membership() {
        assert_eq!(constant("2 in (1, 2, 3)"), Value::Bool(true));
        assert_eq!(constant("'x' in ('a', 'b')"), Value::Bool(false));
        let expr = parse("'ok' in statuses");
        let vars = HashMap::from([(
            "statuses",
            Value::Sequence(vec![Value::from("bad"), Value::from("ok")]),
        )]);
        assert_eq!(eval_with(&expr, &vars).unwrap(), Value::Bool(true));
    }

    #[test]
    fn sequence_equality_against_list_literal() {
        let expr = parse("ids == (1, 2)");
        let vars = HashMap::from([(
            "ids",
            Value::Sequence(vec![Value::Number(1.0), Value::Number(2.0)]),
        )]);
        assert_eq!(eval_with(&expr, &vars).unwrap(), Value::Bool(true));
    }

    #[test]
    fn type_errors() {
        let expr = parse("'a' > 1");
        assert_eq!(
            expr.eval(|_| unreachable!()),
            Err(EvalError::TypeMismatch {
                op: ">",
                left: "string",
                right: "number"
            })
        );
        let expr = parse("1 && true");
        assert_eq!(
            expr.eval(|_| unreachable!()),
            Err(EvalError::OperandMismatch {
                op: "&&",
                operand: "number"
            })
        );
    }

    #[test]
    fn display_and_source() {
        let expr = parse(r"skud\:level == 'high' && x > 1");
        assert_eq!(expr.source(), r"skud\:level == 'high' && x > 1");
        assert_eq!(expr.to_string(), r"((skud\:level == 'high') && (x > 1))");
    }

    #[test]
    fn expression_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expression>();
    }
}
