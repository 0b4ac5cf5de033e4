use std::borrow::Cow;
use std::collections::HashMap;

use crate::{EvalError, Value};

use super::ast::{ArithOp, Node};
use super::Functions;

/// State of one evaluation: the resolution callback and the variables it
/// has already produced during this call.
pub(crate) struct Scope<'a, 'e, F> {
    resolve: F,
    functions: &'e Functions,
    resolved: HashMap<&'e str, Cow<'a, Value>>,
}

impl<'a, 'e, F> Scope<'a, 'e, F>
where
    'e: 'a,
    F: FnMut(&str) -> Result<Cow<'a, Value>, EvalError>,
{
    pub(crate) fn new(functions: &'e Functions, resolve: F) -> Self {
        Self {
            resolve,
            functions,
            resolved: HashMap::new(),
        }
    }

    pub(crate) fn eval(&mut self, node: &'e Node) -> Result<Cow<'a, Value>, EvalError> {
        match node {
            Node::Literal(v) => Ok(Cow::Borrowed(v)),
            Node::Var(name) => self.variable(name),
            Node::List(items) => {
                let values = items
                    .iter()
                    .map(|n| self.eval(n).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Cow::Owned(Value::Sequence(values)))
            }
            Node::Not(inner) => Ok(boolean(!self.truth("!", inner)?)),
            Node::Neg(inner) => {
                let v = self.eval(inner)?;
                match v.as_ref() {
                    Value::Number(n) => Ok(Cow::Owned(Value::Number(-n))),
                    other => Err(EvalError::OperandMismatch {
                        op: "-",
                        operand: other.type_name(),
                    }),
                }
            }
            Node::And(items) => {
                for item in items {
                    if !self.truth("&&", item)? {
                        return Ok(boolean(false));
                    }
                }
                Ok(boolean(true))
            }
            Node::Or(items) => {
                for item in items {
                    if self.truth("||", item)? {
                        return Ok(boolean(true));
                    }
                }
                Ok(boolean(false))
            }
            Node::Compare(op, a, b) => {
                let l = self.eval(a)?;
                let r = self.eval(b)?;
                l.compare(*op, &r)
                    .map(boolean)
                    .ok_or_else(|| mismatch(op.symbol(), &l, &r))
            }
            Node::In(a, b) => {
                let needle = self.eval(a)?;
                let haystack = self.eval(b)?;
                let found = match haystack.as_ref() {
                    Value::Sequence(items) => items.contains(&*needle),
                    Value::Mapping(entries) => entries.values().any(|v| *v == *needle),
                    other => *other == *needle,
                };
                Ok(boolean(found))
            }
            Node::Arith(op, a, b) => {
                let l = self.eval(a)?;
                let r = self.eval(b)?;
                arith(*op, &l, &r).map(Cow::Owned)
            }
            Node::Call(name, args) => {
                let functions = self.functions;
                let function = functions
                    .get(name)
                    .ok_or_else(|| EvalError::UnknownFunction { name: name.clone() })?;
                let values = args
                    .iter()
                    .map(|n| self.eval(n).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?;
                function(&values).map(Cow::Owned)
            }
        }
    }

    fn truth(&mut self, op: &'static str, node: &'e Node) -> Result<bool, EvalError> {
        let value = self.eval(node)?;
        value.as_bool().ok_or_else(|| EvalError::OperandMismatch {
            op,
            operand: value.type_name(),
        })
    }

    fn variable(&mut self, name: &'e str) -> Result<Cow<'a, Value>, EvalError> {
        if let Some(found) = self.resolved.get(name) {
            return Ok(found.clone());
        }
        let found = (self.resolve)(name)?;
        self.resolved.insert(name, found.clone());
        Ok(found)
    }
}

fn boolean<'a>(b: bool) -> Cow<'a, Value> {
    Cow::Owned(Value::Bool(b))
}

fn mismatch(op: &'static str, l: &Value, r: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op,
        left: l.type_name(),
        right: r.type_name(),
    }
}

fn is_scalar(v: &Value) -> bool {
    !matches!(v, Value::Sequence(_) | Value::Mapping(_))
}

fn arith(op: ArithOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Rem => a % b,
        })),
        (Value::String(_), _) | (_, Value::String(_))
            if op == ArithOp::Add && is_scalar(l) && is_scalar(r) =>
        {
            let mut s = l.to_plain_string();
            s.push_str(&r.to_plain_string());
            Ok(Value::String(s))
        }
        _ => Err(mismatch(op.symbol(), l, r)),
    }
}
