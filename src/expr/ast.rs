use std::fmt;

use crate::Value;

use super::{Functions, ParseError};

/// Comparison operators supported in formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }
}

/// Parsed formula tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Literal(Value),
    Var(String),
    List(Vec<Node>),
    Not(Box<Node>),
    Neg(Box<Node>),
    Arith(ArithOp, Box<Node>, Box<Node>),
    Compare(CompareOp, Box<Node>, Box<Node>),
    In(Box<Node>, Box<Node>),
    /// Two or more operands, evaluated left to right.
    And(Vec<Node>),
    /// Two or more operands, evaluated left to right.
    Or(Vec<Node>),
    Call(String, Vec<Node>),
}

impl Node {
    /// Fold constant negations and logical connectives whose first operand
    /// is a constant that decides the result. Variables inside a discarded
    /// branch are no longer part of the tree afterwards.
    pub(crate) fn fold(self) -> Node {
        match self {
            Node::Not(inner) => match (*inner).fold() {
                Node::Literal(Value::Bool(b)) => Node::Literal(Value::Bool(!b)),
                other => Node::Not(Box::new(other)),
            },
            Node::Neg(inner) => match (*inner).fold() {
                Node::Literal(Value::Number(n)) => Node::Literal(Value::Number(-n)),
                other => Node::Neg(Box::new(other)),
            },
            Node::And(items) => fold_connective(items, false).map_or_else(
                || Node::Literal(Value::Bool(false)),
                Node::And,
            ),
            Node::Or(items) => fold_connective(items, true).map_or_else(
                || Node::Literal(Value::Bool(true)),
                Node::Or,
            ),
            Node::Arith(op, a, b) => Node::Arith(op, Box::new((*a).fold()), Box::new((*b).fold())),
            Node::Compare(op, a, b) => {
                Node::Compare(op, Box::new((*a).fold()), Box::new((*b).fold()))
            }
            Node::In(a, b) => Node::In(Box::new((*a).fold()), Box::new((*b).fold())),
            Node::List(items) => Node::List(items.into_iter().map(Node::fold).collect()),
            Node::Call(name, args) => Node::Call(name, args.into_iter().map(Node::fold).collect()),
            leaf @ (Node::Literal(_) | Node::Var(_)) => leaf,
        }
    }

    /// Reject calls to functions missing from `functions`.
    pub(crate) fn check_calls(&self, functions: &Functions) -> Result<(), ParseError> {
        match self {
            Node::Literal(_) | Node::Var(_) => Ok(()),
            Node::Not(inner) | Node::Neg(inner) => inner.check_calls(functions),
            Node::Arith(_, a, b)
            | Node::Compare(_, a, b)
            | Node::In(a, b) => {
                a.check_calls(functions)?;
                b.check_calls(functions)
            }
            Node::List(items) | Node::And(items) | Node::Or(items) => {
                items.iter().try_for_each(|n| n.check_calls(functions))
            }
            Node::Call(name, args) => {
                if !functions.contains(name) {
                    return Err(ParseError::new(format!("unknown function '{name}'")));
                }
                args.iter().try_for_each(|n| n.check_calls(functions))
            }
        }
    }

    /// Append every distinct variable name, in order of first appearance.
    pub(crate) fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Node::Literal(_) => {}
            Node::Var(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Node::Not(inner) | Node::Neg(inner) => inner.collect_variables(out),
            Node::Arith(_, a, b)
            | Node::Compare(_, a, b)
            | Node::In(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Node::List(items) | Node::Call(_, items) | Node::And(items) | Node::Or(items) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
        }
    }
}

/// Fold the operands of a connective whose first operand decides the
/// result when it is the literal `decisive`. Returns `None` in that case.
fn fold_connective(items: Vec<Node>, decisive: bool) -> Option<Vec<Node>> {
    let mut folded = Vec::with_capacity(items.len());
    for item in items {
        let item = item.fold();
        if folded.is_empty() && item == Node::Literal(Value::Bool(decisive)) {
            return None;
        }
        folded.push(item);
    }
    Some(folded)
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    write_joined(f, items, ", ")
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Node], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(Value::String(s)) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Node::Literal(v) => write!(f, "{v}"),
            Node::Var(name) => write!(f, "{}", crate::token::identifier(name)),
            Node::List(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Node::Not(inner) => write!(f, "(!{inner})"),
            Node::Neg(inner) => write!(f, "(-{inner})"),
            Node::Arith(op, a, b) => write!(f, "({a} {} {b})", op.symbol()),
            Node::Compare(op, a, b) => write!(f, "({a} {op} {b})"),
            Node::In(a, b) => write!(f, "({a} in {b})"),
            Node::And(items) => {
                write!(f, "(")?;
                write_joined(f, items, " && ")?;
                write!(f, ")")
            }
            Node::Or(items) => {
                write!(f, "(")?;
                write_joined(f, items, " || ")?;
                write!(f, ")")
            }
            Node::Call(name, args) => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Node> {
        Box::new(Node::Var(name.to_owned()))
    }

    fn lit(v: impl Into<Value>) -> Box<Node> {
        Box::new(Node::Literal(v.into()))
    }

    #[test]
    fn fold_false_and_drops_right_side() {
        let node = Node::And(vec![*lit(false), *var("x"), *var("y")]).fold();
        assert_eq!(node, Node::Literal(Value::Bool(false)));
        let mut vars = Vec::new();
        node.collect_variables(&mut vars);
        assert!(vars.is_empty());
    }

    #[test]
    fn fold_true_or_drops_right_side() {
        let node = Node::Or(vec![*lit(true), *var("x")]).fold();
        assert_eq!(node, Node::Literal(Value::Bool(true)));
    }

    #[test]
    fn fold_keeps_undecided_connectives() {
        let node = Node::And(vec![*lit(true), *var("x")]).fold();
        assert!(matches!(&node, Node::And(items) if items.len() == 2));
        let node = Node::Or(vec![*var("x"), *lit(true)]).fold();
        assert!(matches!(&node, Node::Or(items) if items.len() == 2));
        // a decisive literal past the first operand does not fold
        let node = Node::And(vec![*var("x"), *lit(false), *var("y")]).fold();
        assert!(matches!(&node, Node::And(items) if items.len() == 3));
    }

    #[test]
    fn fold_negations() {
        assert_eq!(
            Node::Not(lit(true)).fold(),
            Node::Literal(Value::Bool(false))
        );
        assert_eq!(Node::Neg(lit(2.5)).fold(), Node::Literal(Value::Number(-2.5)));
    }

    #[test]
    fn collect_variables_is_distinct_and_ordered() {
        let node = Node::Or(vec![
            Node::Compare(CompareOp::Eq, var("b"), var("a")),
            Node::Compare(CompareOp::Gt, var("b"), var("c")),
        ]);
        let mut vars = Vec::new();
        node.collect_variables(&mut vars);
        assert_eq!(vars, ["b", "a", "c"]);
    }

    #[test]
    fn check_calls_rejects_unknown_function() {
        let node = Node::Call("nope".into(), vec![Node::Var("x".into())]);
        let err = node.check_calls(&Functions::builtin()).unwrap_err();
        assert_eq!(err.to_string(), "parse error: unknown function 'nope'");
        let node = Node::Call("int".into(), vec![Node::Var("x".into())]);
        assert!(node.check_calls(&Functions::builtin()).is_ok());
    }

    #[test]
    fn display_renders_parenthesized_tree() {
        let node = Node::And(vec![
            Node::Compare(CompareOp::Eq, var("skud:level"), lit("high")),
            Node::Not(var("x")),
        ]);
        assert_eq!(node.to_string(), r"((skud\:level == 'high') && (!x))");
    }

    #[test]
    fn display_joins_connective_operands() {
        let node = Node::Or(vec![*var("a"), *var("b"), *var("c")]);
        assert_eq!(node.to_string(), "(a || b || c)");
    }
}
