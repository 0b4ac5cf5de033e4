use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, not, opt, preceded, repeat, separated, terminated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::Value;

use super::ast::{ArithOp, CompareOp, Node};

// -- Whitespace -------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

// -- Identifiers ------------------------------------------------------------

struct Ident {
    name: String,
    escaped: bool,
}

fn ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Letters, digits and `_`, not starting with a digit. A backslash takes the
/// next character literally, whatever it is.
fn identifier(input: &mut &str) -> ModalResult<Ident> {
    let mut name = String::new();
    let mut escaped = false;
    loop {
        let rest: &str = *input;
        let mut chars = rest.chars();
        match chars.next() {
            Some('\\') => {
                let Some(c) = chars.next() else {
                    return Err(ErrMode::from_input(input).cut());
                };
                name.push(c);
                escaped = true;
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => name.push(c),
            Some(c) if c.is_ascii_digit() && !name.is_empty() => name.push(c),
            _ => break,
        }
        *input = chars.as_str();
    }
    if name.is_empty() {
        return Err(ErrMode::from_input(input));
    }
    Ok(Ident { name, escaped })
}

// -- Literals ---------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any).parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => match cut_err(any).parse_next(input)? {
                'n' => s.push('\n'),
                't' => s.push('\t'),
                other => s.push(other),
            },
            c => s.push(c),
        }
    }
}

fn number(input: &mut &str) -> ModalResult<f64> {
    (
        digit1,
        opt(('.', digit1)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

// -- Primaries --------------------------------------------------------------

/// `( expr )` is grouping, `( expr, expr, ... )` is a list.
fn parenthesized(input: &mut &str) -> ModalResult<Node> {
    '('.parse_next(input)?;
    let mut items: Vec<Node> = cut_err(separated(1.., expr, (ws, ','))).parse_next(input)?;
    (ws, cut_err(')')).parse_next(input)?;
    if items.len() == 1 {
        Ok(items.remove(0))
    } else {
        Ok(Node::List(items))
    }
}

fn name_or_call(input: &mut &str) -> ModalResult<Node> {
    let ident = identifier.parse_next(input)?;
    let checkpoint = input.checkpoint();
    ws.parse_next(input)?;
    if opt('(').parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        let args: Vec<Node> = if opt(')').parse_next(input)?.is_some() {
            Vec::new()
        } else {
            let args = cut_err(separated(1.., expr, (ws, ','))).parse_next(input)?;
            (ws, cut_err(')')).parse_next(input)?;
            args
        };
        return Ok(Node::Call(ident.name, args));
    }
    input.reset(&checkpoint);

    if !ident.escaped {
        match ident.name.as_str() {
            "true" => return Ok(Node::Literal(Value::Bool(true))),
            "false" => return Ok(Node::Literal(Value::Bool(false))),
            "null" => return Ok(Node::Literal(Value::Null)),
            _ => {}
        }
    }
    Ok(Node::Var(ident.name))
}

fn primary(input: &mut &str) -> ModalResult<Node> {
    ws.parse_next(input)?;
    alt((
        parenthesized,
        string_literal.map(|s| Node::Literal(Value::String(s))),
        number.map(|n| Node::Literal(Value::Number(n))),
        name_or_call,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

// -- Operators (precedence: || < && < comparison < + - < * / % < unary) ------

fn unary(input: &mut &str) -> ModalResult<Node> {
    ws.parse_next(input)?;
    if opt('!').parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        Ok(Node::Not(Box::new(inner)))
    } else if opt('-').parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        Ok(Node::Neg(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn mul_expr(input: &mut &str) -> ModalResult<Node> {
    let first = unary(input)?;
    let rest: Vec<(ArithOp, Node)> = repeat(
        0..,
        (
            preceded(
                ws,
                alt((
                    '*'.value(ArithOp::Mul),
                    '/'.value(ArithOp::Div),
                    '%'.value(ArithOp::Rem),
                )),
            ),
            cut_err(unary),
        ),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, r)| {
        Node::Arith(op, Box::new(acc), Box::new(r))
    }))
}

fn add_expr(input: &mut &str) -> ModalResult<Node> {
    let first = mul_expr(input)?;
    let rest: Vec<(ArithOp, Node)> = repeat(
        0..,
        (
            preceded(ws, alt(('+'.value(ArithOp::Add), '-'.value(ArithOp::Sub)))),
            cut_err(mul_expr),
        ),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, r)| {
        Node::Arith(op, Box::new(acc), Box::new(r))
    }))
}

#[derive(Debug, Clone, Copy)]
enum Relation {
    Compare(CompareOp),
    In,
}

fn relation(input: &mut &str) -> ModalResult<Relation> {
    ws.parse_next(input)?;
    alt((
        "==".value(Relation::Compare(CompareOp::Eq)),
        "!=".value(Relation::Compare(CompareOp::Neq)),
        ">=".value(Relation::Compare(CompareOp::Gte)),
        ">".value(Relation::Compare(CompareOp::Gt)),
        "<=".value(Relation::Compare(CompareOp::Lte)),
        "<".value(Relation::Compare(CompareOp::Lt)),
        terminated(alt(("in", "IN")), not(one_of(ident_char))).value(Relation::In),
    ))
    .parse_next(input)
}

/// Comparisons do not chain: `a == b == c` leaves unparsed input.
fn cmp_expr(input: &mut &str) -> ModalResult<Node> {
    let left = add_expr(input)?;
    let Some(rel) = opt(relation).parse_next(input)? else {
        return Ok(left);
    };
    let right = cut_err(add_expr).parse_next(input)?;
    Ok(match rel {
        Relation::Compare(op) => Node::Compare(op, Box::new(left), Box::new(right)),
        Relation::In => Node::In(Box::new(left), Box::new(right)),
    })
}

/// One flat node for a run of the same connective; a lone operand is
/// returned as is.
fn connective(first: Node, rest: Vec<Node>, make: fn(Vec<Node>) -> Node) -> Node {
    if rest.is_empty() {
        return first;
    }
    let mut items = Vec::with_capacity(rest.len() + 1);
    items.push(first);
    items.extend(rest);
    make(items)
}

fn and_expr(input: &mut &str) -> ModalResult<Node> {
    let first = cmp_expr(input)?;
    let rest: Vec<Node> = repeat(0.., preceded((ws, "&&"), cut_err(cmp_expr))).parse_next(input)?;
    Ok(connective(first, rest, Node::And))
}

fn or_expr(input: &mut &str) -> ModalResult<Node> {
    let first = and_expr(input)?;
    let rest: Vec<Node> = repeat(0.., preceded((ws, "||"), cut_err(and_expr))).parse_next(input)?;
    Ok(connective(first, rest, Node::Or))
}

fn expr(input: &mut &str) -> ModalResult<Node> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Top-level parser -------------------------------------------------------

pub(crate) fn parse_formula(input: &mut &str) -> ModalResult<Node> {
    let node = expr(input)?;
    ws.parse_next(input)?;
    Ok(node)
}
