use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::expr::{Expression, Functions};
use crate::types::OperandKind;
use crate::{bind, token, CompileError, Condition, Operand, Operation, Path, Rule};

/// Infix formula rendered from a rule body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formula {
    text: String,
    references: Vec<Reference>,
}

/// A distinct event field referenced by a [`Formula`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub event: String,
    pub path: Path,
    /// Variable name the expression engine reports for this reference.
    pub name: String,
    /// The name as spelled in the formula text.
    pub token: String,
}

impl Formula {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distinct references in order of first appearance.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render `operations` as one infix formula.
///
/// Contiguous runs of grouped operations are wrapped in parentheses. Each
/// operation's connective is written only when another operation follows,
/// after the `)` closing the preceding run; the connective of the last
/// operation is dropped. Every field reference becomes an escaped variable
/// token, and equal `(event, path)` pairs share one token.
///
/// # Errors
///
/// Returns [`CompileError::InvalidOperand`] when an operand holds both or
/// neither of a literal and an event field, and
/// [`CompileError::UnknownEvent`] when a field names an event outside
/// `events`.
pub fn build(operations: &[Operation], events: &[String]) -> Result<Formula, CompileError> {
    let mut builder = Builder::new(events);
    for (index, operation) in operations.iter().enumerate() {
        builder.push(index, operation)?;
    }
    Ok(builder.finish())
}

struct Builder<'o> {
    events: &'o [String],
    out: String,
    in_group: bool,
    pending: Option<&'o str>,
    cache: HashMap<(&'o str, Path), usize>,
    references: Vec<Reference>,
}

impl<'o> Builder<'o> {
    fn new(events: &'o [String]) -> Self {
        Self {
            events,
            out: String::new(),
            in_group: false,
            pending: None,
            cache: HashMap::new(),
            references: Vec::new(),
        }
    }

    fn push(&mut self, index: usize, operation: &'o Operation) -> Result<(), CompileError> {
        if self.in_group && !operation.group {
            self.out.push(')');
        }
        if let Some(connective) = self.pending.take() {
            self.out.push(' ');
            self.out.push_str(connective);
            self.out.push(' ');
        }
        if operation.group && !self.in_group {
            self.out.push('(');
        }
        self.in_group = operation.group;

        self.operand(index, "left", &operation.left)?;
        self.out.push(' ');
        self.out.push_str(&operation.action);
        self.out.push(' ');
        self.operand(index, "right", &operation.right)?;

        self.pending = Some(operation.operator.as_str());
        Ok(())
    }

    fn operand(
        &mut self,
        index: usize,
        position: &'static str,
        operand: &'o Operand,
    ) -> Result<(), CompileError> {
        let kind = operand
            .kind()
            .ok_or(CompileError::InvalidOperand { index, position })?;
        match kind {
            OperandKind::Literal {
                value,
                quoted: false,
            } => self.out.push_str(value),
            OperandKind::Literal {
                value,
                quoted: true,
            } => quote_into(&mut self.out, value),
            OperandKind::Field { event, field } => {
                if !self.events.iter().any(|e| e == event) {
                    return Err(CompileError::UnknownEvent {
                        index,
                        event: event.to_owned(),
                    });
                }
                let slot = match self.cache.entry((event, Path::parse(field))) {
                    Entry::Occupied(e) => *e.get(),
                    Entry::Vacant(e) => {
                        let path = e.key().1.clone();
                        let name = token::name(event, &path);
                        self.references.push(Reference {
                            event: event.to_owned(),
                            token: token::identifier(&name),
                            path,
                            name,
                        });
                        *e.insert(self.references.len() - 1)
                    }
                };
                self.out.push_str(&self.references[slot].token);
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Formula {
        if self.in_group {
            self.out.push(')');
        }
        if let Some(connective) = self.pending.filter(|c| !c.is_empty()) {
            debug!(connective, "dropping trailing connective");
        }
        Formula {
            text: self.out,
            references: self.references,
        }
    }
}

fn quote_into(out: &mut String, value: &str) {
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}

fn check_events(events: &[String]) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for event in events {
        if event.is_empty() {
            return Err(CompileError::EmptyEvent);
        }
        if !seen.insert(event) {
            return Err(CompileError::DuplicateEvent {
                event: event.clone(),
            });
        }
    }
    Ok(())
}

pub(crate) fn compile(rule: &Rule, functions: &Functions) -> Result<Condition, CompileError> {
    check_events(&rule.basic_events)?;
    let formula = build(&rule.body.expression, &rule.basic_events)?;
    let expression = Expression::parse(formula.text(), functions)?;
    let bindings = bind(expression.variables(), &rule.basic_events)?;
    debug!(
        rule = %rule.id,
        formula = %formula,
        variables = bindings.len(),
        "compiled condition"
    );
    Ok(Condition::new(expression, bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(names: &[&str]) -> Vec<String> {
        names.iter().map(|&n| n.to_owned()).collect()
    }

    fn cmp(event: &str, field: &str, action: &str, value: i64) -> Operation {
        Operation::new(Operand::field(event, field), action, Operand::number(value))
    }

    #[test]
    fn single_operation() {
        let formula = build(
            &[Operation::new(
                Operand::field("skud", "access_level"),
                "==",
                Operand::string("high"),
            )],
            &events(&["skud"]),
        )
        .unwrap();
        assert_eq!(formula.text(), r"skud\:access_level == 'high'");
        assert_eq!(formula.references().len(), 1);
        let reference = &formula.references()[0];
        assert_eq!(reference.event, "skud");
        assert_eq!(reference.name, "skud:access_level");
        assert_eq!(reference.token, r"skud\:access_level");
    }

    #[test]
    fn group_run_is_parenthesized() {
        let ops = [
            cmp("x", "a", "==", 1).then("&&"),
            cmp("x", "b", "==", 2).then("||").grouped(),
            cmp("x", "c", "==", 3).then("&&").grouped(),
            cmp("x", "d", "==", 4).then("||"),
        ];
        let formula = build(&ops, &events(&["x"])).unwrap();
        assert_eq!(
            formula.text(),
            r"x\:a == 1 && (x\:b == 2 || x\:c == 3) && x\:d == 4"
        );
    }

    #[test]
    fn trailing_connective_is_dropped() {
        let formula = build(&[cmp("x", "a", ">", 1).then("&&")], &events(&["x"])).unwrap();
        assert_eq!(formula.text(), r"x\:a > 1");
    }

    #[test]
    fn open_group_closed_at_end() {
        let ops = [
            cmp("x", "a", "==", 1).then("&&"),
            cmp("x", "b", "==", 2).then("||").grouped(),
        ];
        let formula = build(&ops, &events(&["x"])).unwrap();
        assert_eq!(formula.text(), r"x\:a == 1 && (x\:b == 2)");
    }

    #[test]
    fn adjacent_groups_form_one_run() {
        let ops = [
            cmp("x", "a", "==", 1).then("||").grouped(),
            cmp("x", "b", "==", 2).then("&&").grouped(),
        ];
        let formula = build(&ops, &events(&["x"])).unwrap();
        assert_eq!(formula.text(), r"(x\:a == 1 || x\:b == 2)");
    }

    #[test]
    fn repeated_field_shares_token() {
        let ops = [
            cmp("skud", "level", ">", 1).then("&&"),
            cmp("skud", "level", "<", 9),
        ];
        let formula = build(&ops, &events(&["skud"])).unwrap();
        assert_eq!(formula.references().len(), 1);
        assert_eq!(formula.text(), r"skud\:level > 1 && skud\:level < 9");
    }

    #[test]
    fn wildcard_and_special_characters_are_escaped() {
        let ops = [Operation::new(
            Operand::field("door-2", "list.#.open"),
            "==",
            Operand::literal("true", "bool"),
        )];
        let formula = build(&ops, &events(&["door-2"])).unwrap();
        assert_eq!(formula.text(), r"door\-2\:list\.\#\.open == true");
    }

    #[test]
    fn quoted_literal_escapes_quotes() {
        let ops = [Operation::new(
            Operand::field("e", "name"),
            "==",
            Operand::string(r"it's a \ test"),
        )];
        let formula = build(&ops, &events(&["e"])).unwrap();
        assert_eq!(formula.text(), r"e\:name == 'it\'s a \\ test'");
    }

    #[test]
    fn unknown_event() {
        let err = build(&[cmp("door", "open", "==", 1)], &events(&["skud"])).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownEvent {
                index: 0,
                event: "door".into()
            }
        );
    }

    #[test]
    fn invalid_operand_position() {
        let op = Operation::new(Operand::field("e", "x"), "==", Operand::default());
        let err = build(&[op], &events(&["e"])).unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidOperand {
                index: 0,
                position: "right"
            }
        );
    }

    #[test]
    fn empty_and_duplicate_events() {
        assert_eq!(
            check_events(&events(&["skud", ""])),
            Err(CompileError::EmptyEvent)
        );
        assert_eq!(
            check_events(&events(&["skud", "door", "skud"])),
            Err(CompileError::DuplicateEvent {
                event: "skud".into()
            })
        );
        assert!(check_events(&events(&["skud", "door"])).is_ok());
    }

    #[test]
    fn compile_binds_every_reference() {
        let rule = Rule::new(["x", "y"])
            .operation(cmp("x", "a", "==", 1).then("&&"))
            .operation(cmp("y", "b.#", ">", 2).then("||"))
            .operation(cmp("x", "a", "<", 5));
        let condition = compile(&rule, &Functions::builtin()).unwrap();
        assert_eq!(condition.variables().count(), 2);
        assert_eq!(condition.bindings().len(), 2);
        assert_eq!(
            condition.bindings().get("y", "b.#").unwrap().segments(),
            ["b", "#"]
        );
    }

    #[test]
    fn compile_surfaces_parse_errors() {
        let rule = Rule::new(["x"]).operation(cmp("x", "a", "=<", 1));
        assert!(matches!(
            compile(&rule, &Functions::builtin()),
            Err(CompileError::Parse(_))
        ));
    }
}
