use std::io::Read;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::error::CompileError;
use crate::expr::Functions;
use crate::RuleError;

/// A rule document.
///
/// Only `basic_events` and `body.expression` take part in compilation; the
/// remaining fields are carried through untouched.
///
/// # Example
///
/// ```
/// use json_rule::{Operand, Operation, Rule, Value};
/// use std::collections::HashMap;
///
/// let rule = Rule::new(["skud"]).operation(Operation::new(
///     Operand::field("skud", "access_level"),
///     "==",
///     Operand::string("high"),
/// ));
/// let condition = rule.condition().unwrap();
///
/// let mut documents = HashMap::new();
/// documents.insert(
///     "skud".to_owned(),
///     Value::from(serde_json::json!({"access_level": "high"})),
/// );
/// assert!(condition.matches(&documents).unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub basic_events: Vec<String>,
    pub body: Body,
    pub created_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub exit_points: ExitPoints,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub initiator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_field: String,
    pub modification_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub weight: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Body {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expression: Vec<Operation>,
}

/// Opaque action metadata attached to a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitPoints {
    pub is_every_condition: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Point {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// One comparison in a rule body: `left action right`, followed by the
/// logical `operator` joining it to the next operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    pub group: bool,
    pub left: Operand,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    pub right: Operand,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operator: String,
}

/// Either a literal value or a reference to a field of an event document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operand {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// What an [`Operand`] stands for once validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperandKind<'a> {
    Literal { value: &'a str, quoted: bool },
    Field { event: &'a str, field: &'a str },
}

impl Rule {
    /// An empty rule declaring `events`.
    #[must_use]
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            basic_events: events.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append an operation to the rule body.
    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.body.expression.push(operation);
        self
    }

    /// Decode a rule document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Json`] when the text is not a valid rule document.
    pub fn from_json(text: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a rule document from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Json`] on malformed input or read failure.
    pub fn from_reader(reader: impl Read) -> Result<Self, RuleError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read and decode a rule document file.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] on I/O or decoding failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, RuleError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Compile the rule body into a reusable [`Condition`] using the
    /// built-in function registry.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if the declared events are invalid, an operand
    /// is malformed or names an undeclared event, or the rendered formula
    /// does not parse.
    pub fn condition(&self) -> Result<Condition, CompileError> {
        self.condition_with(&Functions::builtin())
    }

    /// Like [`condition`](Self::condition), with a caller-supplied function
    /// registry.
    ///
    /// # Errors
    ///
    /// See [`condition`](Self::condition).
    pub fn condition_with(&self, functions: &Functions) -> Result<Condition, CompileError> {
        crate::compile::compile(self, functions)
    }
}

impl Operation {
    #[must_use]
    pub fn new(left: Operand, action: &str, right: Operand) -> Self {
        Self {
            group: false,
            left,
            action: action.to_owned(),
            right,
            operator: String::new(),
        }
    }

    /// Set the logical operator joining this operation to the next one.
    #[must_use]
    pub fn then(mut self, operator: &str) -> Self {
        self.operator = operator.to_owned();
        self
    }

    /// Mark this operation as part of a parenthesized group run.
    #[must_use]
    pub fn grouped(mut self) -> Self {
        self.group = true;
        self
    }
}

impl Operand {
    /// A reference to `field` (dotted, may contain `#`) of `event`.
    #[must_use]
    pub fn field(event: &str, field: &str) -> Self {
        Self {
            event: Some(event.to_owned()),
            field: Some(field.to_owned()),
            ..Self::default()
        }
    }

    /// A literal rendered verbatim, quoted only when `kind` is `"string"`.
    #[must_use]
    pub fn literal(value: impl ToString, kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            value: Some(value.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn string(value: &str) -> Self {
        Self::literal(value, "string")
    }

    #[must_use]
    pub fn number(value: impl ToString) -> Self {
        Self::literal(value, "number")
    }

    /// Classify the operand. An empty `value` beside a non-empty `event`
    /// counts as absent. Returns `None` when both sides or neither are set.
    pub(crate) fn kind(&self) -> Option<OperandKind<'_>> {
        let value = self.value.as_deref();
        let event = self.event.as_deref().filter(|e| !e.is_empty());
        match (value, event) {
            (Some(v), Some(_)) if !v.is_empty() => None,
            (_, Some(event)) => Some(OperandKind::Field {
                event,
                field: self.field.as_deref().unwrap_or_default(),
            }),
            (Some(value), None) => Some(OperandKind::Literal {
                value,
                quoted: self.kind == "string",
            }),
            (None, None) => None,
        }
    }
}
