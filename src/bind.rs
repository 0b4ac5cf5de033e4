use std::collections::HashMap;

use crate::{token, CompileError, Path};

/// Immutable table mapping formula variables back to event fields.
///
/// Built once per [`Condition`](crate::Condition) from the free variables
/// the parsed expression actually reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    /// event -> field text -> parsed path
    events: HashMap<String, HashMap<String, Path>>,
    /// variable name -> (event, field text)
    variables: HashMap<String, (String, String)>,
}

impl Bindings {
    /// Event and path bound to `variable`.
    #[must_use]
    pub fn lookup(&self, variable: &str) -> Option<(&str, &Path)> {
        let (event, field) = self.variables.get(variable)?;
        let path = self.events.get(event)?.get(field)?;
        Some((event.as_str(), path))
    }

    /// Path bound for `field` of `event`.
    #[must_use]
    pub fn get(&self, event: &str, field: &str) -> Option<&Path> {
        self.events.get(event)?.get(field)
    }

    /// Events with at least one bound field.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Decode each variable name into the event and path it stands for.
///
/// # Errors
///
/// Returns [`CompileError::UnboundVariable`] for a name without a field
/// separator or whose event part is not one of `events`.
pub fn bind<'v, I>(variables: I, events: &[String]) -> Result<Bindings, CompileError>
where
    I: IntoIterator<Item = &'v str>,
{
    let mut bindings = Bindings::default();
    for variable in variables {
        if bindings.variables.contains_key(variable) {
            continue;
        }
        let unbound = || CompileError::UnboundVariable {
            variable: variable.to_owned(),
        };
        let (event, path) = token::decode(variable).ok_or_else(unbound)?;
        if !events.contains(&event) {
            return Err(unbound());
        }
        let field = path.to_string();
        bindings
            .events
            .entry(event.clone())
            .or_default()
            .insert(field.clone(), path);
        bindings
            .variables
            .insert(variable.to_owned(), (event, field));
    }
    Ok(bindings)
}
