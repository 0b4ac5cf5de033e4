use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{EvalError, Value};

/// A function callable from formula text.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// Registry of functions a formula may call. Calls are checked against the
/// registry when the formula is parsed.
#[derive(Clone, Default)]
pub struct Functions {
    table: BTreeMap<String, Function>,
}

impl Functions {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by [`Rule::condition`](crate::Rule::condition).
    ///
    /// `int(x)` is a type hint for rule authors; it returns its argument
    /// unchanged.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new().with("int", |args| identity("int", args))
    }

    /// Register `function` under `name`, replacing any previous entry.
    #[must_use]
    pub fn with<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.insert(name, function);
        self
    }

    pub fn insert<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.table.insert(name.to_owned(), Arc::new(function));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.table.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

fn identity(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [value] => Ok(value.clone()),
        _ => Err(EvalError::Function {
            name: name.to_owned(),
            message: format!("expected 1 argument, got {}", args.len()),
        }),
    }
}
