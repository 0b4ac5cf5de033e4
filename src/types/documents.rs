use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use super::Value;

/// Source of event documents for evaluation, keyed by event name.
pub trait Documents {
    fn document(&self, event: &str) -> Option<&Value>;
}

impl<S: BuildHasher> Documents for HashMap<String, Value, S> {
    fn document(&self, event: &str) -> Option<&Value> {
        self.get(event)
    }
}

impl<S: BuildHasher> Documents for HashMap<&str, Value, S> {
    fn document(&self, event: &str) -> Option<&Value> {
        self.get(event)
    }
}

impl Documents for BTreeMap<String, Value> {
    fn document(&self, event: &str) -> Option<&Value> {
        self.get(event)
    }
}

/// A single mapping whose top-level keys are event names.
impl Documents for Value {
    fn document(&self, event: &str) -> Option<&Value> {
        self.as_mapping().and_then(|entries| entries.get(event))
    }
}
