//! Path resolution over [`Value`] trees.
//!
//! A path is a sequence of segments. A literal segment selects one mapping
//! entry, or one sequence element when it is all digits. The wildcard
//! segment [`WILDCARD`] fans out over every entry or element at that level;
//! branches that fail to resolve are dropped from the aggregate instead of
//! failing the whole lookup.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::{PathError, Value};

/// Reserved segment meaning "every entry or element at this level".
pub const WILDCARD: &str = "#";

/// Resolve `segments` against `value`.
///
/// Literal lookups borrow from `value`; a wildcard segment builds a new
/// sequence or mapping holding the successful branches.
///
/// # Errors
///
/// Returns [`PathError::InvalidPath`] when a literal segment names a missing
/// key, an out-of-range or non-numeric index, or meets a scalar.
pub fn get<'a, S: AsRef<str>>(value: &'a Value, segments: &[S]) -> Result<Cow<'a, Value>, PathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(Cow::Borrowed(value));
    };
    let head = head.as_ref();

    match value {
        Value::Mapping(entries) if head == WILDCARD => {
            let collected: BTreeMap<String, Value> = entries
                .iter()
                .filter_map(|(key, item)| {
                    get(item, rest)
                        .ok()
                        .map(|found| (key.clone(), found.into_owned()))
                })
                .collect();
            Ok(Cow::Owned(Value::Mapping(collected)))
        }
        Value::Mapping(entries) => match entries.get(head) {
            Some(item) => get(item, rest),
            None => Err(invalid(head)),
        },
        Value::Sequence(items) if head == WILDCARD => {
            let collected: Vec<Value> = items
                .iter()
                .filter_map(|item| get(item, rest).ok().map(Cow::into_owned))
                .collect();
            Ok(Cow::Owned(Value::Sequence(collected)))
        }
        Value::Sequence(items) => match head.parse::<usize>().ok().and_then(|i| items.get(i)) {
            Some(item) => get(item, rest),
            None => Err(invalid(head)),
        },
        _ => Err(invalid(head)),
    }
}

fn invalid(segment: &str) -> PathError {
    PathError::InvalidPath {
        segment: segment.to_owned(),
    }
}

/// A parsed dotted path such as `object_array.list.#.status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Split `text` on `.`. The empty string is the empty path, which
    /// resolves to the whole document.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            segments: text.split('.').map(str::to_owned).collect(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether any segment is the wildcard marker.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| s == WILDCARD)
    }

    /// Resolve this path against `value`. See [`get`].
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPath`] on a literal mismatch.
    pub fn resolve<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>, PathError> {
        get(value, &self.segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
