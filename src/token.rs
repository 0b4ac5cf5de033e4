//! Variable tokens standing in for `(event, path)` references inside a formula.
//!
//! A token has two forms. The *name* is what the expression engine reports
//! as a free variable: the event and the dotted field joined by
//! [`SEPARATOR`], with `\` and `:` backslash-escaped in both halves. The
//! *identifier* is how the name is spelled in formula text: every character
//! outside `[A-Za-z0-9_]`, and a leading digit, is backslash-escaped so the
//! lexer reads the whole token as one identifier and unescapes it back to
//! the name.

use crate::Path;

pub(crate) const SEPARATOR: char = ':';

/// Variable name for a reference to `path` inside `event`.
pub(crate) fn name(event: &str, path: &Path) -> String {
    let mut out = String::with_capacity(event.len() + 16);
    escape_into(&mut out, event);
    out.push(SEPARATOR);
    for (i, segment) in path.segments().iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        escape_into(&mut out, segment);
    }
    out
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '\\' || c == SEPARATOR {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Spell a variable name as a formula identifier.
pub(crate) fn identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    for (i, c) in name.chars().enumerate() {
        let plain = c.is_ascii_alphabetic() || c == '_' || (i > 0 && c.is_ascii_digit());
        if !plain {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split a variable name at its first unescaped separator into the
/// unescaped event and field path. Returns `None` when there is no
/// separator or an escape is left dangling.
pub(crate) fn decode(name: &str) -> Option<(String, Path)> {
    let mut event = String::new();
    let mut chars = name.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => event.push(chars.next()?.1),
            SEPARATOR => {
                let field = unescape(&name[i + c.len_utf8()..])?;
                return Some((event, Path::parse(&field)));
            }
            other => event.push(other),
        }
    }
    None
}

fn unescape(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(chars.next()?);
        } else {
            out.push(c);
        }
    }
    Some(out)
}
