//! Canonical, cycle-safe fingerprints of value graphs.
//!
//! Two values are equal for `assertEqual` iff their fingerprints are equal strings.
//! Fingerprints ignore key insertion order and follow the *shape* of cycles rather
//! than the identities involved, so two separately built cyclic graphs with the same
//! topology compare equal.
//!
//! A composite renders as `{key#value#key#value..}`. Keys and primitive text put a
//! backslash before every separator character (`#&{}` and the backslash itself), so
//! no string can spell out the structure of a composite.

use crate::value::Value;

/// Computes the fingerprint of `value`.
///
/// # Examples
///
/// ```rust
/// use tapsuite::fingerprint::fingerprint;
/// use tapsuite::value::Value;
/// let a = Value::object([("a", Value::from(1)), ("b", Value::from(2))]);
/// let b = Value::object([("b", Value::from(2)), ("a", Value::from(1))]);
/// assert_eq!(fingerprint(&a), fingerprint(&b));
/// assert_eq!(fingerprint(&a), "{a#1#b#2}");
/// ```
pub fn fingerprint(value: &Value) -> String {
    let mut seen = Vec::new();
    fingerprint_with(value, &mut seen)
}

/// Fingerprints `value` against an existing list of visited identities.
///
/// Composite values are appended to `seen` before their properties are visited; a
/// property whose value already sits in `seen` is written as `&<position>`. The list
/// is not unwound, so a sub-object shared by two siblings is a back-reference the
/// second time it is met.
pub fn fingerprint_with(value: &Value, seen: &mut Vec<usize>) -> String {
    let Some(identity) = value.identity() else {
        return escape(&value.coerce_string());
    };
    let mut entries = match value {
        Value::Object(object) => object.entries(),
        _ => Vec::new(),
    };
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    seen.push(identity);

    let mut parts = Vec::with_capacity(entries.len() * 2);
    for (key, property) in entries {
        parts.push(escape(&key));
        let back_reference = property
            .identity()
            .and_then(|id| seen.iter().position(|s| *s == id));
        match back_reference {
            Some(position) => parts.push(format!("&{position}")),
            None => parts.push(fingerprint_with(&property, seen)),
        }
    }
    format!("{{{}}}", parts.join("#"))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '#' | '&' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
