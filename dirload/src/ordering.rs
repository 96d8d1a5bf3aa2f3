//! Numeric-aware ordering of property keys.
//!
//! Keys that are integers sort by value and before every other key, so `"9"`
//! comes before `"10"` and both come before `"abc"`. Missing keys sort last.

use std::cmp::Ordering;

/// Parse a key that is wholly an integer in canonical form.
///
/// `"42"` and `"-7"` are numeric; `"042"`, `" 42"`, `"42a"` and `"+42"` are not,
/// because formatting the parsed number does not give back the same string.
pub fn numeric_key(key: &str) -> Option<i64> {
    let n: i64 = key.parse().ok()?;
    (n.to_string() == key).then_some(n)
}

/// Parse a key that is wholly a non-negative integer, usable as an array index.
pub fn index_key(key: &str) -> Option<usize> {
    numeric_key(key).and_then(|n| usize::try_from(n).ok())
}

/// Total order over optional keys.
pub fn compare_keys(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (numeric_key(a), numeric_key(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        },
    }
}
