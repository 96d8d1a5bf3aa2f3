//! Storing values under keys that may already be taken.
//!
//! Two entries can map to the same key (`a.json` and `a.yaml` both become
//! `a`). [`set_or_merge`] decides what ends up stored: the configured merge
//! function when both values are objects or both are arrays, otherwise the new
//! value.

use crate::options::{LoadOptions, MergeFn};
use crate::value::{Map, Value};
use std::sync::Arc;

/// Store `value` under `key`, merging with an existing value of the same shape.
pub fn set_or_merge(map: &mut Map, key: &str, value: Value, options: &LoadOptions) {
    let merge = match (map.get(key), &value) {
        (Some(Value::Object(_)), Value::Object(_)) => options.object_merge.as_ref(),
        (Some(Value::Array(_)), Value::Array(_)) => options.array_merge.as_ref(),
        _ => None,
    };

    let stored = match merge {
        Some(merge) => {
            tracing::trace!("Merging into existing value at '{}'", key);
            let existing = map.get_mut(key).map(std::mem::take).unwrap_or_default();
            merge(existing, value)
        }
        None => value,
    };
    map.insert(key.to_string(), stored);
}

/// Recursively merge `incoming` into `existing`.
///
/// Objects merge key by key; for any other pair the incoming value wins.
pub fn deep_merge(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.get_mut(&key) {
                    Some(slot) => deep_merge(std::mem::take(slot), value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, incoming) => incoming,
    }
}

/// Append the items of `incoming` to `existing` when both are arrays.
pub fn concat_arrays(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::Array(mut base), Value::Array(items)) => {
            base.extend(items);
            Value::Array(base)
        }
        (_, incoming) => incoming,
    }
}

/// [`deep_merge`] as a merge function for [`LoadOptions::object_merge`].
pub fn deep_merge_fn() -> MergeFn {
    Arc::new(deep_merge)
}

/// [`concat_arrays`] as a merge function for [`LoadOptions::array_merge`].
pub fn concat_arrays_fn() -> MergeFn {
    Arc::new(concat_arrays)
}
