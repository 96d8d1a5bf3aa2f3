//! Result shapes for directory aggregation.

use crate::error::{LoadError, Result};
use crate::merge::set_or_merge;
use crate::options::LoadOptions;
use crate::ordering::index_key;
use crate::value::{Map, Value};
use url::Url;

/// Largest index an array result accepts. Higher integer keys fail the load
/// instead of allocating the holes in front of them.
pub const MAX_ARRAY_INDEX: usize = 1 << 20;

/// Accumulates the values of a directory's entries.
pub trait Container: Default + Send + 'static {
    /// Default diagnostic name of engines producing this shape.
    const KIND: &'static str;

    /// Store `value`, loaded from `location`, under `key`.
    fn set_value(
        &mut self,
        key: &str,
        value: Value,
        location: &Url,
        options: &LoadOptions,
    ) -> Result<()>;

    /// Store the directory's location under `property`. Returns `false` when
    /// this shape cannot carry it.
    fn embed_location(&mut self, _property: &str, _location: &Url) -> bool {
        false
    }

    fn into_value(self) -> Value;
}

/// Keys become properties of one object.
#[derive(Debug, Default)]
pub struct ObjectContainer(Map);

impl Container for ObjectContainer {
    const KIND: &'static str = "object";

    fn set_value(
        &mut self,
        key: &str,
        value: Value,
        _location: &Url,
        options: &LoadOptions,
    ) -> Result<()> {
        set_or_merge(&mut self.0, key, value, options);
        Ok(())
    }

    fn embed_location(&mut self, property: &str, location: &Url) -> bool {
        self.0
            .insert(property.to_string(), Value::from(location.as_str()));
        true
    }

    fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Integer keys become array indices; other keys are appended.
#[derive(Debug, Default)]
pub struct ArrayContainer(Vec<Value>);

impl Container for ArrayContainer {
    const KIND: &'static str = "array";

    fn set_value(
        &mut self,
        key: &str,
        value: Value,
        location: &Url,
        _options: &LoadOptions,
    ) -> Result<()> {
        match index_key(key) {
            Some(index) if index > MAX_ARRAY_INDEX => {
                return Err(LoadError::IndexOutOfRange {
                    key: key.to_string(),
                    location: location.clone(),
                    limit: MAX_ARRAY_INDEX,
                });
            }
            Some(index) => {
                if index >= self.0.len() {
                    self.0.resize(index + 1, Value::Absent);
                }
                self.0[index] = value;
            }
            None => self.0.push(value),
        }
        Ok(())
    }

    fn into_value(self) -> Value {
        Value::Array(self.0)
    }
}
