//! Loaders that parse a file's text into a structured value.

use super::file::TextFileLoader;
use super::{Acceptance, ValueLoader};
use crate::entry::DirectoryEntry;
use crate::error::{BoxError, LoadError, Result};
use crate::options::LoadOptions;
use crate::value::Value;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Turns file text into a value.
pub type ParseFn = Arc<dyn Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// A text-file loader whose content goes through a parse function.
///
/// Acceptance and keys are those of the underlying [`TextFileLoader`]; the
/// parse result is the loaded value.
#[derive(Clone)]
pub struct StringParserLoader {
    name: String,
    text: TextFileLoader,
    parse: ParseFn,
}

impl StringParserLoader {
    pub fn new<F>(extension: &str, parse: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        let text = TextFileLoader::with_extension(extension);
        Self {
            name: format!("parser{}", text.extension().unwrap_or_default()),
            text,
            parse: Arc::new(parse),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Debug for StringParserLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringParserLoader")
            .field("name", &self.name)
            .field("extension", &self.text.extension())
            .finish()
    }
}

#[async_trait]
impl ValueLoader for StringParserLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a> {
        self.text.can_load_value(entry)
    }

    fn compute_key(&self, entry: &DirectoryEntry) -> Option<String> {
        self.text.compute_key(entry)
    }

    async fn load_value(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<Value> {
        let content = self.text.read_text(entry, options).await?;
        tracing::trace!("Parsing {} with {}", entry.location, self.name);
        (self.parse)(&content).map_err(|e| LoadError::parse(&entry.location, e))
    }
}

/// Parses `.json` files.
pub fn json_loader() -> StringParserLoader {
    StringParserLoader::new(".json", |content| {
        let value: serde_json::Value = serde_json::from_str(content)?;
        Ok(Value::from(value))
    })
    .named("json")
}

/// Parses YAML files with the given extension (`.yaml` or `.yml`).
///
/// An empty document loads as null.
pub fn yaml_loader(extension: &str) -> StringParserLoader {
    StringParserLoader::new(extension, |content| {
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(content)?;
        Ok(Value::from(value))
    })
    .named("yaml")
}

/// Parses `.toml` files. A TOML document is always a table.
pub fn toml_loader() -> StringParserLoader {
    StringParserLoader::new(".toml", |content| {
        let table: toml::Table = toml::from_str(content)?;
        Ok(Value::from(toml::Value::Table(table)))
    })
    .named("toml")
}
