//! Loaders that read a file's content as text or bytes.

use super::{dotted, Acceptance, ValueLoader};
use crate::entry::DirectoryEntry;
use crate::error::Result;
use crate::options::LoadOptions;
use crate::storage::{FileSystemStorage, SharedStorage};
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;

/// Accept files by extension and key them by their name without it.
#[derive(Debug, Clone)]
pub(crate) struct ExtensionMatcher {
    extension: Option<String>,
}

impl ExtensionMatcher {
    pub(crate) fn new(extension: Option<&str>) -> Self {
        Self {
            extension: extension.map(dotted),
        }
    }

    pub(crate) fn accepts(&self, entry: &DirectoryEntry) -> bool {
        entry.is_file()
            && self
                .extension
                .as_deref()
                .is_none_or(|ext| entry.name.ends_with(ext))
    }

    pub(crate) fn key(&self, entry: &DirectoryEntry) -> Option<String> {
        let key = match self.extension.as_deref() {
            Some(ext) => entry.name.strip_suffix(ext).unwrap_or(&entry.name),
            None => &entry.name,
        };
        Some(key.to_string())
    }

    pub(crate) fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

/// Storage to read from: the options' override, else the local filesystem.
pub(crate) fn active_storage(options: &LoadOptions) -> SharedStorage {
    options
        .storage
        .clone()
        .unwrap_or_else(|| Arc::new(FileSystemStorage::new()))
}

/// Loads files as UTF-8 text.
///
/// With an extension (`.txt`) only matching files are accepted and the key is
/// the name without the extension; without one every file is accepted and
/// keyed by its full name.
#[derive(Debug, Clone)]
pub struct TextFileLoader {
    name: String,
    matcher: ExtensionMatcher,
}

impl TextFileLoader {
    /// Accept every file.
    pub fn new() -> Self {
        Self {
            name: "text".to_string(),
            matcher: ExtensionMatcher::new(None),
        }
    }

    /// Accept files ending with `extension` (with or without the leading dot).
    pub fn with_extension(extension: &str) -> Self {
        let matcher = ExtensionMatcher::new(Some(extension));
        Self {
            name: format!("text{}", matcher.extension().unwrap_or_default()),
            matcher,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        self.matcher.extension()
    }

    /// Read the entry as text without converting it into a [`Value`].
    pub async fn read_text(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<String> {
        options.check_cancelled()?;
        active_storage(options)
            .read_text(&entry.location, &options.storage_options())
            .await
    }
}

impl Default for TextFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueLoader for TextFileLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a> {
        Acceptance::Ready(self.matcher.accepts(entry))
    }

    fn compute_key(&self, entry: &DirectoryEntry) -> Option<String> {
        self.matcher.key(entry)
    }

    async fn load_value(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<Value> {
        self.read_text(entry, options).await.map(Value::String)
    }
}

/// Loads files as raw bytes.
#[derive(Debug, Clone)]
pub struct BinaryFileLoader {
    name: String,
    matcher: ExtensionMatcher,
}

impl BinaryFileLoader {
    /// Accept every file.
    pub fn new() -> Self {
        Self {
            name: "binary".to_string(),
            matcher: ExtensionMatcher::new(None),
        }
    }

    /// Accept files ending with `extension` (with or without the leading dot).
    pub fn with_extension(extension: &str) -> Self {
        let matcher = ExtensionMatcher::new(Some(extension));
        Self {
            name: format!("binary{}", matcher.extension().unwrap_or_default()),
            matcher,
        }
    }
}

impl Default for BinaryFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueLoader for BinaryFileLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a> {
        Acceptance::Ready(self.matcher.accepts(entry))
    }

    fn compute_key(&self, entry: &DirectoryEntry) -> Option<String> {
        self.matcher.key(entry)
    }

    async fn load_value(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<Value> {
        options.check_cancelled()?;
        let bytes = active_storage(options)
            .read_binary(&entry.location, &options.storage_options())
            .await?;
        Ok(Value::from(bytes))
    }
}
