//! Options recognized by every load call.

use crate::error::{LoadError, Result};
use crate::storage::{SharedStorage, StorageOptions};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Combines an existing value with a new one stored under the same key.
pub type MergeFn = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

/// Transforms a computed key before it is sorted and stored.
pub type NameDecoder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Options for a load.
///
/// Every field is optional so that two option sets can be layered: an engine's
/// defaults and the options of a single call. See [`LoadOptions::merged_with`].
#[derive(Clone, Default)]
pub struct LoadOptions {
    pub cancellation_token: Option<CancellationToken>,
    /// Applied when an array is stored where an array already exists.
    pub array_merge: Option<MergeFn>,
    /// Applied when an object is stored where an object already exists.
    pub object_merge: Option<MergeFn>,
    /// Property under which a directory's location is embedded in its object.
    pub embed_directory_url_as: Option<String>,
    /// Property under which a file's location is embedded in its object value.
    pub embed_file_url_as: Option<String>,
    pub property_name_decoder: Option<NameDecoder>,
    /// Fail when a directory entry is not accepted by any loader.
    pub strict: Option<bool>,
    /// Storage backend override, taking priority over the engine's backend.
    pub storage: Option<SharedStorage>,
    /// Resolve symlinks to their target type when listing.
    pub include_symlinks: Option<bool>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn with_array_merge<F>(mut self, merge: F) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        self.array_merge = Some(Arc::new(merge));
        self
    }

    pub fn with_object_merge<F>(mut self, merge: F) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        self.object_merge = Some(Arc::new(merge));
        self
    }

    pub fn with_embed_directory_url_as(mut self, property: impl Into<String>) -> Self {
        self.embed_directory_url_as = Some(property.into());
        self
    }

    pub fn with_embed_file_url_as(mut self, property: impl Into<String>) -> Self {
        self.embed_file_url_as = Some(property.into());
        self
    }

    pub fn with_property_name_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.property_name_decoder = Some(Arc::new(decoder));
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_include_symlinks(mut self, include: bool) -> Self {
        self.include_symlinks = Some(include);
        self
    }

    /// Layer call-site options over these defaults.
    ///
    /// Each field set in `call_site` wins; unset fields fall back to `self`.
    pub fn merged_with(&self, call_site: &LoadOptions) -> LoadOptions {
        LoadOptions {
            cancellation_token: call_site
                .cancellation_token
                .clone()
                .or_else(|| self.cancellation_token.clone()),
            array_merge: call_site
                .array_merge
                .clone()
                .or_else(|| self.array_merge.clone()),
            object_merge: call_site
                .object_merge
                .clone()
                .or_else(|| self.object_merge.clone()),
            embed_directory_url_as: call_site
                .embed_directory_url_as
                .clone()
                .or_else(|| self.embed_directory_url_as.clone()),
            embed_file_url_as: call_site
                .embed_file_url_as
                .clone()
                .or_else(|| self.embed_file_url_as.clone()),
            property_name_decoder: call_site
                .property_name_decoder
                .clone()
                .or_else(|| self.property_name_decoder.clone()),
            strict: call_site.strict.or(self.strict),
            storage: call_site.storage.clone().or_else(|| self.storage.clone()),
            include_symlinks: call_site.include_symlinks.or(self.include_symlinks),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail with [`LoadError::Cancelled`] if the token has been cancelled.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        Ok(())
    }

    /// Apply the property name decoder, if any.
    pub fn decode_name(&self, name: String) -> String {
        match &self.property_name_decoder {
            Some(decoder) => decoder(&name),
            None => name,
        }
    }

    /// The options forwarded to storage backend calls.
    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            cancellation_token: self.cancellation_token.clone(),
            include_symlinks: self.include_symlinks.unwrap_or(false),
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("cancelled", &self.is_cancelled())
            .field("array_merge", &self.array_merge.is_some())
            .field("object_merge", &self.object_merge.is_some())
            .field("embed_directory_url_as", &self.embed_directory_url_as)
            .field("embed_file_url_as", &self.embed_file_url_as)
            .field("property_name_decoder", &self.property_name_decoder.is_some())
            .field("strict", &self.strict)
            .field("storage", &self.storage)
            .field("include_symlinks", &self.include_symlinks)
            .finish()
    }
}

/// Property name decoder that percent-decodes names (`my%20key` → `my key`).
///
/// Names that are not valid percent-encoded UTF-8 are kept unchanged.
pub fn percent_decode_names() -> NameDecoder {
    Arc::new(|name: &str| {
        urlencoding::decode(name)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| name.to_string())
    })
}
