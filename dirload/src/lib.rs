//! Load a directory tree into one structured value.
//!
//! Every entry of a directory is handed to the first loader that accepts it;
//! the loader's key becomes a property of the result and its value the
//! property's value. Subdirectories are loaded recursively the same way, so a
//! tree of small configuration files becomes one configuration object.
//!
//! # Overview
//!
//! - [`ValueLoader`] - the loader contract, with text, binary and parser
//!   implementations ([`TextFileLoader`], [`BinaryFileLoader`],
//!   [`StringParserLoader`])
//! - [`FluentLoader`] - refines any loader with predicates and key transforms
//! - [`ObjectLoader`] / [`ArrayLoader`] - the aggregation engine
//! - [`StorageBackend`] - where listings and contents come from
//!   ([`FileSystemStorage`], [`MemoryStorage`])
//!
//! Keys are ordered numerically where they are integers (`9` before `10`) and
//! byte-wise otherwise, so the result never depends on listing order.
//!
//! # Example
//!
//! ```no_run
//! use dirload::{load_path, LoadOptions};
//!
//! # async fn run() -> dirload::Result<()> {
//! // config/name.txt          -> "demo"
//! // config/server/port.json  -> 8080
//! let config = load_path("config", &LoadOptions::new()).await?;
//! assert_eq!(config.get("name").and_then(|v| v.as_str()), Some("demo"));
//! # Ok(())
//! # }
//! ```
//!
//! # Custom loaders
//!
//! ```rust
//! use dirload::{json_loader, Fluent, MemoryStorage, ObjectLoader, SharedLoader, TextFileLoader};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(MemoryStorage::new().with_file("notes/readme.md", "# hi"));
//! let loaders: Vec<SharedLoader> = vec![
//!     Arc::new(json_loader()),
//!     TextFileLoader::new().fluent().when_extension_is("md").into_shared(),
//! ];
//! let engine = ObjectLoader::new(loaders).with_storage(storage);
//! ```

mod aggregate;
mod entry;
mod error;
mod fluent;
mod loader;
mod merge;
mod options;
mod ordering;
mod storage;
mod value;

pub use aggregate::{
    AggregateLoader, ArrayContainer, ArrayLoader, Container, ObjectContainer, ObjectLoader,
    MAX_ARRAY_INDEX,
};
pub use entry::{DirectoryEntry, EntryType};
pub use error::{BoxError, LoadError, Result};
pub use fluent::{Fluent, FluentLoader, KeyTransform, Predicate};
pub use loader::{
    json_loader, toml_loader, yaml_loader, Acceptance, BinaryFileLoader, ParseFn, SharedLoader,
    StringParserLoader, TextFileLoader, ValueLoader, ValueLoaderExt,
};
pub use merge::{concat_arrays, concat_arrays_fn, deep_merge, deep_merge_fn, set_or_merge};
pub use options::{percent_decode_names, LoadOptions, MergeFn, NameDecoder};
pub use ordering::{compare_keys, index_key, numeric_key};
pub use storage::{
    location_from_path, DirectoryListing, Disposer, FileSystemStorage, MemoryStorage,
    SharedStorage, StorageBackend, StorageOptions,
};
pub use value::{Map, Value};

use std::path::Path;
use std::sync::Arc;
use url::Url;

/// A fresh list of the built-in parsers: JSON, YAML (`.yaml` and `.yml`),
/// TOML and plain text (`.txt`).
pub fn default_loaders() -> Vec<SharedLoader> {
    vec![
        Arc::new(json_loader()),
        Arc::new(yaml_loader(".yaml")),
        Arc::new(yaml_loader(".yml")),
        Arc::new(toml_loader()),
        Arc::new(TextFileLoader::with_extension(".txt")),
    ]
}

/// Load the directory at `location` into an object using [`default_loaders`].
///
/// The location is read through `options.storage`, or the local filesystem
/// when none is set.
pub async fn load_directory(location: Url, options: &LoadOptions) -> Result<Value> {
    ObjectLoader::new(default_loaders())
        .load_directory(location, options)
        .await
}

/// Load a local directory into an object using [`default_loaders`].
pub async fn load_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Value> {
    let location = location_from_path(path)?;
    tracing::debug!("Loading directory {}", location);
    load_directory(location, options).await
}

/// Load a single file with the first of `loaders` that accepts it.
pub async fn load_file(
    location: Url,
    loaders: &[SharedLoader],
    options: &LoadOptions,
) -> Result<Value> {
    let entry = DirectoryEntry::root(EntryType::File, location);
    for loader in loaders {
        if loader.can_load_value(&entry).resolve().await? {
            tracing::debug!("Loading {} with {}", entry.location, loader.name());
            return loader.load_value(&entry, options).await;
        }
    }

    let names: Vec<&str> = loaders.iter().map(|loader| loader.name()).collect();
    Err(LoadError::NotAccepted {
        loader: names.join(", "),
        location: entry.location,
    })
}
