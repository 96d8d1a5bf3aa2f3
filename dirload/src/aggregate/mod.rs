//! The directory aggregation engine.
//!
//! An [`AggregateLoader`] lists a directory, binds every entry to the first
//! registered loader that accepts it (falling back to itself for
//! subdirectories), orders the entries by key and loads them one after the
//! other into a [`Container`]. The container decides the shape of the result:
//! an object for [`ObjectLoader`], an array for [`ArrayLoader`].

mod container;

pub use container::{ArrayContainer, Container, ObjectContainer, MAX_ARRAY_INDEX};

use crate::entry::DirectoryEntry;
use crate::error::{LoadError, Result};
use crate::loader::{Acceptance, SharedLoader, ValueLoader};
use crate::options::LoadOptions;
use crate::ordering::compare_keys;
use crate::storage::{DirectoryListing, DisposeGuard, FileSystemStorage, SharedStorage};
use crate::value::Value;
use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Aggregates a directory into an object keyed by entry key.
pub type ObjectLoader = AggregateLoader<ObjectContainer>;

/// Aggregates a directory into an array indexed by integer entry keys.
pub type ArrayLoader = AggregateLoader<ArrayContainer>;

/// Which loader an entry was bound to during the decision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Registered(usize),
    Itself,
}

#[derive(Debug)]
struct PlannedEntry {
    entry: DirectoryEntry,
    key: Option<String>,
    binding: Binding,
}

/// Loads a directory by delegating each entry to a loader.
///
/// The engine takes a snapshot of the loader list on construction and is
/// immutable afterwards. It is implicitly the last loader consulted, so
/// subdirectories nobody else claims are aggregated recursively with the same
/// loaders.
pub struct AggregateLoader<C: Container> {
    name: String,
    loaders: Vec<SharedLoader>,
    storage: SharedStorage,
    defaults: LoadOptions,
    shape: PhantomData<fn() -> C>,
}

impl<C: Container> AggregateLoader<C> {
    pub fn new<I>(loaders: I) -> Self
    where
        I: IntoIterator<Item = SharedLoader>,
    {
        Self {
            name: C::KIND.to_string(),
            loaders: loaders.into_iter().collect(),
            storage: Arc::new(FileSystemStorage::new()),
            defaults: LoadOptions::default(),
            shape: PhantomData,
        }
    }

    /// Backend used when the call-site options name none.
    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        self.storage = storage;
        self
    }

    /// Options that apply to every load unless the call site overrides them.
    pub fn with_default_options(mut self, defaults: LoadOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn loaders(&self) -> &[SharedLoader] {
        &self.loaders
    }

    async fn bind(&self, entry: &DirectoryEntry) -> Result<Option<(Binding, Option<String>)>> {
        for (index, loader) in self.loaders.iter().enumerate() {
            if accepted(loader.can_load_value(entry)).await? {
                return Ok(Some((Binding::Registered(index), loader.compute_key(entry))));
            }
        }
        if accepted(self.can_load_value(entry)).await? {
            return Ok(Some((Binding::Itself, self.compute_key(entry))));
        }
        Ok(None)
    }

    async fn plan(
        &self,
        parent: &DirectoryEntry,
        entries: Vec<DirectoryEntry>,
        options: &LoadOptions,
    ) -> Result<Vec<PlannedEntry>> {
        let mut planned = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.with_parent(parent);
            match self.bind(&entry).await? {
                Some((binding, key)) => {
                    let key = key.map(|key| options.decode_name(key));
                    tracing::trace!("Bound '{}' to {:?} with key {:?}", entry.relative_path, binding, key);
                    planned.push(PlannedEntry {
                        entry,
                        key,
                        binding,
                    });
                }
                None if options.is_strict() => {
                    return Err(LoadError::UnhandledEntry {
                        relative_path: entry.relative_path,
                        location: entry.location,
                    });
                }
                None => {
                    tracing::debug!("No loader for '{}', skipping", entry.relative_path);
                }
            }
        }

        planned.sort_by(|a, b| {
            compare_keys(a.key.as_deref(), b.key.as_deref())
                .then_with(|| a.entry.name.cmp(&b.entry.name))
        });
        Ok(planned)
    }
}

async fn accepted(acceptance: Acceptance<'_>) -> Result<bool> {
    match acceptance {
        Acceptance::Ready(accepted) => Ok(accepted),
        deferred => deferred.resolve().await,
    }
}

impl<C: Container> fmt::Debug for AggregateLoader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaders: Vec<&str> = self.loaders.iter().map(|l| l.name()).collect();
        f.debug_struct("AggregateLoader")
            .field("name", &self.name)
            .field("loaders", &loaders)
            .field("storage", &self.storage)
            .field("defaults", &self.defaults)
            .finish()
    }
}

#[async_trait]
impl<C: Container> ValueLoader for AggregateLoader<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a> {
        Acceptance::Ready(entry.is_dir())
    }

    fn compute_key(&self, entry: &DirectoryEntry) -> Option<String> {
        Some(entry.name.clone())
    }

    async fn load_value(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<Value> {
        if !entry.is_dir() {
            return Err(LoadError::NotADirectory {
                location: entry.location.clone(),
            });
        }

        let options = self.defaults.merged_with(options);
        options.check_cancelled()?;

        let storage = options
            .storage
            .clone()
            .unwrap_or_else(|| self.storage.clone());
        let DirectoryListing {
            entries,
            disposer,
            nested_storage,
        } = storage
            .list_directory(&entry.location, &options.storage_options())
            .await?;
        let _dispose = DisposeGuard::new(disposer);
        tracing::debug!("Listed {} entries in {}", entries.len(), entry.location);

        let child_options = LoadOptions {
            storage: Some(nested_storage.unwrap_or(storage)),
            ..options.clone()
        };

        let planned = self.plan(entry, entries, &options).await?;

        let mut container = C::default();
        for PlannedEntry {
            entry: child,
            key,
            binding,
        } in planned
        {
            let Some(key) = key else {
                tracing::trace!("'{}' has no key, skipping", child.relative_path);
                continue;
            };
            child_options.check_cancelled()?;

            let mut value = match binding {
                Binding::Registered(index) => {
                    self.loaders[index].load_value(&child, &child_options).await?
                }
                Binding::Itself => self.load_value(&child, &child_options).await?,
            };

            if let (Some(property), Value::Object(map)) = (&options.embed_file_url_as, &mut value) {
                if child.is_file() {
                    map.insert(property.clone(), Value::from(child.location.as_str()));
                }
            }
            container.set_value(&key, value, &child.location, &options)?;
        }

        if let Some(property) = &options.embed_directory_url_as {
            if !container.embed_location(property, &entry.location) {
                tracing::trace!("{} results do not carry the directory location", C::KIND);
            }
        }

        Ok(container.into_value())
    }
}
