//! Storage backends: where directory listings and file contents come from.
//!
//! The loaders never touch the filesystem directly. They go through a
//! [`StorageBackend`], which makes the same loader stack usable against a real
//! directory ([`FileSystemStorage`]) or an in-memory tree ([`MemoryStorage`]).

mod fs;
mod memory;

pub use fs::{location_from_path, FileSystemStorage};
pub use memory::MemoryStorage;

use crate::entry::DirectoryEntry;
use crate::error::{LoadError, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Shared handle to a storage backend.
pub type SharedStorage = Arc<dyn StorageBackend>;

/// Releases a resource held open by a listing.
pub type Disposer = Box<dyn FnOnce() + Send>;

/// Options forwarded to every backend call.
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    pub cancellation_token: Option<CancellationToken>,
    /// Report symlinks as their target's type instead of [`EntryType::Other`](crate::EntryType::Other).
    pub include_symlinks: bool,
}

impl StorageOptions {
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
}

/// The result of listing a directory.
pub struct DirectoryListing {
    /// Entries in backend order. The engine never relies on this order.
    pub entries: Vec<DirectoryEntry>,
    /// Called once the directory has been fully processed or has failed.
    pub disposer: Option<Disposer>,
    /// Backend to use for the children of this directory.
    pub nested_storage: Option<SharedStorage>,
}

impl DirectoryListing {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            disposer: None,
            nested_storage: None,
        }
    }

    pub fn with_disposer(mut self, disposer: impl FnOnce() + Send + 'static) -> Self {
        self.disposer = Some(Box::new(disposer));
        self
    }

    pub fn with_nested_storage(mut self, storage: SharedStorage) -> Self {
        self.nested_storage = Some(storage);
        self
    }
}

impl fmt::Debug for DirectoryListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryListing")
            .field("entries", &self.entries)
            .field("disposer", &self.disposer.is_some())
            .field("nested_storage", &self.nested_storage)
            .finish()
    }
}

/// Runs a listing's disposer when dropped, on success and failure alike.
pub(crate) struct DisposeGuard(Option<Disposer>);

impl DisposeGuard {
    pub(crate) fn new(disposer: Option<Disposer>) -> Self {
        Self(disposer)
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        if let Some(dispose) = self.0.take() {
            dispose();
        }
    }
}

/// Lists directories and reads files for the loaders.
///
/// Implementations must be safe to share across concurrent loads.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Read a file as UTF-8 text.
    async fn read_text(&self, location: &Url, options: &StorageOptions) -> Result<String>;

    /// Read a file as raw bytes.
    async fn read_binary(&self, location: &Url, options: &StorageOptions) -> Result<Vec<u8>>;

    /// List the entries of a directory.
    async fn list_directory(
        &self,
        location: &Url,
        options: &StorageOptions,
    ) -> Result<DirectoryListing>;
}
