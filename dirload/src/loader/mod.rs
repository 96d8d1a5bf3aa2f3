//! Value loaders: the unit of extensibility.
//!
//! A [`ValueLoader`] decides whether it handles a directory entry, computes the
//! key the entry is stored under, and loads the entry's value. The aggregation
//! engine probes loaders in registration order and binds each entry to the
//! first loader that accepts it.

mod file;
mod parser;

pub use file::{BinaryFileLoader, TextFileLoader};
pub use parser::{json_loader, toml_loader, yaml_loader, ParseFn, StringParserLoader};

use crate::entry::{DirectoryEntry, EntryType};
use crate::error::{LoadError, Result};
use crate::options::LoadOptions;
use crate::value::Value;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Shared handle to a loader.
pub type SharedLoader = Arc<dyn ValueLoader>;

/// Answer to "can this loader load this entry?".
///
/// Most loaders answer immediately from the entry's name and type. Loaders
/// that need I/O to decide (peeking at file content, say) return a deferred
/// answer, which callers await only when they actually get one.
pub enum Acceptance<'a> {
    Ready(bool),
    Deferred(BoxFuture<'a, Result<bool>>),
}

impl<'a> Acceptance<'a> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Acceptance::Ready(_))
    }

    /// Wait for the answer.
    pub async fn resolve(self) -> Result<bool> {
        match self {
            Acceptance::Ready(accepted) => Ok(accepted),
            Acceptance::Deferred(answer) => answer.await,
        }
    }

    /// Logical AND with a second answer, computed only when still needed.
    ///
    /// A ready `false` short-circuits, a ready `true` yields `next()` as is, and
    /// only a deferred answer forces the combination to be deferred.
    pub fn and_then<F>(self, next: F) -> Acceptance<'a>
    where
        F: FnOnce() -> Acceptance<'a> + Send + 'a,
    {
        match self {
            Acceptance::Ready(false) => Acceptance::Ready(false),
            Acceptance::Ready(true) => next(),
            Acceptance::Deferred(answer) => Acceptance::Deferred(Box::pin(async move {
                if answer.await? {
                    next().resolve().await
                } else {
                    Ok(false)
                }
            })),
        }
    }
}

impl From<bool> for Acceptance<'_> {
    fn from(accepted: bool) -> Self {
        Acceptance::Ready(accepted)
    }
}

impl fmt::Debug for Acceptance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acceptance::Ready(accepted) => f.debug_tuple("Ready").field(accepted).finish(),
            Acceptance::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Loads the value of a directory entry.
///
/// Loaders are immutable once built and shared across concurrent loads.
#[async_trait]
pub trait ValueLoader: Send + Sync + fmt::Debug {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Whether this loader handles `entry`. Must not have side effects.
    fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a>;

    /// The key `entry` is stored under. `None` accepts the entry but stores nothing.
    fn compute_key(&self, entry: &DirectoryEntry) -> Option<String>;

    /// Load the entry's value.
    async fn load_value(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<Value>;
}

/// Load a single root file or directory with any loader.
#[async_trait]
pub trait ValueLoaderExt: ValueLoader {
    /// Load the file at `location`, failing if this loader rejects it.
    async fn load_file(&self, location: Url, options: &LoadOptions) -> Result<Value> {
        self.load_root(EntryType::File, location, options).await
    }

    /// Load the directory at `location`, failing if this loader rejects it.
    async fn load_directory(&self, location: Url, options: &LoadOptions) -> Result<Value> {
        self.load_root(EntryType::Directory, location, options).await
    }

    /// Synthesize a root entry of `entry_type`, confirm acceptance and load it.
    async fn load_root(
        &self,
        entry_type: EntryType,
        location: Url,
        options: &LoadOptions,
    ) -> Result<Value> {
        let entry = DirectoryEntry::root(entry_type, location);
        if !self.can_load_value(&entry).resolve().await? {
            return Err(LoadError::NotAccepted {
                loader: self.name().to_string(),
                location: entry.location,
            });
        }
        self.load_value(&entry, options).await
    }
}

#[async_trait]
impl<T: ValueLoader + ?Sized> ValueLoaderExt for T {}

/// Normalize an extension to its dotted form (`json` → `.json`).
pub(crate) fn dotted(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_ready_and_ready() {
        assert!(matches!(
            Acceptance::Ready(true).and_then(|| Acceptance::Ready(true)),
            Acceptance::Ready(true)
        ));
        assert!(matches!(
            Acceptance::Ready(true).and_then(|| Acceptance::Ready(false)),
            Acceptance::Ready(false)
        ));
    }

    #[tokio::test]
    async fn test_ready_false_short_circuits() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let combined = Acceptance::Ready(false).and_then(move || {
            flag.store(true, Ordering::SeqCst);
            Acceptance::Ready(true)
        });
        assert!(matches!(combined, Acceptance::Ready(false)));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_deferred_combines() {
        let deferred = || Acceptance::Deferred(Box::pin(async { Ok::<_, LoadError>(true) }));
        let combined = deferred().and_then(|| Acceptance::Ready(false));
        assert!(!combined.is_ready());
        assert!(!combined.resolve().await.unwrap());

        let combined = Acceptance::Ready(true).and_then(deferred);
        assert!(!combined.is_ready());
        assert!(combined.resolve().await.unwrap());
    }

    #[tokio::test]
    async fn test_deferred_error_propagates() {
        let failing = Acceptance::Deferred(Box::pin(async { Err::<bool, _>(LoadError::Cancelled) }));
        let combined = failing.and_then(|| Acceptance::Ready(true));
        assert!(combined.resolve().await.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_dotted() {
        assert_eq!(dotted("json"), ".json");
        assert_eq!(dotted(".json"), ".json");
    }
}
