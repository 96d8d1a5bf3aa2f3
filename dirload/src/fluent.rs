//! Composable refinements over any loader.
//!
//! A [`FluentLoader`] wraps an inner loader and narrows it: extra predicates
//! are AND-ed with the inner acceptance and keys can be rewritten. Every
//! refinement returns a new wrapper around the previous one, so a base loader
//! can be refined in several directions without being changed.
//!
//! ```
//! use dirload::{json_loader, Fluent};
//!
//! let services = json_loader()
//!     .fluent()
//!     .when_path_matches("/services/*")
//!     .unwrap()
//!     .map_key(|_entry, key| key.to_uppercase())
//!     .named("services");
//! ```

use crate::entry::DirectoryEntry;
use crate::error::{LoadError, Result};
use crate::loader::{dotted, Acceptance, SharedLoader, ValueLoader};
use crate::options::LoadOptions;
use crate::value::Value;
use async_trait::async_trait;
use futures::future::BoxFuture;
use glob::{MatchOptions, Pattern};
use std::fmt;
use std::sync::Arc;

/// An additional acceptance condition.
pub type Predicate = Arc<dyn for<'a> Fn(&'a DirectoryEntry) -> Acceptance<'a> + Send + Sync>;

/// Rewrites a key computed by the inner loader.
pub type KeyTransform = Arc<dyn Fn(&DirectoryEntry, String) -> String + Send + Sync>;

const PATH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A loader decorated with a predicate, a key transform or a name.
#[derive(Clone)]
pub struct FluentLoader {
    inner: SharedLoader,
    name: Option<String>,
    predicate: Option<Predicate>,
    key_transform: Option<KeyTransform>,
}

impl FluentLoader {
    /// Wrap `inner` without changing its behaviour.
    pub fn wrap(inner: SharedLoader) -> Self {
        Self {
            inner,
            name: None,
            predicate: None,
            key_transform: None,
        }
    }

    fn refine(&self) -> Self {
        Self::wrap(Arc::new(self.clone()))
    }

    /// Override the diagnostic name.
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self.refine()
        }
    }

    /// Also require `predicate` to hold.
    pub fn when<F>(&self, predicate: F) -> Self
    where
        F: Fn(&DirectoryEntry) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Some(predicate_fn(move |entry| {
                Acceptance::Ready(predicate(entry))
            })),
            ..self.refine()
        }
    }

    /// Also require an asynchronously computed condition to hold.
    pub fn when_deferred<F>(&self, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a DirectoryEntry) -> BoxFuture<'a, Result<bool>> + Send + Sync + 'static,
    {
        Self {
            predicate: Some(predicate_fn(move |entry| {
                Acceptance::Deferred(predicate(entry))
            })),
            ..self.refine()
        }
    }

    /// Rewrite keys produced by the inner loader. `None` keys stay `None`.
    pub fn map_key<F>(&self, transform: F) -> Self
    where
        F: Fn(&DirectoryEntry, String) -> String + Send + Sync + 'static,
    {
        Self {
            key_transform: Some(Arc::new(transform)),
            ..self.refine()
        }
    }

    /// Only accept entries whose name ends with `extension`.
    pub fn when_extension_is(&self, extension: &str) -> Self {
        self.when_extension_is_one_of(&[extension])
    }

    /// Only accept entries whose name ends with one of `extensions`.
    pub fn when_extension_is_one_of(&self, extensions: &[&str]) -> Self {
        let extensions: Vec<String> = extensions.iter().map(|ext| dotted(ext)).collect();
        self.when(move |entry| extensions.iter().any(|ext| entry.name.ends_with(ext.as_str())))
    }

    /// Only accept entries whose relative path matches `pattern`.
    pub fn when_path_matches(&self, pattern: &str) -> Result<Self> {
        self.when_path_matches_all(&[pattern])
    }

    /// Only accept entries whose relative path matches every pattern.
    pub fn when_path_matches_all(&self, patterns: &[&str]) -> Result<Self> {
        let patterns = compile(patterns)?;
        Ok(self.when(move |entry| {
            patterns
                .iter()
                .all(|p| p.matches_with(&entry.relative_path, PATH_MATCH))
        }))
    }

    /// Only accept entries whose relative path matches at least one pattern.
    pub fn when_path_matches_any(&self, patterns: &[&str]) -> Result<Self> {
        let patterns = compile(patterns)?;
        Ok(self.when(move |entry| {
            patterns
                .iter()
                .any(|p| p.matches_with(&entry.relative_path, PATH_MATCH))
        }))
    }

    /// This loader as a shared handle for a loader list.
    pub fn into_shared(self) -> SharedLoader {
        Arc::new(self)
    }
}

fn predicate_fn<F>(predicate: F) -> Predicate
where
    F: for<'a> Fn(&'a DirectoryEntry) -> Acceptance<'a> + Send + Sync + 'static,
{
    Arc::new(predicate)
}

fn compile(patterns: &[&str]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| LoadError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

impl fmt::Debug for FluentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluentLoader")
            .field("name", &self.name())
            .field("inner", &self.inner)
            .field("predicate", &self.predicate.is_some())
            .field("key_transform", &self.key_transform.is_some())
            .finish()
    }
}

#[async_trait]
impl ValueLoader for FluentLoader {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.inner.name())
    }

    fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a> {
        let inner = self.inner.can_load_value(entry);
        match &self.predicate {
            Some(predicate) => inner.and_then(move || predicate(entry)),
            None => inner,
        }
    }

    fn compute_key(&self, entry: &DirectoryEntry) -> Option<String> {
        let key = self.inner.compute_key(entry)?;
        Some(match &self.key_transform {
            Some(transform) => transform(entry, key),
            None => key,
        })
    }

    async fn load_value(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<Value> {
        self.inner.load_value(entry, options).await
    }
}

/// Start a fluent chain from any loader.
pub trait Fluent {
    fn fluent(self) -> FluentLoader;
}

impl<L: ValueLoader + 'static> Fluent for L {
    fn fluent(self) -> FluentLoader {
        FluentLoader::wrap(Arc::new(self))
    }
}
