//! Error types for directory loading operations.

use thiserror::Error;
use url::Url;

/// Boxed error produced by parse functions and other user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using LoadError.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that can occur while loading a directory tree.
///
/// Every error aborts the whole load: a failure in one subtree fails the tree.
#[derive(Error, Debug)]
pub enum LoadError {
    /// An aggregation loader was asked to load something that is not a directory.
    #[error("'{location}' is not a directory")]
    NotADirectory { location: Url },

    /// Strict mode: no registered loader accepted an entry.
    #[error("no loader accepts '{relative_path}' ({location})")]
    UnhandledEntry { relative_path: String, location: Url },

    /// A root load was attempted with a loader that rejects the root entry.
    #[error("loader '{loader}' does not accept '{location}'")]
    NotAccepted { loader: String, location: Url },

    /// The storage backend has nothing at this location.
    #[error("'{location}' not found")]
    NotFound { location: Url },

    /// The storage backend failed to read or list a location.
    #[error("I/O error at '{location}': {source}")]
    Io {
        location: Url,
        #[source]
        source: std::io::Error,
    },

    /// A parse function rejected the content of a file.
    #[error("failed to parse '{location}': {source}")]
    Parse {
        location: Url,
        #[source]
        source: BoxError,
    },

    /// An array result was asked to store a value past its largest index.
    #[error("array index '{key}' from '{location}' exceeds the limit of {limit}")]
    IndexOutOfRange {
        key: String,
        location: Url,
        limit: usize,
    },

    /// The load was cancelled through its cancellation token.
    #[error("load cancelled")]
    Cancelled,

    /// A location could not be used by the storage backend.
    #[error("invalid location '{location}'")]
    InvalidLocation { location: String },

    /// A glob pattern handed to a fluent loader is malformed.
    #[error("invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl LoadError {
    /// Create an Io error, mapping `NotFound` kinds to [`LoadError::NotFound`].
    pub fn io(location: &Url, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                location: location.clone(),
            }
        } else {
            Self::Io {
                location: location.clone(),
                source,
            }
        }
    }

    /// Create a Parse error.
    pub fn parse(location: &Url, source: impl Into<BoxError>) -> Self {
        Self::Parse {
            location: location.clone(),
            source: source.into(),
        }
    }

    /// Create an InvalidLocation error.
    pub fn invalid_location(location: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
        }
    }

    /// Whether this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
