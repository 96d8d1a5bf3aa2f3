//! Directory entries as seen during a traversal.

use url::Url;

/// The kind of an item reported by a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryType {
    File,
    Directory,
    /// Symlinks (unless resolved by the backend), sockets, devices and the like.
    Other,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One listed item, placed in the context of the traversal that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Raw entry name including its extension.
    pub name: String,
    pub entry_type: EntryType,
    /// Backend-specific location used for reads and nested listings.
    pub location: Url,
    /// `/`-separated path from the traversal root. The root itself is `""`.
    ///
    /// This is an identifier for pattern matching; it is never handed to a
    /// storage backend.
    pub relative_path: String,
}

impl DirectoryEntry {
    /// Create an entry as a storage backend reports it, before it is placed
    /// under a parent.
    pub fn new(name: impl Into<String>, entry_type: EntryType, location: Url) -> Self {
        Self {
            name: name.into(),
            entry_type,
            location,
            relative_path: String::new(),
        }
    }

    /// Create the synthetic root entry for a load that starts at `location`.
    ///
    /// The name is the last non-empty path segment of the location.
    pub fn root(entry_type: EntryType, location: Url) -> Self {
        let name = location
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| segment.to_string())
            })
            .unwrap_or_default();
        Self::new(name, entry_type, location)
    }

    /// Place this entry under `parent`, deriving its relative path.
    pub fn with_parent(mut self, parent: &DirectoryEntry) -> Self {
        self.relative_path = format!("{}/{}", parent.relative_path, self.name);
        self
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_root(&self) -> bool {
        self.relative_path.is_empty()
    }
}
