//! In-memory storage backend.

use super::{DirectoryListing, StorageBackend, StorageOptions};
use crate::entry::{DirectoryEntry, EntryType};
use crate::error::{LoadError, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

const ROOT: &str = "/";

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Directory,
    Other,
}

#[derive(Debug, Clone)]
struct MemoryNode {
    name: String,
    parent: String,
    node: Node,
}

/// A read-only tree of files held in memory.
///
/// Locations are `memory:///` URLs. Directories list their children in the
/// order they were added, which makes it easy to present the same tree in
/// different listing orders.
///
/// ```
/// use dirload::MemoryStorage;
///
/// let storage = MemoryStorage::new()
///     .with_file("app/name.txt", "demo")
///     .with_file("app/server/port.json", "8080");
/// assert!(storage.location("app/server").as_str().starts_with("memory:///"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    nodes: IndexMap<String, MemoryNode>,
    operations: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories.
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, Node::File(content.into()))
    }

    /// Add an empty directory, creating its parents.
    pub fn with_dir(self, path: &str) -> Self {
        self.insert(path, Node::Directory)
    }

    /// Add an entry that is neither a file nor a directory.
    pub fn with_other(self, path: &str) -> Self {
        self.insert(path, Node::Other)
    }

    /// The location of `path` inside this storage.
    pub fn location(&self, path: &str) -> Url {
        let mut url = Url::parse("memory:///").expect("static URL is valid");
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(split(path));
        }
        url
    }

    /// Number of list/read calls served so far.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn insert(mut self, path: &str, node: Node) -> Self {
        let segments: Vec<&str> = split(path).collect();
        for depth in 1..segments.len() {
            self.insert_node(&segments[..depth], Node::Directory, false);
        }
        if !segments.is_empty() {
            self.insert_node(&segments, node, true);
        }
        self
    }

    fn insert_node(&mut self, segments: &[&str], node: Node, replace: bool) {
        let Some((name, parents)) = segments.split_last() else {
            return;
        };
        let key = Self::key(&self.location(&segments.join("/")));
        if !replace && self.nodes.contains_key(&key) {
            return;
        }
        let parent = Self::key(&self.location(&parents.join("/")));
        self.nodes.insert(
            key,
            MemoryNode {
                name: name.to_string(),
                parent,
                node,
            },
        );
    }

    fn check_scheme(location: &Url) -> Result<()> {
        if location.scheme() != "memory" {
            return Err(LoadError::invalid_location(location.as_str()));
        }
        Ok(())
    }

    fn key(location: &Url) -> String {
        let path = location.path();
        if path.len() > 1 {
            path.trim_end_matches('/').to_string()
        } else {
            ROOT.to_string()
        }
    }

    fn read(&self, location: &Url, options: &StorageOptions) -> Result<&[u8]> {
        options.check_cancelled()?;
        Self::check_scheme(location)?;
        self.operations.fetch_add(1, Ordering::SeqCst);
        match self.nodes.get(&Self::key(location)).map(|n| &n.node) {
            Some(Node::File(content)) => Ok(content),
            Some(_) => Err(LoadError::io(
                location,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            )),
            None => Err(LoadError::NotFound {
                location: location.clone(),
            }),
        }
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read_text(&self, location: &Url, options: &StorageOptions) -> Result<String> {
        let content = self.read(location, options)?;
        String::from_utf8(content.to_vec()).map_err(|e| {
            LoadError::io(
                location,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    async fn read_binary(&self, location: &Url, options: &StorageOptions) -> Result<Vec<u8>> {
        self.read(location, options).map(<[u8]>::to_vec)
    }

    async fn list_directory(
        &self,
        location: &Url,
        options: &StorageOptions,
    ) -> Result<DirectoryListing> {
        options.check_cancelled()?;
        Self::check_scheme(location)?;
        self.operations.fetch_add(1, Ordering::SeqCst);

        let key = Self::key(location);
        match self.nodes.get(&key).map(|n| &n.node) {
            Some(Node::Directory) => {}
            None if key == ROOT => {}
            Some(_) => {
                return Err(LoadError::io(
                    location,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
                ))
            }
            None => {
                return Err(LoadError::NotFound {
                    location: location.clone(),
                })
            }
        }

        let entries = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent == key)
            .map(|(path, node)| {
                let entry_type = match node.node {
                    Node::File(_) => EntryType::File,
                    Node::Directory => EntryType::Directory,
                    Node::Other => EntryType::Other,
                };
                let mut child = location.clone();
                child.set_path(path);
                DirectoryEntry::new(node.name.clone(), entry_type, child)
            })
            .collect();

        Ok(DirectoryListing::new(entries))
    }
}
