//! Local filesystem storage backend.

use super::{DirectoryListing, StorageBackend, StorageOptions};
use crate::entry::{DirectoryEntry, EntryType};
use crate::error::{LoadError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

/// Reads directories and files from the local filesystem through `tokio::fs`.
///
/// Locations are `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemStorage;

impl FileSystemStorage {
    pub fn new() -> Self {
        Self
    }

    fn to_path(location: &Url) -> Result<PathBuf> {
        if location.scheme() != "file" {
            return Err(LoadError::invalid_location(location.as_str()));
        }
        location
            .to_file_path()
            .map_err(|_| LoadError::invalid_location(location.as_str()))
    }

    async fn entry_type(
        path: &Path,
        file_type: std::fs::FileType,
        options: &StorageOptions,
    ) -> EntryType {
        if file_type.is_symlink() {
            if !options.include_symlinks {
                return EntryType::Other;
            }
            return match tokio::fs::metadata(path).await {
                Ok(metadata) if metadata.is_dir() => EntryType::Directory,
                Ok(metadata) if metadata.is_file() => EntryType::File,
                Ok(_) => EntryType::Other,
                Err(e) => {
                    tracing::debug!("Dangling symlink '{}': {}", path.display(), e);
                    EntryType::Other
                }
            };
        }

        if file_type.is_dir() {
            EntryType::Directory
        } else if file_type.is_file() {
            EntryType::File
        } else {
            EntryType::Other
        }
    }
}

/// Convert a local path into a `file://` location.
///
/// Relative paths are resolved against the current directory.
pub fn location_from_path(path: impl AsRef<Path>) -> Result<Url> {
    let path = path.as_ref();
    let absolute = std::path::absolute(path)
        .map_err(|_| LoadError::invalid_location(path.display().to_string()))?;
    Url::from_file_path(&absolute)
        .map_err(|_| LoadError::invalid_location(absolute.display().to_string()))
}

#[async_trait]
impl StorageBackend for FileSystemStorage {
    async fn read_text(&self, location: &Url, options: &StorageOptions) -> Result<String> {
        options.check_cancelled()?;
        let path = Self::to_path(location)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LoadError::io(location, e))
    }

    async fn read_binary(&self, location: &Url, options: &StorageOptions) -> Result<Vec<u8>> {
        options.check_cancelled()?;
        let path = Self::to_path(location)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| LoadError::io(location, e))
    }

    async fn list_directory(
        &self,
        location: &Url,
        options: &StorageOptions,
    ) -> Result<DirectoryListing> {
        options.check_cancelled()?;
        let dir = Self::to_path(location)?;
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| LoadError::io(location, e))?;

        let mut entries = Vec::new();
        while let Some(dir_entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| LoadError::io(location, e))?
        {
            options.check_cancelled()?;
            let path = dir_entry.path();
            let file_type = dir_entry
                .file_type()
                .await
                .map_err(|e| LoadError::io(location, e))?;
            let entry_type = Self::entry_type(&path, file_type, options).await;
            let entry_location = Url::from_file_path(&path)
                .map_err(|_| LoadError::invalid_location(path.display().to_string()))?;
            let name = dir_entry.file_name().to_string_lossy().into_owned();

            entries.push(DirectoryEntry::new(name, entry_type, entry_location));
        }

        tracing::trace!("Listed {} entries in {}", entries.len(), dir.display());
        Ok(DirectoryListing::new(entries))
    }
}
