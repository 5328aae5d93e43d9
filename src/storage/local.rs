use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scenecatalog_common::paths::to_slash;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{RawFile, Share, StorageError, StorageProvider};

/// A share mounted into the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalShareStorage {
    root: PathBuf,
}

impl LocalShareStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a share-relative or absolute path.
    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }
}

fn raw_file(path: &Path, metadata: &std::fs::Metadata) -> RawFile {
    RawFile {
        path: to_slash(path),
        display_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        size: metadata.len(),
        modified_time: metadata.modified().ok().map(DateTime::<Utc>::from),
        is_directory: metadata.is_dir(),
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn not_found_or(path: &Path, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(to_slash(path))
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl StorageProvider for LocalShareStorage {
    fn name(&self) -> &str {
        "local"
    }

    async fn discover_shares(&self) -> Result<Vec<Share>, StorageError> {
        let metadata =
            tokio::fs::metadata(&self.root)
                .await
                .map_err(|source| StorageError::Unreachable {
                    path: to_slash(&self.root),
                    source,
                })?;
        if !metadata.is_dir() {
            return Err(StorageError::NotFound(to_slash(&self.root)));
        }

        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| to_slash(&self.root));

        Ok(vec![Share {
            name,
            path: to_slash(&self.root),
        }])
    }

    async fn list_directory(&self, share: &str, path: &str) -> Result<Vec<RawFile>, StorageError> {
        let dir = self.resolve(share).join(path.trim_start_matches('/'));
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| not_found_or(&dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            match entry.metadata().await {
                Ok(metadata) => files.push(raw_file(&entry.path(), &metadata)),
                Err(e) => warn!(path = ?entry.path(), error = %e, "Skipping unreadable entry"),
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn read_file(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path);
        let file = tokio::fs::File::open(&full)
            .await
            .map_err(|e| not_found_or(&full, e))?;

        let mut buf = Vec::with_capacity(max_bytes.min(1 << 20));
        file.take(max_bytes as u64).read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn stat(&self, path: &str) -> Result<RawFile, StorageError> {
        let full = self.resolve(path);
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| not_found_or(&full, e))?;
        Ok(raw_file(&full, &metadata))
    }

    async fn scan_media_files(&self, root: &str) -> Result<Vec<RawFile>, StorageError> {
        let dir = self.resolve(root);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(StorageError::NotFound(to_slash(&dir)));
        }

        let files = tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            let walker = WalkDir::new(&dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_hidden(e));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable path during walk");
                        continue;
                    }
                };
                if entry.file_type().is_dir() {
                    continue;
                }
                match entry.metadata() {
                    Ok(metadata) => files.push(raw_file(entry.path(), &metadata)),
                    Err(e) => warn!(path = ?entry.path(), error = %e, "Skipping unreadable file"),
                }
            }
            files
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;

        debug!(root, count = files.len(), "Walked share folder");
        Ok(files)
    }
}
