//! Access to the file share being catalogued.
//!
//! The scanner never touches the filesystem directly; it goes through a
//! [`StorageProvider`]. [`LocalShareStorage`] serves a share that is mounted
//! into the local filesystem (SMB/NFS mount point or plain directory).

mod local;

pub use local::LocalShareStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A file or directory entry as reported by the share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFile {
    /// Full path, `/`-separated
    pub path: String,
    pub display_name: String,
    pub size: u64,
    pub modified_time: Option<DateTime<Utc>>,
    pub is_directory: bool,
}

/// A share exposed by the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub name: String,
    pub path: String,
}

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No share path configured")]
    NotConfigured,

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Share unreachable at {path}: {source}")]
    Unreachable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage backend the scanner reads from.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Shares available on this backend.
    async fn discover_shares(&self) -> Result<Vec<Share>, StorageError>;

    /// Immediate children of `path` within `share`.
    async fn list_directory(&self, share: &str, path: &str) -> Result<Vec<RawFile>, StorageError>;

    /// Up to `max_bytes` from the start of the file.
    async fn read_file(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, StorageError>;

    /// Size and timestamps of a single path.
    async fn stat(&self, path: &str) -> Result<RawFile, StorageError>;

    /// Every file below `root`, recursively. Unreadable entries are skipped.
    async fn scan_media_files(&self, root: &str) -> Result<Vec<RawFile>, StorageError>;
}
