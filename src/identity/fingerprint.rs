//! Cheap file fingerprints.
//!
//! Fingerprints are identity proxies, not integrity checks: XxHash64 over
//! either the file size and a bounded prefix of its bytes, or over the path,
//! size and modification time. Values carry a strategy prefix so the two
//! namespaces never collide.

use std::hash::Hasher;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use twox_hash::XxHash64;

use crate::config::FingerprintStrategy;
use crate::storage::{StorageError, StorageProvider};

pub const CONTENT_PREFIX: &str = "c1:";
pub const METADATA_PREFIX: &str = "m1:";

pub struct Fingerprinter {
    storage: Arc<dyn StorageProvider>,
    strategy: FingerprintStrategy,
    prefix_bytes: usize,
}

impl Fingerprinter {
    pub fn new(storage: Arc<dyn StorageProvider>, strategy: FingerprintStrategy, prefix_bytes: usize) -> Self {
        Self {
            storage,
            strategy,
            prefix_bytes,
        }
    }

    pub async fn fingerprint(&self, path: &str) -> Result<String, StorageError> {
        let file = self.storage.stat(path).await?;
        match self.strategy {
            FingerprintStrategy::Content => {
                let prefix = self.storage.read_file(path, self.prefix_bytes).await?;
                Ok(content_fingerprint(file.size, &prefix))
            }
            FingerprintStrategy::Metadata => Ok(metadata_fingerprint(
                &file.path,
                file.size,
                file.modified_time,
            )),
        }
    }
}

pub fn content_fingerprint(size: u64, prefix: &[u8]) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&size.to_le_bytes());
    hasher.write(prefix);
    format!("{CONTENT_PREFIX}{:016x}", hasher.finish())
}

pub fn metadata_fingerprint(path: &str, size: u64, modified: Option<DateTime<Utc>>) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(path.as_bytes());
    hasher.write(&[0]);
    hasher.write(&size.to_le_bytes());
    let seconds = modified.map_or(i64::MIN, |m| m.timestamp());
    hasher.write(&seconds.to_le_bytes());
    format!("{METADATA_PREFIX}{:016x}", hasher.finish())
}
