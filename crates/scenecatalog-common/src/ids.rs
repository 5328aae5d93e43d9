//! Typed ID wrappers for type safety across scenecatalog.
//!
//! Catalog item ids are not random: they are UUIDv5 values derived from the
//! item's primary path, so rescanning an unchanged file always lands on the
//! same record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for path-derived item ids.
const ITEM_NAMESPACE: Uuid = Uuid::from_bytes([
    0x5c, 0x3e, 0x6a, 0x21, 0x94, 0x0d, 0x4f, 0x7b, 0x8e, 0x12, 0xc4, 0x50, 0x9a, 0x77, 0x3d, 0xe1,
]);

/// Unique identifier for a catalog item (movie, series, or unknown file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Derive the id for an item from its primary path.
    ///
    /// Path separators are normalised to `/` first so the same share path
    /// produces the same id regardless of platform.
    #[must_use]
    pub fn from_path(primary_path: &str) -> Self {
        let normalized = primary_path.replace('\\', "/");
        Self(Uuid::new_v5(&ITEM_NAMESPACE, normalized.as_bytes()))
    }

    /// Parse an id from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for ItemId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ItemId> for Uuid {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
