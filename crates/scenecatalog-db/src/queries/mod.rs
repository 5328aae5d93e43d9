//! Database query modules.
//!
//! - items: catalog item upserts, lookups, and duplicate grouping
//! - fingerprints: fingerprint upserts and lookups
//! - scan_runs: scan history

pub mod fingerprints;
pub mod items;
pub mod scan_runs;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Wrap a column decoding problem as a rusqlite conversion error.
pub(crate) fn conversion_error(column: usize, message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into().into())
}

/// Decode an RFC 3339 timestamp column.
pub(crate) fn timestamp(row: &rusqlite::Row, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e.to_string()))
}

/// Decode a JSON text column.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    column: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(column, e.to_string()))
}

/// Decode an item id column.
pub(crate) fn item_id(
    row: &rusqlite::Row,
    column: usize,
) -> rusqlite::Result<scenecatalog_common::ItemId> {
    let raw: String = row.get(column)?;
    raw.parse::<scenecatalog_common::ItemId>()
        .map_err(|e| conversion_error(column, e.to_string()))
}
