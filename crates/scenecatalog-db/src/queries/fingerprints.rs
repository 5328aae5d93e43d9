//! Fingerprint queries.

use rusqlite::Connection;
use scenecatalog_common::{Error, Result};

use super::{item_id, timestamp};
use crate::models::FingerprintRecord;

/// Insert or update a fingerprint by value.
///
/// Missing `media_id`/`title` on the new record never erase stored values.
pub fn upsert_fingerprint(conn: &Connection, record: &FingerprintRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO fingerprints (value, media_id, title, created_at, updated_at)
         VALUES (:value, :media_id, :title, :created_at, :updated_at)
         ON CONFLICT(value) DO UPDATE SET
            media_id = COALESCE(:media_id, media_id),
            title = COALESCE(:title, title),
            updated_at = :updated_at",
        rusqlite::named_params! {
            ":value": &record.value,
            ":media_id": record.media_id.map(|id| id.to_string()),
            ":title": &record.title,
            ":created_at": record.created_at.to_rfc3339(),
            ":updated_at": record.updated_at.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

fn parse_fingerprint_row(row: &rusqlite::Row) -> rusqlite::Result<FingerprintRecord> {
    let media_id = match row.get::<_, Option<String>>(1)? {
        Some(_) => Some(item_id(row, 1)?),
        None => None,
    };

    Ok(FingerprintRecord {
        value: row.get(0)?,
        media_id,
        title: row.get(2)?,
        created_at: timestamp(row, 3)?,
        updated_at: timestamp(row, 4)?,
    })
}

/// Get a fingerprint record by value.
pub fn get_fingerprint(conn: &Connection, value: &str) -> Result<Option<FingerprintRecord>> {
    let result = conn.query_row(
        "SELECT value, media_id, title, created_at, updated_at
         FROM fingerprints WHERE value = :value",
        rusqlite::named_params! { ":value": value },
        parse_fingerprint_row,
    );

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}
