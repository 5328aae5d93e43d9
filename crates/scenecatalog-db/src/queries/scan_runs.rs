//! Scan history queries.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use scenecatalog_common::{Error, Result};

use super::{json_column, timestamp};
use crate::models::ScanRun;

/// Summary of a finished scan to record.
#[derive(Debug, Clone)]
pub struct NewScanRun<'a> {
    pub phase: &'a str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_discovered: u64,
    pub items_processed: u64,
    pub items_resolved: u64,
    pub items_failed: u64,
    pub errors: &'a [String],
}

/// Record a finished scan, returning its row id.
pub fn record_scan_run(conn: &Connection, run: &NewScanRun<'_>) -> Result<i64> {
    let errors_json = serde_json::to_string(run.errors)?;

    conn.execute(
        "INSERT INTO scan_runs (
            phase, started_at, finished_at, files_discovered, items_processed,
            items_resolved, items_failed, errors
         ) VALUES (
            :phase, :started_at, :finished_at, :files_discovered, :items_processed,
            :items_resolved, :items_failed, :errors
         )",
        rusqlite::named_params! {
            ":phase": run.phase,
            ":started_at": run.started_at.to_rfc3339(),
            ":finished_at": run.finished_at.to_rfc3339(),
            ":files_discovered": run.files_discovered as i64,
            ":items_processed": run.items_processed as i64,
            ":items_resolved": run.items_resolved as i64,
            ":items_failed": run.items_failed as i64,
            ":errors": errors_json,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(conn.last_insert_rowid())
}

fn parse_scan_run_row(row: &rusqlite::Row) -> rusqlite::Result<ScanRun> {
    Ok(ScanRun {
        id: row.get(0)?,
        phase: row.get(1)?,
        started_at: timestamp(row, 2)?,
        finished_at: timestamp(row, 3)?,
        files_discovered: row.get::<_, i64>(4)? as u64,
        items_processed: row.get::<_, i64>(5)? as u64,
        items_resolved: row.get::<_, i64>(6)? as u64,
        items_failed: row.get::<_, i64>(7)? as u64,
        errors: json_column(row, 8)?,
    })
}

/// Most recent scans first.
pub fn list_recent(conn: &Connection, limit: u32) -> Result<Vec<ScanRun>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, phase, started_at, finished_at, files_discovered, items_processed,
                    items_resolved, items_failed, errors
             FROM scan_runs ORDER BY id DESC LIMIT ?",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let runs = stmt
        .query_map([limit], parse_scan_run_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    #[test]
    fn test_record_and_list() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let errors = vec!["/share/Missing: not found".to_string()];
        let now = Utc::now();
        for phase in ["completed", "error"] {
            record_scan_run(
                &conn,
                &NewScanRun {
                    phase,
                    started_at: now,
                    finished_at: now,
                    files_discovered: 10,
                    items_processed: 8,
                    items_resolved: 6,
                    items_failed: 2,
                    errors: &errors,
                },
            )
            .unwrap();
        }

        let runs = list_recent(&conn, 10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].phase, "error");
        assert_eq!(runs[1].items_resolved, 6);
        assert_eq!(runs[1].errors, errors);

        assert_eq!(list_recent(&conn, 1).unwrap().len(), 1);
    }
}
