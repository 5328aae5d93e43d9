//! Scenecatalog-DB: catalog schema, migrations, and query operations
//!
//! This crate stores catalog items and file fingerprints in SQLite using
//! rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Embedded, versioned schema migrations
//! - `pool` - Connection pool management
//! - `models` - Catalog items, episodes, fingerprints and metadata patches
//! - `queries` - Upserts and lookups
//!
//! # Example
//!
//! ```no_run
//! use scenecatalog_common::MediaKind;
//! use scenecatalog_db::models::CatalogItem;
//! use scenecatalog_db::pool::{get_conn, init_pool};
//! use scenecatalog_db::queries::items;
//!
//! let pool = init_pool("/var/lib/scenecatalog/catalog.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let item = CatalogItem::new("Heat", Some(1995), MediaKind::Movie, "/share/Heat.1995.mkv");
//! items::upsert_item(&conn, &item).unwrap();
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
