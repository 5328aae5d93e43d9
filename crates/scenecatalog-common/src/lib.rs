//! Scenecatalog-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across scenecatalog:
//!
//! - **Typed IDs**: Path-derived, deterministic catalog item identifiers
//! - **Core Types**: Enums for media kinds and match methods
//! - **Path Utilities**: Functions to detect media files by extension
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use scenecatalog_common::{ItemId, MediaKind, Error, Result};
//! use scenecatalog_common::paths::is_video_file;
//! use std::path::Path;
//!
//! // The same path always yields the same id
//! let id = ItemId::from_path("/share/Movies/Inception.2010.mkv");
//! assert_eq!(id, ItemId::from_path("/share/Movies/Inception.2010.mkv"));
//!
//! let kind = MediaKind::Movie;
//! assert_eq!(kind.to_string(), "movie");
//!
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("item"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
