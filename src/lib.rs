//! Scenecatalog - media catalog scanner
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod identity;
pub mod metadata;
pub mod scanner;
pub mod scheduler;
pub mod state;
pub mod storage;
