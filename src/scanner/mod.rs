//! Media share scanner.
//!
//! Discovery walks the configured root folders, the classifier decides
//! whether each file is a movie or a TV episode, the grouper folds episodes
//! into series items, and the orchestrator drives the whole scan through its
//! phases and hands unenriched items to the resolver.

pub mod classifier;
pub mod grouper;
pub mod orchestrator;

pub use classifier::{Classification, ClassificationReason, MediaClassifier};
pub use grouper::{Grouping, MediaGrouper};
pub use orchestrator::{ScanError, ScanOrchestrator, ScanReport};
