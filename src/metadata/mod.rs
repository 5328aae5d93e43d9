//! Metadata resolution for catalog items.
//!
//! # Module layout
//!
//! - [`provider`] -- Metadata source trait and shared data types.
//! - [`providers`] -- Concrete sources (TMDB).
//! - [`registry`] -- Provider registry for multi-source lookups.
//! - [`scoring`] -- Candidate scoring and title similarity.
//! - [`strategies`] -- The resolution tiers.
//! - [`resolver`] -- Runs the tiers in order.
//! - [`recognizer`] -- AI filename recognizer.
//! - [`web`] -- Web search extension point.
//! - [`enrichment`] -- Scheduler handler that persists accepted results.

pub mod enrichment;
pub mod provider;
pub mod providers;
pub mod recognizer;
pub mod registry;
pub mod resolver;
pub mod scoring;
pub mod strategies;
pub mod web;

pub use enrichment::{ResolutionHandler, ResolutionTask};
pub use provider::{MediaDetails, MetadataProvider, SearchHit};
pub use recognizer::{ChatRecognizer, Recognition, Recognizer};
pub use registry::ProviderRegistry;
pub use resolver::{MatchResolver, ResolutionResult};
pub use scoring::{calculate_matching_score, MatchCandidate, MatchQuery, MatchingScore};
pub use web::WebSearch;
