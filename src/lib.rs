//! Daily MLB game ingestion with franchise identity resolution.
//!
//! Polls the MLB Stats schedule API for a trailing two-day window, resolves
//! team names to franchise codes valid for the reference year, and appends
//! each completed regular-season game to Postgres exactly once.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod schedule;
pub mod store;
pub mod tracker;

pub use config::Config;
pub use models::{CanonicalGameRecord, RawGameObservation};
pub use orchestrator::{CycleReport, IngestionCycle};
pub use registry::{FranchiseEntry, FranchiseIndex, MatchStrategy};
