//! `ftymerge-dedup`: factory-profile deduplication and reconciliation engine.
//!
//! Pure engine crate: receives a batch of extracted factory records, groups
//! them by normalized vendor name, and returns one reconciled record per
//! factory. File I/O is limited to the `io` boundary.

pub mod bucket;
pub mod config;
pub mod dates;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod group;
pub mod io;
pub mod model;
pub mod normalize;
pub mod policy;
pub mod presence;
pub mod provenance;
pub mod select;
pub mod tokens;

#[cfg(test)]
mod testutil;

pub use config::MergeConfig;
pub use engine::{run, CancelToken};
pub use error::MergeError;
pub use io::{combine_dir, run_files, CombineSummary};
pub use model::{FactoryRecord, MergeResult, MergeSummary, Scenario};
