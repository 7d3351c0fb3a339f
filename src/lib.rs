//! Online topic clustering over a stream of discussion updates.
//!
//! A scan task turns feed fetches into batches; a single mutation task owns
//! every investigation and, per batch, tracks engagement deltas, assigns
//! updates to investigations by embedding similarity, merges converging
//! investigations, prunes idle ones, and asks a summarizer for a headline
//! when an investigation becomes significant.

pub mod clustering;
pub mod config;
pub mod db;
pub mod engine;
pub mod investigation;
pub mod models;
pub mod providers;
pub mod report;
pub mod scan;
pub mod significance;
pub mod utils;

pub use config::{EngineConfig, SignificanceWeights};
pub use db::Database;
pub use engine::{BatchSummary, Collaborators, Engine, ScanBatch};
pub use investigation::{Investigation, InvestigationSnapshot};
pub use models::{Alert, Comment, Item, Update};
pub use report::{ReportOutcome, ReportVerdict};
pub use scan::ScanController;

/// Initialize `env_logger` at info level.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
