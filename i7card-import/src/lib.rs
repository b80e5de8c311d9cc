//! Sheet-to-database import engine
//!
//! Pulls the community-maintained spreadsheet's CSV exports and reconciles
//! them into the local SQLite database. Two extraction strategies cover the
//! sheet shapes in play: header-driven row extraction for tabular sheets and
//! label-anchored positional scanning for the free-form score-calculation
//! sheet.

pub mod cell;
pub mod fetch;
pub mod orchestrator;
pub mod record;
pub mod scan;
pub mod summary;
pub mod upsert;

pub use cell::PercentPolicy;
pub use fetch::SheetClient;
pub use orchestrator::Importer;
pub use summary::ImportSummary;
