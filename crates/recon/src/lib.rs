//! `provcheck-recon`: provision reconciliation engine.
//!
//! Pure engine crate: receives loaded cell grids, returns comparison
//! results and a run report. No CLI or file IO.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod facts;
pub mod header;
pub mod matcher;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod validate;

pub use config::ReconConfig;
pub use error::ReconError;
pub use executor::{CompareJob, Executor, LocalExecutor};
pub use model::{ComparisonResult, RunOutcome, RunReport, SourceWorkbook};
pub use pipeline::{run, RunInput};
