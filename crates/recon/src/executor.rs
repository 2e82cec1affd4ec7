//! Seam between the run pipeline and whatever performs a pair comparison.

use serde::{Deserialize, Serialize};

use crate::config::ToleranceConfig;
use crate::engine::compare_facts;
use crate::error::ReconError;
use crate::model::{ComparisonResult, FactTable};

/// Everything needed to compare one matched pair. Serializable so it can be
/// shipped to an out-of-process worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareJob {
    pub fundline: FactTable,
    pub partner: FactTable,
    pub tolerance: ToleranceConfig,
}

pub trait Executor {
    fn compare(&self, job: &CompareJob) -> Result<ComparisonResult, ReconError>;
}

/// Runs aggregation and reconciliation in the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl Executor for LocalExecutor {
    fn compare(&self, job: &CompareJob) -> Result<ComparisonResult, ReconError> {
        Ok(compare_facts(&job.fundline, &job.partner, &job.tolerance))
    }
}
