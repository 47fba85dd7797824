//! Validation runner - checks many resources with bounded parallelism

use rayon::prelude::*;
use validation::{Summary, TestResult};

use crate::error::Result;
use crate::resource::{BoxedResource, ValidateContext};

/// Results of validating a set of resources
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Every test result, in resource order then check order
    pub results: Vec<TestResult>,
    pub summary: Summary,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }
}

/// Validate every resource, at most `jobs` at a time
///
/// Result order follows `resources` regardless of scheduling.
pub fn validate_all(
    resources: &[BoxedResource],
    ctx: &ValidateContext,
    jobs: usize,
) -> Result<RunReport> {
    log::info!("Validating {} resources with {} jobs", resources.len(), jobs);

    let per_resource: Vec<Vec<TestResult>> = if jobs <= 1 || resources.len() <= 1 {
        resources.iter().map(|r| r.validate(ctx)).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
        pool.install(|| resources.par_iter().map(|r| r.validate(ctx)).collect())
    };

    let results: Vec<TestResult> = per_resource.into_iter().flatten().collect();
    let summary = Summary::from_results(&results);
    log::info!(
        "Validation finished: {} passed, {} failed, {} skipped, {} errors",
        summary.success,
        summary.failure,
        summary.skipped,
        summary.error
    );

    Ok(RunReport { results, summary })
}
