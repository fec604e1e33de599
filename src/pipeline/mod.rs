//! Batch runner for datasets and ranking comparisons
//!
//! Datasets and comparisons are independent jobs and run on the rayon pool;
//! steps inside a job run sequentially. A failing job is reported without
//! aborting the others.

mod comparison;
mod dataset;

pub use comparison::{run_comparison, write_comparison_outputs, ComparisonResult, CurveSummary, RecoveryScore};
pub use dataset::{run_dataset, write_dataset_outputs, DatasetResult, DatasetSummary};

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::{resolve_path, AnalysisConfig};
use crate::error::Result;

/// Kind of analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Dataset,
    Comparison,
}

/// Outcome of one job: the directory written, or the error that stopped it
#[derive(Debug)]
pub struct JobOutcome {
    pub kind: JobKind,
    pub name: String,
    pub result: Result<PathBuf>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run every dataset and comparison of a configuration and write their outputs
pub fn run_analysis(config: &AnalysisConfig, base_dir: &Path) -> Result<Vec<JobOutcome>> {
    let output_dir = resolve_path(base_dir, &config.output_dir);
    fs::create_dir_all(&output_dir)?;

    let datasets = config.datasets.par_iter().map(|d| {
        let dir = output_dir.join(&d.name);
        let result = run_dataset(d, base_dir).and_then(|r| write_dataset_outputs(&r, &dir)).map(|_| dir);
        JobOutcome {
            kind: JobKind::Dataset,
            name: d.name.clone(),
            result,
        }
    });

    let comparisons = config.comparisons.par_iter().map(|c| {
        let result = run_comparison(c, base_dir)
            .and_then(|r| write_comparison_outputs(&r, &output_dir))
            .map(|_| output_dir.clone());
        JobOutcome {
            kind: JobKind::Comparison,
            name: c.name.clone(),
            result,
        }
    });

    let outcomes: Vec<JobOutcome> = datasets.chain(comparisons).collect();

    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            log::error!("{:?} '{}' failed: {}", outcome.kind, outcome.name, e);
        }
    }
    log::info!(
        "Analysis finished: {} of {} job(s) succeeded",
        outcomes.iter().filter(|o| o.is_ok()).count(),
        outcomes.len()
    );
    Ok(outcomes)
}
