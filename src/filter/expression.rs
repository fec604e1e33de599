//! Low-count gene filtering prior to normalization

use serde::{Deserialize, Serialize};

use crate::data::CountMatrix;
use crate::error::{Result, RuvError};

/// Thresholds for the expression filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterParams {
    /// A sample qualifies when its count is strictly greater than this
    pub min_count: f64,
    /// A gene is kept when strictly more than this many samples qualify
    pub min_samples: usize,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_count: 10.0,
            min_samples: 5,
        }
    }
}

impl FilterParams {
    fn validate(&self) -> Result<()> {
        if !self.min_count.is_finite() || self.min_count < 0.0 {
            return Err(RuvError::InvalidInput {
                reason: format!("min_count must be a non-negative number, got {}", self.min_count),
            });
        }
        Ok(())
    }

    /// Whether a single gene's counts pass the thresholds
    pub fn keeps<'a, I>(&self, counts: I) -> bool
    where
        I: IntoIterator<Item = &'a f64>,
    {
        counts.into_iter().filter(|&&x| x > self.min_count).count() > self.min_samples
    }
}

/// Keep genes with more than `min_samples` samples above `min_count`
/// R equivalent: filter <- apply(x, 1, function(x) length(x[x > 10]) > 5)
///
/// Returns a zero-row matrix (not an error) when no gene passes. Filtering
/// that zero-row matrix again is an `InvalidInput` error, as for any matrix
/// without genes or samples, so idempotence holds for non-empty results only.
pub fn filter_by_expression(counts: &CountMatrix, params: &FilterParams) -> Result<CountMatrix> {
    if counts.is_empty() {
        return Err(RuvError::InvalidInput {
            reason: format!(
                "cannot filter an empty count matrix ({} genes x {} samples)",
                counts.n_genes(),
                counts.n_samples()
            ),
        });
    }
    params.validate()?;

    let keep: Vec<usize> = (0..counts.n_genes())
        .filter(|&i| params.keeps(counts.gene_counts(i).iter()))
        .collect();

    log::info!(
        "Expression filter (count > {}, samples > {}): kept {} of {} genes",
        params.min_count,
        params.min_samples,
        keep.len(),
        counts.n_genes()
    );

    counts.subset_genes(&keep)
}
