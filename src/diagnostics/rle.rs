//! Relative log expression (RLE)
//!
//! Each gene's median across samples is subtracted from its log expression.
//! In a well-normalized dataset every sample's RLE distribution is centered on
//! zero with a similar spread.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuvError};
use crate::stats::{cmp_nan_last, quantile_type7};

/// Gene-median-centered log expression (genes x samples)
/// R equivalent: plotRLE() values in EDASeq
pub fn relative_log_expression(log_values: ArrayView2<f64>) -> Result<Array2<f64>> {
    let (n_genes, n_samples) = log_values.dim();
    if n_genes == 0 || n_samples == 0 {
        return Err(RuvError::InvalidInput {
            reason: format!("cannot compute RLE of a {}x{} matrix", n_genes, n_samples),
        });
    }

    let mut rle = log_values.to_owned();
    for mut row in rle.axis_iter_mut(Axis(0)) {
        let mut sorted = row.to_vec();
        sorted.sort_by(cmp_nan_last);
        let median = quantile_type7(&sorted, 0.5);
        row.mapv_inplace(|x| x - median);
    }
    Ok(rle)
}

/// Per-sample box summary of the RLE distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RleSummary {
    pub sample_id: String,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
    /// Upper minus lower quartile
    pub iqr: f64,
}

/// Median and quartiles of each sample's RLE values
pub fn rle_summary(rle: ArrayView2<f64>, sample_ids: &[String]) -> Result<Vec<RleSummary>> {
    if rle.ncols() != sample_ids.len() {
        return Err(RuvError::InvalidInput {
            reason: format!("{} RLE columns but {} sample IDs", rle.ncols(), sample_ids.len()),
        });
    }

    let summaries = rle
        .axis_iter(Axis(1))
        .zip(sample_ids)
        .map(|(col, id)| {
            let mut sorted: Vec<f64> = col.iter().copied().filter(|x| !x.is_nan()).collect();
            sorted.sort_by(cmp_nan_last);
            let lower = quantile_type7(&sorted, 0.25);
            let upper = quantile_type7(&sorted, 0.75);
            RleSummary {
                sample_id: id.clone(),
                lower_quartile: lower,
                median: quantile_type7(&sorted, 0.5),
                upper_quartile: upper,
                iqr: upper - lower,
            }
        })
        .collect();
    Ok(summaries)
}
