//! Global (between-sample) scale normalization
//!
//! Upper-quartile scaling is the step preceding factor analysis: each
//! sample is rescaled so that the log of its upper quartile equals the
//! average log upper quartile over all samples.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::data::CountMatrix;
use crate::error::{Result, RuvError};
use crate::stats::{cmp_nan_last, quantile_type7};

/// Between-sample normalization method
/// R equivalent: betweenLaneNormalization(which = ...) in EDASeq
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    /// Scale by the per-sample 75th percentile
    UpperQuartile,
    /// Scale by the per-sample median
    Median,
    /// Full quantile normalization (identical column distributions)
    FullQuantile,
    /// Leave counts unchanged
    None,
}

impl Default for ScalingMethod {
    fn default() -> Self {
        ScalingMethod::UpperQuartile
    }
}

impl std::str::FromStr for ScalingMethod {
    type Err = RuvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upper" | "uq" | "upper_quartile" => Ok(ScalingMethod::UpperQuartile),
            "median" => Ok(ScalingMethod::Median),
            "full" | "full_quantile" => Ok(ScalingMethod::FullQuantile),
            "none" => Ok(ScalingMethod::None),
            other => Err(RuvError::InvalidParameter {
                reason: format!(
                    "unknown scaling method '{}'. Use 'upper', 'median', 'full' or 'none'.",
                    other
                ),
            }),
        }
    }
}

/// Scale-normalized expression values (genes x samples)
#[derive(Debug, Clone)]
pub struct ScaledMatrix {
    values: Array2<f64>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
    /// Per-sample divisor applied to the raw counts (absent for full quantile)
    scale_factors: Option<Vec<f64>>,
    method: ScalingMethod,
}

impl ScaledMatrix {
    /// Wrap already-normalized values
    pub fn from_values(values: Array2<f64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        if values.nrows() != gene_ids.len() || values.ncols() != sample_ids.len() {
            return Err(RuvError::InvalidInput {
                reason: format!(
                    "values are {}x{} but {} gene and {} sample IDs were given",
                    values.nrows(),
                    values.ncols(),
                    gene_ids.len(),
                    sample_ids.len()
                ),
            });
        }
        if values.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(RuvError::InvalidInput {
                reason: "scaled values must be non-negative finite numbers".to_string(),
            });
        }
        Ok(Self {
            values,
            gene_ids,
            sample_ids,
            scale_factors: None,
            method: ScalingMethod::None,
        })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn scale_factors(&self) -> Option<&[f64]> {
        self.scale_factors.as_deref()
    }

    pub fn method(&self) -> ScalingMethod {
        self.method
    }

    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// `log2(x + pseudo_count)` of every entry
    pub fn log2(&self, pseudo_count: f64) -> Array2<f64> {
        self.values.mapv(|x| (x + pseudo_count).log2())
    }
}

/// Normalize counts between samples
///
/// `round` rounds the scaled values to whole numbers, as EDASeq does by default.
pub fn scale_normalize(counts: &CountMatrix, method: ScalingMethod, round: bool) -> Result<ScaledMatrix> {
    if counts.is_empty() {
        return Err(RuvError::InvalidInput {
            reason: "cannot normalize an empty count matrix".to_string(),
        });
    }

    let raw = counts.counts();
    let (mut values, scale_factors) = match method {
        ScalingMethod::UpperQuartile => {
            let (v, f) = quantile_scaling(raw, 0.75, counts.sample_ids())?;
            (v, Some(f))
        }
        ScalingMethod::Median => {
            let (v, f) = quantile_scaling(raw, 0.5, counts.sample_ids())?;
            (v, Some(f))
        }
        ScalingMethod::FullQuantile => (full_quantile(raw), None),
        ScalingMethod::None => (raw.to_owned(), Some(vec![1.0; counts.n_samples()])),
    };

    if round {
        values.mapv_inplace(f64::round);
    }

    log::debug!("Scale normalization {:?}: factors {:?}", method, scale_factors);

    Ok(ScaledMatrix {
        values,
        gene_ids: counts.gene_ids().to_vec(),
        sample_ids: counts.sample_ids().to_vec(),
        scale_factors,
        method,
    })
}

/// Divide each sample by `q_j / exp(mean(log q))` where `q_j` is its `p`-quantile
fn quantile_scaling(raw: ArrayView2<f64>, p: f64, sample_ids: &[String]) -> Result<(Array2<f64>, Vec<f64>)> {
    let quantiles: Vec<f64> = raw
        .axis_iter(Axis(1))
        .map(|col| {
            let mut sorted = col.to_vec();
            sorted.sort_by(cmp_nan_last);
            quantile_type7(&sorted, p)
        })
        .collect();

    if let Some(j) = quantiles.iter().position(|&q| !(q > 0.0)) {
        return Err(RuvError::InvalidInput {
            reason: format!(
                "sample '{}' has a {:.0}th percentile of zero; cannot scale it",
                sample_ids[j],
                p * 100.0
            ),
        });
    }

    let mean_log = quantiles.iter().map(|q| q.ln()).sum::<f64>() / quantiles.len() as f64;
    let target = mean_log.exp();
    let factors: Vec<f64> = quantiles.iter().map(|&q| q / target).collect();

    let mut values = raw.to_owned();
    for (mut col, &f) in values.axis_iter_mut(Axis(1)).zip(factors.iter()) {
        col.mapv_inplace(|x| x / f);
    }

    Ok((values, factors))
}

/// Replace each column by the mean sorted profile (ties keep row order)
fn full_quantile(raw: ArrayView2<f64>) -> Array2<f64> {
    let (n_genes, n_samples) = raw.dim();

    let orders: Vec<Vec<usize>> = raw
        .axis_iter(Axis(1))
        .map(|col| {
            let mut order: Vec<usize> = (0..n_genes).collect();
            order.sort_by(|&a, &b| cmp_nan_last(&col[a], &col[b]));
            order
        })
        .collect();

    let mut reference = vec![0.0; n_genes];
    for (j, order) in orders.iter().enumerate() {
        for (rank, &gene) in order.iter().enumerate() {
            reference[rank] += raw[[gene, j]];
        }
    }
    for r in reference.iter_mut() {
        *r /= n_samples as f64;
    }

    let mut values = Array2::zeros((n_genes, n_samples));
    for (j, order) in orders.iter().enumerate() {
        for (rank, &gene) in order.iter().enumerate() {
            values[[gene, j]] = reference[rank];
        }
    }
    values
}
