//! Principal components of samples

use ndarray::{s, Array2, ArrayView2, Axis};

use crate::error::{Result, RuvError};
use crate::linalg::sorted_svd;

/// Sample scores on the leading principal components
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// Sample scores (samples x n_components)
    pub scores: Array2<f64>,
    /// Percent of total variance per component
    pub percent_variance: Vec<f64>,
    pub sample_ids: Vec<String>,
}

impl PcaResult {
    pub fn n_components(&self) -> usize {
        self.scores.ncols()
    }

    pub fn component_names(&self) -> Vec<String> {
        (1..=self.scores.ncols()).map(|i| format!("PC{}", i)).collect()
    }
}

/// PCA of samples on gene-centered log expression
/// R equivalent: prcomp(t(x)) as used by EDASeq::plotPCA
///
/// `n_components` is capped at the number of non-zero components.
pub fn principal_components(
    log_values: ArrayView2<f64>,
    sample_ids: &[String],
    n_components: usize,
) -> Result<PcaResult> {
    let (n_genes, n_samples) = log_values.dim();
    if n_genes == 0 || n_samples < 2 {
        return Err(RuvError::InvalidInput {
            reason: format!("PCA needs at least one gene and two samples, got {}x{}", n_genes, n_samples),
        });
    }
    if sample_ids.len() != n_samples {
        return Err(RuvError::InvalidInput {
            reason: format!("{} columns but {} sample IDs", n_samples, sample_ids.len()),
        });
    }
    if n_components == 0 {
        return Err(RuvError::InvalidParameter {
            reason: "number of principal components must be at least 1".to_string(),
        });
    }

    let means = log_values.mean_axis(Axis(1)).ok_or_else(|| RuvError::InvalidInput {
        reason: "matrix has no samples".to_string(),
    })?;
    let centered = &log_values.t() - &means.insert_axis(Axis(0)); // samples x genes

    let svd = sorted_svd(centered.view(), "principal component analysis")?;
    let total: f64 = svd.singular_values.iter().map(|s| s * s).sum();
    let n = n_components.min(svd.rank()).max(1);

    let scores = &svd.u.slice(s![.., ..n]) * &svd.singular_values.slice(s![..n]);
    let percent_variance = svd
        .singular_values
        .iter()
        .take(n)
        .map(|s| if total > 0.0 { 100.0 * s * s / total } else { 0.0 })
        .collect::<Vec<f64>>();

    log::debug!("PCA percent variance: {:?}", percent_variance);

    Ok(PcaResult {
        scores,
        percent_variance,
        sample_ids: sample_ids.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{}", i)).collect()
    }

    #[test]
    fn test_single_axis_of_variation() {
        // Samples differ only along one direction in gene space
        let values = array![
            [1.0, 2.0, 3.0, 4.0],
            [2.0, 4.0, 6.0, 8.0],
            [5.0, 5.0, 5.0, 5.0],
        ];
        let pca = principal_components(values.view(), &ids(4), 3).unwrap();
        assert_eq!(pca.n_components(), 1);
        assert_abs_diff_eq!(pca.percent_variance[0], 100.0, epsilon = 1e-9);

        // Scores are proportional to the sample position, centered at zero
        let sc = pca.scores.column(0).to_vec();
        assert_abs_diff_eq!(sc.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        let step = sc[1] - sc[0];
        assert_abs_diff_eq!(sc[2] - sc[1], step, epsilon = 1e-9);
        assert_abs_diff_eq!(step.abs(), 5.0f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_percent_variance_sums_to_100() {
        let values = array![
            [1.0, 3.0, 2.0, 7.0, 4.0],
            [6.0, 1.0, 0.0, 2.0, 5.0],
            [3.0, 3.0, 8.0, 1.0, 2.0],
            [0.5, 2.5, 1.0, 4.0, 9.0],
        ];
        let pca = principal_components(values.view(), &ids(5), 10).unwrap();
        assert_eq!(pca.n_components(), 4);
        assert_abs_diff_eq!(pca.percent_variance.iter().sum::<f64>(), 100.0, epsilon = 1e-9);
        assert_eq!(pca.component_names()[0], "PC1");
    }

    #[test]
    fn test_invalid() {
        let one_sample = array![[1.0], [2.0]];
        assert!(principal_components(one_sample.view(), &ids(1), 2).is_err());
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(principal_components(values.view(), &ids(2), 0).is_err());
    }
}
