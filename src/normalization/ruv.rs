//! Removal of unwanted variation by factor analysis
//!
//! Nuisance directions are estimated from negative-control genes: either from
//! the differences between replicate samples (which cancel the biology of
//! interest) or from the centered control genes themselves. The per-sample
//! loadings on those directions are then regressed out of every gene.

use ndarray::{s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::scaling::ScaledMatrix;
use crate::data::{NegativeControlSet, ReplicateGroups};
use crate::error::{Result, RuvError};
use crate::linalg::{least_squares, sorted_svd};

/// Source of the matrix the nuisance directions are estimated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuvMethod {
    /// Differences between replicate samples
    /// R equivalent: RUVs() in RUVSeq
    Replicates,
    /// Centered control genes
    /// R equivalent: RUVg() in RUVSeq
    ControlGenes,
}

impl Default for RuvMethod {
    fn default() -> Self {
        RuvMethod::Replicates
    }
}

impl std::str::FromStr for RuvMethod {
    type Err = RuvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "replicates" | "ruvs" => Ok(RuvMethod::Replicates),
            "control_genes" | "controls" | "ruvg" => Ok(RuvMethod::ControlGenes),
            other => Err(RuvError::InvalidParameter {
                reason: format!("unknown RUV method '{}'. Use 'replicates' or 'control_genes'.", other),
            }),
        }
    }
}

/// Parameters for unwanted-variation estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuvParams {
    /// Number of unwanted factors
    pub k: usize,
    pub method: RuvMethod,
    /// Added before taking log2
    pub pseudo_count: f64,
}

impl Default for RuvParams {
    fn default() -> Self {
        Self {
            k: 1,
            method: RuvMethod::Replicates,
            pseudo_count: 1.0,
        }
    }
}

/// Estimated unwanted-variation factors (samples x k)
#[derive(Debug, Clone)]
pub struct UnwantedFactors {
    values: Array2<f64>,
    sample_ids: Vec<String>,
}

impl UnwantedFactors {
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_factors(&self) -> usize {
        self.values.ncols()
    }

    /// Factor names `W_1..W_k`
    pub fn names(&self) -> Vec<String> {
        (1..=self.values.ncols()).map(|i| format!("W_{}", i)).collect()
    }

    /// Loadings of factor `j` (0-based) across samples
    pub fn factor(&self, j: usize) -> Vec<f64> {
        self.values.column(j).to_vec()
    }
}

/// Log2 expression with the fitted unwanted component removed (genes x samples)
#[derive(Debug, Clone)]
pub struct NormalizedMatrix {
    values: Array2<f64>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
}

impl NormalizedMatrix {
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }
}

/// Result of an unwanted-variation fit
#[derive(Debug, Clone)]
pub struct RuvFit {
    pub factors: UnwantedFactors,
    pub normalized: NormalizedMatrix,
    /// Per-gene regression coefficients on the factors (k x genes)
    pub alpha: Array2<f64>,
    /// All singular values of the decomposed matrix, descending
    pub singular_values: Vec<f64>,
    /// Numerical rank of the decomposed matrix
    pub rank: usize,
    pub n_controls: usize,
    /// Replicate pairs used (0 for the control-gene method)
    pub n_pairs: usize,
}

/// Estimate `k` unwanted factors and remove them from the log expression
///
/// `replicates` is required for [`RuvMethod::Replicates`] and ignored otherwise.
pub fn estimate_unwanted_variation(
    scaled: &ScaledMatrix,
    controls: &NegativeControlSet,
    replicates: Option<&ReplicateGroups>,
    params: &RuvParams,
) -> Result<RuvFit> {
    let k = params.k;
    if k == 0 {
        return Err(RuvError::InvalidParameter {
            reason: "number of unwanted factors k must be at least 1".to_string(),
        });
    }
    if !(params.pseudo_count > 0.0) || !params.pseudo_count.is_finite() {
        return Err(RuvError::InvalidParameter {
            reason: format!("pseudo_count must be positive, got {}", params.pseudo_count),
        });
    }
    if scaled.n_genes() == 0 || scaled.n_samples() == 0 {
        return Err(RuvError::InvalidInput {
            reason: format!(
                "cannot estimate unwanted variation on a {}x{} matrix",
                scaled.n_genes(),
                scaled.n_samples()
            ),
        });
    }

    let n_samples = scaled.n_samples();
    let replicates = match (params.method, replicates) {
        (RuvMethod::Replicates, None) => {
            return Err(RuvError::InvalidInput {
                reason: "the replicate method needs replicate groups".to_string(),
            })
        }
        (RuvMethod::Replicates, Some(groups)) => {
            check_sample_range(groups, n_samples)?;
            Some(groups)
        }
        (RuvMethod::ControlGenes, _) => None,
    };

    let control_idx = controls.resolve(scaled.gene_ids());
    if control_idx.is_empty() {
        return Err(RuvError::InsufficientControls {
            reason: format!(
                "none of the {} negative controls are among the {} genes",
                controls.len(),
                scaled.n_genes()
            ),
        });
    }

    let pairs = match replicates {
        Some(groups) => {
            let pairs = groups.pairs();
            if pairs.is_empty() {
                return Err(RuvError::InsufficientReplicates {
                    reason: format!("all {} replicate sets have fewer than two samples", groups.n_sets()),
                });
            }
            pairs
        }
        None => Vec::new(),
    };

    log::info!(
        "Estimating {} unwanted factor(s) ({:?}) from {} controls, {} samples, {} replicate pairs",
        k,
        params.method,
        control_idx.len(),
        n_samples,
        pairs.len()
    );

    let y = scaled.log2(params.pseudo_count);
    let gene_means = y.mean_axis(Axis(1)).ok_or_else(|| RuvError::InvalidInput {
        reason: "matrix has no samples".to_string(),
    })?;
    let yc = &y - &gene_means.insert_axis(Axis(1));
    let yc_controls = yc.select(Axis(0), &control_idx); // controls x samples

    let decomposed = match params.method {
        RuvMethod::Replicates => Array2::from_shape_fn((pairs.len(), control_idx.len()), |(p, c)| {
            let (a, b) = pairs[p];
            let g = control_idx[c];
            y[[g, a]] - y[[g, b]]
        }),
        RuvMethod::ControlGenes => yc_controls.t().to_owned(),
    };

    let svd = sorted_svd(decomposed.view(), "unwanted factor decomposition")?;
    let rank = svd.rank();
    log::debug!("Singular values: {:?} (rank {})", svd.singular_values.to_vec(), rank);

    if rank == 0 {
        return Err(RuvError::NumericalInstability {
            operation: "unwanted factor decomposition".to_string(),
            details: "control-gene differences are numerically zero; replicate samples may be duplicates"
                .to_string(),
        });
    }
    if k > rank {
        return Err(RuvError::InvalidParameter {
            reason: format!(
                "k = {} exceeds the rank ({}) of the {}x{} {} matrix",
                k,
                rank,
                decomposed.nrows(),
                decomposed.ncols(),
                match params.method {
                    RuvMethod::Replicates => "replicate-difference",
                    RuvMethod::ControlGenes => "control-gene",
                }
            ),
        });
    }

    let mut directions = svd.v.slice(s![.., ..k]).to_owned(); // controls x k
    fix_signs(&mut directions);

    let w = yc_controls.t().dot(&directions); // samples x k
    let alpha = least_squares(w.view(), yc.t(), "unwanted factor regression")?; // k x genes
    let normalized = &y - &w.dot(&alpha).t();

    Ok(RuvFit {
        factors: UnwantedFactors {
            values: w,
            sample_ids: scaled.sample_ids().to_vec(),
        },
        normalized: NormalizedMatrix {
            values: normalized,
            gene_ids: scaled.gene_ids().to_vec(),
            sample_ids: scaled.sample_ids().to_vec(),
        },
        alpha,
        singular_values: svd.singular_values.to_vec(),
        rank,
        n_controls: control_idx.len(),
        n_pairs: pairs.len(),
    })
}

/// Replicate-based estimation with default settings
pub fn ruv_replicates(
    scaled: &ScaledMatrix,
    controls: &NegativeControlSet,
    replicates: &ReplicateGroups,
    k: usize,
) -> Result<RuvFit> {
    let params = RuvParams {
        k,
        ..Default::default()
    };
    estimate_unwanted_variation(scaled, controls, Some(replicates), &params)
}

/// Control-gene estimation with default settings
pub fn ruv_control_genes(scaled: &ScaledMatrix, controls: &NegativeControlSet, k: usize) -> Result<RuvFit> {
    let params = RuvParams {
        k,
        method: RuvMethod::ControlGenes,
        ..Default::default()
    };
    estimate_unwanted_variation(scaled, controls, None, &params)
}

fn check_sample_range(groups: &ReplicateGroups, n_samples: usize) -> Result<()> {
    for (set_idx, row) in groups.rows().iter().enumerate() {
        if let Some(&sample) = row.iter().flatten().find(|&&s| s >= n_samples) {
            return Err(RuvError::InvalidInput {
                reason: format!(
                    "replicate set {} references sample index {} but the matrix has {} samples",
                    groups.labels()[set_idx],
                    sample,
                    n_samples
                ),
            });
        }
    }
    Ok(())
}

/// Flip each column so that its largest-magnitude entry is positive
fn fix_signs(directions: &mut Array2<f64>) {
    for mut col in directions.axis_iter_mut(Axis(1)) {
        let pivot = col
            .iter()
            .copied()
            .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if pivot < 0.0 {
            col.mapv_inplace(|x| -x);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::{scale_normalize, ScalingMethod};
    use crate::simulate::{simulate, SimulationConfig};
    use crate::stats::pearson_correlation;
    use ndarray::array;

    struct Fixture {
        scaled: ScaledMatrix,
        groups: ReplicateGroups,
        null_genes: Vec<String>,
        true_factor: Vec<f64>,
    }

    /// 3 replicate sets of 5 samples
    fn fixture(n_genes: usize, n_de: usize) -> Fixture {
        let config = SimulationConfig {
            n_genes,
            n_de,
            ..Default::default()
        };
        let data = simulate(&config).unwrap();
        let scaled = scale_normalize(&data.counts, ScalingMethod::UpperQuartile, true).unwrap();
        let groups = ReplicateGroups::from_metadata(&data.metadata, &["condition".to_string()]).unwrap();
        Fixture {
            scaled,
            groups,
            null_genes: data.null_genes,
            true_factor: data.true_factors.column(0).to_vec(),
        }
    }

    #[test]
    fn test_scenario_15_samples_20_controls() {
        let fx = fixture(200, 20);
        let controls = NegativeControlSet::new(fx.null_genes[..20].iter().cloned());

        let fit5 = ruv_replicates(&fx.scaled, &controls, &fx.groups, 5).unwrap();
        assert_eq!(fit5.factors.values().dim(), (15, 5));
        assert_eq!(fit5.factors.names(), vec!["W_1", "W_2", "W_3", "W_4", "W_5"]);
        assert_eq!(fit5.normalized.values().dim(), (200, 15));
        assert_eq!(fit5.n_controls, 20);
        assert_eq!(fit5.n_pairs, 30);
        assert!(fit5.factors.values().iter().all(|x| x.is_finite()));

        let fit1 = ruv_replicates(&fx.scaled, &controls, &fx.groups, 1).unwrap();
        let r = pearson_correlation(&fit1.factors.factor(0), &fit5.factors.factor(0));
        assert!(r >= 0.8, "first factor correlation {}", r);
    }

    #[test]
    fn test_recovers_true_factor() {
        let fx = fixture(500, 50);
        let controls = NegativeControlSet::new(fx.null_genes.iter().cloned());
        let fit = ruv_replicates(&fx.scaled, &controls, &fx.groups, 1).unwrap();
        let r = pearson_correlation(&fit.factors.factor(0), &fx.true_factor).abs();
        assert!(r > 0.9, "correlation with true factor {}", r);
    }

    #[test]
    fn test_k_boundary() {
        let fx = fixture(200, 20);
        let controls = NegativeControlSet::new(fx.null_genes[..20].iter().cloned());
        let contrasts = fx.groups.independent_contrasts();
        assert_eq!(contrasts, 12);

        let ok = ruv_replicates(&fx.scaled, &controls, &fx.groups, contrasts - 1).unwrap();
        assert_eq!(ok.rank, contrasts);
        assert_eq!(ok.factors.n_factors(), contrasts - 1);

        let err = ruv_replicates(&fx.scaled, &controls, &fx.groups, contrasts + 1).unwrap_err();
        assert!(matches!(err, RuvError::InvalidParameter { .. }));

        let err = ruv_replicates(&fx.scaled, &controls, &fx.groups, 0).unwrap_err();
        assert!(matches!(err, RuvError::InvalidParameter { .. }));
    }

    #[test]
    fn test_insufficient_controls() {
        let fx = fixture(50, 5);
        let controls = NegativeControlSet::new(["not_a_gene"]);
        let err = ruv_replicates(&fx.scaled, &controls, &fx.groups, 1).unwrap_err();
        assert!(matches!(err, RuvError::InsufficientControls { .. }));
    }

    #[test]
    fn test_singleton_sets_are_insufficient() {
        let fx = fixture(50, 5);
        let controls = NegativeControlSet::new(fx.null_genes.iter().cloned());
        let singletons = ReplicateGroups::from_sets((0..15).map(|s| vec![s]).collect(), 15).unwrap();
        let err = ruv_replicates(&fx.scaled, &controls, &singletons, 1).unwrap_err();
        assert!(matches!(err, RuvError::InsufficientReplicates { .. }));
    }

    #[test]
    fn test_sample_index_out_of_range() {
        let fx = fixture(50, 5);
        let controls = NegativeControlSet::new(fx.null_genes.iter().cloned());
        let groups = ReplicateGroups::from_sets(vec![vec![0, 20]], 21).unwrap();
        let err = ruv_replicates(&fx.scaled, &controls, &groups, 1).unwrap_err();
        assert!(matches!(err, RuvError::InvalidInput { .. }));
    }

    #[test]
    fn test_duplicate_samples_are_unstable() {
        let values = array![
            [10.0, 10.0, 30.0],
            [20.0, 20.0, 25.0],
            [40.0, 40.0, 12.0],
            [15.0, 15.0, 18.0],
        ];
        let genes: Vec<String> = (0..4).map(|i| format!("g{}", i)).collect();
        let samples: Vec<String> = (0..3).map(|j| format!("s{}", j)).collect();
        let scaled = ScaledMatrix::from_values(values, genes.clone(), samples).unwrap();
        let groups = ReplicateGroups::from_sets(vec![vec![0, 1], vec![2]], 3).unwrap();
        let err = ruv_replicates(&scaled, &NegativeControlSet::all_genes(&genes), &groups, 1).unwrap_err();
        assert!(matches!(err, RuvError::NumericalInstability { .. }));
    }

    #[test]
    fn test_removes_unwanted_component_from_controls() {
        let fx = fixture(300, 30);
        let controls = NegativeControlSet::new(fx.null_genes.iter().cloned());
        let fit = ruv_replicates(&fx.scaled, &controls, &fx.groups, 1).unwrap();

        // Control genes should lose their correlation with the true factor
        let raw = fx.scaled.log2(1.0);
        let mut before = 0.0;
        let mut after = 0.0;
        for name in fx.null_genes.iter().take(100) {
            let g = fx.scaled.gene_ids().iter().position(|id| id == name).unwrap();
            before += pearson_correlation(&raw.row(g).to_vec(), &fx.true_factor).abs();
            after += pearson_correlation(&fit.normalized.values().row(g).to_vec(), &fx.true_factor).abs();
        }
        assert!(after < before * 0.5, "mean |r| before {} after {}", before / 100.0, after / 100.0);
    }

    #[test]
    fn test_control_gene_method() {
        let fx = fixture(300, 30);
        let controls = NegativeControlSet::new(fx.null_genes.iter().cloned());
        let fit = ruv_control_genes(&fx.scaled, &controls, 2).unwrap();
        assert_eq!(fit.factors.values().dim(), (15, 2));
        assert_eq!(fit.n_pairs, 0);
        // Centering removes one degree of freedom
        assert!(fit.rank <= 14);

        let err = ruv_control_genes(&fx.scaled, &controls, 15).unwrap_err();
        assert!(matches!(err, RuvError::InvalidParameter { .. }));
    }

    #[test]
    fn test_padded_replicate_sets() {
        // Four sets of unequal size; sample 11 belongs to no set
        let data = simulate(&SimulationConfig {
            n_genes: 200,
            n_de: 20,
            n_conditions: 4,
            replicates: 3,
            ..Default::default()
        })
        .unwrap();
        let scaled = scale_normalize(&data.counts, ScalingMethod::UpperQuartile, true).unwrap();
        let groups =
            ReplicateGroups::from_sets(vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9, 10]], 12).unwrap();
        assert_eq!(groups.width(), 3);
        assert_eq!(groups.rows()[3], vec![Some(9), Some(10), None]);

        let controls = NegativeControlSet::new(data.null_genes.iter().cloned());
        let fit = ruv_replicates(&scaled, &controls, &groups, 2).unwrap();
        assert_eq!(fit.factors.values().dim(), (12, 2));
        assert_eq!(fit.normalized.values().dim(), (200, 12));
        assert_eq!(fit.n_pairs, 10);
        assert_eq!(fit.rank, groups.independent_contrasts());
        assert!(fit.factors.values().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_replicate_method_requires_groups() {
        let fx = fixture(50, 5);
        let controls = NegativeControlSet::new(fx.null_genes.iter().cloned());
        let err = estimate_unwanted_variation(&fx.scaled, &controls, None, &RuvParams::default()).unwrap_err();
        assert!(matches!(err, RuvError::InvalidInput { .. }));
    }

    #[test]
    fn test_sign_convention() {
        let mut d = array![[0.2, -0.9], [-0.7, 0.1], [0.1, 0.3]];
        fix_signs(&mut d);
        assert_eq!(d.column(0).to_vec(), vec![-0.2, 0.7, -0.1]);
        assert_eq!(d.column(1).to_vec(), vec![0.9, -0.1, -0.3]);
    }
}
