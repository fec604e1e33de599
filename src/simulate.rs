//! Synthetic count data with known unwanted variation
//!
//! Generates negative-binomial counts from a log-linear model with baseline
//! expression, condition effects on a subset of genes, latent unwanted factors
//! and library-size variation. The genes without a condition effect are the
//! natural negative controls.

use ndarray::Array2;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Gamma, Normal, Poisson};

use crate::data::{CountMatrix, SampleMetadata};
use crate::error::{Result, RuvError};

/// Configuration for synthetic data generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of genes
    pub n_genes: usize,
    /// Number of biological conditions
    pub n_conditions: usize,
    /// Number of batches; every condition appears in every batch
    pub n_batches: usize,
    /// Replicates per condition within a batch
    pub replicates: usize,
    /// Number of genes with a condition effect (the first `n_de` genes)
    pub n_de: usize,
    /// Absolute log2 fold change of affected genes
    pub effect_size: f64,
    /// Number of latent unwanted factors
    pub n_factors: usize,
    /// Standard deviation of per-sample factor values
    pub factor_sd: f64,
    /// Standard deviation of per-gene factor loadings (natural log scale)
    pub loading_sd: f64,
    /// Mean of per-gene baseline log expression (natural log scale)
    pub base_log_mean: f64,
    /// Standard deviation of per-gene baseline log expression
    pub base_log_sd: f64,
    /// Standard deviation of log library size
    pub library_size_sd: f64,
    /// Negative-binomial dispersion (0 gives Poisson counts)
    pub dispersion: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_genes: 1000,
            n_conditions: 3,
            n_batches: 1,
            replicates: 5,
            n_de: 100,
            effect_size: 2.0,
            n_factors: 1,
            factor_sd: 1.0,
            loading_sd: 0.5,
            base_log_mean: 6.0,
            base_log_sd: 1.0,
            library_size_sd: 0.2,
            dispersion: 0.02,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Total number of samples
    pub fn n_samples(&self) -> usize {
        self.n_conditions * self.n_batches * self.replicates
    }

    fn validate(&self) -> Result<()> {
        if self.n_genes == 0 || self.n_samples() == 0 {
            return Err(RuvError::InvalidParameter {
                reason: "simulation needs at least one gene and one sample".to_string(),
            });
        }
        if self.n_de > self.n_genes {
            return Err(RuvError::InvalidParameter {
                reason: format!("n_de ({}) exceeds n_genes ({})", self.n_de, self.n_genes),
            });
        }
        if self.dispersion < 0.0 || !self.dispersion.is_finite() {
            return Err(RuvError::InvalidParameter {
                reason: format!("dispersion must be non-negative, got {}", self.dispersion),
            });
        }
        Ok(())
    }
}

/// A simulated dataset with its ground truth
#[derive(Debug, Clone)]
pub struct SimulatedDataset {
    pub counts: CountMatrix,
    /// Columns `condition` and `batch`
    pub metadata: SampleMetadata,
    /// Genes without a condition effect
    pub null_genes: Vec<String>,
    /// Genes with a condition effect
    pub de_genes: Vec<String>,
    /// True unwanted factor values (samples x n_factors)
    pub true_factors: Array2<f64>,
}

fn dist_error(what: &str, e: impl std::fmt::Display) -> RuvError {
    RuvError::InvalidParameter {
        reason: format!("invalid {} distribution: {}", what, e),
    }
}

/// Draw one negative-binomial count as a gamma-Poisson mixture
fn sample_count(rng: &mut StdRng, mu: f64, dispersion: f64) -> Result<f64> {
    let lambda = if dispersion > 0.0 {
        let shape = 1.0 / dispersion;
        let gamma = Gamma::new(shape, shape / mu).map_err(|e| dist_error("gamma", e))?;
        gamma.sample(rng)
    } else {
        mu
    };
    let poisson = Poisson::new(lambda.max(1e-10)).map_err(|e| dist_error("Poisson", e))?;
    Ok(poisson.sample(rng))
}

/// Generate a synthetic dataset
pub fn simulate(config: &SimulationConfig) -> Result<SimulatedDataset> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let n_genes = config.n_genes;
    let n_samples = config.n_samples();
    let std_normal = Normal::new(0.0, 1.0).map_err(|e| dist_error("normal", e))?;

    let gene_ids: Vec<String> = (1..=n_genes).map(|i| format!("gene{:05}", i)).collect();

    // Sample layout: batch-major, then condition, then replicate
    let mut sample_ids = Vec::with_capacity(n_samples);
    let mut conditions = Vec::with_capacity(n_samples);
    let mut batches = Vec::with_capacity(n_samples);
    let mut condition_of = Vec::with_capacity(n_samples);
    for b in 0..config.n_batches {
        for c in 0..config.n_conditions {
            for r in 0..config.replicates {
                sample_ids.push(format!("b{}_c{}_r{}", b + 1, c + 1, r + 1));
                conditions.push(format!("c{}", c + 1));
                batches.push(format!("b{}", b + 1));
                condition_of.push(c);
            }
        }
    }

    let baseline: Vec<f64> = (0..n_genes)
        .map(|_| config.base_log_mean + config.base_log_sd * std_normal.sample(&mut rng))
        .collect();

    // Condition 1 is the reference level
    let ln2 = std::f64::consts::LN_2;
    let mut effects = Array2::<f64>::zeros((n_genes, config.n_conditions));
    for g in 0..config.n_de {
        for c in 1..config.n_conditions {
            let sign = if std_normal.sample(&mut rng) < 0.0 { -1.0 } else { 1.0 };
            effects[[g, c]] = sign * config.effect_size * ln2;
        }
    }

    let true_factors =
        Array2::from_shape_fn((n_samples, config.n_factors), |_| config.factor_sd * std_normal.sample(&mut rng));
    let loadings =
        Array2::from_shape_fn((config.n_factors, n_genes), |_| config.loading_sd * std_normal.sample(&mut rng));
    let log_library: Vec<f64> = (0..n_samples)
        .map(|_| config.library_size_sd * std_normal.sample(&mut rng))
        .collect();

    let unwanted = true_factors.dot(&loadings); // samples x genes
    let mut counts = Array2::<f64>::zeros((n_genes, n_samples));
    for g in 0..n_genes {
        for s in 0..n_samples {
            let log_mu = baseline[g] + effects[[g, condition_of[s]]] + unwanted[[s, g]] + log_library[s];
            counts[[g, s]] = sample_count(&mut rng, log_mu.exp(), config.dispersion)?;
        }
    }

    let mut metadata = SampleMetadata::new(sample_ids.clone())?;
    metadata.add_column("condition", conditions)?;
    metadata.add_column("batch", batches)?;

    let de_genes = gene_ids[..config.n_de].to_vec();
    let null_genes = gene_ids[config.n_de..].to_vec();
    let counts = CountMatrix::new(counts, gene_ids, sample_ids)?;

    log::info!(
        "Simulated {} genes x {} samples ({} DE genes, {} unwanted factors)",
        n_genes,
        n_samples,
        config.n_de,
        config.n_factors
    );

    Ok(SimulatedDataset {
        counts,
        metadata,
        null_genes,
        de_genes,
        true_factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_and_layout() {
        let config = SimulationConfig {
            n_genes: 50,
            n_conditions: 2,
            n_batches: 2,
            replicates: 3,
            n_de: 10,
            ..Default::default()
        };
        let data = simulate(&config).unwrap();
        assert_eq!(data.counts.n_genes(), 50);
        assert_eq!(data.counts.n_samples(), 12);
        assert_eq!(data.true_factors.dim(), (12, 1));
        assert_eq!(data.de_genes.len(), 10);
        assert_eq!(data.null_genes.len(), 40);
        assert_eq!(data.metadata.levels("batch").unwrap(), vec!["b1", "b2"]);
        assert_eq!(data.metadata.samples_with_level("condition", "c2").unwrap(), vec![3, 4, 5, 9, 10, 11]);
        assert!(data.counts.counts().iter().all(|&x| x >= 0.0 && x == x.round()));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let config = SimulationConfig {
            n_genes: 20,
            n_de: 5,
            ..Default::default()
        };
        let a = simulate(&config).unwrap();
        let b = simulate(&config).unwrap();
        assert_eq!(a.counts.counts(), b.counts.counts());

        let c = simulate(&SimulationConfig { seed: 7, ..config }).unwrap();
        assert_ne!(a.counts.counts(), c.counts.counts());
    }

    #[test]
    fn test_invalid_config() {
        let config = SimulationConfig {
            n_genes: 5,
            n_de: 6,
            ..Default::default()
        };
        assert!(matches!(simulate(&config), Err(RuvError::InvalidParameter { .. })));
    }
}
