//! Count matrix representation for RNA-seq and microarray tables

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Result, RuvError};

/// Return the first identifier that occurs more than once
fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(ids.len());
    ids.iter().map(|s| s.as_str()).find(|id| !seen.insert(*id))
}

/// A count matrix of genes (rows) by samples (columns)
/// R equivalent: counts(SeqExpressionSet) in EDASeq
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Raw count data (genes x samples)
    counts: Array2<f64>,
    /// Gene identifiers
    gene_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new count matrix from raw data
    pub fn new(counts: Array2<f64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (n_genes, n_samples) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(RuvError::InvalidInput {
                reason: format!("expected {} gene IDs, got {}", n_genes, gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(RuvError::InvalidInput {
                reason: format!("expected {} sample IDs, got {}", n_samples, sample_ids.len()),
            });
        }

        if let Some(dup) = first_duplicate(&gene_ids) {
            return Err(RuvError::InvalidInput {
                reason: format!("duplicate gene identifier '{}'", dup),
            });
        }

        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(RuvError::InvalidInput {
                reason: format!("duplicate sample identifier '{}'", dup),
            });
        }

        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(RuvError::InvalidInput {
                reason: "counts must be non-negative finite values".to_string(),
            });
        }

        // Microarray intensities share this type, so fractional values only warn
        if counts.iter().any(|&x| x != x.round()) {
            log::warn!(
                "Some count values are not integers. Read-count tables are expected to hold \
                 integer counts; fractional values are kept as-is."
            );
        }

        Ok(Self {
            counts,
            gene_ids,
            sample_ids,
        })
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.counts.ncols()
    }

    /// True when the matrix has no genes or no samples
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Get the raw counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get counts for a specific gene
    pub fn gene_counts(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.counts.row(gene_idx)
    }

    /// Calculate sum of counts per sample (library size)
    pub fn library_sizes(&self) -> Vec<f64> {
        self.counts.axis_iter(Axis(1)).map(|col| col.sum()).collect()
    }

    /// Subset to specific samples
    pub fn subset_samples(&self, sample_indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = sample_indices.iter().find(|&&i| i >= self.n_samples()) {
            return Err(RuvError::InvalidInput {
                reason: format!("sample index {} out of range for {} samples", bad, self.n_samples()),
            });
        }
        let new_counts = self.counts.select(Axis(1), sample_indices);
        let new_sample_ids: Vec<String> = sample_indices.iter().map(|&i| self.sample_ids[i].clone()).collect();

        Self::new(new_counts, self.gene_ids.clone(), new_sample_ids)
    }

    /// Subset to specific genes
    pub fn subset_genes(&self, gene_indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = gene_indices.iter().find(|&&i| i >= self.n_genes()) {
            return Err(RuvError::InvalidInput {
                reason: format!("gene index {} out of range for {} genes", bad, self.n_genes()),
            });
        }
        let new_counts = self.counts.select(Axis(0), gene_indices);
        let new_gene_ids: Vec<String> = gene_indices.iter().map(|&i| self.gene_ids[i].clone()).collect();

        Self::new(new_counts, new_gene_ids, self.sample_ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_count_matrix_creation() {
        let counts = array![[10.0, 20.0, 30.0], [5.0, 15.0, 25.0]];
        let matrix = CountMatrix::new(counts, ids("gene", 2), ids("s", 3)).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_samples(), 3);
        assert_eq!(matrix.gene_counts(1).to_vec(), vec![5.0, 15.0, 25.0]);
    }

    #[test]
    fn test_negative_counts_rejected() {
        let counts = array![[10.0, -5.0], [5.0, 15.0]];
        let result = CountMatrix::new(counts, ids("gene", 2), ids("s", 2));
        assert!(matches!(result, Err(RuvError::InvalidInput { .. })));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let counts = array![[10.0, 5.0], [5.0, 15.0]];
        let genes = vec!["g".to_string(), "g".to_string()];
        assert!(CountMatrix::new(counts.clone(), genes, ids("s", 2)).is_err());

        let samples = vec!["s".to_string(), "s".to_string()];
        assert!(CountMatrix::new(counts, ids("gene", 2), samples).is_err());
    }

    #[test]
    fn test_zero_gene_matrix_allowed() {
        let counts = Array2::<f64>::zeros((0, 3));
        let matrix = CountMatrix::new(counts, vec![], ids("s", 3)).unwrap();
        assert_eq!(matrix.n_genes(), 0);
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_library_sizes() {
        let counts = array![[10.0, 20.0], [5.0, 15.0]];
        let matrix = CountMatrix::new(counts, ids("gene", 2), ids("s", 2)).unwrap();
        assert_eq!(matrix.library_sizes(), vec![15.0, 35.0]);
    }
}
