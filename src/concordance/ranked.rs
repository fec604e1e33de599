//! Ranked gene lists from pre-computed differential expression tables

use std::collections::HashSet;

use crate::error::{Result, RuvError};
use crate::stats::cmp_nan_last;

/// Genes ordered by significance score (lower is more significant)
///
/// The order is ascending by score with NaN scores last; equal scores keep
/// their input order.
#[derive(Debug, Clone)]
pub struct RankedGeneList {
    /// Gene identifiers in rank order
    gene_ids: Vec<String>,
    /// Scores in rank order
    scores: Vec<f64>,
    /// Signed effects (e.g. log fold change) in rank order
    effects: Option<Vec<f64>>,
}

impl RankedGeneList {
    /// Rank genes by score
    pub fn new(gene_ids: Vec<String>, scores: Vec<f64>) -> Result<Self> {
        Self::build(gene_ids, scores, None)
    }

    /// Rank genes by score, carrying a signed effect per gene
    pub fn with_effects(gene_ids: Vec<String>, scores: Vec<f64>, effects: Vec<f64>) -> Result<Self> {
        Self::build(gene_ids, scores, Some(effects))
    }

    fn build(gene_ids: Vec<String>, scores: Vec<f64>, effects: Option<Vec<f64>>) -> Result<Self> {
        if gene_ids.len() != scores.len() {
            return Err(RuvError::InvalidInput {
                reason: format!("{} gene IDs but {} scores", gene_ids.len(), scores.len()),
            });
        }
        if let Some(e) = &effects {
            if e.len() != gene_ids.len() {
                return Err(RuvError::InvalidInput {
                    reason: format!("{} gene IDs but {} effects", gene_ids.len(), e.len()),
                });
            }
        }
        let mut seen = HashSet::with_capacity(gene_ids.len());
        if let Some(dup) = gene_ids.iter().find(|g| !seen.insert(g.as_str())) {
            return Err(RuvError::InvalidInput {
                reason: format!("gene '{}' appears more than once in the ranked list", dup),
            });
        }

        // Vec::sort_by is stable, so ties keep their input order
        let mut order: Vec<usize> = (0..gene_ids.len()).collect();
        order.sort_by(|&a, &b| cmp_nan_last(&scores[a], &scores[b]));

        Ok(Self {
            gene_ids: order.iter().map(|&i| gene_ids[i].clone()).collect(),
            scores: order.iter().map(|&i| scores[i]).collect(),
            effects: effects.map(|e| order.iter().map(|&i| e[i]).collect()),
        })
    }

    pub fn len(&self) -> usize {
        self.gene_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gene_ids.is_empty()
    }

    /// Gene identifiers, most significant first
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn effects(&self) -> Option<&[f64]> {
        self.effects.as_deref()
    }

    /// The `n` most significant genes
    pub fn top(&self, n: usize) -> &[String] {
        &self.gene_ids[..n.min(self.gene_ids.len())]
    }

    /// 0-based rank of a gene
    pub fn rank_of(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|g| g == gene_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stable_order_with_ties_and_nan() {
        let list = RankedGeneList::new(
            ids(&["a", "b", "c", "d", "e"]),
            vec![0.5, f64::NAN, 0.1, 0.5, 0.01],
        )
        .unwrap();
        assert_eq!(list.gene_ids(), &ids(&["e", "c", "a", "d", "b"])[..]);
        assert!(list.scores()[4].is_nan());
        assert_eq!(list.top(2), &ids(&["e", "c"])[..]);
        assert_eq!(list.rank_of("d"), Some(3));
    }

    #[test]
    fn test_effects_follow_order() {
        let list =
            RankedGeneList::with_effects(ids(&["a", "b"]), vec![0.9, 0.1], vec![1.5, -2.0]).unwrap();
        assert_eq!(list.effects().unwrap(), &[-2.0, 1.5]);
    }

    #[test]
    fn test_invalid_lists() {
        assert!(RankedGeneList::new(ids(&["a", "a"]), vec![0.1, 0.2]).is_err());
        assert!(RankedGeneList::new(ids(&["a"]), vec![0.1, 0.2]).is_err());
        assert!(RankedGeneList::with_effects(ids(&["a"]), vec![0.1], vec![]).is_err());
    }
}
