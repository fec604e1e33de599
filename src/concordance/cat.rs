//! Concordance at the top (CAT) between ranked gene lists

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::RankedGeneList;
use crate::data::PositiveControl;
use crate::error::{Result, RuvError};

/// Agreement of the top `rank` genes of two lists
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcordancePoint {
    pub rank: usize,
    pub concordance: f64,
}

/// CAT curve, one point per rank from 1 to `r_max`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcordanceCurve {
    pub name: String,
    pub points: Vec<ConcordancePoint>,
}

impl ConcordanceCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn r_max(&self) -> usize {
        self.points.last().map_or(0, |p| p.rank)
    }

    /// Concordance at a 1-based rank
    pub fn at(&self, rank: usize) -> Option<f64> {
        rank.checked_sub(1)
            .and_then(|i| self.points.get(i))
            .map(|p| p.concordance)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.concordance).collect()
    }
}

/// Fraction of shared genes among the top `i` of each list, for `i = 1..=r_max`
/// R equivalent: CATplot() computation in ffpe
pub fn concordance_at_top(a: &RankedGeneList, b: &RankedGeneList, r_max: usize) -> Result<ConcordanceCurve> {
    if a.is_empty() || b.is_empty() {
        return Err(RuvError::InvalidInput {
            reason: format!("cannot compare empty ranked lists ({} and {} genes)", a.len(), b.len()),
        });
    }
    if r_max == 0 {
        return Err(RuvError::InvalidParameter {
            reason: "maximum rank must be at least 1".to_string(),
        });
    }
    if r_max > a.len() || r_max > b.len() {
        return Err(RuvError::InvalidInput {
            reason: format!(
                "maximum rank {} exceeds list length ({} and {} genes)",
                r_max,
                a.len(),
                b.len()
            ),
        });
    }

    let top_a = a.top(r_max);
    let top_b = b.top(r_max);
    let mut seen_a: HashSet<&str> = HashSet::with_capacity(r_max);
    let mut seen_b: HashSet<&str> = HashSet::with_capacity(r_max);
    let mut shared = 0usize;
    let mut points = Vec::with_capacity(r_max);

    for i in 0..r_max {
        let ga = top_a[i].as_str();
        let gb = top_b[i].as_str();
        seen_a.insert(ga);
        seen_b.insert(gb);
        if ga == gb {
            shared += 1;
        } else {
            if seen_b.contains(ga) {
                shared += 1;
            }
            if seen_a.contains(gb) {
                shared += 1;
            }
        }
        points.push(ConcordancePoint {
            rank: i + 1,
            concordance: shared as f64 / (i + 1) as f64,
        });
    }

    log::debug!(
        "CAT over {} ranks: concordance at r_max = {:.3}",
        r_max,
        points.last().map_or(0.0, |p| p.concordance)
    );

    Ok(ConcordanceCurve {
        name: String::new(),
        points,
    })
}

/// CAT with `r_max = min(len a, len b, limit)`
pub fn concordance_at_top_capped(a: &RankedGeneList, b: &RankedGeneList, limit: usize) -> Result<ConcordanceCurve> {
    let r_max = a.len().min(b.len()).min(limit);
    concordance_at_top(a, b, r_max)
}

/// One named CAT curve per candidate list against a shared reference
pub fn compare_rankings(
    reference: &RankedGeneList,
    candidates: &[(String, RankedGeneList)],
    limit: usize,
) -> Result<Vec<ConcordanceCurve>> {
    candidates
        .iter()
        .map(|(name, list)| {
            let mut curve = concordance_at_top_capped(reference, list, limit).map_err(|e| {
                log::error!("CAT '{}' against the reference failed", name);
                e
            })?;
            curve.name = name.clone();
            log::info!(
                "CAT '{}': concordance {:.3} at rank {}",
                name,
                curve.points.last().map_or(0.0, |p| p.concordance),
                curve.r_max()
            );
            Ok(curve)
        })
        .collect()
}

/// Fraction of positive controls among the top `depth` genes
///
/// When the list carries effects, a control only counts if its effect has the
/// expected sign. Controls absent from the list count as not recovered.
pub fn positive_control_recovery(list: &RankedGeneList, positives: &[PositiveControl], depth: usize) -> Result<f64> {
    if positives.is_empty() {
        return Err(RuvError::InvalidInput {
            reason: "no positive controls given".to_string(),
        });
    }
    let depth = depth.min(list.len());
    let top: HashSet<&str> = list.top(depth).iter().map(|g| g.as_str()).collect();

    let recovered = positives
        .iter()
        .filter(|pc| top.contains(pc.gene_id.as_str()))
        .filter(|pc| match (list.effects(), list.rank_of(&pc.gene_id)) {
            (Some(effects), Some(rank)) => pc.direction.agrees_with(effects[rank]),
            _ => true,
        })
        .count();

    Ok(recovered as f64 / positives.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Direction;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn list(genes: &[&str]) -> RankedGeneList {
        let ids = genes.iter().map(|s| s.to_string()).collect();
        let scores = (0..genes.len()).map(|i| i as f64).collect();
        RankedGeneList::new(ids, scores).unwrap()
    }

    /// Brute-force |top_i(a) ∩ top_i(b)| / i
    fn naive(a: &RankedGeneList, b: &RankedGeneList, r_max: usize) -> Vec<f64> {
        (1..=r_max)
            .map(|i| {
                let ta: HashSet<&String> = a.top(i).iter().collect();
                b.top(i).iter().filter(|g| ta.contains(g)).count() as f64 / i as f64
            })
            .collect()
    }

    #[test]
    fn test_small_example() {
        let a = list(&["g1", "g2", "g3", "g4"]);
        let b = list(&["g2", "g1", "g4", "g3"]);
        let curve = concordance_at_top(&a, &b, 4).unwrap();
        assert_eq!(curve.values(), vec![0.0, 1.0, 2.0 / 3.0, 1.0]);
        assert_eq!(curve.at(1), Some(0.0));
        assert_eq!(curve.at(0), None);
    }

    #[test]
    fn test_identical_lists() {
        let a = list(&["x", "y", "z"]);
        let curve = concordance_at_top(&a, &a, 3).unwrap();
        assert!(curve.values().iter().all(|&c| c == 1.0));
    }

    #[test]
    fn test_different_universes() {
        let a = list(&["a", "b", "c"]);
        let b = list(&["d", "e", "a", "f"]);
        let curve = concordance_at_top(&a, &b, 3).unwrap();
        assert_eq!(curve.values(), vec![0.0, 0.0, 1.0 / 3.0]);
    }

    #[test]
    fn test_correlated_lists_1000_genes() {
        let mut rng = StdRng::seed_from_u64(11);
        let ids: Vec<String> = (0..1000).map(|i| format!("g{}", i)).collect();
        let truth: Vec<f64> = (0..1000).map(|_| rng.gen::<f64>()).collect();
        let noisy_a: Vec<f64> = truth.iter().map(|t| t + 0.05 * rng.gen::<f64>()).collect();
        let noisy_b: Vec<f64> = truth.iter().map(|t| t + 0.05 * rng.gen::<f64>()).collect();
        let a = RankedGeneList::new(ids.clone(), noisy_a).unwrap();
        let b = RankedGeneList::new(ids, noisy_b).unwrap();

        let curve = concordance_at_top(&a, &b, 500).unwrap();
        assert_eq!(curve.len(), 500);
        assert_eq!(curve.r_max(), 500);
        assert!(curve.values().iter().all(|&c| (0.0..=1.0).contains(&c)));

        for (got, want) in curve.values().iter().zip(naive(&a, &b, 500)) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }

        // Trend rises with depth for correlated scores
        let early: f64 = curve.values()[..50].iter().sum::<f64>() / 50.0;
        let late: f64 = curve.values()[450..].iter().sum::<f64>() / 50.0;
        assert!(late > early);
        assert!(curve.at(500).unwrap() > 0.8);
    }

    #[test]
    fn test_errors() {
        let a = list(&["a", "b"]);
        let empty = RankedGeneList::new(vec![], vec![]).unwrap();
        assert!(matches!(concordance_at_top(&a, &empty, 1), Err(RuvError::InvalidInput { .. })));
        assert!(matches!(concordance_at_top(&a, &a, 0), Err(RuvError::InvalidParameter { .. })));
        assert!(matches!(concordance_at_top(&a, &a, 3), Err(RuvError::InvalidInput { .. })));
    }

    #[test]
    fn test_capped_and_named() {
        let reference = list(&["a", "b", "c", "d", "e"]);
        let candidates = vec![
            ("short".to_string(), list(&["b", "a", "c"])),
            ("long".to_string(), list(&["a", "c", "b", "e", "d", "f"])),
        ];
        let curves = compare_rankings(&reference, &candidates, 4).unwrap();
        assert_eq!(curves[0].name, "short");
        assert_eq!(curves[0].len(), 3);
        assert_eq!(curves[1].len(), 4);
        assert_eq!(curves[0].at(3), Some(1.0));

        let bad = vec![("empty".to_string(), RankedGeneList::new(vec![], vec![]).unwrap())];
        let err = compare_rankings(&reference, &bad, 4).unwrap_err();
        assert!(matches!(err, RuvError::InvalidInput { .. }));
    }

    #[test]
    fn test_positive_control_recovery() {
        let ids = ["p1", "n1", "p2", "n2", "p3"].iter().map(|s| s.to_string()).collect();
        let list = RankedGeneList::with_effects(ids, vec![0.01, 0.02, 0.03, 0.04, 0.05], vec![1.0, 0.5, -1.0, 0.2, 2.0])
            .unwrap();
        let positives = vec![
            PositiveControl {
                gene_id: "p1".to_string(),
                direction: Direction::Up,
            },
            PositiveControl {
                gene_id: "p2".to_string(),
                direction: Direction::Up,
            },
            PositiveControl {
                gene_id: "p3".to_string(),
                direction: Direction::Up,
            },
            PositiveControl {
                gene_id: "missing".to_string(),
                direction: Direction::Down,
            },
        ];
        // p1 recovered, p2 wrong sign, p3 below depth
        assert_abs_diff_eq!(positive_control_recovery(&list, &positives, 3).unwrap(), 0.25);
        assert_abs_diff_eq!(positive_control_recovery(&list, &positives, 10).unwrap(), 0.5);
        assert!(positive_control_recovery(&list, &[], 3).is_err());
    }
}
