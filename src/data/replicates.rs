//! Replicate-set bookkeeping for factor analysis
//!
//! Replicate sets (samples sharing a biological condition within a batch) are
//! stored as a rectangular table padded with an absent sentinel, so batches
//! with different replicate counts can share one design.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::SampleMetadata;
use crate::error::{Result, RuvError};

/// Integer code used for the absent sentinel in exported index tables
pub const ABSENT_INDEX: i64 = -1;

/// Declarative assignment of samples to one replicate set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicateAssignment {
    /// Batch (library preparation, flow cell, platform run)
    pub batch: String,
    /// Biological condition
    pub condition: String,
    /// Sample identifiers that are replicates of each other
    pub samples: Vec<String>,
}

/// Rectangular replicate table; `None` marks an absent (padding) entry
/// R equivalent: makeGroups() scIdx matrix in RUVSeq, with -1 padding
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateGroups {
    rows: Vec<Vec<Option<usize>>>,
    labels: Vec<String>,
    n_samples: usize,
}

impl ReplicateGroups {
    /// Build from sets of sample indices, padding shorter sets
    pub fn from_sets(sets: Vec<Vec<usize>>, n_samples: usize) -> Result<Self> {
        let labels = (1..=sets.len()).map(|i| format!("set{}", i)).collect();
        Self::from_labelled_sets(sets, labels, n_samples)
    }

    fn from_labelled_sets(sets: Vec<Vec<usize>>, labels: Vec<String>, n_samples: usize) -> Result<Self> {
        if sets.is_empty() {
            return Err(RuvError::InvalidInput {
                reason: "no replicate sets given".to_string(),
            });
        }

        let mut owner: Vec<Option<usize>> = vec![None; n_samples];
        for (set_idx, set) in sets.iter().enumerate() {
            for &sample in set {
                if sample >= n_samples {
                    return Err(RuvError::InvalidInput {
                        reason: format!(
                            "replicate set {} references sample index {} but only {} samples exist",
                            set_idx + 1,
                            sample,
                            n_samples
                        ),
                    });
                }
                if let Some(prev) = owner[sample] {
                    return Err(RuvError::InvalidInput {
                        reason: format!(
                            "sample index {} appears in replicate sets {} and {}",
                            sample,
                            prev + 1,
                            set_idx + 1
                        ),
                    });
                }
                owner[sample] = Some(set_idx);
            }
        }

        let width = sets.iter().map(|s| s.len()).max().unwrap_or(0);
        let rows = sets
            .into_iter()
            .map(|set| {
                let mut row: Vec<Option<usize>> = set.into_iter().map(Some).collect();
                row.resize(width, None);
                row
            })
            .collect();

        Ok(Self { rows, labels, n_samples })
    }

    /// Build from declarative `(batch, condition) -> samples` assignments,
    /// validated against the sample manifest
    pub fn from_assignments(assignments: &[ReplicateAssignment], sample_ids: &[String]) -> Result<Self> {
        let index: HashMap<&str, usize> = sample_ids.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();

        let mut sets = Vec::with_capacity(assignments.len());
        let mut labels = Vec::with_capacity(assignments.len());
        for a in assignments {
            let set = a
                .samples
                .iter()
                .map(|id| {
                    index.get(id.as_str()).copied().ok_or_else(|| RuvError::InvalidInput {
                        reason: format!(
                            "replicate set {}/{} names unknown sample '{}'",
                            a.batch, a.condition, id
                        ),
                    })
                })
                .collect::<Result<Vec<usize>>>()?;
            sets.push(set);
            labels.push(format!("{}/{}", a.batch, a.condition));
        }

        Self::from_labelled_sets(sets, labels, sample_ids.len())
    }

    /// One replicate set per distinct combination of the given metadata
    /// columns, in order of first appearance
    pub fn from_metadata(metadata: &SampleMetadata, factors: &[String]) -> Result<Self> {
        if factors.is_empty() {
            return Err(RuvError::InvalidInput {
                reason: "at least one metadata column is needed to form replicate sets".to_string(),
            });
        }
        let columns = factors
            .iter()
            .map(|f| metadata.column(f))
            .collect::<Result<Vec<&[String]>>>()?;

        let mut key_to_set: HashMap<Vec<&str>, usize> = HashMap::new();
        let mut sets: Vec<Vec<usize>> = Vec::new();
        let mut labels: Vec<String> = Vec::new();
        for sample in 0..metadata.n_samples() {
            let key: Vec<&str> = columns.iter().map(|c| c[sample].as_str()).collect();
            let set_idx = match key_to_set.get(&key) {
                Some(&idx) => idx,
                None => {
                    labels.push(key.join("/"));
                    key_to_set.insert(key, sets.len());
                    sets.push(Vec::new());
                    sets.len() - 1
                }
            };
            sets[set_idx].push(sample);
        }

        Self::from_labelled_sets(sets, labels, metadata.n_samples())
    }

    /// Number of replicate sets (rows)
    pub fn n_sets(&self) -> usize {
        self.rows.len()
    }

    /// Width of the padded table (largest set size)
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    /// Number of samples the indices refer to
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Padded rows; `None` entries are the absent sentinel
    pub fn rows(&self) -> &[Vec<Option<usize>>] {
        &self.rows
    }

    /// Set labels (`batch/condition` or `setN`)
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Real members of one set, sentinels skipped
    pub fn members(&self, set_idx: usize) -> Vec<usize> {
        self.rows[set_idx].iter().flatten().copied().collect()
    }

    /// All within-set pairs `(a, b)` of real members, `a` listed before `b`
    ///
    /// Sets with fewer than two real members contribute nothing.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for set_idx in 0..self.rows.len() {
            let members = self.members(set_idx);
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    pairs.push((members[i], members[j]));
                }
            }
        }
        pairs
    }

    /// Number of linearly independent within-set contrasts: sum of (size - 1)
    pub fn independent_contrasts(&self) -> usize {
        (0..self.rows.len())
            .map(|i| self.members(i).len().saturating_sub(1))
            .sum()
    }

    /// Integer export with `ABSENT_INDEX` in place of the sentinel
    pub fn to_index_table(&self) -> Vec<Vec<i64>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|e| e.map_or(ABSENT_INDEX, |i| i as i64)).collect())
            .collect()
    }
}
