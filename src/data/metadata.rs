//! Per-sample metadata table
//!
//! Every sample carries exactly one value per named column (condition, batch,
//! platform, ...). Platform and condition are looked up here explicitly rather
//! than inferred from sample-name conventions.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Result, RuvError};

/// Sample metadata containing categorical annotations
/// R equivalent: pData(SeqExpressionSet) / colData
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Column name -> value for each sample
    columns: HashMap<String, Vec<String>>,
    /// Column names in insertion order
    column_order: Vec<String>,
}

impl SampleMetadata {
    /// Create new sample metadata; sample identifiers must be unique
    pub fn new(sample_ids: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(RuvError::InvalidInput {
                    reason: format!("duplicate sample ID '{}' in sample table", id),
                });
            }
        }
        Ok(Self {
            sample_ids,
            columns: HashMap::new(),
            column_order: Vec::new(),
        })
    }

    /// Add (or replace) a categorical column
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.sample_ids.len() {
            return Err(RuvError::InvalidInput {
                reason: format!(
                    "column '{}' has {} values for {} samples",
                    name,
                    values.len(),
                    self.sample_ids.len()
                ),
            });
        }
        if self.columns.insert(name.to_string(), values).is_none() {
            self.column_order.push(name.to_string());
        }
        Ok(())
    }

    /// Check if a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Get the values of a column
    pub fn column(&self, name: &str) -> Result<&[String]> {
        self.columns
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| RuvError::InvalidInput {
                reason: format!("sample table has no column '{}'", name),
            })
    }

    /// Column names in the order they were added
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    /// Get the value of a column for a specific sample
    pub fn value(&self, column: &str, sample_idx: usize) -> Result<&str> {
        self.column(column)?
            .get(sample_idx)
            .map(|s| s.as_str())
            .ok_or_else(|| RuvError::InvalidInput {
                reason: format!("sample index {} out of range", sample_idx),
            })
    }

    /// Distinct levels of a column, in order of first appearance
    pub fn levels(&self, column: &str) -> Result<Vec<String>> {
        let values = self.column(column)?;
        let mut seen = HashSet::new();
        Ok(values
            .iter()
            .filter(|v| seen.insert(v.as_str()))
            .cloned()
            .collect())
    }

    /// Sample indices carrying a specific level
    pub fn samples_with_level(&self, column: &str, level: &str) -> Result<Vec<usize>> {
        Ok(self
            .column(column)?
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_str() == level)
            .map(|(i, _)| i)
            .collect())
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get the index of a sample
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|id| id == sample_id)
    }

    /// Subset metadata to specific samples
    pub fn subset(&self, sample_indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = sample_indices.iter().find(|&&i| i >= self.n_samples()) {
            return Err(RuvError::InvalidInput {
                reason: format!("sample index {} out of range for {} samples", bad, self.n_samples()),
            });
        }
        let new_ids: Vec<String> = sample_indices.iter().map(|&i| self.sample_ids[i].clone()).collect();
        let mut new_meta = SampleMetadata::new(new_ids)?;

        for name in &self.column_order {
            let values = &self.columns[name];
            let new_values: Vec<String> = sample_indices.iter().map(|&i| values[i].clone()).collect();
            new_meta.add_column(name, new_values)?;
        }

        Ok(new_meta)
    }

    /// Reorder (and subset) to follow the given sample identifiers
    pub fn select_by_ids(&self, sample_ids: &[String]) -> Result<Self> {
        let indices = sample_ids
            .iter()
            .map(|id| {
                self.sample_index(id).ok_or_else(|| RuvError::InvalidInput {
                    reason: format!("sample '{}' missing from sample table", id),
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        self.subset(&indices)
    }
}
