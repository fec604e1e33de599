//! Analysis configuration loaded from JSON
//!
//! One file describes every dataset to normalize and every ranking comparison
//! to evaluate. Relative paths are resolved against the directory holding the
//! configuration file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::ReplicateAssignment;
use crate::error::{Result, RuvError};
use crate::filter::FilterParams;
use crate::io::RankedColumns;
use crate::normalization::{RuvParams, ScalingMethod};

/// Top-level analysis description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Directory receiving one sub-directory per dataset and the CAT curves
    pub output_dir: PathBuf,
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub comparisons: Vec<ComparisonConfig>,
}

/// Keep only the samples whose metadata `column` equals `level`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleSelection {
    pub column: String,
    pub level: String,
}

/// How replicate sets are formed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicateSpec {
    /// One set per distinct combination of these metadata columns
    Factors(Vec<String>),
    /// Explicit `(batch, condition) -> samples` sets
    Assignments(Vec<ReplicateAssignment>),
}

impl Default for ReplicateSpec {
    fn default() -> Self {
        ReplicateSpec::Factors(vec!["condition".to_string()])
    }
}

/// One dataset to filter, normalize and diagnose
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub name: String,
    /// Genes x samples count table
    pub counts: PathBuf,
    /// Sample table (sample id plus categorical columns)
    pub samples: PathBuf,
    /// Negative-control gene list; every gene is a control when absent
    #[serde(default)]
    pub negative_controls: Option<PathBuf>,
    /// Column of the control list holding gene IDs (default: first column)
    #[serde(default)]
    pub control_column: Option<String>,
    /// Restrict the dataset to one platform or other metadata level
    #[serde(default)]
    pub select: Option<SampleSelection>,
    #[serde(default)]
    pub filter: FilterParams,
    #[serde(default)]
    pub scaling: ScalingMethod,
    #[serde(default = "default_round")]
    pub round: bool,
    #[serde(default)]
    pub ruv: RuvParams,
    #[serde(default)]
    pub replicates: ReplicateSpec,
    #[serde(default = "default_pca_components")]
    pub pca_components: usize,
}

fn default_round() -> bool {
    true
}

fn default_pca_components() -> usize {
    3
}

/// A ranked gene table and the columns to read from it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankedListSource {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub id_column: Option<String>,
    #[serde(default = "default_score_column")]
    pub score_column: String,
    #[serde(default)]
    pub effect_column: Option<String>,
}

fn default_score_column() -> String {
    "pvalue".to_string()
}

impl RankedListSource {
    pub fn columns(&self) -> RankedColumns {
        RankedColumns {
            id: self.id_column.clone(),
            score: self.score_column.clone(),
            effect: self.effect_column.clone(),
        }
    }
}

/// Positive controls for one comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositiveControlSource {
    pub path: PathBuf,
    #[serde(default)]
    pub gene_column: Option<String>,
    /// Column holding `UP` / `DOWN` for this comparison
    pub direction_column: String,
    /// Number of top genes searched for the controls
    #[serde(default = "default_recovery_depth")]
    pub depth: usize,
}

fn default_recovery_depth() -> usize {
    100
}

/// CAT comparison of candidate rankings against a reference ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonConfig {
    pub name: String,
    pub reference: RankedListSource,
    pub candidates: Vec<RankedListSource>,
    /// Largest rank of each CAT curve (capped at the list lengths)
    #[serde(default = "default_max_rank")]
    pub max_rank: usize,
    #[serde(default)]
    pub positive_controls: Option<PositiveControlSource>,
}

fn default_max_rank() -> usize {
    500
}

impl AnalysisConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file; returns it with the directory that relative
    /// paths are resolved against
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<(Self, PathBuf)> {
        let path = path.as_ref();
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        log::info!(
            "Loaded {}: {} dataset(s), {} comparison(s)",
            path.display(),
            config.datasets.len(),
            config.comparisons.len()
        );
        Ok((config, base_dir))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for d in &self.datasets {
            if d.name.is_empty() || !names.insert(d.name.as_str()) {
                return Err(RuvError::InvalidParameter {
                    reason: format!("dataset names must be non-empty and unique, got '{}'", d.name),
                });
            }
        }
        let mut names = HashSet::new();
        for c in &self.comparisons {
            if c.name.is_empty() || !names.insert(c.name.as_str()) {
                return Err(RuvError::InvalidParameter {
                    reason: format!("comparison names must be non-empty and unique, got '{}'", c.name),
                });
            }
            if c.candidates.is_empty() {
                return Err(RuvError::InvalidParameter {
                    reason: format!("comparison '{}' has no candidate rankings", c.name),
                });
            }
            if c.max_rank == 0 {
                return Err(RuvError::InvalidParameter {
                    reason: format!("comparison '{}' has max_rank 0", c.name),
                });
            }
        }
        Ok(())
    }
}

/// Resolve `path` against `base_dir` unless it is absolute
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
