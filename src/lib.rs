//! rust_ruvseq: removal of unwanted variation from RNA-seq counts
//!
//! This crate estimates unobserved nuisance factors (library preparation,
//! flow cell, platform) from negative-control genes and replicate samples,
//! removes them from log expression, and compares the resulting gene
//! rankings with concordance-at-the-top (CAT) curves.
//!
//! # Example
//!
//! ```ignore
//! use rust_ruvseq::prelude::*;
//!
//! let counts = read_count_matrix("counts.tsv")?;
//! let samples = read_sample_table("samples.tsv")?;
//!
//! let filtered = filter_by_expression(&counts, &FilterParams::default())?;
//! let scaled = scale_normalize(&filtered, ScalingMethod::UpperQuartile, true)?;
//! let groups = ReplicateGroups::from_metadata(&samples, &["condition".to_string()])?;
//! let controls = NegativeControlSet::all_genes(scaled.gene_ids());
//!
//! let fit = ruv_replicates(&scaled, &controls, &groups, 1)?;
//! println!("W_1 = {:?}", fit.factors.factor(0));
//! ```

pub mod cli;
pub mod concordance;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod io;
pub mod linalg;
pub mod normalization;
pub mod pipeline;
pub mod simulate;
pub mod stats;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::concordance::{
        compare_rankings, concordance_at_top, concordance_at_top_capped, positive_control_recovery,
        ConcordanceCurve, RankedGeneList,
    };
    pub use crate::config::{AnalysisConfig, ComparisonConfig, DatasetConfig};
    pub use crate::data::{CountMatrix, Direction, NegativeControlSet, PositiveControl, ReplicateGroups, SampleMetadata};
    pub use crate::diagnostics::{principal_components, relative_log_expression, rle_summary, PcaResult};
    pub use crate::error::{Result, RuvError};
    pub use crate::filter::{filter_by_expression, FilterParams};
    pub use crate::io::{read_count_matrix, read_ranked_list, read_sample_table, RankedColumns};
    pub use crate::normalization::{
        estimate_unwanted_variation, ruv_control_genes, ruv_replicates, scale_normalize, RuvFit, RuvMethod,
        RuvParams, ScaledMatrix, ScalingMethod, UnwantedFactors,
    };
}

use prelude::*;

/// Filter, scale and remove `k` unwanted factors in one call, using
/// replicate sets from the `factors` columns of the sample table
/// R equivalent: RUVs(betweenLaneNormalization(filtered, "upper"), cIdx, k, makeGroups(x))
pub fn normalize_with_replicates(
    counts: &CountMatrix,
    samples: &SampleMetadata,
    factors: &[String],
    controls: &NegativeControlSet,
    k: usize,
) -> Result<RuvFit> {
    let samples = samples.select_by_ids(counts.sample_ids())?;
    let filtered = filter_by_expression(counts, &FilterParams::default())?;
    let scaled = scale_normalize(&filtered, ScalingMethod::UpperQuartile, true)?;
    let groups = ReplicateGroups::from_metadata(&samples, factors)?;
    ruv_replicates(&scaled, controls, &groups, k)
}
