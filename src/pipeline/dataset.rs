//! Per-dataset normalization run: filter, scale, estimate unwanted factors,
//! diagnose

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::{resolve_path, DatasetConfig, ReplicateSpec};
use crate::data::{CountMatrix, NegativeControlSet, ReplicateGroups, SampleMetadata};
use crate::diagnostics::{principal_components, relative_log_expression, rle_summary, PcaResult, RleSummary};
use crate::error::{Result, RuvError};
use crate::filter::filter_by_expression;
use crate::io::{
    read_count_matrix, read_negative_controls, read_sample_table, write_factors, write_json, write_normalized,
    write_pca, write_replicate_table, write_rle_summary,
};
use crate::normalization::{
    estimate_unwanted_variation, scale_normalize, RuvFit, RuvMethod, ScaledMatrix, ScalingMethod,
};
use crate::stats::mean;

/// Everything produced for one dataset
#[derive(Debug, Clone)]
pub struct DatasetResult {
    pub name: String,
    pub metadata: SampleMetadata,
    /// Counts after the expression filter
    pub filtered: CountMatrix,
    pub replicates: Option<ReplicateGroups>,
    pub scaled: ScaledMatrix,
    pub fit: RuvFit,
    /// RLE of the scaled log expression
    pub rle_scaled: Vec<RleSummary>,
    /// RLE after removing unwanted variation
    pub rle_normalized: Vec<RleSummary>,
    pub pca_scaled: PcaResult,
    pub pca_normalized: PcaResult,
    pub summary: DatasetSummary,
}

/// JSON summary written next to the dataset's tables
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub dataset: String,
    pub n_genes_input: usize,
    pub n_genes_kept: usize,
    pub n_samples: usize,
    /// Per-sample totals of the filtered counts
    pub library_sizes: Vec<f64>,
    pub scaling: ScalingMethod,
    pub scale_factors: Option<Vec<f64>>,
    pub k: usize,
    pub method: RuvMethod,
    pub n_controls: usize,
    pub n_replicate_pairs: usize,
    pub rank: usize,
    pub singular_values: Vec<f64>,
    /// Mean per-sample RLE interquartile range before / after
    pub mean_rle_iqr_scaled: f64,
    pub mean_rle_iqr_normalized: f64,
    pub pca_percent_variance_scaled: Vec<f64>,
    pub pca_percent_variance_normalized: Vec<f64>,
}

/// Run one dataset; failures carry the dataset name and `k`
pub fn run_dataset(config: &DatasetConfig, base_dir: &Path) -> Result<DatasetResult> {
    log::info!("Dataset '{}': starting (k = {})", config.name, config.ruv.k);
    run_dataset_inner(config, base_dir).map_err(|e| RuvError::Dataset {
        dataset: config.name.clone(),
        k: config.ruv.k,
        source: Box::new(e),
    })
}

fn run_dataset_inner(config: &DatasetConfig, base_dir: &Path) -> Result<DatasetResult> {
    let counts = read_count_matrix(resolve_path(base_dir, &config.counts))?;
    let samples = read_sample_table(resolve_path(base_dir, &config.samples))?;

    let (counts, metadata) = select_samples(counts, &samples, config)?;
    let n_genes_input = counts.n_genes();

    let filtered = filter_by_expression(&counts, &config.filter)?;

    let replicates = match config.ruv.method {
        RuvMethod::Replicates => Some(build_replicates(&config.replicates, &metadata)?),
        RuvMethod::ControlGenes => None,
    };

    let controls = match &config.negative_controls {
        Some(path) => read_negative_controls(resolve_path(base_dir, path), config.control_column.as_deref())?,
        None => {
            log::info!("Dataset '{}': using all {} genes as negative controls", config.name, filtered.n_genes());
            NegativeControlSet::all_genes(filtered.gene_ids())
        }
    };

    normalize_and_diagnose(&config.name, filtered, metadata, replicates, &controls, config, n_genes_input)
}

/// Restrict counts and sample table to the selected samples, in count-table order
fn select_samples(
    counts: CountMatrix,
    samples: &SampleMetadata,
    config: &DatasetConfig,
) -> Result<(CountMatrix, SampleMetadata)> {
    let metadata = samples.select_by_ids(counts.sample_ids())?;
    match &config.select {
        None => Ok((counts, metadata)),
        Some(sel) => {
            let keep = metadata.samples_with_level(&sel.column, &sel.level)?;
            if keep.is_empty() {
                return Err(RuvError::InvalidInput {
                    reason: format!("no samples have {} = '{}'", sel.column, sel.level),
                });
            }
            log::info!(
                "Dataset '{}': {} of {} samples have {} = '{}'",
                config.name,
                keep.len(),
                metadata.n_samples(),
                sel.column,
                sel.level
            );
            Ok((counts.subset_samples(&keep)?, metadata.subset(&keep)?))
        }
    }
}

fn build_replicates(spec: &ReplicateSpec, metadata: &SampleMetadata) -> Result<ReplicateGroups> {
    match spec {
        ReplicateSpec::Factors(factors) => ReplicateGroups::from_metadata(metadata, factors),
        ReplicateSpec::Assignments(assignments) => {
            ReplicateGroups::from_assignments(assignments, metadata.sample_ids())
        }
    }
}

/// Scale, remove unwanted variation and compute diagnostics for filtered counts
fn normalize_and_diagnose(
    name: &str,
    filtered: CountMatrix,
    metadata: SampleMetadata,
    replicates: Option<ReplicateGroups>,
    controls: &NegativeControlSet,
    config: &DatasetConfig,
    n_genes_input: usize,
) -> Result<DatasetResult> {
    let scaled = scale_normalize(&filtered, config.scaling, config.round)?;
    let fit = estimate_unwanted_variation(&scaled, controls, replicates.as_ref(), &config.ruv)?;

    let sample_ids = scaled.sample_ids();
    let log_scaled = scaled.log2(config.ruv.pseudo_count);
    let rle_scaled = rle_summary(relative_log_expression(log_scaled.view())?.view(), sample_ids)?;
    let rle_normalized = rle_summary(relative_log_expression(fit.normalized.values())?.view(), sample_ids)?;
    let pca_scaled = principal_components(log_scaled.view(), sample_ids, config.pca_components)?;
    let pca_normalized = principal_components(fit.normalized.values(), sample_ids, config.pca_components)?;

    let summary = DatasetSummary {
        dataset: name.to_string(),
        n_genes_input,
        n_genes_kept: filtered.n_genes(),
        n_samples: filtered.n_samples(),
        library_sizes: filtered.library_sizes(),
        scaling: scaled.method(),
        scale_factors: scaled.scale_factors().map(|f| f.to_vec()),
        k: config.ruv.k,
        method: config.ruv.method,
        n_controls: fit.n_controls,
        n_replicate_pairs: fit.n_pairs,
        rank: fit.rank,
        singular_values: fit.singular_values.clone(),
        mean_rle_iqr_scaled: mean_iqr(&rle_scaled),
        mean_rle_iqr_normalized: mean_iqr(&rle_normalized),
        pca_percent_variance_scaled: pca_scaled.percent_variance.clone(),
        pca_percent_variance_normalized: pca_normalized.percent_variance.clone(),
    };

    log::info!(
        "Dataset '{}': {} genes, {} samples, mean RLE IQR {:.3} -> {:.3}",
        name,
        summary.n_genes_kept,
        summary.n_samples,
        summary.mean_rle_iqr_scaled,
        summary.mean_rle_iqr_normalized
    );

    Ok(DatasetResult {
        name: name.to_string(),
        metadata,
        filtered,
        replicates,
        scaled,
        fit,
        rle_scaled,
        rle_normalized,
        pca_scaled,
        pca_normalized,
        summary,
    })
}

fn mean_iqr(summary: &[RleSummary]) -> f64 {
    mean(&summary.iter().map(|s| s.iqr).collect::<Vec<f64>>())
}

/// Write `normalized.tsv`, `factors.tsv`, `replicates.tsv`, RLE and PCA tables
/// and `summary.json` into `dir`
pub fn write_dataset_outputs(result: &DatasetResult, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_normalized(dir.join("normalized.tsv"), &result.fit.normalized)?;
    write_factors(dir.join("factors.tsv"), &result.fit.factors)?;
    if let Some(groups) = &result.replicates {
        write_replicate_table(dir.join("replicates.tsv"), groups)?;
    }
    write_rle_summary(dir.join("rle.tsv"), &result.rle_normalized)?;
    write_rle_summary(dir.join("rle_scaled.tsv"), &result.rle_scaled)?;
    write_pca(dir.join("pca.tsv"), &result.pca_normalized)?;
    write_pca(dir.join("pca_scaled.tsv"), &result.pca_scaled)?;
    write_json(dir.join("summary.json"), &result.summary)?;
    log::info!("Dataset '{}': outputs written to {}", result.name, dir.display());
    Ok(())
}
