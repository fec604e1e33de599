//! Per-comparison CAT evaluation

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::concordance::{compare_rankings, positive_control_recovery, ConcordanceCurve, RankedGeneList};
use crate::config::{resolve_path, ComparisonConfig, RankedListSource};
use crate::error::{Result, RuvError};
use crate::io::{read_positive_controls, read_ranked_list, write_concordance_curves, write_json};

/// Positive-control recovery of one ranked list
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryScore {
    pub list: String,
    pub depth: usize,
    pub fraction: f64,
}

/// Final point of one CAT curve
#[derive(Debug, Clone, Serialize)]
pub struct CurveSummary {
    pub list: String,
    pub r_max: usize,
    pub concordance_at_r_max: f64,
}

/// Curves and recovery scores for one comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub name: String,
    pub reference: String,
    #[serde(skip)]
    pub curves: Vec<ConcordanceCurve>,
    pub curve_summaries: Vec<CurveSummary>,
    pub positive_control_recovery: Vec<RecoveryScore>,
}

fn load(source: &RankedListSource, base_dir: &Path) -> Result<RankedGeneList> {
    let list = read_ranked_list(resolve_path(base_dir, &source.path), &source.columns())?;
    log::debug!("Ranked list '{}': {} genes", source.name, list.len());
    Ok(list)
}

/// Compute one CAT curve per candidate against the reference
pub fn run_comparison(config: &ComparisonConfig, base_dir: &Path) -> Result<ComparisonResult> {
    run_comparison_inner(config, base_dir).map_err(|e| RuvError::Comparison {
        comparison: config.name.clone(),
        source: Box::new(e),
    })
}

fn run_comparison_inner(config: &ComparisonConfig, base_dir: &Path) -> Result<ComparisonResult> {
    log::info!(
        "Comparison '{}': {} candidate(s) against '{}'",
        config.name,
        config.candidates.len(),
        config.reference.name
    );
    let reference = load(&config.reference, base_dir)?;
    let candidates = config
        .candidates
        .iter()
        .map(|c| Ok((c.name.clone(), load(c, base_dir)?)))
        .collect::<Result<Vec<(String, RankedGeneList)>>>()?;

    let curves = compare_rankings(&reference, &candidates, config.max_rank)?;
    let curve_summaries = curves
        .iter()
        .map(|c| CurveSummary {
            list: c.name.clone(),
            r_max: c.r_max(),
            concordance_at_r_max: c.points.last().map_or(f64::NAN, |p| p.concordance),
        })
        .collect();

    let mut recovery = Vec::new();
    if let Some(pc) = &config.positive_controls {
        let positives = read_positive_controls(
            resolve_path(base_dir, &pc.path),
            pc.gene_column.as_deref(),
            &pc.direction_column,
        )?;
        let lists = std::iter::once((&config.reference.name, &reference))
            .chain(candidates.iter().map(|(name, list)| (name, list)));
        for (name, list) in lists {
            let fraction = positive_control_recovery(list, &positives, pc.depth)?;
            log::info!(
                "Comparison '{}': '{}' recovers {:.1}% of positive controls in the top {}",
                config.name,
                name,
                100.0 * fraction,
                pc.depth
            );
            recovery.push(RecoveryScore {
                list: name.clone(),
                depth: pc.depth,
                fraction,
            });
        }
    }

    Ok(ComparisonResult {
        name: config.name.clone(),
        reference: config.reference.name.clone(),
        curves,
        curve_summaries,
        positive_control_recovery: recovery,
    })
}

/// Write `cat_<name>.tsv` and `cat_<name>.json` into `dir`
pub fn write_comparison_outputs(result: &ComparisonResult, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_concordance_curves(dir.join(format!("cat_{}.tsv", result.name)), &result.curves)?;
    write_json(dir.join(format!("cat_{}.json", result.name)), result)?;
    Ok(())
}
