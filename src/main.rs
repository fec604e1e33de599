//! rust_ruvseq command-line interface

use std::fs;
use std::path::Path;

use clap::Parser;
use log::{info, LevelFilter};

use rust_ruvseq::cli::{Cli, Commands};
use rust_ruvseq::config::{AnalysisConfig, DatasetConfig, ReplicateSpec, SampleSelection};
use rust_ruvseq::io::{
    write_concordance_curve, write_count_matrix, write_gene_list, write_scaled_matrix, write_sample_table,
};
use rust_ruvseq::pipeline::{run_analysis, run_dataset, write_dataset_outputs};
use rust_ruvseq::prelude::*;
use rust_ruvseq::simulate::{simulate, SimulationConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["run", "filter", "normalize", "ruv", "cat", "simulate", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.iter().any(|a| a == "--help" || a == "-h") {
            print_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("rust_ruvseq {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Run { config, threads }) => run_config(&config, threads),
        Some(Commands::Filter {
            counts,
            output,
            min_count,
            min_samples,
        }) => run_filter(&counts, &output, min_count, min_samples),
        Some(Commands::Normalize {
            counts,
            output,
            method,
            no_round,
        }) => run_normalize(&counts, &output, &method, !no_round),
        Some(Commands::Ruv {
            counts,
            samples,
            negative_controls,
            control_column,
            k,
            method,
            factors,
            select,
            scaling,
            no_round,
            min_count,
            min_samples,
            output,
        }) => build_dataset_config(
            counts,
            samples,
            negative_controls,
            control_column,
            k,
            &method,
            factors,
            select.as_deref(),
            &scaling,
            !no_round,
            FilterParams {
                min_count,
                min_samples,
            },
        )
        .and_then(|config| run_single_dataset(&config, &output)),
        Some(Commands::Cat {
            reference,
            query,
            id_column,
            score_column,
            max_rank,
            output,
        }) => run_cat(&reference, &query, id_column, score_column, max_rank, &output),
        Some(Commands::Simulate {
            output,
            genes,
            conditions,
            batches,
            replicates,
            de_genes,
            factors,
            seed,
        }) => run_simulate(
            &output,
            SimulationConfig {
                n_genes: genes,
                n_conditions: conditions,
                n_batches: batches,
                replicates,
                n_de: de_genes,
                n_factors: factors,
                seed,
                ..Default::default()
            },
        ),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("rust_ruvseq v{}", VERSION);
    println!("Run `rust_ruvseq --help` for usage.");
}

fn print_help() {
    println!("rust_ruvseq v{}", VERSION);
    println!("Remove unwanted variation from RNA-seq counts and compare gene rankings");
    println!();
    println!("Usage: rust_ruvseq <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run        Run every dataset and comparison of a JSON analysis file");
    println!("  filter     Drop lowly expressed genes");
    println!("  normalize  Between-sample scale normalization (upper quartile, median, full quantile)");
    println!("  ruv        Estimate and remove unwanted variation for one dataset");
    println!("  cat        Concordance at the top between two ranked gene tables");
    println!("  simulate   Generate a synthetic dataset with known unwanted variation");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h, --help       Print help");
    println!("  -V, --version    Print version");
    println!();
    println!("Run `rust_ruvseq <COMMAND> --help` for command-specific options.");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn run_config(config_path: &str, threads: usize) -> Result<()> {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new().num_threads(threads).build_global().ok();
    }

    let (config, base_dir) = AnalysisConfig::from_file(config_path)?;
    let outcomes = run_analysis(&config, &base_dir)?;

    let failed: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.is_ok())
        .map(|o| o.name.clone())
        .collect();
    if !failed.is_empty() {
        return Err(RuvError::InvalidInput {
            reason: format!("{} job(s) failed: {}", failed.len(), failed.join(", ")),
        });
    }
    info!("Done!");
    Ok(())
}

fn run_filter(counts_path: &str, output_path: &str, min_count: f64, min_samples: usize) -> Result<()> {
    let counts = read_count_matrix(counts_path)?;
    let filtered = filter_by_expression(
        &counts,
        &FilterParams {
            min_count,
            min_samples,
        },
    )?;
    info!("Writing filtered counts to: {}", output_path);
    write_count_matrix(output_path, &filtered)
}

fn run_normalize(counts_path: &str, output_path: &str, method: &str, round: bool) -> Result<()> {
    let counts = read_count_matrix(counts_path)?;
    let method: ScalingMethod = method.parse()?;
    let scaled = scale_normalize(&counts, method, round)?;
    if let Some(factors) = scaled.scale_factors() {
        for (id, f) in scaled.sample_ids().iter().zip(factors) {
            info!("  {}: scale factor {:.4}", id, f);
        }
    }
    info!("Writing scaled counts to: {}", output_path);
    write_scaled_matrix(output_path, &scaled)
}

#[allow(clippy::too_many_arguments)]
fn build_dataset_config(
    counts: String,
    samples: String,
    negative_controls: Option<String>,
    control_column: Option<String>,
    k: usize,
    method: &str,
    factors: Vec<String>,
    select: Option<&str>,
    scaling: &str,
    round: bool,
    filter: FilterParams,
) -> Result<DatasetConfig> {
    let select = select
        .map(|s| {
            s.split_once('=')
                .map(|(column, level)| SampleSelection {
                    column: column.to_string(),
                    level: level.to_string(),
                })
                .ok_or_else(|| RuvError::InvalidParameter {
                    reason: format!("--select expects COLUMN=LEVEL, got '{}'", s),
                })
        })
        .transpose()?;

    Ok(DatasetConfig {
        name: Path::new(&counts)
            .file_stem()
            .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned()),
        counts: counts.into(),
        samples: samples.into(),
        negative_controls: negative_controls.map(Into::into),
        control_column,
        select,
        filter,
        scaling: scaling.parse()?,
        round,
        ruv: RuvParams {
            k,
            method: method.parse()?,
            ..Default::default()
        },
        replicates: ReplicateSpec::Factors(factors),
        pca_components: 3,
    })
}

fn run_single_dataset(config: &DatasetConfig, output_dir: &str) -> Result<()> {
    let result = run_dataset(config, Path::new("."))?;
    write_dataset_outputs(&result, Path::new(output_dir))?;
    info!("Done!");
    Ok(())
}

fn run_cat(
    reference_path: &str,
    query_path: &str,
    id_column: Option<String>,
    score_column: String,
    max_rank: usize,
    output_path: &str,
) -> Result<()> {
    let columns = RankedColumns {
        id: id_column,
        score: score_column,
        effect: None,
    };
    let reference = read_ranked_list(reference_path, &columns)?;
    let query = read_ranked_list(query_path, &columns)?;
    let curve = concordance_at_top_capped(&reference, &query, max_rank)?;
    info!(
        "Concordance at rank {}: {:.3}",
        curve.r_max(),
        curve.points.last().map_or(0.0, |p| p.concordance)
    );
    write_concordance_curve(output_path, &curve)
}

fn run_simulate(output_dir: &str, config: SimulationConfig) -> Result<()> {
    let data = simulate(&config)?;
    let dir = Path::new(output_dir);
    fs::create_dir_all(dir)?;
    write_count_matrix(dir.join("counts.tsv"), &data.counts)?;
    write_sample_table(dir.join("samples.tsv"), &data.metadata)?;
    write_gene_list(dir.join("negative_controls.txt"), "gene_id", &data.null_genes)?;
    write_gene_list(dir.join("de_genes.txt"), "gene_id", &data.de_genes)?;
    let factor_names: Vec<String> = (1..=config.n_factors).map(|i| format!("W_{}", i)).collect();
    rust_ruvseq::io::write_matrix(
        dir.join("true_factors.tsv"),
        "sample_id",
        data.counts.sample_ids(),
        &factor_names,
        data.true_factors.view(),
    )?;
    info!("Simulated dataset written to {}", dir.display());
    Ok(())
}
