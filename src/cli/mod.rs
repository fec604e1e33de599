//! Command-line interface for rust_ruvseq

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_ruvseq")]
#[command(version)]
#[command(about = "RUV normalization and concordance-at-the-top evaluation for RNA-seq")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every dataset and comparison of a JSON analysis file
    #[command(
        long_about = "Run every dataset and comparison of a JSON analysis file.\n\n\
            Each dataset is filtered, scale-normalized and corrected for unwanted\n\
            variation; RLE and PCA diagnostics are written alongside. Each comparison\n\
            produces CAT curves of candidate rankings against a reference ranking.\n\
            Datasets and comparisons run in parallel; a failing job does not stop\n\
            the others.",
        after_long_help = "\
Examples:
  rust_ruvseq run analysis.json
  rust_ruvseq run analysis.json --threads 4 -v"
    )]
    Run {
        /// Path to the JSON analysis file
        config: String,

        /// Number of worker threads (0 = all cores)
        #[arg(short, long, default_value = "0")]
        threads: usize,
    },

    /// Drop lowly expressed genes
    #[command(
        long_about = "Drop lowly expressed genes.\n\n\
            Keeps a gene when strictly more than --min-samples samples have a count\n\
            strictly greater than --min-count.",
        after_long_help = "\
Examples:
  rust_ruvseq filter -c counts.tsv -o filtered.tsv
  rust_ruvseq filter -c counts.tsv --min-count 5 --min-samples 2 -o filtered.tsv"
    )]
    Filter {
        /// Path to count matrix file
        #[arg(short, long,
            long_help = "Path to count matrix file.\n\
                Format: first column = gene IDs, remaining columns = counts per sample.\n\
                Supports both CSV (comma) and TSV (tab) delimiters (auto-detected).")]
        counts: String,

        /// Output file path [default: filtered_counts.tsv]
        #[arg(short, long, default_value = "filtered_counts.tsv")]
        output: String,

        /// Count a sample must exceed [default: 10]
        #[arg(long, default_value = "10")]
        min_count: f64,

        /// Number of samples a gene must exceed [default: 5]
        #[arg(long, default_value = "5")]
        min_samples: usize,
    },

    /// Between-sample scale normalization
    #[command(
        after_long_help = "\
Examples:
  rust_ruvseq normalize -c counts.tsv -o uq.tsv
  rust_ruvseq normalize -c counts.tsv --method full --no-round -o fq.tsv"
    )]
    Normalize {
        /// Path to count matrix file
        #[arg(short, long)]
        counts: String,

        /// Output file path [default: scaled_counts.tsv]
        #[arg(short, long, default_value = "scaled_counts.tsv")]
        output: String,

        /// Scaling method [default: upper]
        #[arg(short, long, default_value = "upper",
            long_help = "Between-sample normalization method.\n\
                upper:  Upper-quartile scaling (default)\n\
                median: Median scaling\n\
                full:   Full quantile normalization\n\
                none:   Leave counts unchanged")]
        method: String,

        /// Keep fractional scaled values
        #[arg(long)]
        no_round: bool,
    },

    /// Estimate and remove unwanted variation for one dataset
    #[command(
        long_about = "Estimate and remove unwanted variation for one dataset.\n\n\
            Filters and scale-normalizes the counts, estimates k unwanted factors\n\
            from negative-control genes, and writes normalized.tsv, factors.tsv,\n\
            replicates.tsv, rle.tsv, pca.tsv and summary.json to the output directory.",
        after_long_help = "\
Examples:
  # Replicate sets from the condition column, all genes as controls
  rust_ruvseq ruv -c counts.tsv -s samples.tsv -k 1 -o ruv_k1

  # Curated controls, replicate sets per condition within batch
  rust_ruvseq ruv -c counts.tsv -s samples.tsv -n housekeeping.txt \\
    --factor condition --factor batch -k 2 -o ruv_k2

  # Control-gene method restricted to one platform
  rust_ruvseq ruv -c counts.tsv -s samples.tsv -n spikes.txt \\
    --method control_genes --select platform=FC -o ruv_fc"
    )]
    Ruv {
        /// Path to count matrix file
        #[arg(short, long)]
        counts: String,

        /// Path to sample table
        #[arg(short, long,
            long_help = "Path to sample table.\n\
                Format: first column = sample IDs (matching count matrix columns),\n\
                remaining columns = categorical annotations (condition, batch, platform).")]
        samples: String,

        /// Negative-control gene list (default: all genes)
        #[arg(short, long)]
        negative_controls: Option<String>,

        /// Column of the control list holding gene IDs
        #[arg(long)]
        control_column: Option<String>,

        /// Number of unwanted factors [default: 1]
        #[arg(short, long, default_value = "1")]
        k: usize,

        /// Estimation method [default: replicates]
        #[arg(short, long, default_value = "replicates",
            long_help = "Source of the unwanted-variation estimate.\n\
                replicates:    Differences between replicate samples (RUVs)\n\
                control_genes: Centered negative-control genes (RUVg)")]
        method: String,

        /// Sample-table column defining replicate sets (repeatable)
        #[arg(long = "factor", value_name = "COLUMN", default_value = "condition")]
        factors: Vec<String>,

        /// Restrict to samples with COLUMN=LEVEL
        #[arg(long, value_name = "COLUMN=LEVEL")]
        select: Option<String>,

        /// Scaling method [default: upper]
        #[arg(long, default_value = "upper")]
        scaling: String,

        /// Keep fractional scaled values
        #[arg(long)]
        no_round: bool,

        /// Count a sample must exceed [default: 10]
        #[arg(long, default_value = "10")]
        min_count: f64,

        /// Number of samples a gene must exceed [default: 5]
        #[arg(long, default_value = "5")]
        min_samples: usize,

        /// Output directory [default: ruv_output]
        #[arg(short, long, default_value = "ruv_output")]
        output: String,
    },

    /// Concordance at the top between two ranked gene tables
    #[command(
        after_long_help = "\
Examples:
  rust_ruvseq cat -r microarray.tsv -q rnaseq_ruv.tsv --max-rank 500 -o cat.tsv
  rust_ruvseq cat -r a.csv -q b.csv --score-column padj --id-column gene"
    )]
    Cat {
        /// Reference ranked table
        #[arg(short, long)]
        reference: String,

        /// Query ranked table
        #[arg(short = 'q', long)]
        query: String,

        /// Column holding gene IDs (default: first column)
        #[arg(long)]
        id_column: Option<String>,

        /// Column holding scores, lower is more significant [default: pvalue]
        #[arg(long, default_value = "pvalue")]
        score_column: String,

        /// Largest rank, capped at the list lengths [default: 500]
        #[arg(long, default_value = "500")]
        max_rank: usize,

        /// Output file path [default: cat.tsv]
        #[arg(short, long, default_value = "cat.tsv")]
        output: String,
    },

    /// Generate a synthetic dataset with known unwanted variation
    #[command(
        after_long_help = "\
Examples:
  rust_ruvseq simulate -o sim --genes 2000 --conditions 2 --batches 2 --replicates 3"
    )]
    Simulate {
        /// Output directory [default: simulated]
        #[arg(short, long, default_value = "simulated")]
        output: String,

        /// Number of genes [default: 1000]
        #[arg(long, default_value = "1000")]
        genes: usize,

        /// Number of conditions [default: 3]
        #[arg(long, default_value = "3")]
        conditions: usize,

        /// Number of batches [default: 1]
        #[arg(long, default_value = "1")]
        batches: usize,

        /// Replicates per condition and batch [default: 5]
        #[arg(long, default_value = "5")]
        replicates: usize,

        /// Number of differentially expressed genes [default: 100]
        #[arg(long, default_value = "100")]
        de_genes: usize,

        /// Number of unwanted factors [default: 1]
        #[arg(long, default_value = "1")]
        factors: usize,

        /// Random seed [default: 42]
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}
