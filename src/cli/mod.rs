//! Command-line interface for exprkit

mod commands;

use clap::{Args, Parser, Subcommand};

pub use commands::run;

#[derive(Parser)]
#[command(name = "exprkit")]
#[command(version)]
#[command(about = "Linear models, precision weights and row statistics for expression matrices")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of worker threads (0 = all cores)
    #[arg(short = 't', long, global = true, default_value = "0")]
    pub threads: usize,
}

/// Model terms built from a sample table
#[derive(Args, Debug, Clone)]
pub struct DesignArgs {
    /// Path to the sample table (tab- or comma-delimited)
    #[arg(short, long,
        long_help = "Path to the sample table.\n\
            Format: first column = sample IDs matching the matrix column names,\n\
            remaining columns = sample attributes. Tab or comma delimited.")]
    pub samples: String,

    /// Categorical term
    #[arg(long, value_name = "VAR",
        long_help = "Categorical term, treatment-coded against its reference level.\n\
            Can be specified multiple times: --factor batch --factor treatment")]
    pub factor: Vec<String>,

    /// Continuous term
    #[arg(long, value_name = "VAR")]
    pub continuous: Vec<String>,

    /// Interaction between two factors
    #[arg(long, value_name = "A:B")]
    pub interaction: Vec<String>,

    /// Reference level (format: factor=level)
    #[arg(long, value_name = "FACTOR=LEVEL",
        long_help = "Reference level for a factor.\n\
            Format: factor=level (e.g., --reference treatment=control)\n\
            Without this, the alphabetically first level is used as reference.")]
    pub reference: Vec<String>,

    /// Fit without an intercept
    #[arg(long)]
    pub no_intercept: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit a linear model to every row of a matrix
    #[command(after_long_help = "\
Examples:
  # Treatment effect adjusted for batch
  exprkit fit -i expr.tsv -s samples.tsv --factor batch --factor treatment -o fit.tsv

  # Weighted fit using voom weights, JSON output
  exprkit fit -i logcpm.tsv -s samples.tsv --factor group -w weights.tsv --format json")]
    Fit {
        /// Response matrix (rows = features, columns = samples)
        #[arg(short = 'i', long)]
        matrix: String,

        #[command(flatten)]
        design: DesignArgs,

        /// Observation weights, same shape as the matrix
        #[arg(short, long)]
        weights: Option<String>,

        /// Output file path
        #[arg(short, long, default_value = "fit.tsv")]
        output: String,

        /// Output format: tsv or json
        #[arg(long, default_value = "tsv")]
        format: String,

        /// Relative tolerance for aliased design columns
        #[arg(long, default_value = "1e-7")]
        tolerance: f64,
    },

    /// Estimate voom precision weights for a count matrix
    Voom {
        /// Count matrix (rows = genes, columns = samples)
        #[arg(short, long)]
        counts: String,

        #[command(flatten)]
        design: DesignArgs,

        /// Lowess span for the mean-variance trend
        #[arg(long, default_value = "0.5")]
        span: f64,

        /// Output path for the weight matrix
        #[arg(short, long, default_value = "weights.tsv")]
        output: String,

        /// Optional output path for the log2-CPM matrix
        #[arg(long)]
        log_cpm: Option<String>,
    },

    /// Filter matrix rows
    Filter {
        /// Input matrix
        #[arg(short = 'i', long)]
        matrix: String,

        /// Output file path
        #[arg(short, long, default_value = "filtered.tsv")]
        output: String,

        /// Minimum number of present values per row
        #[arg(long)]
        min_present_count: Option<usize>,

        /// Minimum fraction of present values per row
        #[arg(long)]
        min_present_fraction: Option<f64>,

        /// Row statistic for level filtering: mean, median, max, min, variance
        #[arg(long, default_value = "mean")]
        statistic: String,

        /// Drop rows whose statistic is below this value
        #[arg(long)]
        low: Option<f64>,

        /// Drop rows whose statistic is above this value
        #[arg(long)]
        high: Option<f64>,

        /// Drop this fraction of rows with the lowest statistic
        #[arg(long)]
        remove_fraction: Option<f64>,

        /// Compare absolute values of the statistic
        #[arg(long)]
        absolute: bool,

        /// Keep only these rows
        #[arg(long, value_name = "NAME")]
        keep: Vec<String>,

        /// Drop these rows
        #[arg(long, value_name = "NAME")]
        exclude: Vec<String>,
    },

    /// Row-by-row correlation or distance matrix
    Cor {
        /// Input matrix
        #[arg(short = 'i', long)]
        matrix: String,

        /// pearson, spearman (correlations) or euclidean, manhattan (distances)
        #[arg(short, long, default_value = "pearson")]
        method: String,

        /// Output file path
        #[arg(short, long, default_value = "correlation.tsv")]
        output: String,
    },
}
