//! Subcommand implementations

use log::info;

use super::{Cli, Commands, DesignArgs};
use crate::data::{DenseMatrix, MatrixKind, NamedMatrix, SampleTable};
use crate::error::{ExprError, Result};
use crate::filter::{PresenceFilter, RowFilter, RowLevelFilter, RowNameFilter, RowStatistic};
use crate::io::{read_matrix, read_sample_table, write_matrix, write_summaries, SummaryFormat};
use crate::lm::{fit_linear_model, DesignBuilder, DesignMatrix, FitParams};
use crate::stats::{correlation_matrix, distance_matrix, spearman_matrix, DistanceMetric};
use crate::voom::{estimate_mean_variance, VoomParams};

/// Execute a parsed command line
pub fn run(cli: &Cli) -> Result<()> {
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok();
    }

    match &cli.command {
        Commands::Fit {
            matrix,
            design,
            weights,
            output,
            format,
            tolerance,
        } => run_fit(matrix, design, weights.as_deref(), output, format, *tolerance),
        Commands::Voom {
            counts,
            design,
            span,
            output,
            log_cpm,
        } => run_voom(counts, design, *span, output, log_cpm.as_deref()),
        Commands::Filter {
            matrix,
            output,
            min_present_count,
            min_present_fraction,
            statistic,
            low,
            high,
            remove_fraction,
            absolute,
            keep,
            exclude,
        } => {
            let level = RowLevelFilter {
                statistic: parse_statistic(statistic)?,
                low: *low,
                high: *high,
                remove_fraction: *remove_fraction,
                absolute: *absolute,
            };
            run_filter(
                matrix,
                output,
                *min_present_count,
                *min_present_fraction,
                level,
                keep,
                exclude,
            )
        }
        Commands::Cor {
            matrix,
            method,
            output,
        } => run_cor(matrix, method, output),
    }
}

fn read_dense(path: &str) -> Result<DenseMatrix> {
    Ok(read_matrix(path, MatrixKind::Dense)?.into_dense())
}

/// Sample table ordered like the matrix columns
fn load_samples(args: &DesignArgs, columns: &[String]) -> Result<SampleTable> {
    let table = read_sample_table(&args.samples, &args.continuous)?;
    if table.n_samples() != columns.len() {
        return Err(ExprError::dimension_mismatch(
            format!("{} samples (one per matrix column)", columns.len()),
            format!("{} samples", table.n_samples()),
        ));
    }
    table.reorder(columns)
}

/// Weights reordered to the response's row and column names
fn align_weights(weights: DenseMatrix, response: &DenseMatrix) -> Result<DenseMatrix> {
    if weights.rows() != response.rows() || weights.columns() != response.columns() {
        return Err(ExprError::dimension_mismatch(
            format!("{}x{} weights", response.rows(), response.columns()),
            format!("{}x{} weights", weights.rows(), weights.columns()),
        ));
    }
    weights
        .subset_rows_by_name(response.row_names())?
        .subset_columns_by_name(response.column_names())
}

fn build_design(args: &DesignArgs, table: &SampleTable) -> Result<DesignMatrix> {
    let mut builder = DesignBuilder::new(table).intercept(!args.no_intercept);
    for f in &args.factor {
        builder = builder.factor(f);
    }
    for c in &args.continuous {
        builder = builder.continuous(c);
    }
    for spec in &args.interaction {
        let (a, b) = spec.split_once(':').ok_or_else(|| {
            ExprError::invalid_argument(format!("interaction '{}' must look like A:B", spec))
        })?;
        builder = builder.interaction(a, b);
    }
    for spec in &args.reference {
        let (factor, level) = spec.split_once('=').ok_or_else(|| {
            ExprError::invalid_argument(format!("reference '{}' must look like factor=level", spec))
        })?;
        builder = builder.reference_level(factor, level);
    }
    let design = builder.build()?;
    info!("Design: ~ {}", design.terms().join(" + "));
    Ok(design)
}

fn parse_format(format: &str) -> Result<SummaryFormat> {
    match format {
        "tsv" => Ok(SummaryFormat::Tsv),
        "json" => Ok(SummaryFormat::Json),
        other => Err(ExprError::invalid_argument(format!(
            "Unknown output format '{}'. Use 'tsv' or 'json'.",
            other
        ))),
    }
}

fn parse_statistic(name: &str) -> Result<RowStatistic> {
    match name {
        "mean" => Ok(RowStatistic::Mean),
        "median" => Ok(RowStatistic::Median),
        "max" => Ok(RowStatistic::Max),
        "min" => Ok(RowStatistic::Min),
        "variance" => Ok(RowStatistic::Variance),
        other => Err(ExprError::invalid_argument(format!(
            "Unknown statistic '{}'. Use mean, median, max, min or variance.",
            other
        ))),
    }
}

fn run_fit(
    matrix_path: &str,
    design_args: &DesignArgs,
    weights_path: Option<&str>,
    output: &str,
    format: &str,
    tolerance: f64,
) -> Result<()> {
    let format = parse_format(format)?;
    let response = read_dense(matrix_path)?;
    let table = load_samples(design_args, response.column_names())?;
    let design = build_design(design_args, &table)?;
    let weights = weights_path
        .map(|path| align_weights(read_dense(path)?, &response))
        .transpose()?;

    let fit = fit_linear_model(&response, &design, weights.as_ref(), &FitParams { tolerance })?;
    let summaries = fit.summaries();
    let significant = summaries.iter().filter(|s| s.adjusted_p_value < 0.05).count();
    info!("{} of {} rows with adjusted p < 0.05", significant, summaries.len());
    write_summaries(output, &summaries, format)
}

fn run_voom(
    counts_path: &str,
    design_args: &DesignArgs,
    span: f64,
    output: &str,
    log_cpm: Option<&str>,
) -> Result<()> {
    let counts = read_dense(counts_path)?;
    let table = load_samples(design_args, counts.column_names())?;
    let design = build_design(design_args, &table)?;
    let params = VoomParams {
        span,
        ..Default::default()
    };
    let result = estimate_mean_variance(&counts, &design, None, &params)?;
    write_matrix(output, &result.weights)?;
    if let Some(path) = log_cpm {
        write_matrix(path, &result.log2cpm)?;
    }
    Ok(())
}

fn run_filter(
    matrix_path: &str,
    output: &str,
    min_present_count: Option<usize>,
    min_present_fraction: Option<f64>,
    level: RowLevelFilter,
    keep: &[String],
    exclude: &[String],
) -> Result<()> {
    if !keep.is_empty() && !exclude.is_empty() {
        return Err(ExprError::invalid_argument(
            "--keep and --exclude cannot be combined",
        ));
    }
    let mut matrix = read_dense(matrix_path)?;

    if !keep.is_empty() {
        matrix = RowNameFilter::keep_only(keep.iter().cloned()).filter(&matrix)?;
    } else if !exclude.is_empty() {
        matrix = RowNameFilter::exclude(exclude.iter().cloned()).filter(&matrix)?;
    }

    if min_present_count.is_some() || min_present_fraction.is_some() {
        let mut presence = PresenceFilter::new();
        if let Some(count) = min_present_count {
            presence = presence.with_min_present_count(count);
        }
        if let Some(fraction) = min_present_fraction {
            presence = presence.with_min_present_fraction(fraction)?;
        }
        matrix = presence.filter(&matrix)?;
    }

    if level.low.is_some() || level.high.is_some() || level.remove_fraction.is_some() {
        matrix = level.filter(&matrix)?;
    }

    write_matrix(output, &matrix)
}

fn run_cor(matrix_path: &str, method: &str, output: &str) -> Result<()> {
    let matrix = read_dense(matrix_path)?;
    let result = match method {
        "pearson" => correlation_matrix(&matrix)?,
        "spearman" => spearman_matrix(&matrix)?,
        "euclidean" => distance_matrix(&matrix, DistanceMetric::Euclidean)?,
        "manhattan" => distance_matrix(&matrix, DistanceMetric::Manhattan)?,
        other => {
            return Err(ExprError::invalid_argument(format!(
                "Unknown method '{}'. Use pearson, spearman, euclidean or manhattan.",
                other
            )))
        }
    };
    write_matrix(output, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn out(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    fn run_args(args: &[&str]) -> Result<()> {
        let cli = Cli::try_parse_from(args).unwrap();
        run(&cli)
    }

    const SAMPLES: &str = "sample,group\nb1,ctl\na1,ctl\nb2,trt\na2,trt\n";

    #[test]
    fn test_fit_command() {
        let dir = TempDir::new().unwrap();
        let matrix = write(
            &dir,
            "expr.tsv",
            "id\ta1\tb1\ta2\tb2\ngene1\t1.0\t1.2\t5.0\t5.3\ngene2\t2.0\tNA\t2.1\t1.9\n",
        );
        let samples = write(&dir, "samples.csv", SAMPLES);
        let output = out(&dir, "fit.tsv");
        run_args(&["exprkit", "fit", "-i", &matrix, "-s", &samples, "--factor", "group", "-o", &output]).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("group_trt_vs_ctl_estimate"));
        assert!(lines[1].starts_with("gene1\t"));
    }

    #[test]
    fn test_fit_matches_weights_by_name() {
        let dir = TempDir::new().unwrap();
        let matrix = write(
            &dir,
            "expr.tsv",
            "id\ta1\tb1\ta2\tb2\ngene1\t1.0\t1.2\t5.0\t5.3\ngene2\t2.0\t2.4\t2.1\t1.9\n",
        );
        let samples = write(&dir, "samples.csv", SAMPLES);
        let ordered = write(
            &dir,
            "w1.tsv",
            "id\ta1\tb1\ta2\tb2\ngene1\t1\t4\t2\t0.5\ngene2\t3\t1\t1\t2\n",
        );
        let permuted = write(
            &dir,
            "w2.tsv",
            "id\tb2\ta2\tb1\ta1\ngene2\t2\t1\t1\t3\ngene1\t0.5\t2\t4\t1\n",
        );
        let out1 = out(&dir, "fit1.tsv");
        let out2 = out(&dir, "fit2.tsv");
        for (weights, output) in [(&ordered, &out1), (&permuted, &out2)] {
            run_args(&[
                "exprkit", "fit", "-i", &matrix, "-s", &samples, "--factor", "group", "-w", weights, "-o", output,
            ])
            .unwrap();
        }
        assert_eq!(fs::read_to_string(&out1).unwrap(), fs::read_to_string(&out2).unwrap());

        let unknown = write(
            &dir,
            "w3.tsv",
            "id\ta1\tb1\ta2\tzz\ngene1\t1\t1\t1\t1\ngene2\t1\t1\t1\t1\n",
        );
        let result = run_args(&[
            "exprkit", "fit", "-i", &matrix, "-s", &samples, "--factor", "group", "-w", &unknown, "-o", &out1,
        ]);
        assert!(matches!(result, Err(ExprError::NotFound { .. })));
    }

    #[test]
    fn test_fit_rejects_unknown_format() {
        let dir = TempDir::new().unwrap();
        let matrix = write(&dir, "expr.tsv", "id\ta1\tb1\ta2\tb2\ng\t1\t2\t3\t4\n");
        let samples = write(&dir, "samples.csv", SAMPLES);
        let result = run_args(&[
            "exprkit", "fit", "-i", &matrix, "-s", &samples, "--factor", "group", "--format", "xml",
        ]);
        assert!(matches!(result, Err(ExprError::InvalidArgument { .. })));
    }

    #[test]
    fn test_filter_command() {
        let dir = TempDir::new().unwrap();
        let matrix = write(
            &dir,
            "m.tsv",
            "id\ts1\ts2\ts3\nr1\t1\t2\t3\nr2\tNA\tNA\t9\nr3\t10\t20\t30\n",
        );
        let output = out(&dir, "filtered.tsv");
        run_args(&[
            "exprkit", "filter", "-i", &matrix, "-o", &output, "--min-present-count", "2", "--low", "5",
        ])
        .unwrap();
        let back = read_dense(&output).unwrap();
        assert_eq!(back.row_names(), &["r3".to_string()]);
    }

    #[test]
    fn test_cor_command() {
        let dir = TempDir::new().unwrap();
        let matrix = write(&dir, "m.tsv", "id\ts1\ts2\ts3\nr1\t1\t2\t3\nr2\t3\t2\t1\n");
        let output = out(&dir, "cor.tsv");
        run_args(&["exprkit", "cor", "-i", &matrix, "-o", &output]).unwrap();
        let back = read_dense(&output).unwrap();
        assert!((back.get(0, 1) + 1.0).abs() < 1e-9);
        assert!(run_args(&["exprkit", "cor", "-i", &matrix, "-m", "kendall", "-o", &output]).is_err());
    }

    #[test]
    fn test_voom_command() {
        let dir = TempDir::new().unwrap();
        let counts = write(
            &dir,
            "counts.tsv",
            "gene\ta1\tb1\ta2\tb2\n\
             g1\t10\t12\t30\t33\n\
             g2\t100\t90\t240\t260\n\
             g3\t1\t0\t3\t2\n\
             g4\t500\t520\t480\t510\n\
             g5\t50\t70\t40\t65\n\
             g6\t5\t9\t4\t8\n",
        );
        let samples = write(&dir, "samples.csv", SAMPLES);
        let output = out(&dir, "weights.tsv");
        let log_cpm = out(&dir, "logcpm.tsv");
        run_args(&[
            "exprkit", "voom", "-c", &counts, "-s", &samples, "--factor", "group", "-o", &output, "--log-cpm", &log_cpm,
        ])
        .unwrap();
        let weights = read_dense(&output).unwrap();
        assert_eq!((weights.rows(), weights.columns()), (6, 4));
        assert_eq!(weights.column_names()[0], "a1");
        assert!(read_dense(&log_cpm).is_ok());
    }
}
