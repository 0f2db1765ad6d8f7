//! Mean-variance modelling of count data for precision weights
//!
//! Counts are moved to the log2 counts-per-million scale, a linear model is
//! fitted to every gene, and a lowess trend of sqrt(residual sd) against mean
//! log count is turned into one inverse-variance weight per observation.

use ndarray::Array2;

use super::interpolate::LinearInterpolator;
use super::lowess::{lowess, LowessFit, LowessParams};
use crate::data::{DenseMatrix, NamedMatrix};
use crate::error::{ExprError, Result};
use crate::lm::{fit_linear_model, DesignMatrix, FitParams};
use crate::stats::mean;

/// Offset added to every count before the log
pub const PRIOR_COUNT: f64 = 0.5;

const LOG2_MILLION: f64 = 19.931568569324174;

/// Configurable parameters for mean-variance estimation
#[derive(Debug, Clone)]
pub struct VoomParams {
    /// Lowess span for the mean-variance trend
    pub span: f64,
    /// Lowess robustness iterations
    pub iterations: usize,
    pub fit: FitParams,
}

impl Default for VoomParams {
    fn default() -> Self {
        Self {
            span: 0.5,
            iterations: 3,
            fit: FitParams::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeanVarianceResult {
    /// log2 counts per million, genes x samples
    pub log2cpm: DenseMatrix,
    /// Precision weights, same shape as `log2cpm`
    pub weights: DenseMatrix,
    pub library_sizes: Vec<f64>,
    /// Per-gene average log2 count
    pub mean_log_count: Vec<f64>,
    /// Per-gene square root of the residual standard deviation
    pub sqrt_sd: Vec<f64>,
    /// Smoothed trend of `sqrt_sd` on `mean_log_count`
    pub trend: LowessFit,
}

/// `log2((count + 0.5) / (library size + 1) * 1e6)`; missing counts stay
/// missing
pub fn log2_cpm(counts: &DenseMatrix, library_sizes: &[f64]) -> Result<DenseMatrix> {
    if library_sizes.len() != counts.columns() {
        return Err(ExprError::dimension_mismatch(
            format!("{} library sizes", counts.columns()),
            format!("{} library sizes", library_sizes.len()),
        ));
    }
    let mut out = counts.clone();
    for ((_, j), v) in out.values_mut().indexed_iter_mut() {
        *v = ((*v + PRIOR_COUNT) / (library_sizes[j] + 1.0)).log2() + LOG2_MILLION;
    }
    Ok(out)
}

/// Column sums, skipping missing counts
pub fn library_sizes(counts: &DenseMatrix) -> Vec<f64> {
    (0..counts.columns())
        .map(|j| counts.column_view(j).iter().filter(|v| !v.is_nan()).sum())
        .collect()
}

/// Estimate the mean-variance trend of `counts` (genes x samples) under
/// `design` and derive observation weights
pub fn estimate_mean_variance(
    counts: &DenseMatrix,
    design: &DesignMatrix,
    library_sizes: Option<&[f64]>,
    params: &VoomParams,
) -> Result<MeanVarianceResult> {
    if counts.rows() < 2 {
        return Err(ExprError::EmptyData {
            reason: format!("need at least 2 genes to estimate a trend, got {}", counts.rows()),
        });
    }
    if counts.values().iter().any(|&c| c < 0.0 || c.is_infinite()) {
        return Err(ExprError::invalid_argument(
            "counts must be non-negative and finite",
        ));
    }
    let lib: Vec<f64> = match library_sizes {
        Some(l) => l.to_vec(),
        None => self::library_sizes(counts),
    };
    if lib.iter().any(|&l| !l.is_finite() || l < 0.0) {
        return Err(ExprError::invalid_argument(
            "library sizes must be non-negative and finite",
        ));
    }

    let log2cpm = log2_cpm(counts, &lib)?;
    let fit = fit_linear_model(&log2cpm, design, None, &params.fit)?;

    let lib_log: Vec<f64> = lib.iter().map(|&l| (l + 1.0).log2()).collect();
    let mean_lib_log = lib_log.iter().sum::<f64>() / lib_log.len() as f64;

    let mut mean_log_count = Vec::with_capacity(counts.rows());
    let mut sqrt_sd = Vec::with_capacity(counts.rows());
    let (mut trend_x, mut trend_y) = (Vec::new(), Vec::new());
    for (i, r) in fit.results().iter().enumerate() {
        let sx = mean(&log2cpm.row(i)) + mean_lib_log - LOG2_MILLION;
        let sy = r.sigma.sqrt();
        mean_log_count.push(sx);
        sqrt_sd.push(sy);
        let all_zero = counts.row_view(i).iter().all(|&c| c == 0.0 || c.is_nan());
        if !all_zero {
            trend_x.push(sx);
            trend_y.push(sy);
        }
    }
    log::debug!(
        "Mean-variance trend from {} of {} genes",
        trend_x.iter().zip(&trend_y).filter(|(x, y)| x.is_finite() && y.is_finite()).count(),
        counts.rows()
    );

    let trend = lowess(
        &trend_x,
        &trend_y,
        &LowessParams {
            span: params.span,
            iterations: params.iterations,
            delta: None,
        },
    )?;
    let curve = LinearInterpolator::new(&trend.x, &trend.y)?;

    let fitted = fit.fitted();
    let mut weights = Array2::from_elem((counts.rows(), counts.columns()), f64::NAN);
    for ((i, j), w) in weights.indexed_iter_mut() {
        let fitted_count = fitted.get(i, j) + lib_log[j] - LOG2_MILLION;
        *w = curve.evaluate(fitted_count).powi(-4);
    }
    let mut weights = DenseMatrix::new(weights);
    if counts.has_row_names() {
        weights.set_row_names(counts.row_names().to_vec())?;
    }
    if counts.has_column_names() {
        weights.set_column_names(counts.column_names().to_vec())?;
    }

    log::info!(
        "Estimated precision weights for {} genes x {} samples",
        counts.rows(),
        counts.columns()
    );

    Ok(MeanVarianceResult {
        log2cpm,
        weights,
        library_sizes: lib,
        mean_log_count,
        sqrt_sd,
        trend,
    })
}
