//! Descriptive statistics that ignore missing values
//!
//! Every reducer skips `NaN` entries (elementwise for one vector, pairwise
//! for two) and computes over the surviving count rather than the nominal
//! length. Reductions over nothing give `NaN`, except sums which give 0.

use crate::error::{ExprError, Result};

/// Returned by [`correlation`] when the two vectors share no non-missing pair
pub const NO_OVERLAP_CORRELATION: f64 = -2.0;

fn present(x: &[f64]) -> impl Iterator<Item = f64> + '_ {
    x.iter().copied().filter(|v| !v.is_nan())
}

fn present_pairs<'a>(x: &'a [f64], y: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    x.iter()
        .copied()
        .zip(y.iter().copied())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
}

fn check_same_length(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(ExprError::dimension_mismatch(
            format!("{} values", x.len()),
            format!("{} values", y.len()),
        ));
    }
    Ok(())
}

/// Non-missing values in ascending order
pub(crate) fn sorted_present(x: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = present(x).collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Number of non-missing values
pub fn count_present(x: &[f64]) -> usize {
    present(x).count()
}

pub fn sum(x: &[f64]) -> f64 {
    present(x).sum()
}

pub fn sum_of_squares(x: &[f64]) -> f64 {
    present(x).map(|v| v * v).sum()
}

pub fn mean(x: &[f64]) -> f64 {
    let (total, n) = present(x).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        total / n as f64
    }
}

fn sum_squared_deviations(x: &[f64]) -> (f64, usize) {
    let m = mean(x);
    present(x).fold((0.0, 0usize), |(s, n), v| (s + (v - m) * (v - m), n + 1))
}

/// Population variance: squared deviations divided by `n`
pub fn variance(x: &[f64]) -> f64 {
    let (ss, n) = sum_squared_deviations(x);
    if n == 0 {
        f64::NAN
    } else {
        ss / n as f64
    }
}

/// Sample variance: squared deviations divided by `n - 1`
pub fn sample_variance(x: &[f64]) -> f64 {
    let (ss, n) = sum_squared_deviations(x);
    if n < 2 {
        f64::NAN
    } else {
        ss / (n - 1) as f64
    }
}

/// Sample standard deviation
pub fn standard_deviation(x: &[f64]) -> f64 {
    sample_variance(x).sqrt()
}

pub fn min(x: &[f64]) -> f64 {
    present(x).fold(f64::NAN, f64::min)
}

pub fn max(x: &[f64]) -> f64 {
    present(x).fold(f64::NAN, f64::max)
}

fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * p;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Quantile with linear interpolation between order statistics
///
/// `p` must lie in `[0, 1]`.
pub fn quantile(x: &[f64], p: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ExprError::invalid_argument(format!(
            "quantile fraction {} outside [0, 1]",
            p
        )));
    }
    Ok(quantile_sorted(&sorted_present(x), p))
}

pub fn median(x: &[f64]) -> f64 {
    quantile_sorted(&sorted_present(x), 0.5)
}

/// Median absolute deviation from the median (unscaled)
pub fn mad(x: &[f64]) -> f64 {
    let m = median(x);
    let deviations: Vec<f64> = present(x).map(|v| (v - m).abs()).collect();
    median(&deviations)
}

/// Mean after dropping `fraction` of the values from each end
pub fn trimmed_mean(x: &[f64], fraction: f64) -> Result<f64> {
    if !(0.0..0.5).contains(&fraction) {
        return Err(ExprError::invalid_argument(format!(
            "trim fraction {} outside [0, 0.5)",
            fraction
        )));
    }
    let sorted = sorted_present(x);
    let cut = (sorted.len() as f64 * fraction).floor() as usize;
    Ok(mean(&sorted[cut..sorted.len() - cut]))
}

/// Geometric mean; `NaN` if any surviving value is not positive
pub fn geometric_mean(x: &[f64]) -> f64 {
    let (log_sum, n, valid) = present(x).fold((0.0, 0usize, true), |(s, n, ok), v| {
        (s + v.ln(), n + 1, ok && v > 0.0)
    });
    if n == 0 || !valid {
        f64::NAN
    } else {
        (log_sum / n as f64).exp()
    }
}

/// Sample covariance over pairs where both values are present
pub fn covariance(x: &[f64], y: &[f64]) -> Result<f64> {
    check_same_length(x, y)?;
    let pairs: Vec<(f64, f64)> = present_pairs(x, y).collect();
    let n = pairs.len();
    if n < 2 {
        return Ok(f64::NAN);
    }
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let s: f64 = pairs.iter().map(|(a, b)| (a - mx) * (b - my)).sum();
    Ok(s / (n - 1) as f64)
}

/// Pearson correlation over pairs where both values are present
///
/// Returns [`NO_OVERLAP_CORRELATION`] when no such pair exists, and `NaN`
/// when the overlap is non-empty but one side has zero variance.
pub fn correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    check_same_length(x, y)?;
    let mut n = 0usize;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (a, b) in present_pairs(x, y) {
        n += 1;
        sx += a;
        sy += b;
        sxx += a * a;
        syy += b * b;
        sxy += a * b;
    }
    if n == 0 {
        return Ok(NO_OVERLAP_CORRELATION);
    }
    let nf = n as f64;
    let num = sxy - sx * sy / nf;
    let den = ((sxx - sx * sx / nf) * (syy - sy * sy / nf)).sqrt();
    if den <= 0.0 || !den.is_finite() {
        return Ok(f64::NAN);
    }
    Ok((num / den).clamp(-1.0, 1.0))
}

/// Durbin-Watson statistic of a residual series, missing values dropped
///
/// `sum((e[t] - e[t-1])^2) / sum(e[t]^2)`; fails with fewer than two values.
pub fn durbin_watson(x: &[f64]) -> Result<f64> {
    let e: Vec<f64> = present(x).collect();
    if e.len() < 2 {
        return Err(ExprError::invalid_argument(format!(
            "Durbin-Watson needs at least 2 non-missing values, got {}",
            e.len()
        )));
    }
    let num: f64 = e.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    let den: f64 = e.iter().map(|v| v * v).sum();
    Ok(num / den)
}

/// Z-score transform; missing positions stay missing
pub fn standardize(x: &[f64]) -> Vec<f64> {
    let m = mean(x);
    let sd = standard_deviation(x);
    x.iter()
        .map(|&v| if v.is_nan() { f64::NAN } else { (v - m) / sd })
        .collect()
}
