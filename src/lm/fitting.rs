//! Weighted least-squares fitting of every row of a response matrix

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

use super::anova::{sequential_anova, term_sums, AnovaTerm};
use super::design::DesignMatrix;
use super::qr::{PivotedQr, DEFAULT_TOLERANCE};
use crate::data::{DenseMatrix, NamedMatrix};
use crate::error::{ExprError, Result};
use crate::stats::{benjamini_hochberg, f_test_pvalue, t_test_pvalue};

/// Configurable parameters for linear model fitting
#[derive(Debug, Clone)]
pub struct FitParams {
    /// Relative tolerance below which a design column counts as aliased
    pub tolerance: f64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Fit of one response row
///
/// `fitted` and `residuals` span every observation and are NaN where the
/// observation was not used (missing response or unusable weight).
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub n_used: usize,
    pub rank: usize,
    pub residual_df: usize,
    pub numerator_df: usize,
    /// Residual sum of squares, weighted when weights were given
    pub rss: f64,
    pub sigma: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub anova: Vec<AnovaTerm>,
}

impl FitResult {
    /// Two-sided t-test p-value of each coefficient
    pub fn coefficient_pvalues(&self) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.std_errors)
            .map(|(&b, &se)| t_test_pvalue(b / se, self.residual_df as f64))
            .collect()
    }
}

/// Fit `y ~ X` on the observations in `used`
///
/// `qr` decomposes the used design rows scaled by `scale` (square roots of
/// the weights) when present.
fn fit_row(
    y: &[f64],
    used: &[usize],
    scale: Option<&[f64]>,
    qr: &PivotedQr,
    design: &DesignMatrix,
) -> FitResult {
    let n_obs = y.len();
    let n_coef = design.n_columns();
    let x = design.matrix();

    let y_used: Vec<f64> = match scale {
        Some(s) => used.iter().zip(s).map(|(&i, &k)| y[i] * k).collect(),
        None => used.iter().map(|&i| y[i]).collect(),
    };
    let effects = qr.qty(&y_used);
    let coefficients = qr.coefficients(&effects);

    let mut fitted = vec![f64::NAN; n_obs];
    let mut residuals = vec![f64::NAN; n_obs];
    for &i in used {
        let f: f64 = (0..n_coef)
            .filter(|&j| !coefficients[j].is_nan())
            .map(|j| x[[i, j]] * coefficients[j])
            .sum();
        fitted[i] = f;
        residuals[i] = y[i] - f;
    }

    let rank = qr.rank();
    let n_used = used.len();
    let residual_df = n_used.saturating_sub(rank);
    let rss: f64 = effects[rank.min(effects.len())..].iter().map(|e| e * e).sum();
    let sigma = if residual_df > 0 {
        (rss / residual_df as f64).sqrt()
    } else {
        f64::NAN
    };
    let std_errors = qr
        .unscaled_variances()
        .into_iter()
        .map(|v| sigma * v.sqrt())
        .collect();

    let assign = design.assign();
    let intercept = design.intercept_term();
    let (ss, df) = term_sums(&effects, qr, &assign, design.terms().len());
    let (model_ss, numerator_df) = (0..ss.len())
        .filter(|&t| Some(t) != intercept)
        .fold((0.0, 0), |(s, d), t| (s + ss[t], d + df[t]));
    let f_statistic = if numerator_df > 0 && residual_df > 0 {
        (model_ss / numerator_df as f64) / (rss / residual_df as f64)
    } else {
        f64::NAN
    };
    let p_value = f_test_pvalue(f_statistic, numerator_df as f64, residual_df as f64);
    let anova = sequential_anova(&effects, qr, &assign, design.terms(), intercept, rss, residual_df);

    FitResult {
        coefficients,
        std_errors,
        fitted,
        residuals,
        n_used,
        rank,
        residual_df,
        numerator_df,
        rss,
        sigma,
        f_statistic,
        p_value,
        anova,
    }
}

/// Observations with a present response and, when weighted, a finite
/// positive weight
fn usable_observations(y: &[f64], w: Option<&[f64]>) -> Vec<usize> {
    (0..y.len())
        .filter(|&i| !y[i].is_nan())
        .filter(|&i| w.map_or(true, |w| w[i].is_finite() && w[i] > 0.0))
        .collect()
}

/// Fit the design to every row of `response`
///
/// Rows are features and columns observations; the design has one row per
/// observation. Missing responses drop that observation from that row's fit
/// only. Without weights, rows sharing a missingness pattern share one QR
/// decomposition. Rows too sparse to estimate anything come back with NaN
/// statistics instead of failing the batch.
pub fn fit_linear_model(
    response: &DenseMatrix,
    design: &DesignMatrix,
    weights: Option<&DenseMatrix>,
    params: &FitParams,
) -> Result<LinearModelFit> {
    if design.n_observations() != response.columns() {
        return Err(ExprError::dimension_mismatch(
            format!("{} design rows (one per response column)", response.columns()),
            format!("{} design rows", design.n_observations()),
        ));
    }
    if let Some(w) = weights {
        if w.rows() != response.rows() || w.columns() != response.columns() {
            return Err(ExprError::dimension_mismatch(
                format!("{}x{} weights", response.rows(), response.columns()),
                format!("{}x{} weights", w.rows(), w.columns()),
            ));
        }
    }

    let n_rows = response.rows();
    log::info!(
        "Fitting linear model: {} rows, {} observations, {} coefficients{}",
        n_rows,
        response.columns(),
        design.n_columns(),
        if weights.is_some() { " (weighted)" } else { "" }
    );

    let used: Vec<Vec<usize>> = (0..n_rows)
        .into_par_iter()
        .map(|i| {
            let w = weights.map(|w| w.row(i));
            usable_observations(&response.row(i), w.as_deref())
        })
        .collect();

    let results: Vec<FitResult> = match weights {
        None => {
            let mut patterns: HashMap<&[usize], Option<PivotedQr>> = HashMap::new();
            for u in &used {
                patterns.entry(u.as_slice()).or_insert(None);
            }
            log::debug!("{} distinct missingness patterns", patterns.len());
            patterns.par_iter_mut().for_each(|(rows, qr)| {
                *qr = Some(PivotedQr::decompose(
                    design.select_rows(rows, None).view(),
                    params.tolerance,
                ));
            });

            (0..n_rows)
                .into_par_iter()
                .map(|i| {
                    let qr = patterns
                        .get(used[i].as_slice())
                        .and_then(|qr| qr.as_ref())
                        .ok_or_else(|| {
                            ExprError::invalid_argument(format!("no decomposition for row {}", i))
                        })?;
                    Ok(fit_row(&response.row(i), &used[i], None, qr, design))
                })
                .collect::<Result<Vec<_>>>()?
        }
        Some(w) => (0..n_rows)
            .into_par_iter()
            .map(|i| {
                let row_w = w.row(i);
                let scale: Vec<f64> = used[i].iter().map(|&j| row_w[j].sqrt()).collect();
                let qr = PivotedQr::decompose(
                    design.select_rows(&used[i], Some(&scale)).view(),
                    params.tolerance,
                );
                fit_row(&response.row(i), &used[i], Some(&scale), &qr, design)
            })
            .collect(),
    };

    let degenerate = results.iter().filter(|r| r.residual_df == 0).count();
    if degenerate > 0 {
        log::debug!("{} rows have no residual degrees of freedom", degenerate);
    }

    LinearModelFit::assemble(response, design, results)
}

/// Per-coefficient line of a [`FitSummary`]
#[derive(Debug, Clone, Serialize)]
pub struct CoefficientSummary {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub p_value: f64,
}

/// Flat per-row summary for reporting
#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub row: String,
    pub coefficients: Vec<CoefficientSummary>,
    pub residual_df: usize,
    pub sigma: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub terms: Vec<AnovaTerm>,
}

/// Result of fitting a design to a whole response matrix
#[derive(Debug, Clone)]
pub struct LinearModelFit {
    coefficients: DenseMatrix,
    fitted: DenseMatrix,
    residuals: DenseMatrix,
    rows: Vec<FitResult>,
}

impl LinearModelFit {
    fn assemble(response: &DenseMatrix, design: &DesignMatrix, rows: Vec<FitResult>) -> Result<Self> {
        let (n_rows, n_obs) = (response.rows(), response.columns());
        let n_coef = design.n_columns();

        let mut coefficients = Array2::from_elem((n_coef, n_rows), f64::NAN);
        let mut fitted = Array2::from_elem((n_rows, n_obs), f64::NAN);
        let mut residuals = Array2::from_elem((n_rows, n_obs), f64::NAN);
        for (i, r) in rows.iter().enumerate() {
            for (j, &b) in r.coefficients.iter().enumerate() {
                coefficients[[j, i]] = b;
            }
            for k in 0..n_obs {
                fitted[[i, k]] = r.fitted[k];
                residuals[[i, k]] = r.residuals[k];
            }
        }

        let mut coefficients = DenseMatrix::new(coefficients);
        coefficients.set_row_names(design.column_names())?;
        let mut fitted = DenseMatrix::new(fitted);
        let mut residuals = DenseMatrix::new(residuals);
        if response.has_row_names() {
            let names = response.row_names().to_vec();
            coefficients.set_column_names(names.clone())?;
            fitted.set_row_names(names.clone())?;
            residuals.set_row_names(names)?;
        }
        if response.has_column_names() {
            let names = response.column_names().to_vec();
            fitted.set_column_names(names.clone())?;
            residuals.set_column_names(names)?;
        }

        Ok(Self {
            coefficients,
            fitted,
            residuals,
            rows,
        })
    }

    /// Coefficients: design columns x response rows
    pub fn coefficients(&self) -> &DenseMatrix {
        &self.coefficients
    }

    pub fn fitted(&self) -> &DenseMatrix {
        &self.fitted
    }

    pub fn residuals(&self) -> &DenseMatrix {
        &self.residuals
    }

    pub fn results(&self) -> &[FitResult] {
        &self.rows
    }

    pub fn result(&self, row: usize) -> Option<&FitResult> {
        self.rows.get(row)
    }

    pub fn result_by_name(&self, name: &str) -> Result<&FitResult> {
        let i = self.fitted.row_index(name)?;
        Ok(&self.rows[i])
    }

    /// Overall F-test p-value of each row
    pub fn p_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.p_value).collect()
    }

    /// Benjamini-Hochberg adjusted overall p-values
    pub fn adjusted_p_values(&self) -> Vec<f64> {
        benjamini_hochberg(&self.p_values())
    }

    pub fn summaries(&self) -> Vec<FitSummary> {
        let names = self.coefficients.row_names();
        let adjusted = self.adjusted_p_values();
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let pvalues = r.coefficient_pvalues();
                FitSummary {
                    row: self
                        .fitted
                        .row_name(i)
                        .map_or_else(|| (i + 1).to_string(), str::to_string),
                    coefficients: names
                        .iter()
                        .enumerate()
                        .map(|(j, name)| CoefficientSummary {
                            name: name.clone(),
                            estimate: r.coefficients[j],
                            std_error: r.std_errors[j],
                            p_value: pvalues[j],
                        })
                        .collect(),
                    residual_df: r.residual_df,
                    sigma: r.sigma,
                    f_statistic: r.f_statistic,
                    p_value: r.p_value,
                    adjusted_p_value: adjusted[i],
                    terms: r.anova.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn line_design(n: usize) -> DesignMatrix {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| (i + 1) as f64);
        DesignMatrix::with_intercept(x, vec!["x".to_string()]).unwrap()
    }

    fn line_response() -> DenseMatrix {
        DenseMatrix::from_rows(vec![vec![1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_ordinary_least_squares() {
        let fit = fit_linear_model(&line_response(), &line_design(10), None, &FitParams::default()).unwrap();
        let r = &fit.results()[0];
        assert_abs_diff_eq!(r.coefficients[0], 2.0 / 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(r.coefficients[1], 42.5 / 82.5, epsilon = 1e-10);
        assert_eq!(r.rank, 2);
        assert_eq!(r.residual_df, 8);
        assert_eq!(r.numerator_df, 1);
        assert!(r.p_value < 1e-5);

        // Residuals sum to zero with an intercept
        let total: f64 = r.residuals.iter().sum();
        assert_abs_diff_eq!(total, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.coefficients().get(1, 0), r.coefficients[1]);
    }

    #[test]
    fn test_unit_weights_equal_ols() {
        let response = line_response();
        let design = line_design(10);
        let ols = fit_linear_model(&response, &design, None, &FitParams::default()).unwrap();
        let ones = DenseMatrix::filled(1, 10, 1.0);
        let wls = fit_linear_model(&response, &design, Some(&ones), &FitParams::default()).unwrap();
        for j in 0..2 {
            assert_abs_diff_eq!(ols.results()[0].coefficients[j], wls.results()[0].coefficients[j], epsilon = 1e-10);
            assert_abs_diff_eq!(ols.results()[0].std_errors[j], wls.results()[0].std_errors[j], epsilon = 1e-10);
        }
        assert_abs_diff_eq!(ols.results()[0].f_statistic, wls.results()[0].f_statistic, epsilon = 1e-8);
    }

    #[test]
    fn test_weighted_group_means() {
        // Intercept-only model: the estimate is the weighted mean
        let design = DesignMatrix::with_intercept(Array2::zeros((3, 0)), vec![]).unwrap();
        let response = DenseMatrix::from_rows(vec![vec![1.0, 2.0, 6.0]]).unwrap();
        let weights = DenseMatrix::from_rows(vec![vec![1.0, 3.0, 0.0]]).unwrap();
        let fit = fit_linear_model(&response, &design, Some(&weights), &FitParams::default()).unwrap();
        let r = &fit.results()[0];
        assert_abs_diff_eq!(r.coefficients[0], 1.75, epsilon = 1e-12);
        // Zero weight excludes the observation
        assert_eq!(r.n_used, 2);
        assert!(r.residuals[2].is_nan());
        assert_abs_diff_eq!(r.rss, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_regression_with_slope() {
        let x = array![[1.0, 1.0], [1.0, 2.0], [1.0, 3.0], [1.0, 4.0], [1.0, 5.0]];
        let design = DesignMatrix::from_columns(x, vec!["(Intercept)".into(), "x".into()]).unwrap();
        let response = DenseMatrix::from_rows(vec![vec![1.0, 3.0, 2.0, 5.0, 4.0]]).unwrap();
        let weights = DenseMatrix::from_rows(vec![vec![1.0, 2.0, 1.0, 3.0, 1.0]]).unwrap();
        let fit = fit_linear_model(&response, &design, Some(&weights), &FitParams::default()).unwrap();
        let r = &fit.results()[0];
        // Weighted normal equations: 73/103 and 92/103
        assert_abs_diff_eq!(r.coefficients[0], 73.0 / 103.0, epsilon = 1e-10);
        assert_abs_diff_eq!(r.coefficients[1], 92.0 / 103.0, epsilon = 1e-10);
        assert_abs_diff_eq!(r.rss, 590.0 / 103.0, epsilon = 1e-10);
        assert_eq!(r.residual_df, 3);
        assert_eq!(r.n_used, 5);
    }

    #[test]
    fn test_duplicate_column_gives_nan() {
        let x = array![[1.0, 1.0, 1.0], [1.0, 2.0, 2.0], [1.0, 3.0, 3.0], [1.0, 4.0, 4.0]];
        let design = DesignMatrix::from_columns(x, vec!["i".into(), "a".into(), "b".into()]).unwrap();
        let response = DenseMatrix::from_rows(vec![vec![6.0, 5.0, 7.0, 10.0]]).unwrap();
        let fit = fit_linear_model(&response, &design, None, &FitParams::default()).unwrap();
        let r = &fit.results()[0];
        assert_eq!(r.rank, 2);
        assert_abs_diff_eq!(r.coefficients[1], 1.4, epsilon = 1e-10);
        assert!(r.coefficients[2].is_nan());
        assert!(r.std_errors[2].is_nan());
        assert!(fit.coefficients().is_missing(2, 0));
    }

    #[test]
    fn test_missing_values_refit_on_subset() {
        let response = DenseMatrix::from_rows(vec![
            vec![1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0, 6.0],
            vec![f64::NAN, 5.0, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, 1.0],
            vec![6.0, 5.0, 7.0, 10.0, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN],
        ])
        .unwrap();
        let fit = fit_linear_model(&response, &line_design(10), None, &FitParams::default()).unwrap();

        // Two points: exact fit, no residual df
        let sparse = &fit.results()[1];
        assert_eq!(sparse.n_used, 2);
        assert_eq!(sparse.residual_df, 0);
        assert!(sparse.f_statistic.is_nan());
        assert!(sparse.p_value.is_nan());
        assert!(fit.residuals().is_missing(1, 0));

        // Later rows are still fit; x = 1..4 subset gives y = 3.5 + 1.4x
        let subset = &fit.results()[2];
        assert_abs_diff_eq!(subset.coefficients[0], 3.5, epsilon = 1e-10);
        assert_abs_diff_eq!(subset.coefficients[1], 1.4, epsilon = 1e-10);
        assert_eq!(subset.residual_df, 2);
        assert!(!subset.p_value.is_nan());

        let adjusted = fit.adjusted_p_values();
        assert!(adjusted[1].is_nan());
        assert!(adjusted[0] <= adjusted[2]);
    }

    #[test]
    fn test_all_missing_row() {
        let response = DenseMatrix::from_rows(vec![vec![f64::NAN; 4], vec![1.0, 2.0, 4.0, 3.0]]).unwrap();
        let fit = fit_linear_model(&response, &line_design(4), None, &FitParams::default()).unwrap();
        assert_eq!(fit.results()[0].n_used, 0);
        assert!(fit.results()[0].coefficients.iter().all(|b| b.is_nan()));
        assert!(!fit.results()[1].coefficients[1].is_nan());
    }

    #[test]
    fn test_dimension_checks() {
        let response = line_response();
        assert!(matches!(
            fit_linear_model(&response, &line_design(9), None, &FitParams::default()),
            Err(ExprError::DimensionMismatch { .. })
        ));
        let weights = DenseMatrix::filled(2, 10, 1.0);
        assert!(matches!(
            fit_linear_model(&response, &line_design(10), Some(&weights), &FitParams::default()),
            Err(ExprError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_summaries_use_names() {
        let mut response = line_response();
        response.set_row_names(vec!["gene1".to_string()]).unwrap();
        let fit = fit_linear_model(&response, &line_design(10), None, &FitParams::default()).unwrap();
        let summaries = fit.summaries();
        assert_eq!(summaries[0].row, "gene1");
        assert_eq!(summaries[0].coefficients[1].name, "x");
        assert_eq!(summaries[0].terms.len(), 1);
        assert_abs_diff_eq!(summaries[0].terms[0].f_statistic, summaries[0].f_statistic, epsilon = 1e-8);
        assert_eq!(fit.result_by_name("gene1").unwrap().rank, 2);
        assert!(fit.result_by_name("gene2").is_err());
        assert_eq!(fit.coefficients().column_names(), &["gene1".to_string()]);
    }
}
