//! P-values from F and t statistics

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Upper-tail p-value of an F statistic
///
/// Degenerate inputs (non-finite statistic, zero degrees of freedom) give
/// `NaN` rather than an error so one bad row cannot stop a batch.
pub fn f_test_pvalue(f: f64, df1: f64, df2: f64) -> f64 {
    if !f.is_finite() || f < 0.0 || df1 <= 0.0 || df2 <= 0.0 {
        return f64::NAN;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value of a t statistic
pub fn t_test_pvalue(t: f64, df: f64) -> f64 {
    if !t.is_finite() || df <= 0.0 {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * dist.cdf(-t.abs()),
        Err(_) => f64::NAN,
    }
}
