//! Sequential (type I) ANOVA from a QR effects vector

use serde::Serialize;

use super::qr::PivotedQr;
use crate::stats::f_test_pvalue;

/// One row of an ANOVA table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTerm {
    pub term: String,
    pub df: usize,
    pub sum_sq: f64,
    pub mean_sq: f64,
    pub f_statistic: f64,
    pub p_value: f64,
}

/// Sums of squares and degrees of freedom per term
///
/// Effect `k` belongs to the term of the column at pivot position `k`;
/// aliased columns contribute nothing. Because pivoting preserves column
/// order, each term's sum of squares is the drop in residual sum of squares
/// from adding it after all earlier terms.
pub(crate) fn term_sums(effects: &[f64], qr: &PivotedQr, assign: &[usize], n_terms: usize) -> (Vec<f64>, Vec<usize>) {
    let mut ss = vec![0.0; n_terms];
    let mut df = vec![0usize; n_terms];
    for (pos, &col) in qr.pivot()[..qr.rank()].iter().enumerate() {
        let t = assign[col];
        ss[t] += effects[pos] * effects[pos];
        df[t] += 1;
    }
    (ss, df)
}

/// Build the ANOVA table, skipping the intercept and fully aliased terms
///
/// F statistics and p-values are NaN when there are no residual degrees of
/// freedom.
pub fn sequential_anova(
    effects: &[f64],
    qr: &PivotedQr,
    assign: &[usize],
    terms: &[String],
    intercept: Option<usize>,
    rss: f64,
    residual_df: usize,
) -> Vec<AnovaTerm> {
    let (ss, df) = term_sums(effects, qr, assign, terms.len());
    let residual_ms = if residual_df > 0 {
        rss / residual_df as f64
    } else {
        f64::NAN
    };

    (0..terms.len())
        .filter(|&t| Some(t) != intercept && df[t] > 0)
        .map(|t| {
            let mean_sq = ss[t] / df[t] as f64;
            let f_statistic = mean_sq / residual_ms;
            AnovaTerm {
                term: terms[t].clone(),
                df: df[t],
                sum_sq: ss[t],
                mean_sq,
                f_statistic,
                p_value: f_test_pvalue(f_statistic, df[t] as f64, residual_df as f64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lm::qr::DEFAULT_TOLERANCE;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn terms(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_way_anova() {
        // Groups {1,2,3}, {4,5,6}: grand mean 3.5, SS_between 13.5, SS_within 4
        let x = array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let qr = PivotedQr::decompose(x.view(), DEFAULT_TOLERANCE);
        let effects = qr.qty(&y);
        let rss: f64 = effects[2..].iter().map(|e| e * e).sum();
        assert_abs_diff_eq!(rss, 4.0, epsilon = 1e-10);

        let table = sequential_anova(&effects, &qr, &[0, 1], &terms(&["(Intercept)", "group"]), Some(0), rss, 4);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].term, "group");
        assert_eq!(table[0].df, 1);
        assert_abs_diff_eq!(table[0].sum_sq, 13.5, epsilon = 1e-10);
        assert_abs_diff_eq!(table[0].f_statistic, 13.5, epsilon = 1e-10);
        assert!(table[0].p_value > 0.02 && table[0].p_value < 0.03);
    }

    #[test]
    fn test_aliased_term_dropped() {
        let x = array![[1.0, 1.0, 2.0], [1.0, 2.0, 4.0], [1.0, 3.0, 6.0], [1.0, 4.0, 8.0]];
        let y = [1.0, 3.0, 2.0, 5.0];
        let qr = PivotedQr::decompose(x.view(), DEFAULT_TOLERANCE);
        let effects = qr.qty(&y);
        let rss: f64 = effects[2..].iter().map(|e| e * e).sum();
        let table = sequential_anova(&effects, &qr, &[0, 1, 2], &terms(&["(Intercept)", "a", "b"]), Some(0), rss, 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].term, "a");
    }

    #[test]
    fn test_no_residual_df() {
        let x = array![[1.0, 0.0], [1.0, 1.0]];
        let qr = PivotedQr::decompose(x.view(), DEFAULT_TOLERANCE);
        let effects = qr.qty(&[1.0, 3.0]);
        let table = sequential_anova(&effects, &qr, &[0, 1], &terms(&["(Intercept)", "g"]), Some(0), 0.0, 0);
        assert!(table[0].f_statistic.is_nan());
        assert!(table[0].p_value.is_nan());
    }
}
