//! Multiple-testing correction
//!
//! Missing (`NaN`) p-values are excluded from the number of tests and come
//! back as `NaN`.

/// Benjamini-Hochberg false discovery rate adjustment
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..pvalues.len()).filter(|&i| !pvalues[i].is_nan()).collect();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

    let m = order.len() as f64;
    let mut adjusted = vec![f64::NAN; pvalues.len()];
    let mut running_min = 1.0f64;
    for (pos, &i) in order.iter().enumerate().rev() {
        let rank = (pos + 1) as f64;
        running_min = running_min.min(pvalues[i] * m / rank);
        adjusted[i] = running_min;
    }
    adjusted
}

/// Bonferroni family-wise error rate adjustment
pub fn bonferroni(pvalues: &[f64]) -> Vec<f64> {
    let m = pvalues.iter().filter(|p| !p.is_nan()).count() as f64;
    pvalues
        .iter()
        .map(|&p| if p.is_nan() { p } else { (p * m).min(1.0) })
        .collect()
}
