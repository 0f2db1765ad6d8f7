//! Rank transform and Spearman rank correlation

use std::cmp::Ordering;

use crate::error::{ExprError, Result};

/// 0-based position of each element in ascending order
///
/// Ties keep their original relative order instead of sharing an averaged
/// (fractional) rank, so the result is always a permutation of `0..n`.
/// Missing values sort after every present value.
pub fn rank_transform(x: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| match (x[a].is_nan(), x[b].is_nan()) {
        (false, false) => x[a].total_cmp(&x[b]),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });

    let mut ranks = vec![0; x.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = rank;
    }
    ranks
}

fn is_constant(x: &[f64]) -> bool {
    x.windows(2).all(|w| w[0] == w[1])
}

/// Spearman rank correlation over pairs where both values are present
///
/// Uses `1 - 6 * sum(d^2) / (n * (n^2 - 1))` on the stable ranks from
/// [`rank_transform`]. The result is `NaN` with fewer than two complete
/// pairs, or when either side is constant over those pairs.
pub fn spearman_rank_correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(ExprError::dimension_mismatch(
            format!("{} values", x.len()),
            format!("{} values", y.len()),
        ));
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .unzip();

    let n = xs.len();
    if n < 2 || is_constant(&xs) || is_constant(&ys) {
        return Ok(f64::NAN);
    }

    let rx = rank_transform(&xs);
    let ry = rank_transform(&ys);
    let d2: f64 = rx
        .iter()
        .zip(&ry)
        .map(|(&a, &b)| {
            let d = a as f64 - b as f64;
            d * d
        })
        .sum();
    let nf = n as f64;
    Ok(1.0 - 6.0 * d2 / (nf * (nf * nf - 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rank_transform_is_permutation() {
        let x = [3.2, -1.0, 7.5, 0.0, 3.2, 10.0, -4.4];
        let mut ranks = rank_transform(&x);
        assert_eq!(ranks[6], 0);
        assert_eq!(ranks[5], 6);
        ranks.sort();
        assert_eq!(ranks, (0..x.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_ties_keep_original_order() {
        let ranks = rank_transform(&[2.0, 1.0, 2.0, 2.0]);
        assert_eq!(ranks, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_missing_ranked_last() {
        let ranks = rank_transform(&[f64::NAN, 5.0, 1.0]);
        assert_eq!(ranks, vec![2, 1, 0]);
    }

    #[test]
    fn test_spearman() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [10.0, 20.0, 30.0, 40.0, 1000.0];
        assert_abs_diff_eq!(spearman_rank_correlation(&x, &y).unwrap(), 1.0);

        let rev = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert_abs_diff_eq!(spearman_rank_correlation(&x, &rev).unwrap(), -1.0);

        let y2 = [1.0, 3.0, 2.0, 5.0, 4.0];
        // d^2 = 0 + 1 + 1 + 1 + 1 = 4 -> 1 - 24/120
        assert_abs_diff_eq!(spearman_rank_correlation(&x, &y2).unwrap(), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_spearman_degenerate() {
        let x = [1.0, f64::NAN, 3.0];
        let y = [f64::NAN, 2.0, 5.0];
        assert!(spearman_rank_correlation(&x, &y).unwrap().is_nan());
        assert!(spearman_rank_correlation(&x, &[1.0]).is_err());
    }

    #[test]
    fn test_spearman_constant_input() {
        let flat = [1.0, 1.0, 1.0, 1.0];
        assert!(spearman_rank_correlation(&flat, &[1.0, 2.0, 3.0, 4.0]).unwrap().is_nan());
        assert!(spearman_rank_correlation(&[4.0, 3.0, 2.0, 1.0], &flat).unwrap().is_nan());
        // Constant only once the missing pair is dropped
        let y = [2.0, 2.0, f64::NAN, 2.0];
        assert!(spearman_rank_correlation(&[1.0, 2.0, 3.0, 4.0], &y).unwrap().is_nan());
    }
}
