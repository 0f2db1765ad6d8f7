//! Row-wise statistics over named matrices

use ndarray::Array2;
use rayon::prelude::*;

use super::descriptive;
use super::distance::DistanceMetric;
use super::rank::spearman_rank_correlation;
use crate::data::{DenseMatrix, NamedMatrix};
use crate::error::Result;

/// Apply a reducer to every row
pub fn row_apply<M, F>(matrix: &M, f: F) -> Vec<f64>
where
    M: NamedMatrix + Sync,
    F: Fn(&[f64]) -> f64 + Sync,
{
    (0..matrix.rows())
        .into_par_iter()
        .map(|i| f(&matrix.row(i)))
        .collect()
}

pub fn row_means<M: NamedMatrix + Sync>(matrix: &M) -> Vec<f64> {
    row_apply(matrix, descriptive::mean)
}

pub fn row_sample_variances<M: NamedMatrix + Sync>(matrix: &M) -> Vec<f64> {
    row_apply(matrix, descriptive::sample_variance)
}

pub fn row_medians<M: NamedMatrix + Sync>(matrix: &M) -> Vec<f64> {
    row_apply(matrix, descriptive::median)
}

fn square_with_row_names<M: NamedMatrix>(matrix: &M, values: Array2<f64>) -> Result<DenseMatrix> {
    let mut out = DenseMatrix::new(values);
    if matrix.has_row_names() {
        let names = matrix.row_names().to_vec();
        out.set_row_names(names.clone())?;
        out.set_column_names(names)?;
    }
    Ok(out)
}

/// Fill a square symmetric matrix with `f` over every pair of rows
fn pairwise<M, F>(matrix: &M, f: F) -> Result<DenseMatrix>
where
    M: NamedMatrix + Sync,
    F: Fn(&[f64], &[f64]) -> Result<f64> + Sync,
{
    let n = matrix.rows();
    let rows: Vec<Vec<f64>> = (0..n).map(|i| matrix.row(i)).collect();
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| (i..n).map(|j| f(&rows[i], &rows[j])).collect::<Result<Vec<f64>>>())
        .collect::<Result<Vec<_>>>()?;

    let mut values = Array2::zeros((n, n));
    for (i, row) in upper.iter().enumerate() {
        for (offset, &d) in row.iter().enumerate() {
            let j = i + offset;
            values[[i, j]] = d;
            values[[j, i]] = d;
        }
    }
    square_with_row_names(matrix, values)
}

/// Pairwise distances between rows
///
/// The result is square and symmetric, named by the input's row names on
/// both axes.
pub fn distance_matrix<M: NamedMatrix + Sync>(matrix: &M, metric: DistanceMetric) -> Result<DenseMatrix> {
    pairwise(matrix, |x, y| metric.distance(x, y))
}

/// Pearson correlation between every pair of rows, missing values handled
/// pairwise
///
/// Pairs of rows with no overlapping present values hold
/// [`NO_OVERLAP_CORRELATION`](super::NO_OVERLAP_CORRELATION); zero variance
/// gives `NaN`.
pub fn correlation_matrix<M: NamedMatrix + Sync>(matrix: &M) -> Result<DenseMatrix> {
    pairwise(matrix, descriptive::correlation)
}

/// Spearman correlation between every pair of rows
pub fn spearman_matrix<M: NamedMatrix + Sync>(matrix: &M) -> Result<DenseMatrix> {
    pairwise(matrix, spearman_rank_correlation)
}

/// Z-score every row of a dense matrix
pub fn standardize_rows(matrix: &DenseMatrix) -> DenseMatrix {
    let mut out = matrix.clone();
    for (i, mut row) in out.values_mut().rows_mut().into_iter().enumerate() {
        let z = descriptive::standardize(&matrix.row(i));
        for (cell, v) in row.iter_mut().zip(z) {
            *cell = v;
        }
    }
    out
}

/// `log2` of every cell; non-positive cells become missing
pub fn log2_transform(matrix: &DenseMatrix) -> DenseMatrix {
    matrix.map(|v| if v > 0.0 { v.log2() } else { f64::NAN })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SparseMatrix;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn named() -> DenseMatrix {
        DenseMatrix::with_names(
            array![[1.0, 2.0, 3.0, 4.0], [2.0, 4.0, 6.0, f64::NAN], [4.0, 3.0, 2.0, 1.0]],
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string(), "s4".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_row_means_skip_missing() {
        let means = row_means(&named());
        assert_abs_diff_eq!(means[0], 2.5);
        assert_abs_diff_eq!(means[1], 4.0);
    }

    #[test]
    fn test_correlation_matrix() {
        let m = named();
        let cor = correlation_matrix(&m).unwrap();
        assert_eq!(cor.rows(), 3);
        assert_abs_diff_eq!(cor.get(0, 0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cor.get(0, 1), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cor.get(0, 2), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cor.get(2, 0), -1.0, epsilon = 1e-12);
        assert_eq!(cor.column_index("c").unwrap(), 2);
    }

    #[test]
    fn test_correlation_matrix_without_overlap() {
        let m = DenseMatrix::from_rows(vec![
            vec![1.0, 2.0, f64::NAN, f64::NAN],
            vec![f64::NAN, f64::NAN, 3.0, 5.0],
            vec![7.0, 7.0, 7.0, 7.0],
        ])
        .unwrap();
        let cor = correlation_matrix(&m).unwrap();
        assert_eq!(cor.get(0, 1), crate::stats::NO_OVERLAP_CORRELATION);
        assert_eq!(cor.get(1, 0), crate::stats::NO_OVERLAP_CORRELATION);
        // Overlap exists but one row is constant
        assert!(cor.get(0, 2).is_nan());
        assert_abs_diff_eq!(cor.get(0, 0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_matrix_on_sparse() {
        let s = SparseMatrix::from_triplets(2, 2, &[(0, 0, 3.0), (1, 1, 4.0)]).unwrap();
        let d = distance_matrix(&s, DistanceMetric::Euclidean).unwrap();
        assert_abs_diff_eq!(d.get(0, 1), 5.0);
        assert_abs_diff_eq!(d.get(1, 1), 0.0);
        assert!(!d.has_row_names());
    }

    #[test]
    fn test_standardize_and_log() {
        let z = standardize_rows(&named());
        assert_abs_diff_eq!(row_means(&z)[0], 0.0, epsilon = 1e-12);
        assert!(z.is_missing(1, 3));

        let l = log2_transform(&DenseMatrix::from_rows(vec![vec![8.0, 0.0]]).unwrap());
        assert_eq!(l.get(0, 0), 3.0);
        assert!(l.is_missing(0, 1));
    }
}
