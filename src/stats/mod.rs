//! Statistics for expression data
//!
//! All functions treat `NaN` as a missing value and skip it.

pub mod descriptive;
mod distance;
mod fdr;
mod matrix_stats;
mod pvalue;
mod rank;
mod roc;

pub use descriptive::{
    correlation, count_present, covariance, durbin_watson, geometric_mean, mean, median, quantile,
    sample_variance, standard_deviation, sum, sum_of_squares, variance, NO_OVERLAP_CORRELATION,
};
pub use distance::{euclidean_distance, manhattan_distance, DistanceMetric};
pub use fdr::{benjamini_hochberg, bonferroni};
pub use matrix_stats::{
    correlation_matrix, distance_matrix, log2_transform, row_apply, row_means, row_medians,
    row_sample_variances, spearman_matrix, standardize_rows,
};
pub use pvalue::{f_test_pvalue, t_test_pvalue};
pub use rank::{rank_transform, spearman_rank_correlation};
pub use roc::{aroc, roc_pvalue};
