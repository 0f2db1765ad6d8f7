//! Distances between vectors that may contain missing values

use serde::{Deserialize, Serialize};

use super::descriptive::{correlation, NO_OVERLAP_CORRELATION};
use super::rank::spearman_rank_correlation;
use crate::error::{ExprError, Result};

/// Distance or similarity measure between two rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    Manhattan,
    Euclidean,
    /// `1 - pearson`
    Pearson,
    /// `1 - spearman`
    Spearman,
}

impl DistanceMetric {
    pub fn distance(self, x: &[f64], y: &[f64]) -> Result<f64> {
        match self {
            DistanceMetric::Manhattan => manhattan_distance(x, y),
            DistanceMetric::Euclidean => euclidean_distance(x, y),
            DistanceMetric::Pearson => {
                let r = correlation(x, y)?;
                Ok(if r == NO_OVERLAP_CORRELATION { f64::NAN } else { 1.0 - r })
            }
            DistanceMetric::Spearman => Ok(1.0 - spearman_rank_correlation(x, y)?),
        }
    }
}

fn complete_pairs<'a>(x: &'a [f64], y: &'a [f64]) -> Result<impl Iterator<Item = (f64, f64)> + 'a> {
    if x.len() != y.len() {
        return Err(ExprError::dimension_mismatch(
            format!("{} values", x.len()),
            format!("{} values", y.len()),
        ));
    }
    Ok(x.iter()
        .copied()
        .zip(y.iter().copied())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan()))
}

/// Sum of absolute differences over complete pairs; `NaN` if there are none
pub fn manhattan_distance(x: &[f64], y: &[f64]) -> Result<f64> {
    let (total, n) = complete_pairs(x, y)?.fold((0.0, 0usize), |(s, n), (a, b)| (s + (a - b).abs(), n + 1));
    Ok(if n == 0 { f64::NAN } else { total })
}

/// Euclidean distance over complete pairs; `NaN` if there are none
pub fn euclidean_distance(x: &[f64], y: &[f64]) -> Result<f64> {
    let (total, n) = complete_pairs(x, y)?.fold((0.0, 0usize), |(s, n), (a, b)| (s + (a - b).powi(2), n + 1));
    Ok(if n == 0 { f64::NAN } else { total.sqrt() })
}
