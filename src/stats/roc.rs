//! Area under the ROC curve for ranked lists

use std::collections::HashSet;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{ExprError, Result};

fn positive_set(total_size: usize, positive_ranks: &[usize]) -> Result<HashSet<usize>> {
    if let Some(&bad) = positive_ranks.iter().find(|&&r| r >= total_size) {
        return Err(ExprError::invalid_argument(format!(
            "rank {} outside list of {} items",
            bad, total_size
        )));
    }
    Ok(positive_ranks.iter().copied().collect())
}

/// Area under the ROC curve for a ranked list (rank 0 is the best item)
///
/// Sweeps ranks `0..total_size`; every negative item adds the number of
/// positives already seen. With `max_fp` set, the sweep stops once that many
/// false positives have been seen, giving a partial AUC normalized by the
/// negatives actually swept. No positives gives `0.0`; positives but no
/// negatives gives `1.0`.
pub fn aroc(total_size: usize, positive_ranks: &[usize], max_fp: Option<usize>) -> Result<f64> {
    let positives = positive_set(total_size, positive_ranks)?;
    if positives.is_empty() {
        return Ok(0.0);
    }
    if max_fp == Some(0) {
        return Err(ExprError::invalid_argument("max_fp must be positive"));
    }

    let limit = max_fp.unwrap_or(usize::MAX);
    let mut pos_seen = 0usize;
    let mut neg_seen = 0usize;
    let mut area = 0.0;
    for rank in 0..total_size {
        if positives.contains(&rank) {
            pos_seen += 1;
        } else {
            area += pos_seen as f64;
            neg_seen += 1;
            if neg_seen >= limit {
                break;
            }
        }
    }

    if neg_seen == 0 {
        return Ok(1.0);
    }
    Ok(area / (positives.len() as f64 * neg_seen as f64))
}

/// One-sided p-value for an AUC at least this large under random ranking
///
/// Normal approximation to the Mann-Whitney U distribution.
pub fn roc_pvalue(total_size: usize, positive_ranks: &[usize]) -> Result<f64> {
    let n_pos = positive_set(total_size, positive_ranks)?.len() as f64;
    let n_neg = total_size as f64 - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        return Ok(f64::NAN);
    }
    let auc = aroc(total_size, positive_ranks, None)?;
    let u = auc * n_pos * n_neg;
    let mu = n_pos * n_neg / 2.0;
    let sigma = (n_pos * n_neg * (n_pos + n_neg + 1.0) / 12.0).sqrt();
    let normal = Normal::new(0.0, 1.0).map_err(|e| ExprError::invalid_argument(e.to_string()))?;
    Ok(normal.sf((u - mu) / sigma))
}
