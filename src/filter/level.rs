//! Drop rows by a per-row summary statistic

use serde::{Deserialize, Serialize};

use super::RowFilter;
use crate::data::NamedMatrix;
use crate::error::{ExprError, Result};
use crate::stats::descriptive;

/// Statistic summarizing each row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RowStatistic {
    #[default]
    Mean,
    Median,
    Max,
    Min,
    Variance,
}

impl RowStatistic {
    pub fn compute(self, values: &[f64]) -> f64 {
        match self {
            RowStatistic::Mean => descriptive::mean(values),
            RowStatistic::Median => descriptive::median(values),
            RowStatistic::Max => descriptive::max(values),
            RowStatistic::Min => descriptive::min(values),
            RowStatistic::Variance => descriptive::sample_variance(values),
        }
    }
}

/// Keeps rows whose statistic lies within `[low, high]`, then removes the
/// lowest-ranked `remove_fraction` of the survivors
///
/// Rows whose statistic cannot be computed (all values missing) are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct RowLevelFilter {
    pub statistic: RowStatistic,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub remove_fraction: Option<f64>,
    /// Compare absolute values of the statistic
    pub absolute: bool,
}

impl RowLevelFilter {
    pub fn new(statistic: RowStatistic) -> Self {
        Self {
            statistic,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if let (Some(low), Some(high)) = (self.low, self.high) {
            if low > high {
                return Err(ExprError::invalid_argument(format!(
                    "low threshold {} exceeds high threshold {}",
                    low, high
                )));
            }
        }
        if let Some(f) = self.remove_fraction {
            if !(0.0..=1.0).contains(&f) {
                return Err(ExprError::invalid_argument(format!(
                    "remove fraction must lie in [0, 1], got {}",
                    f
                )));
            }
        }
        Ok(())
    }
}

impl RowFilter for RowLevelFilter {
    fn keep<M: NamedMatrix>(&self, matrix: &M) -> Result<Vec<usize>> {
        self.validate()?;
        let stats: Vec<f64> = (0..matrix.rows())
            .map(|i| {
                let s = self.statistic.compute(&matrix.row(i));
                if self.absolute {
                    s.abs()
                } else {
                    s
                }
            })
            .collect();

        let mut kept: Vec<usize> = (0..stats.len())
            .filter(|&i| !stats[i].is_nan())
            .filter(|&i| self.low.map_or(true, |l| stats[i] >= l))
            .filter(|&i| self.high.map_or(true, |h| stats[i] <= h))
            .collect();

        if let Some(fraction) = self.remove_fraction {
            let remove = (fraction * kept.len() as f64).floor() as usize;
            let mut ranked = kept.clone();
            ranked.sort_by(|&a, &b| stats[a].total_cmp(&stats[b]));
            let dropped: std::collections::HashSet<usize> = ranked[..remove].iter().copied().collect();
            kept.retain(|i| !dropped.contains(i));
        }

        log::debug!(
            "{:?} filter kept {} of {} rows",
            self.statistic,
            kept.len(),
            matrix.rows()
        );
        Ok(kept)
    }
}
