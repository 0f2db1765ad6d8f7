//! Keep rows with enough non-missing values

use super::RowFilter;
use crate::data::NamedMatrix;
use crate::error::{ExprError, Result};

/// Drops rows with too few present (non-NaN) values
///
/// A row must satisfy every threshold that has been set. With neither set,
/// every row is kept.
#[derive(Debug, Clone, Default)]
pub struct PresenceFilter {
    min_present_count: Option<usize>,
    min_present_fraction: Option<f64>,
}

impl PresenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_present_count(mut self, count: usize) -> Self {
        self.min_present_count = Some(count);
        self
    }

    pub fn with_min_present_fraction(mut self, fraction: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ExprError::invalid_argument(format!(
                "present fraction must lie in [0, 1], got {}",
                fraction
            )));
        }
        self.min_present_fraction = Some(fraction);
        Ok(self)
    }

    pub fn min_present_count(&self) -> Option<usize> {
        self.min_present_count
    }

    pub fn min_present_fraction(&self) -> Option<f64> {
        self.min_present_fraction
    }
}

impl RowFilter for PresenceFilter {
    fn keep<M: NamedMatrix>(&self, matrix: &M) -> Result<Vec<usize>> {
        let columns = matrix.columns();
        if let Some(count) = self.min_present_count {
            if count > columns {
                log::warn!(
                    "Minimum present count {} exceeds the {} columns; no row can pass",
                    count,
                    columns
                );
            }
        }
        Ok((0..matrix.rows())
            .filter(|&i| {
                let present = matrix.present_in_row(i);
                let enough_count = self.min_present_count.map_or(true, |c| present >= c);
                let enough_fraction = self.min_present_fraction.map_or(true, |f| {
                    columns > 0 && present as f64 / columns as f64 >= f
                });
                enough_count && enough_fraction
            })
            .collect())
    }
}
