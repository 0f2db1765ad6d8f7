//! Row filters over named matrices

mod level;
mod names;
mod presence;

pub use level::{RowLevelFilter, RowStatistic};
pub use names::RowNameFilter;
pub use presence::PresenceFilter;

use crate::data::NamedMatrix;
use crate::error::Result;

/// Selects rows of a matrix
pub trait RowFilter {
    /// Indices of the rows that pass, in matrix order
    fn keep<M: NamedMatrix>(&self, matrix: &M) -> Result<Vec<usize>>;

    /// The passing rows as a new matrix, names preserved
    fn filter<M: NamedMatrix>(&self, matrix: &M) -> Result<M> {
        let rows = self.keep(matrix)?;
        log::info!("Kept {} of {} rows", rows.len(), matrix.rows());
        matrix.subset_rows(&rows)
    }
}
