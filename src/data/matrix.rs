//! The shared contract of dense and sparse named matrices

use super::names::NameIndex;
use super::MatrixKind;
use crate::error::{ExprError, Result};

/// Check that `indices` all fall inside `0..len`
pub(crate) fn check_indices(indices: &[usize], len: usize, axis: &str) -> Result<()> {
    if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
        return Err(ExprError::invalid_range(format!(
            "{} index {} out of bounds for {} {}s",
            axis, bad, len, axis
        )));
    }
    Ok(())
}

/// Check a half-open range `start..end` against `len`
pub(crate) fn check_range(start: usize, end: usize, len: usize, axis: &str) -> Result<()> {
    if start > end || end > len {
        return Err(ExprError::invalid_range(format!(
            "{} range {}..{} invalid for {} {}s",
            axis, start, end, len, axis
        )));
    }
    Ok(())
}

/// A 2D numeric matrix with optional unique row and column names
///
/// `NaN` means "measured but missing". Values are addressed by `(row, column)`
/// and `get`/`set` panic on out-of-bounds indices, like ndarray indexing.
pub trait NamedMatrix: Sized {
    fn rows(&self) -> usize;

    fn columns(&self) -> usize;

    fn get(&self, row: usize, col: usize) -> f64;

    fn set(&mut self, row: usize, col: usize, value: f64);

    /// Row values as a dense vector
    fn row(&self, row: usize) -> Vec<f64>;

    /// Column values as a dense vector
    fn column(&self, col: usize) -> Vec<f64>;

    fn kind(&self) -> MatrixKind;

    fn row_name_index(&self) -> Option<&NameIndex>;

    fn column_name_index(&self) -> Option<&NameIndex>;

    fn replace_row_names(&mut self, names: NameIndex);

    fn replace_column_names(&mut self, names: NameIndex);

    /// New matrix made of the given rows, in the given order
    fn subset_rows(&self, rows: &[usize]) -> Result<Self>;

    /// New matrix made of the given columns, in the given order
    fn subset_columns(&self, cols: &[usize]) -> Result<Self>;

    fn is_missing(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_nan()
    }

    fn has_row_names(&self) -> bool {
        self.row_name_index().is_some()
    }

    fn has_column_names(&self) -> bool {
        self.column_name_index().is_some()
    }

    fn row_names(&self) -> &[String] {
        self.row_name_index().map(|n| n.names()).unwrap_or(&[])
    }

    fn column_names(&self) -> &[String] {
        self.column_name_index().map(|n| n.names()).unwrap_or(&[])
    }

    fn row_name(&self, row: usize) -> Option<&str> {
        self.row_name_index().and_then(|n| n.name(row))
    }

    fn column_name(&self, col: usize) -> Option<&str> {
        self.column_name_index().and_then(|n| n.name(col))
    }

    fn set_row_names(&mut self, names: Vec<String>) -> Result<()> {
        if names.len() != self.rows() {
            return Err(ExprError::dimension_mismatch(
                format!("{} row names", self.rows()),
                format!("{} row names", names.len()),
            ));
        }
        self.replace_row_names(NameIndex::new(names)?);
        Ok(())
    }

    fn set_column_names(&mut self, names: Vec<String>) -> Result<()> {
        if names.len() != self.columns() {
            return Err(ExprError::dimension_mismatch(
                format!("{} column names", self.columns()),
                format!("{} column names", names.len()),
            ));
        }
        self.replace_column_names(NameIndex::new(names)?);
        Ok(())
    }

    fn row_index(&self, name: &str) -> Result<usize> {
        self.row_name_index()
            .and_then(|n| n.position(name))
            .ok_or_else(|| ExprError::NotFound {
                kind: "row",
                name: name.to_string(),
            })
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.column_name_index()
            .and_then(|n| n.position(name))
            .ok_or_else(|| ExprError::NotFound {
                kind: "column",
                name: name.to_string(),
            })
    }

    fn row_by_name(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.row(self.row_index(name)?))
    }

    fn column_by_name(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.column(self.column_index(name)?))
    }

    /// Rows `start..end`
    fn row_range(&self, start: usize, end: usize) -> Result<Self> {
        check_range(start, end, self.rows(), "row")?;
        let rows: Vec<usize> = (start..end).collect();
        self.subset_rows(&rows)
    }

    /// Columns `start..end`
    fn column_range(&self, start: usize, end: usize) -> Result<Self> {
        check_range(start, end, self.columns(), "column")?;
        let cols: Vec<usize> = (start..end).collect();
        self.subset_columns(&cols)
    }

    /// Subset rows by name; unknown names fail with `NotFound`
    fn subset_rows_by_name(&self, names: &[String]) -> Result<Self> {
        let rows = names
            .iter()
            .map(|n| self.row_index(n))
            .collect::<Result<Vec<usize>>>()?;
        self.subset_rows(&rows)
    }

    /// Subset columns by name; unknown names fail with `NotFound`
    fn subset_columns_by_name(&self, names: &[String]) -> Result<Self> {
        let cols = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<usize>>>()?;
        self.subset_columns(&cols)
    }

    /// Number of non-missing values in a row
    fn present_in_row(&self, row: usize) -> usize {
        (0..self.columns())
            .filter(|&j| !self.is_missing(row, j))
            .count()
    }
}
