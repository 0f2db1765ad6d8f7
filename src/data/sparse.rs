//! Sparse named matrix backed by a CSR `sprs::CsMat`
//!
//! A cell is either structurally absent (never stored, reads as 0.0) or
//! stored. A stored `NaN` is a measured-but-missing value, exactly as in
//! [`DenseMatrix`](super::DenseMatrix); an absent cell is not missing.

use sprs::{CsMat, TriMat};

use super::matrix::check_indices;
use super::names::NameIndex;
use super::{DenseMatrix, MatrixKind, NamedMatrix};
use crate::error::{ExprError, Result};

#[derive(Debug, Clone)]
pub struct SparseMatrix {
    values: CsMat<f64>,
    row_names: Option<NameIndex>,
    column_names: Option<NameIndex>,
}

impl SparseMatrix {
    /// Empty matrix: every cell structurally absent
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            values: CsMat::zero((rows, columns)),
            row_names: None,
            column_names: None,
        }
    }

    /// Build from `(row, col, value)` triplets; repeated cells are summed
    pub fn from_triplets(rows: usize, columns: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        let mut tri = TriMat::new((rows, columns));
        for &(i, j, v) in triplets {
            if i >= rows || j >= columns {
                return Err(ExprError::invalid_range(format!(
                    "cell ({}, {}) outside {}x{} matrix",
                    i, j, rows, columns
                )));
            }
            tri.add_triplet(i, j, v);
        }
        let values: CsMat<f64> = tri.to_csr();
        Ok(Self {
            values,
            row_names: None,
            column_names: None,
        })
    }

    /// Stored value, or `None` when the cell is structurally absent
    pub fn entry(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row, col).copied()
    }

    /// Number of stored cells (including stored NaN and explicit zeros)
    pub fn nnz(&self) -> usize {
        self.values.nnz()
    }

    /// Stored cells of one row as `(column, value)` pairs
    pub fn row_entries(&self, row: usize) -> Vec<(usize, f64)> {
        self.values
            .outer_view(row)
            .map(|v| v.iter().map(|(j, &x)| (j, x)).collect())
            .unwrap_or_default()
    }

    /// Dense copy; absent cells become 0.0, stored NaN stays NaN
    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::filled(self.rows(), self.columns(), 0.0);
        for i in 0..self.rows() {
            for (j, v) in self.row_entries(i) {
                dense.set(i, j, v);
            }
        }
        if let Some(n) = &self.row_names {
            dense.replace_row_names(n.clone());
        }
        if let Some(n) = &self.column_names {
            dense.replace_column_names(n.clone());
        }
        dense
    }

    /// Columns become rows; stored cells and names move with them
    pub fn transpose(&self) -> Self {
        Self {
            values: self.values.transpose_view().to_csr(),
            row_names: self.column_names.clone(),
            column_names: self.row_names.clone(),
        }
    }

    fn rebuild(&self, rows: usize, columns: usize, cells: impl Iterator<Item = (usize, usize, f64)>) -> CsMat<f64> {
        let mut tri = TriMat::new((rows, columns));
        for (i, j, v) in cells {
            tri.add_triplet(i, j, v);
        }
        tri.to_csr()
    }
}

impl NamedMatrix for SparseMatrix {
    fn rows(&self) -> usize {
        self.values.rows()
    }

    fn columns(&self) -> usize {
        self.values.cols()
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.rows() && col < self.columns(),
            "index ({}, {}) out of bounds",
            row,
            col
        );
        self.entry(row, col).unwrap_or(0.0)
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            row < self.rows() && col < self.columns(),
            "index ({}, {}) out of bounds",
            row,
            col
        );
        match self.values.get_mut(row, col) {
            Some(cell) => *cell = value,
            None => self.values.insert(row, col, value),
        }
    }

    fn row(&self, row: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.columns()];
        for (j, v) in self.row_entries(row) {
            out[j] = v;
        }
        out
    }

    fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows()).map(|i| self.get(i, col)).collect()
    }

    fn kind(&self) -> MatrixKind {
        MatrixKind::Sparse
    }

    fn row_name_index(&self) -> Option<&NameIndex> {
        self.row_names.as_ref()
    }

    fn column_name_index(&self) -> Option<&NameIndex> {
        self.column_names.as_ref()
    }

    fn replace_row_names(&mut self, names: NameIndex) {
        self.row_names = Some(names);
    }

    fn replace_column_names(&mut self, names: NameIndex) {
        self.column_names = Some(names);
    }

    fn is_missing(&self, row: usize, col: usize) -> bool {
        self.entry(row, col).map_or(false, f64::is_nan)
    }

    fn subset_rows(&self, rows: &[usize]) -> Result<Self> {
        check_indices(rows, self.rows(), "row")?;
        let row_names = match &self.row_names {
            Some(n) => Some(n.select(rows)?),
            None => None,
        };
        let cells = rows.iter().enumerate().flat_map(|(new_i, &old_i)| {
            self.row_entries(old_i)
                .into_iter()
                .map(move |(j, v)| (new_i, j, v))
        });
        let values = self.rebuild(rows.len(), self.columns(), cells);
        Ok(Self {
            values,
            row_names,
            column_names: self.column_names.clone(),
        })
    }

    fn subset_columns(&self, cols: &[usize]) -> Result<Self> {
        check_indices(cols, self.columns(), "column")?;
        let column_names = match &self.column_names {
            Some(n) => Some(n.select(cols)?),
            None => None,
        };
        let mut new_position = vec![None; self.columns()];
        for (new_j, &old_j) in cols.iter().enumerate() {
            new_position[old_j] = Some(new_j);
        }
        let cells = (0..self.rows()).flat_map(|i| {
            self.row_entries(i)
                .into_iter()
                .filter_map(|(j, v)| new_position[j].map(|nj| (i, nj, v)))
                .collect::<Vec<_>>()
        });
        let values = self.rebuild(self.rows(), cols.len(), cells);
        Ok(Self {
            values,
            row_names: self.row_names.clone(),
            column_names,
        })
    }
}
