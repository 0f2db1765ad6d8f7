//! Matrix kind tag and the factory keyed on it

use serde::{Deserialize, Serialize};

use super::names::NameIndex;
use super::{DenseMatrix, NamedMatrix, SparseMatrix};
use crate::error::Result;

/// Storage layout of a named matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Every cell stored; unset cells start out missing (NaN)
    #[default]
    Dense,
    /// Only stored cells take memory; unset cells are structural zeros
    Sparse,
}

/// A named matrix of either kind
#[derive(Debug, Clone)]
pub enum AnyMatrix {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

/// Create an empty matrix of the requested kind
pub fn new_matrix(kind: MatrixKind, rows: usize, columns: usize) -> AnyMatrix {
    match kind {
        MatrixKind::Dense => AnyMatrix::Dense(DenseMatrix::missing(rows, columns)),
        MatrixKind::Sparse => AnyMatrix::Sparse(SparseMatrix::new(rows, columns)),
    }
}

impl AnyMatrix {
    /// Dense form; sparse absent cells become 0.0
    pub fn into_dense(self) -> DenseMatrix {
        match self {
            AnyMatrix::Dense(m) => m,
            AnyMatrix::Sparse(m) => m.to_dense(),
        }
    }

    pub fn as_dense(&self) -> Option<&DenseMatrix> {
        match self {
            AnyMatrix::Dense(m) => Some(m),
            AnyMatrix::Sparse(_) => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseMatrix> {
        match self {
            AnyMatrix::Dense(_) => None,
            AnyMatrix::Sparse(m) => Some(m),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $m:ident => $body:expr) => {
        match $self {
            AnyMatrix::Dense($m) => $body,
            AnyMatrix::Sparse($m) => $body,
        }
    };
}

impl NamedMatrix for AnyMatrix {
    fn rows(&self) -> usize {
        delegate!(self, m => m.rows())
    }

    fn columns(&self) -> usize {
        delegate!(self, m => m.columns())
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        delegate!(self, m => m.get(row, col))
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        delegate!(self, m => m.set(row, col, value))
    }

    fn row(&self, row: usize) -> Vec<f64> {
        delegate!(self, m => m.row(row))
    }

    fn column(&self, col: usize) -> Vec<f64> {
        delegate!(self, m => m.column(col))
    }

    fn kind(&self) -> MatrixKind {
        delegate!(self, m => m.kind())
    }

    fn row_name_index(&self) -> Option<&NameIndex> {
        delegate!(self, m => m.row_name_index())
    }

    fn column_name_index(&self) -> Option<&NameIndex> {
        delegate!(self, m => m.column_name_index())
    }

    fn replace_row_names(&mut self, names: NameIndex) {
        delegate!(self, m => m.replace_row_names(names))
    }

    fn replace_column_names(&mut self, names: NameIndex) {
        delegate!(self, m => m.replace_column_names(names))
    }

    fn is_missing(&self, row: usize, col: usize) -> bool {
        delegate!(self, m => m.is_missing(row, col))
    }

    fn subset_rows(&self, rows: &[usize]) -> Result<Self> {
        Ok(match self {
            AnyMatrix::Dense(m) => AnyMatrix::Dense(m.subset_rows(rows)?),
            AnyMatrix::Sparse(m) => AnyMatrix::Sparse(m.subset_rows(rows)?),
        })
    }

    fn subset_columns(&self, cols: &[usize]) -> Result<Self> {
        Ok(match self {
            AnyMatrix::Dense(m) => AnyMatrix::Dense(m.subset_columns(cols)?),
            AnyMatrix::Sparse(m) => AnyMatrix::Sparse(m.subset_columns(cols)?),
        })
    }
}
