//! Keep or drop rows by name

use std::collections::HashSet;

use super::RowFilter;
use crate::data::NamedMatrix;
use crate::error::{ExprError, Result};

#[derive(Debug, Clone)]
pub struct RowNameFilter {
    names: HashSet<String>,
    exclude: bool,
}

impl RowNameFilter {
    /// Keep only the listed rows
    pub fn keep_only(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
            exclude: false,
        }
    }

    /// Keep every row except the listed ones
    pub fn exclude(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
            exclude: true,
        }
    }
}

impl RowFilter for RowNameFilter {
    fn keep<M: NamedMatrix>(&self, matrix: &M) -> Result<Vec<usize>> {
        if !matrix.has_row_names() {
            return Err(ExprError::invalid_argument(
                "filtering by name needs a matrix with row names",
            ));
        }
        let kept: Vec<usize> = matrix
            .row_names()
            .iter()
            .enumerate()
            .filter(|(_, n)| self.names.contains(*n) != self.exclude)
            .map(|(i, _)| i)
            .collect();
        if !self.exclude {
            let missing = self.names.len() - kept.len();
            if missing > 0 {
                log::debug!("{} requested rows not present in the matrix", missing);
            }
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DenseMatrix;

    fn matrix() -> DenseMatrix {
        let mut m = DenseMatrix::from_rows(vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        m.set_row_names(vec!["x".into(), "y".into(), "z".into()]).unwrap();
        m
    }

    #[test]
    fn test_keep_only_preserves_matrix_order() {
        let f = RowNameFilter::keep_only(vec!["z".to_string(), "x".to_string(), "w".to_string()]);
        let out = f.filter(&matrix()).unwrap();
        assert_eq!(out.row_names(), &["x".to_string(), "z".to_string()]);
        assert_eq!(out.get(1, 0), 3.0);
    }

    #[test]
    fn test_exclude() {
        let f = RowNameFilter::exclude(vec!["y".to_string()]);
        assert_eq!(f.keep(&matrix()).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_unnamed_matrix_rejected() {
        let m = DenseMatrix::from_rows(vec![vec![1.0]]).unwrap();
        assert!(RowNameFilter::exclude(Vec::new()).keep(&m).is_err());
    }
}
