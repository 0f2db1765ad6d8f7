//! Dense named matrix backed by an ndarray `Array2<f64>`

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::matrix::check_indices;
use super::names::NameIndex;
use super::{MatrixKind, NamedMatrix};
use crate::error::{ExprError, Result};

/// Dense matrix of doubles; rows are usually features (genes, probes) and
/// columns observations (samples)
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    values: Array2<f64>,
    row_names: Option<NameIndex>,
    column_names: Option<NameIndex>,
}

impl DenseMatrix {
    /// Wrap values without names
    pub fn new(values: Array2<f64>) -> Self {
        Self {
            values,
            row_names: None,
            column_names: None,
        }
    }

    /// Wrap values with row and column names
    pub fn with_names(
        values: Array2<f64>,
        row_names: Vec<String>,
        column_names: Vec<String>,
    ) -> Result<Self> {
        let mut matrix = Self::new(values);
        matrix.set_row_names(row_names)?;
        matrix.set_column_names(column_names)?;
        Ok(matrix)
    }

    /// Matrix of the given shape with every cell set to `value`
    pub fn filled(rows: usize, columns: usize, value: f64) -> Self {
        Self::new(Array2::from_elem((rows, columns), value))
    }

    /// Matrix of the given shape with every cell missing
    pub fn missing(rows: usize, columns: usize) -> Self {
        Self::filled(rows, columns, f64::NAN)
    }

    /// Build from row vectors, which must all have the same length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.len());
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(ExprError::invalid_argument(format!(
                "row {} has {} values, expected {}",
                i,
                r.len(),
                n_cols
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((n_rows, n_cols), flat)
            .map_err(|e| ExprError::invalid_argument(e.to_string()))?;
        Ok(Self::new(values))
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn row_view(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }

    pub fn column_view(&self, col: usize) -> ArrayView1<'_, f64> {
        self.values.column(col)
    }

    /// Transposed copy; row and column names swap along with the data
    pub fn transpose(&self) -> Self {
        Self {
            values: self.values.t().to_owned(),
            row_names: self.column_names.clone(),
            column_names: self.row_names.clone(),
        }
    }

    /// Number of missing cells in the whole matrix
    pub fn count_missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Apply `f` to every cell, keeping names
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            values: self.values.mapv(f),
            row_names: self.row_names.clone(),
            column_names: self.column_names.clone(),
        }
    }
}

impl NamedMatrix for DenseMatrix {
    fn rows(&self) -> usize {
        self.values.nrows()
    }

    fn columns(&self) -> usize {
        self.values.ncols()
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.values[[row, col]]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[[row, col]] = value;
    }

    fn row(&self, row: usize) -> Vec<f64> {
        self.values.row(row).to_vec()
    }

    fn column(&self, col: usize) -> Vec<f64> {
        self.values.column(col).to_vec()
    }

    fn kind(&self) -> MatrixKind {
        MatrixKind::Dense
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

    fn subset_rows(&self, rows: &[usize]) -> Result<Self> {
        check_indices(rows, self.rows(), "row")?;
        let row_names = match &self.row_names {
            Some(n) => Some(n.select(rows)?),
            None => None,
        };
        Ok(Self {
            values: self.values.select(Axis(0), rows),
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
        Ok(Self {
            values: self.values.select(Axis(1), cols),
            row_names: self.row_names.clone(),
            column_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprError;
    use ndarray::array;

    fn sample() -> DenseMatrix {
        DenseMatrix::with_names(
            array![[1.0, 2.0, 3.0], [4.0, f64::NAN, 6.0]],
            vec!["g1".to_string(), "g2".to_string()],
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let m = sample();
        assert_eq!(m.row_by_name("g2").unwrap()[2], 6.0);
        assert_eq!(m.column_by_name("s1").unwrap(), vec![1.0, 4.0]);
        assert!(matches!(
            m.row_by_name("nope"),
            Err(ExprError::NotFound { kind: "row", .. })
        ));
    }

    #[test]
    fn test_missing() {
        let m = sample();
        assert!(m.is_missing(1, 1));
        assert!(!m.is_missing(0, 1));
        assert_eq!(m.present_in_row(1), 2);
        assert_eq!(m.count_missing(), 1);
    }

    #[test]
    fn test_subset_preserves_names() {
        let m = sample();
        let sub = m.subset_columns(&[2, 0]).unwrap();
        assert_eq!(sub.column_names(), &["s3".to_string(), "s1".to_string()]);
        assert_eq!(sub.get(1, 0), 6.0);
        assert_eq!(sub.column_index("s1").unwrap(), 1);
        assert_eq!(sub.row_names(), m.row_names());

        let rows = m.row_range(1, 2).unwrap();
        assert_eq!(rows.rows(), 1);
        assert_eq!(rows.row_name(0), Some("g2"));
    }

    #[test]
    fn test_out_of_range() {
        let m = sample();
        assert!(matches!(m.subset_rows(&[0, 2]), Err(ExprError::InvalidRange { .. })));
        assert!(matches!(m.column_range(1, 4), Err(ExprError::InvalidRange { .. })));
        assert!(matches!(m.row_range(2, 1), Err(ExprError::InvalidRange { .. })));
    }

    #[test]
    fn test_name_length_checked() {
        let mut m = DenseMatrix::filled(2, 2, 0.0);
        assert!(!m.has_row_names());
        assert!(m.set_row_names(vec!["a".to_string()]).is_err());
        m.set_row_names(vec!["a".to_string(), "b".to_string()]).unwrap();
        assert!(m.has_row_names());
        assert_eq!(m.rows(), m.row_names().len());
    }

    #[test]
    fn test_from_rows_and_transpose() {
        let m = DenseMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let t = m.transpose();
        assert_eq!(t.get(0, 1), 3.0);
        assert!(DenseMatrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
