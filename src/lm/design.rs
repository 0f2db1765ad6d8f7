//! Design matrix creation for linear models

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::qr::{PivotedQr, DEFAULT_TOLERANCE};
use crate::data::SampleTable;
use crate::error::{ExprError, Result};

/// Name of the intercept term and column
pub const INTERCEPT: &str = "(Intercept)";

/// What a design column encodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column (coefficient) name
    pub name: String,
    /// Index into the design's term list
    pub term: usize,
    /// Factor this column dummy-codes, if any
    pub factor: Option<String>,
    /// Level of that factor coded as 1
    pub level: Option<String>,
}

/// Numeric encoding of predictors: observations x columns, with each
/// column assigned to a model term for ANOVA grouping
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    matrix: Array2<f64>,
    columns: Vec<ColumnInfo>,
    terms: Vec<String>,
}

impl DesignMatrix {
    /// Create from a matrix and per-column term assignments
    pub fn new(matrix: Array2<f64>, columns: Vec<ColumnInfo>, terms: Vec<String>) -> Result<Self> {
        if columns.len() != matrix.ncols() {
            return Err(ExprError::dimension_mismatch(
                format!("{} column descriptions", matrix.ncols()),
                format!("{} column descriptions", columns.len()),
            ));
        }
        if let Some(c) = columns.iter().find(|c| c.term >= terms.len()) {
            return Err(ExprError::invalid_argument(format!(
                "column '{}' assigned to unknown term {}",
                c.name, c.term
            )));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(ExprError::invalid_argument(
                "design matrix values must be finite",
            ));
        }
        Ok(Self {
            matrix,
            columns,
            terms,
        })
    }

    /// Every column is its own term, named after the column
    pub fn from_columns(matrix: Array2<f64>, names: Vec<String>) -> Result<Self> {
        let columns = names
            .iter()
            .enumerate()
            .map(|(term, name)| ColumnInfo {
                name: name.clone(),
                term,
                factor: None,
                level: None,
            })
            .collect();
        Self::new(matrix, columns, names)
    }

    /// Intercept column followed by the given covariate columns
    pub fn with_intercept(covariates: Array2<f64>, names: Vec<String>) -> Result<Self> {
        let n = covariates.nrows();
        let mut matrix = Array2::ones((n, covariates.ncols() + 1));
        matrix.slice_mut(ndarray::s![.., 1..]).assign(&covariates);
        let mut all_names = vec![INTERCEPT.to_string()];
        all_names.extend(names);
        Self::from_columns(matrix, all_names)
    }

    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    pub fn n_observations(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Term index of each column
    pub fn assign(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.term).collect()
    }

    /// Columns belonging to a term
    pub fn columns_for_term(&self, term: &str) -> Result<Vec<usize>> {
        let t = self
            .terms
            .iter()
            .position(|n| n == term)
            .ok_or_else(|| ExprError::NotFound {
                kind: "term",
                name: term.to_string(),
            })?;
        Ok(self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.term == t)
            .map(|(j, _)| j)
            .collect())
    }

    /// Term index of the intercept, if the model has one
    pub fn intercept_term(&self) -> Option<usize> {
        self.terms.iter().position(|t| t == INTERCEPT)
    }

    /// Observations `rows`, each scaled by the matching factor when given
    pub(crate) fn select_rows(&self, rows: &[usize], scale: Option<&[f64]>) -> Array2<f64> {
        let mut sub = self.matrix.select(Axis(0), rows);
        if let Some(s) = scale {
            for (mut row, &k) in sub.rows_mut().into_iter().zip(s) {
                row *= k;
            }
        }
        sub
    }

    pub fn rank(&self) -> usize {
        PivotedQr::decompose(self.matrix.view(), DEFAULT_TOLERANCE).rank()
    }

    /// Names of columns that are linear combinations of earlier columns
    pub fn aliased_columns(&self) -> Vec<String> {
        let qr = PivotedQr::decompose(self.matrix.view(), DEFAULT_TOLERANCE);
        qr.aliased()
            .iter()
            .map(|&j| self.columns[j].name.clone())
            .collect()
    }

    /// Fail unless every coefficient is estimable
    ///
    /// Rank-deficient designs are legal for fitting (aliased coefficients
    /// come back as NaN); this is for callers that want a strict check.
    pub fn check_full_rank(&self) -> Result<()> {
        if self.n_observations() == 0 || self.n_columns() == 0 {
            return Err(ExprError::invalid_argument(
                "design matrix has zero rows or columns",
            ));
        }
        if self.rank() == self.n_columns() {
            return Ok(());
        }
        let has_zero_column =
            (0..self.n_columns()).any(|j| self.matrix.column(j).iter().all(|&v| v == 0.0));
        let reason = if has_zero_column {
            "the model matrix is not full rank: levels or combinations of levels \
             without any samples produced column(s) of zeros"
        } else {
            "the model matrix is not full rank: one or more terms are linear \
             combinations of the others"
        };
        Err(ExprError::invalid_argument(format!(
            "{} (aliased: {})",
            reason,
            self.aliased_columns().join(", ")
        )))
    }
}

#[derive(Debug, Clone)]
enum Term {
    Factor(String),
    Continuous(String),
    Interaction(String, String),
}

/// Builds a [`DesignMatrix`] from a [`SampleTable`]
///
/// Factors use treatment contrasts against a reference level (the first
/// level alphabetically unless overridden). Without an intercept the first
/// factor is coded with one column per level. Terms appear in the order
/// they are added.
#[derive(Debug, Clone)]
pub struct DesignBuilder<'a> {
    table: &'a SampleTable,
    terms: Vec<Term>,
    reference_levels: HashMap<String, String>,
    intercept: bool,
}

impl<'a> DesignBuilder<'a> {
    pub fn new(table: &'a SampleTable) -> Self {
        Self {
            table,
            terms: Vec::new(),
            reference_levels: HashMap::new(),
            intercept: true,
        }
    }

    pub fn factor(mut self, name: &str) -> Self {
        self.terms.push(Term::Factor(name.to_string()));
        self
    }

    pub fn continuous(mut self, name: &str) -> Self {
        self.terms.push(Term::Continuous(name.to_string()));
        self
    }

    pub fn interaction(mut self, first: &str, second: &str) -> Self {
        self.terms
            .push(Term::Interaction(first.to_string(), second.to_string()));
        self
    }

    pub fn reference_level(mut self, factor: &str, level: &str) -> Self {
        self.reference_levels
            .insert(factor.to_string(), level.to_string());
        self
    }

    pub fn intercept(mut self, intercept: bool) -> Self {
        self.intercept = intercept;
        self
    }

    /// Levels of a factor with its reference level first
    fn ordered_levels(&self, factor: &str) -> Result<Vec<String>> {
        let mut levels = self.table.levels(factor)?;
        if let Some(reference) = self.reference_levels.get(factor) {
            let pos = levels
                .iter()
                .position(|l| l == reference)
                .ok_or_else(|| ExprError::NotFound {
                    kind: "level",
                    name: format!("{}={}", factor, reference),
                })?;
            let r = levels.remove(pos);
            levels.insert(0, r);
        }
        Ok(levels)
    }

    pub fn build(&self) -> Result<DesignMatrix> {
        let n = self.table.n_samples();
        let mut terms: Vec<String> = Vec::new();
        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut values: Vec<Vec<f64>> = Vec::new();

        if self.intercept {
            terms.push(INTERCEPT.to_string());
            columns.push(ColumnInfo {
                name: INTERCEPT.to_string(),
                term: 0,
                factor: None,
                level: None,
            });
            values.push(vec![1.0; n]);
        }

        let mut full_coding_used = self.intercept;
        for term in &self.terms {
            let t = terms.len();
            match term {
                Term::Factor(f) => {
                    let samples = self.table.factor(f)?;
                    let levels = self.ordered_levels(f)?;
                    let coded: &[String] = if full_coding_used {
                        if levels.len() < 2 {
                            return Err(ExprError::invalid_argument(format!(
                                "factor '{}' needs at least 2 levels, has {}",
                                f,
                                levels.len()
                            )));
                        }
                        &levels[1..]
                    } else {
                        full_coding_used = true;
                        &levels[..]
                    };
                    for level in coded {
                        let name = if coded.len() == levels.len() {
                            format!("{}_{}", f, level)
                        } else {
                            format!("{}_{}_vs_{}", f, level, levels[0])
                        };
                        columns.push(ColumnInfo {
                            name,
                            term: t,
                            factor: Some(f.clone()),
                            level: Some(level.clone()),
                        });
                        values.push(
                            samples
                                .iter()
                                .map(|s| if s == level { 1.0 } else { 0.0 })
                                .collect(),
                        );
                    }
                    terms.push(f.clone());
                }
                Term::Continuous(c) => {
                    let v = self.table.covariate(c)?;
                    columns.push(ColumnInfo {
                        name: c.clone(),
                        term: t,
                        factor: None,
                        level: None,
                    });
                    values.push(v.to_vec());
                    terms.push(c.clone());
                }
                Term::Interaction(f1, f2) => {
                    let s1 = self.table.factor(f1)?;
                    let s2 = self.table.factor(f2)?;
                    let l1 = self.ordered_levels(f1)?;
                    let l2 = self.ordered_levels(f2)?;
                    for a in l1.iter().skip(1) {
                        for b in l2.iter().skip(1) {
                            columns.push(ColumnInfo {
                                name: format!("{}_{}_x_{}_{}", f1, a, f2, b),
                                term: t,
                                factor: None,
                                level: None,
                            });
                            values.push(
                                s1.iter()
                                    .zip(s2)
                                    .map(|(x, y)| if x == a && y == b { 1.0 } else { 0.0 })
                                    .collect(),
                            );
                        }
                    }
                    terms.push(format!("{}:{}", f1, f2));
                }
            }
        }

        if columns.is_empty() {
            return Err(ExprError::invalid_argument("design has no columns"));
        }

        let mut matrix = Array2::zeros((n, columns.len()));
        for (j, col) in values.iter().enumerate() {
            for (i, &v) in col.iter().enumerate() {
                matrix[[i, j]] = v;
            }
        }

        let design = DesignMatrix::new(matrix, columns, terms)?;
        let rank = design.rank();
        if rank < design.n_columns() {
            log::warn!(
                "Design matrix is rank deficient ({} of {} columns estimable); aliased: {}",
                rank,
                design.n_columns(),
                design.aliased_columns().join(", ")
            );
        }
        Ok(design)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn table() -> SampleTable {
        let mut table = SampleTable::new(strings(&["s1", "s2", "s3", "s4", "s5", "s6"])).unwrap();
        table
            .add_factor("treatment", strings(&["control", "control", "treated", "treated", "control", "treated"]))
            .unwrap();
        table
            .add_factor("batch", strings(&["a", "b", "a", "b", "a", "b"]))
            .unwrap();
        table
            .add_continuous("age", vec![30.0, 40.0, 35.0, 50.0, 45.0, 60.0])
            .unwrap();
        table
    }

    #[test]
    fn test_treatment_coding() {
        let t = table();
        let design = DesignBuilder::new(&t).factor("treatment").build().unwrap();

        assert_eq!(design.matrix().dim(), (6, 2));
        assert_eq!(design.column_names(), strings(&["(Intercept)", "treatment_treated_vs_control"]));
        assert_eq!(design.matrix()[[0, 1]], 0.0);
        assert_eq!(design.matrix()[[2, 1]], 1.0);
        assert_eq!(design.intercept_term(), Some(0));
        assert_eq!(design.assign(), vec![0, 1]);
    }

    #[test]
    fn test_multi_term_design() {
        let t = table();
        let design = DesignBuilder::new(&t)
            .factor("batch")
            .factor("treatment")
            .continuous("age")
            .interaction("batch", "treatment")
            .build()
            .unwrap();

        assert_eq!(design.terms(), &strings(&["(Intercept)", "batch", "treatment", "age", "batch:treatment"])[..]);
        assert_eq!(design.n_columns(), 5);
        assert_eq!(design.columns_for_term("age").unwrap(), vec![3]);
        assert_eq!(design.columns()[4].name, "batch_b_x_treatment_treated");
        // s4 is batch b and treated
        assert_eq!(design.matrix()[[3, 4]], 1.0);
        assert_eq!(design.matrix()[[1, 4]], 0.0);
        assert_eq!(design.matrix()[[5, 3]], 60.0);
    }

    #[test]
    fn test_reference_override() {
        let t = table();
        let design = DesignBuilder::new(&t)
            .factor("treatment")
            .reference_level("treatment", "treated")
            .build()
            .unwrap();
        assert_eq!(design.columns()[1].name, "treatment_control_vs_treated");
        assert_eq!(design.columns()[1].level.as_deref(), Some("control"));

        let bad = DesignBuilder::new(&t)
            .factor("treatment")
            .reference_level("treatment", "placebo")
            .build();
        assert!(matches!(bad, Err(ExprError::NotFound { kind: "level", .. })));
    }

    #[test]
    fn test_no_intercept_full_coding() {
        let t = table();
        let design = DesignBuilder::new(&t)
            .intercept(false)
            .factor("treatment")
            .factor("batch")
            .build()
            .unwrap();
        assert_eq!(
            design.column_names(),
            strings(&["treatment_control", "treatment_treated", "batch_b_vs_a"])
        );
        assert_eq!(design.intercept_term(), None);
        assert!(design.check_full_rank().is_ok());
    }

    #[test]
    fn test_unknown_variables() {
        let t = table();
        assert!(DesignBuilder::new(&t).factor("nope").build().is_err());
        assert!(DesignBuilder::new(&t).continuous("nope").build().is_err());
    }

    #[test]
    fn test_check_full_rank_zero_column() {
        let design = DesignMatrix::from_columns(
            array![[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
            strings(&["i", "a", "b"]),
        )
        .unwrap();
        let msg = format!("{}", design.check_full_rank().unwrap_err());
        assert!(msg.contains("column(s) of zeros"), "got: {}", msg);
        assert!(msg.contains("aliased: b"), "got: {}", msg);
    }

    #[test]
    fn test_check_full_rank_linear_combination() {
        let design = DesignMatrix::from_columns(
            array![[1.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 2.0], [1.0, 1.0, 2.0]],
            strings(&["i", "a", "b"]),
        )
        .unwrap();
        assert_eq!(design.rank(), 2);
        let msg = format!("{}", design.check_full_rank().unwrap_err());
        assert!(msg.contains("linear combinations"), "got: {}", msg);
    }

    #[test]
    fn test_with_intercept() {
        let design = DesignMatrix::with_intercept(array![[2.0], [3.0]], strings(&["x"])).unwrap();
        assert_eq!(design.matrix(), array![[1.0, 2.0], [1.0, 3.0]]);
        assert_eq!(design.terms(), &strings(&["(Intercept)", "x"])[..]);
    }

    #[test]
    fn test_invalid_design_rejected() {
        let cols = vec![ColumnInfo {
            name: "x".to_string(),
            term: 3,
            factor: None,
            level: None,
        }];
        assert!(DesignMatrix::new(array![[1.0]], cols, strings(&["x"])).is_err());
        assert!(DesignMatrix::from_columns(array![[f64::NAN]], strings(&["x"])).is_err());
    }
}
