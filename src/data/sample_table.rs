//! Sample attribute table used to build design matrices

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{ExprError, Result};

/// Per-sample attributes: categorical factors and continuous covariates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleTable {
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Factor names in insertion order
    factor_names: Vec<String>,
    /// Factor name -> level of each sample
    factors: HashMap<String, Vec<String>>,
    /// Covariate names in insertion order
    continuous_names: Vec<String>,
    /// Covariate name -> value of each sample
    continuous: HashMap<String, Vec<f64>>,
}

impl SampleTable {
    /// Create an empty table for the given samples
    pub fn new(sample_ids: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id) {
                return Err(ExprError::invalid_argument(format!(
                    "duplicate sample ID '{}'",
                    id
                )));
            }
        }
        Ok(Self {
            sample_ids,
            factor_names: Vec::new(),
            factors: HashMap::new(),
            continuous_names: Vec::new(),
            continuous: HashMap::new(),
        })
    }

    fn check_len(&self, n: usize) -> Result<()> {
        if n != self.sample_ids.len() {
            return Err(ExprError::dimension_mismatch(
                format!("{} values", self.sample_ids.len()),
                format!("{} values", n),
            ));
        }
        Ok(())
    }

    /// Add (or replace) a categorical factor
    pub fn add_factor(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        self.check_len(values.len())?;
        if !self.factors.contains_key(name) {
            self.factor_names.push(name.to_string());
        }
        self.factors.insert(name.to_string(), values);
        Ok(())
    }

    /// Add (or replace) a continuous covariate
    pub fn add_continuous(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.check_len(values.len())?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ExprError::invalid_argument(format!(
                "covariate '{}' has non-finite values",
                name
            )));
        }
        if !self.continuous.contains_key(name) {
            self.continuous_names.push(name.to_string());
        }
        self.continuous.insert(name.to_string(), values);
        Ok(())
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    pub fn continuous_names(&self) -> &[String] {
        &self.continuous_names
    }

    pub fn has_factor(&self, name: &str) -> bool {
        self.factors.contains_key(name)
    }

    pub fn has_continuous(&self, name: &str) -> bool {
        self.continuous.contains_key(name)
    }

    /// Levels of each sample for a factor
    pub fn factor(&self, name: &str) -> Result<&[String]> {
        self.factors
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| ExprError::NotFound {
                kind: "factor",
                name: name.to_string(),
            })
    }

    /// Values of each sample for a covariate
    pub fn covariate(&self, name: &str) -> Result<&[f64]> {
        self.continuous
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| ExprError::NotFound {
                kind: "covariate",
                name: name.to_string(),
            })
    }

    /// Unique levels of a factor, sorted
    pub fn levels(&self, name: &str) -> Result<Vec<String>> {
        let mut unique: Vec<String> = self.factor(name)?.to_vec();
        unique.sort();
        unique.dedup();
        Ok(unique)
    }

    /// Sample indices carrying a given level
    pub fn samples_with_level(&self, factor: &str, level: &str) -> Result<Vec<usize>> {
        Ok(self
            .factor(factor)?
            .iter()
            .enumerate()
            .filter(|(_, v)| *v == level)
            .map(|(i, _)| i)
            .collect())
    }

    /// Reorder (and possibly subset) samples to follow `order`, typically the
    /// column names of an expression matrix
    pub fn reorder(&self, order: &[String]) -> Result<Self> {
        let position: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let indices = order
            .iter()
            .map(|s| {
                position.get(s.as_str()).copied().ok_or_else(|| ExprError::NotFound {
                    kind: "sample",
                    name: s.clone(),
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let mut table = SampleTable::new(order.to_vec())?;
        for name in &self.factor_names {
            let values = &self.factors[name];
            table.add_factor(name, indices.iter().map(|&i| values[i].clone()).collect())?;
        }
        for name in &self.continuous_names {
            let values = &self.continuous[name];
            table.add_continuous(name, indices.iter().map(|&i| values[i]).collect())?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_levels_sorted() {
        let mut table = SampleTable::new(strings(&["s1", "s2", "s3"])).unwrap();
        table.add_factor("dose", strings(&["low", "high", "low"])).unwrap();
        assert_eq!(table.levels("dose").unwrap(), strings(&["high", "low"]));
        assert_eq!(table.samples_with_level("dose", "low").unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_length_mismatch() {
        let mut table = SampleTable::new(strings(&["s1", "s2"])).unwrap();
        assert!(table.add_factor("f", strings(&["a"])).is_err());
        assert!(table.add_continuous("age", vec![1.0]).is_err());
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        assert!(SampleTable::new(strings(&["s1", "s1"])).is_err());
    }

    #[test]
    fn test_reorder() {
        let mut table = SampleTable::new(strings(&["s1", "s2", "s3"])).unwrap();
        table.add_factor("g", strings(&["a", "b", "c"])).unwrap();
        table.add_continuous("x", vec![1.0, 2.0, 3.0]).unwrap();

        let r = table.reorder(&strings(&["s3", "s1"])).unwrap();
        assert_eq!(r.factor("g").unwrap(), &strings(&["c", "a"])[..]);
        assert_eq!(r.covariate("x").unwrap(), &[3.0, 1.0]);
        assert!(table.reorder(&strings(&["s9"])).is_err());
    }
}
