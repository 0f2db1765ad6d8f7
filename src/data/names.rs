//! Unique row/column labels with constant-time lookup

use std::collections::HashMap;

use crate::error::{ExprError, Result};

/// Ordered list of unique names plus a reverse index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl NameIndex {
    /// Build an index, rejecting duplicate names
    pub fn new(names: Vec<String>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(ExprError::invalid_argument(format!(
                    "duplicate name '{}'",
                    name
                )));
            }
        }
        Ok(Self { names, positions })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(|s| s.as_str())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Names at the given positions, in the given order
    ///
    /// Fails if a position repeats, since the result must stay unique.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let names = indices.iter().map(|&i| self.names[i].clone()).collect();
        Self::new(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lookup() {
        let idx = NameIndex::new(names(&["a", "b", "c"])).unwrap();
        assert_eq!(idx.position("b"), Some(1));
        assert_eq!(idx.position("z"), None);
        assert_eq!(idx.name(2), Some("c"));
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = NameIndex::new(names(&["a", "b", "a"])).unwrap_err();
        assert!(format!("{}", err).contains("duplicate name 'a'"));
    }

    #[test]
    fn test_select_keeps_order() {
        let idx = NameIndex::new(names(&["a", "b", "c"])).unwrap();
        let sub = idx.select(&[2, 0]).unwrap();
        assert_eq!(sub.names(), &["c".to_string(), "a".to_string()]);
        assert_eq!(sub.position("a"), Some(1));
        assert!(idx.select(&[1, 1]).is_err());
    }
}
