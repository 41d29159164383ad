//! [`Axes`]: the set of values observed for each keyword within an index,
//! kept sorted for display and used as the per-keyword domain when building
//! a [`crate::hypercube::HyperCube`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::key::Key;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axes {
    values: BTreeMap<String, BTreeSet<String>>,
}

impl Axes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keyword: impl Into<String>, value: impl Into<String>) {
        self.values.entry(keyword.into()).or_default().insert(value.into());
    }

    /// Folds every keyword/value pair of `key` into the axes.
    pub fn observe(&mut self, key: &Key) {
        for (k, v) in key.iter() {
            self.insert(k, v);
        }
    }

    pub fn values_of(&self, keyword: &str) -> impl Iterator<Item = &str> {
        self.values.get(keyword).into_iter().flatten().map(String::as_str)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn contains(&self, keyword: &str, value: &str) -> bool {
        self.values.get(keyword).map(|s| s.contains(value)).unwrap_or(false)
    }

    /// Merges `other`'s observed values into `self`, used when combining a
    /// SubToc's axes into its parent's.
    pub fn merge(&mut self, other: &Axes) {
        for (k, values) in &other.values {
            let entry = self.values.entry(k.clone()).or_default();
            for v in values {
                entry.insert(v.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_kept_sorted() {
        let mut axes = Axes::new();
        axes.insert("param", "130");
        axes.insert("param", "129");
        let values: Vec<_> = axes.values_of("param").collect();
        assert_eq!(values, vec!["129", "130"]);
    }

    #[test]
    fn merge_unions_value_sets() {
        let mut a = Axes::new();
        a.insert("param", "130");
        let mut b = Axes::new();
        b.insert("param", "129");
        a.merge(&b);
        assert_eq!(a.values_of("param").collect::<Vec<_>>(), vec!["129", "130"]);
    }
}
