//! [`HyperCube`]: the cartesian-product domain implied by an index's axes,
//! used to tell a dense, fully-populated index (every combination of its
//! keyword values present) from a sparse one, and [`Deduplicator`], which
//! collapses repeated entries produced by overlapping SubTocs.

use std::collections::HashSet;

use crate::axes::Axes;
use crate::key::Key;

/// The cartesian product of a fixed ordered set of keywords' value axes.
#[derive(Debug, Clone)]
pub struct HyperCube {
    keywords: Vec<String>,
    axis_values: Vec<Vec<String>>,
}

impl HyperCube {
    /// Builds a cube over `keywords`, pulling each keyword's sorted value
    /// set out of `axes`. Keywords absent from `axes` get an empty axis,
    /// collapsing the cube's size to zero.
    pub fn from_axes(axes: &Axes, keywords: &[&str]) -> Self {
        let axis_values = keywords
            .iter()
            .map(|kw| axes.values_of(kw).map(str::to_string).collect())
            .collect();
        Self {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            axis_values,
        }
    }

    /// Total number of distinct coordinates in the cube, i.e. the count of
    /// fields a fully dense index over these keywords would hold.
    pub fn size(&self) -> u64 {
        self.axis_values.iter().map(|a| a.len() as u64).product()
    }

    pub fn is_empty(&self) -> bool {
        self.axis_values.iter().any(Vec::is_empty)
    }

    /// Locates `key`'s position within the cube. Returns `None` if `key` is
    /// missing one of the cube's keywords or holds a value outside that
    /// keyword's observed axis -- such a key falls outside the dense grid.
    pub fn coordinate_of(&self, key: &Key) -> Option<Vec<usize>> {
        self.keywords
            .iter()
            .zip(&self.axis_values)
            .map(|(kw, axis)| {
                let value = key.get(kw)?;
                axis.iter().position(|v| v == value)
            })
            .collect()
    }

    /// Whether every coordinate in the cube is present in `seen`.
    pub fn is_dense(&self, seen: &HashSet<Vec<usize>>) -> bool {
        if self.is_empty() {
            return seen.is_empty();
        }
        seen.len() as u64 == self.size()
    }
}

/// Tracks field fingerprints already emitted during a list/wipe scan so
/// that an entry masked by a later SubToc, or duplicated across index
/// files, is only reported once.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<u64>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a fingerprint is seen, `false` on every
    /// repeat -- callers should skip entries for which this returns `false`.
    pub fn admit(&mut self, fingerprint: u64) -> bool {
        self.seen.insert(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
