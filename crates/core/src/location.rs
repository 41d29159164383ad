//! [`FieldLocation`]: where one archived field lives -- a store URI plus a
//! byte range within it, and an optional key used to remap the result back
//! onto request-time keyword spellings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::key::Key;

/// Addresses a contiguous byte range inside a store unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLocation {
    pub uri: String,
    pub offset: u64,
    pub length: u64,
    /// Values substituted back into the result key at retrieve time, for
    /// keywords whose canonical on-disk form differs from the request
    /// spelling (e.g. a step value with its unit restored).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remap_key: Option<Key>,
}

impl FieldLocation {
    pub fn new(uri: impl Into<String>, offset: u64, length: u64) -> Self {
        Self { uri: uri.into(), offset, length, remap_key: None }
    }

    pub fn with_remap(mut self, remap_key: Key) -> Self {
        self.remap_key = Some(remap_key);
        self
    }

    /// Whether `other`'s byte range overlaps this one within the same URI.
    /// Used by store backends validating that concurrent writers did not
    /// stomp on each other's ranges.
    pub fn overlaps(&self, other: &FieldLocation) -> bool {
        if self.uri != other.uri {
            return false;
        }
        let (a_start, a_end) = (self.offset, self.offset + self.length);
        let (b_start, b_end) = (other.offset, other.offset + other.length);
        a_start < b_end && b_start < a_end
    }
}

impl fmt::Display for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}+{}", self.uri, self.offset, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_in_different_uris_never_overlap() {
        let a = FieldLocation::new("file:///a", 0, 100);
        let b = FieldLocation::new("file:///b", 0, 100);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn overlapping_ranges_in_same_uri_detected() {
        let a = FieldLocation::new("file:///a", 0, 100);
        let b = FieldLocation::new("file:///a", 50, 100);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        let a = FieldLocation::new("file:///a", 0, 100);
        let b = FieldLocation::new("file:///a", 100, 100);
        assert!(!a.overlaps(&b));
    }

    proptest::proptest! {
        /// §8's round-trip law: `decode(encode(FieldLocation x)) == x`.
        #[test]
        fn json_round_trips(uri in "[a-z]{2,8}://[a-z0-9/]{1,16}", offset: u64, length: u64) {
            let location = FieldLocation::new(uri, offset, length);
            let encoded = serde_json::to_vec(&location).unwrap();
            let decoded: FieldLocation = serde_json::from_slice(&encoded).unwrap();
            proptest::prop_assert_eq!(location, decoded);
        }
    }
}
