//! [`HandleGatherer`]: coalesces `ListElement`s gathered from one or more
//! lanes/databases into the single ordered result a caller sees. Per
//! `DESIGN.md`'s Open Question 2, `sorted` is the only thing `optimise=on`
//! toggles -- nothing else is implied by that flag.

use fdb_core::{Deduplicator, ListElement};

#[derive(Debug, Clone, Copy, Default)]
pub struct HandleGatherer {
    pub sorted: bool,
}

impl HandleGatherer {
    pub fn new(sorted: bool) -> Self {
        Self { sorted }
    }

    /// Merges one or more lanes' results and optionally stable-sorts by key
    /// display order. When `deduplicate` is set, collapses by combined-key
    /// fingerprint (a field visible through more than one lane, e.g. an
    /// overlay, is reported once); when it isn't, every lane's entries pass
    /// through untouched -- cross-lane coalescing is only valid when the
    /// caller asked to deduplicate.
    pub fn gather(&self, batches: Vec<Vec<ListElement>>, deduplicate: bool) -> Vec<ListElement> {
        let mut out = Vec::new();
        if deduplicate {
            let mut dedup = Deduplicator::new();
            for batch in batches {
                for elem in batch {
                    if dedup.admit(elem.key.fingerprint()) {
                        out.push(elem);
                    }
                }
            }
        } else {
            for batch in batches {
                out.extend(batch);
            }
        }
        if self.sorted {
            out.sort_by(|a, b| a.key.to_string().cmp(&b.key.to_string()));
        }
        out
    }
}
