//! Deterministic synthetic field payloads, grounded on
//! `crates/testing/src/blocks.rs`'s `slot_to_hash()` -- the same "hash a
//! small seed into reproducible bytes" shape, generalized from a chain
//! block hash to an opaque field payload a test can archive and compare.

use xxhash_rust::xxh3::xxh3_64;

/// A deterministic payload for `(param, step, generation)`, long enough
/// to exercise byte-range reads without needing real GRIB bytes. Two
/// calls with the same arguments always return the same bytes; different
/// generations of the same `(param, step)` always differ.
pub fn synthetic_payload(param: &str, step: &str, generation: u64) -> Vec<u8> {
    let seed = format!("{param}:{step}:{generation}");
    let hash = xxh3_64(seed.as_bytes());
    let mut out = seed.into_bytes();
    out.extend_from_slice(&hash.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_arguments_are_reproducible() {
        assert_eq!(synthetic_payload("130", "1", 0), synthetic_payload("130", "1", 0));
    }

    #[test]
    fn different_generations_differ() {
        assert_ne!(synthetic_payload("130", "1", 0), synthetic_payload("130", "1", 1));
    }
}
