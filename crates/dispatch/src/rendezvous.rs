//! Rendezvous (highest-random-weight) hashing, used by [`crate::dist`] to
//! pick which writable lane a new database lands on without needing a
//! shared directory of existing assignments: every node computes the same
//! ranking independently from the lane id and the database key alone.

use xxhash_rust::xxh3::xxh3_64;

/// Score for one (lane, key) pair. Lanes are ranked by descending score;
/// the highest-scoring writable lane wins the archive.
fn score(lane_id: &str, key_fingerprint: u64) -> u64 {
    let mut bytes = Vec::with_capacity(lane_id.len() + 8);
    bytes.extend_from_slice(lane_id.as_bytes());
    bytes.extend_from_slice(&key_fingerprint.to_le_bytes());
    xxh3_64(&bytes)
}

/// Ranks `lane_ids` for `key_fingerprint`, highest score first. Ties break
/// on lane id so the ranking is stable across runs.
pub fn rank<'a>(lane_ids: &[&'a str], key_fingerprint: u64) -> Vec<&'a str> {
    let mut scored: Vec<(&str, u64)> = lane_ids.iter().map(|id| (*id, score(id, key_fingerprint))).collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Picks the single highest-ranked lane for `key_fingerprint`.
pub fn pick<'a>(lane_ids: &[&'a str], key_fingerprint: u64) -> Option<&'a str> {
    rank(lane_ids, key_fingerprint).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_is_deterministic_for_the_same_inputs() {
        let lanes = ["lane-a", "lane-b", "lane-c"];
        let first = rank(&lanes, 42);
        let second = rank(&lanes, 42);
        assert_eq!(first, second);
    }

    #[test]
    fn different_keys_can_rank_lanes_differently() {
        let lanes = ["lane-a", "lane-b", "lane-c"];
        let picks: std::collections::HashSet<_> = (0..50).map(|k| pick(&lanes, k).unwrap()).collect();
        assert!(picks.len() > 1, "rendezvous hashing should spread load across lanes");
    }

    #[test]
    fn removing_a_lane_only_reshuffles_its_own_keys() {
        let lanes = ["lane-a", "lane-b", "lane-c"];
        let fewer = ["lane-a", "lane-c"];
        for k in 0..50u64 {
            let before = pick(&lanes, k).unwrap();
            if before != "lane-b" {
                assert_eq!(pick(&fewer, k).unwrap(), before);
            }
        }
    }
}
