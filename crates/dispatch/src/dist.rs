//! [`DistDispatch`]: spreads writes across a set of lanes by rendezvous
//! hashing on the database key, and fans reads out across every lane
//! (a database could have landed on any of them), merging results through
//! a [`HandleGatherer`]. Mirrors fdb5's `DistFDB`.

use std::sync::atomic::{AtomicBool, Ordering};

use fdb_core::config::DistLaneConfig;
use fdb_core::{FieldLocation, Key, KeyChain, ListElement, Request};

use crate::error::{DispatchError, FdbError};
use crate::gather::HandleGatherer;
use crate::rendezvous;
use crate::DispatchContext;

struct Lane {
    id: String,
    writable: bool,
    /// Set once an archive to this lane fails before any bytes were known
    /// to reach its store; a disabled lane is skipped by every later
    /// archive until the process restarts. §4.4 gives no re-enable path.
    disabled: AtomicBool,
    dispatch: Box<crate::Dispatcher>,
}

/// `Database::archive` writes to the store before it appends to the
/// catalogue, so a `Catalogue` error here means the store write already
/// landed -- the lane is dirty and must not be retried elsewhere. Any other
/// error (store failure, schema error, ...) happened no later than the
/// store write itself, so the lane can be disabled and the next one tried.
fn is_dirty_error(err: &FdbError) -> bool {
    matches!(err, FdbError::Catalogue(_))
}

pub struct DistDispatch {
    lanes: Vec<Lane>,
    gatherer: HandleGatherer,
}

impl DistDispatch {
    pub fn new(configs: Vec<DistLaneConfig>, ctx: &DispatchContext) -> Result<Self, FdbError> {
        let mut lanes = Vec::with_capacity(configs.len());
        for config in configs {
            let nested = config.dispatch.map(|b| *b).unwrap_or_default();
            let dispatch = crate::Dispatcher::build(&nested, ctx)?;
            lanes.push(Lane { id: config.id, writable: config.writable, disabled: AtomicBool::new(false), dispatch: Box::new(dispatch) });
        }
        Ok(Self { lanes, gatherer: HandleGatherer::new(ctx.optimise) })
    }

    /// Ranks the writable, non-disabled lanes for `db_key` by rendezvous
    /// score, highest first -- the order `archive` tries them in.
    fn candidate_lanes(&self, db_key: &Key) -> Vec<&Lane> {
        let ids: Vec<&str> = self.lanes.iter().filter(|l| l.writable && !l.disabled.load(Ordering::Relaxed)).map(|l| l.id.as_str()).collect();
        rendezvous::rank(&ids, db_key.fingerprint())
            .into_iter()
            .map(|id| self.lanes.iter().find(|l| l.id == id).expect("rank only returns ids passed into it"))
            .collect()
    }

    /// Tries writable, non-disabled lanes in rendezvous order (§4.4). An
    /// error before any bytes reached the lane's store marks that lane
    /// disabled and moves on to the next; an error after the store write
    /// landed (dirty) fails fast rather than risk a second lane also
    /// picking up the same field.
    pub fn archive(&self, chain: &KeyChain, data: &[u8]) -> Result<(), FdbError> {
        let candidates = self.candidate_lanes(&chain.db);
        if candidates.is_empty() {
            return Err(DispatchError::NoWritableLane.into());
        }
        let mut last_err = None;
        for lane in candidates {
            match lane.dispatch.archive(chain, data) {
                Ok(()) => return Ok(()),
                Err(err) if is_dirty_error(&err) => {
                    return Err(DispatchError::DistributionError { lane: lane.id.clone(), source: err.to_string() }.into());
                }
                Err(err) => {
                    lane.disabled.store(true, Ordering::Relaxed);
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| DispatchError::NoWritableLane.into()))
    }

    pub fn flush(&self) -> Result<(), FdbError> {
        for lane in &self.lanes {
            lane.dispatch.flush()?;
        }
        Ok(())
    }

    pub fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, FdbError> {
        let mut batches = Vec::new();
        for lane in &self.lanes {
            batches.push(lane.dispatch.list(request, deduplicate)?);
        }
        Ok(self.gatherer.gather(batches, deduplicate))
    }

    pub fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, FdbError> {
        for lane in &self.lanes {
            if let Some(location) = lane.dispatch.inspect(chain)? {
                return Ok(Some(location));
            }
        }
        Ok(None)
    }

    pub fn read(&self, chain: &KeyChain) -> Result<Option<Vec<u8>>, FdbError> {
        for lane in &self.lanes {
            if let Some(data) = lane.dispatch.read(chain)? {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    pub fn lane_ids(&self) -> Vec<&str> {
        self.lanes.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn wipe(&self, request: &Request, dry_run: bool, unsafe_wipe_all: bool) -> Result<Vec<String>, FdbError> {
        let mut removed = Vec::new();
        for lane in &self.lanes {
            removed.extend(lane.dispatch.wipe(request, dry_run, unsafe_wipe_all)?);
        }
        Ok(removed)
    }

    pub fn purge(&self, request: &Request, dry_run: bool) -> Result<Vec<String>, FdbError> {
        let mut reclaimed = Vec::new();
        for lane in &self.lanes {
            reclaimed.extend(lane.dispatch.purge(request, dry_run)?);
        }
        Ok(reclaimed)
    }

    pub fn axes(&self, request: &Request) -> Result<fdb_core::Axes, FdbError> {
        let mut merged = fdb_core::Axes::new();
        for lane in &self.lanes {
            merged.merge(&lane.dispatch.axes(request)?);
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_lane_selection_is_stable_for_the_same_key() {
        let lanes = vec!["lane-a", "lane-b", "lane-c"];
        let mut key = Key::new();
        key.set_raw("expver", "xxxx");
        let first = rendezvous::pick(&lanes, key.fingerprint());
        let second = rendezvous::pick(&lanes, key.fingerprint());
        assert_eq!(first, second);
    }
}
