//! [`SelectDispatch`]: routes each request to the first lane whose
//! `select`/`excludes` regex constraints match, mirroring fdb5's
//! `SelectDispatcher` -- a request is handled by exactly one lane, chosen
//! by keyword/value pattern rather than by hash.

use std::collections::HashMap;

use regex::Regex;

use fdb_core::config::{MatchOnMissing, SelectLaneConfig};
use fdb_core::{FieldLocation, KeyChain, ListElement, Request};

use crate::error::{DispatchError, FdbError};
use crate::gather::HandleGatherer;
use crate::DispatchContext;

struct Lane {
    id: String,
    select: HashMap<String, Regex>,
    excludes: HashMap<String, Regex>,
    match_on_missing: MatchOnMissing,
    dispatch: Box<crate::Dispatcher>,
}

pub struct SelectDispatch {
    lanes: Vec<Lane>,
    gatherer: HandleGatherer,
}

impl SelectDispatch {
    pub fn new(configs: Vec<SelectLaneConfig>, ctx: &DispatchContext) -> Result<Self, FdbError> {
        let mut lanes = Vec::with_capacity(configs.len());
        for config in configs {
            let select = compile(&config.select)?;
            let excludes = compile(&config.excludes)?;
            let nested = config.dispatch.map(|b| *b).unwrap_or_default();
            let dispatch = crate::Dispatcher::build(&nested, ctx)?;
            lanes.push(Lane { id: config.id, select, excludes, match_on_missing: config.match_on_missing, dispatch: Box::new(dispatch) });
        }
        Ok(Self { lanes, gatherer: HandleGatherer::new(ctx.optimise) })
    }

    /// `select` keywords are tested under the lane's configured
    /// `match_on_missing` policy; `excludes` always behaves as
    /// `DontMatchOnMissing` regardless of that policy (an absent exclude
    /// keyword is never treated as excluded) -- see `SelectMatcher::matchInner`
    /// in `examples/original_source/src/fdb5/rules/SelectMatcher.cc`, which
    /// hardcodes `Matcher::DontMatchOnMissing` for the exclude side only.
    fn matches(lane: &Lane, request: &Request) -> bool {
        let missing_matches = lane.match_on_missing == MatchOnMissing::MatchOnMissing;
        for (keyword, pattern) in &lane.select {
            let matched = request.get(keyword).map(|values| values.iter().any(|v| pattern.is_match(v))).unwrap_or(missing_matches);
            if !matched {
                return false;
            }
        }
        for (keyword, pattern) in &lane.excludes {
            let excluded = request.get(keyword).map(|values| values.iter().any(|v| pattern.is_match(v))).unwrap_or(false);
            if excluded {
                return false;
            }
        }
        true
    }

    fn lane_for(&self, request: &Request) -> Result<&Lane, FdbError> {
        self.lanes.iter().find(|lane| Self::matches(lane, request)).ok_or_else(|| DispatchError::NoMatchingRoot.into())
    }

    fn lane_for_key(&self, key: &fdb_core::Key) -> Result<&Lane, FdbError> {
        let request: Request = key.iter().map(|(k, v)| (k.to_string(), vec![v.to_string()])).collect();
        self.lane_for(&request)
    }

    pub fn archive(&self, chain: &KeyChain, data: &[u8]) -> Result<(), FdbError> {
        self.lane_for_key(&chain.db)?.dispatch.archive(chain, data)
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
            if Self::matches(lane, request) {
                batches.push(lane.dispatch.list(request, deduplicate)?);
            }
        }
        Ok(self.gatherer.gather(batches, deduplicate))
    }

    pub fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, FdbError> {
        self.lane_for_key(&chain.db)?.dispatch.inspect(chain)
    }

    pub fn read(&self, chain: &KeyChain) -> Result<Option<Vec<u8>>, FdbError> {
        self.lane_for_key(&chain.db)?.dispatch.read(chain)
    }

    pub fn lane_ids(&self) -> Vec<&str> {
        self.lanes.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn wipe(&self, request: &Request, dry_run: bool, unsafe_wipe_all: bool) -> Result<Vec<String>, FdbError> {
        let mut removed = Vec::new();
        for lane in &self.lanes {
            if Self::matches(lane, request) {
                removed.extend(lane.dispatch.wipe(request, dry_run, unsafe_wipe_all)?);
            }
        }
        Ok(removed)
    }

    pub fn purge(&self, request: &Request, dry_run: bool) -> Result<Vec<String>, FdbError> {
        let mut reclaimed = Vec::new();
        for lane in &self.lanes {
            if Self::matches(lane, request) {
                reclaimed.extend(lane.dispatch.purge(request, dry_run)?);
            }
        }
        Ok(reclaimed)
    }

    pub fn axes(&self, request: &Request) -> Result<fdb_core::Axes, FdbError> {
        let mut merged = fdb_core::Axes::new();
        for lane in &self.lanes {
            if Self::matches(lane, request) {
                merged.merge(&lane.dispatch.axes(request)?);
            }
        }
        Ok(merged)
    }
}

fn compile(patterns: &HashMap<String, String>) -> Result<HashMap<String, Regex>, FdbError> {
    patterns
        .iter()
        .map(|(k, v)| Regex::new(&format!("^(?:{v})$")).map(|re| (k.clone(), re)).map_err(|e| DispatchError::LaneFailure(e.to_string()).into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn select_matches_require_every_keyword_constraint() {
        let select = compile(&pattern_map(&[("class", "od|rd")])).unwrap();
        let excludes = compile(&pattern_map(&[])).unwrap();
        let ctx = DispatchContext::for_test();
        let lane = Lane {
            id: "lane-a".to_string(),
            select,
            excludes,
            match_on_missing: MatchOnMissing::DontMatchOnMissing,
            dispatch: Box::new(crate::Dispatcher::build(&Default::default(), &ctx).unwrap()),
        };
        let mut matching = Request::new();
        matching.insert("class".to_string(), vec!["od".to_string()]);
        assert!(SelectDispatch::matches(&lane, &matching));

        let mut not_matching = Request::new();
        not_matching.insert("class".to_string(), vec!["xx".to_string()]);
        assert!(!SelectDispatch::matches(&lane, &not_matching));
    }

    #[test]
    fn match_on_missing_treats_an_absent_select_keyword_as_satisfied() {
        let select = compile(&pattern_map(&[("class", "od")])).unwrap();
        let ctx = DispatchContext::for_test();
        let lane = Lane {
            id: "lane-a".to_string(),
            select,
            excludes: HashMap::new(),
            match_on_missing: MatchOnMissing::MatchOnMissing,
            dispatch: Box::new(crate::Dispatcher::build(&Default::default(), &ctx).unwrap()),
        };
        // `class` is entirely absent from the request; under
        // `MatchOnMissing` that still satisfies the `select` constraint.
        let request = Request::new();
        assert!(SelectDispatch::matches(&lane, &request));
    }

    #[test]
    fn excludes_never_match_on_missing_regardless_of_the_lane_policy() {
        let select = compile(&pattern_map(&[("class", "od")])).unwrap();
        let excludes = compile(&pattern_map(&[("number", "1|2")])).unwrap();
        let ctx = DispatchContext::for_test();
        let lane = Lane {
            id: "lane-a".to_string(),
            select,
            excludes,
            match_on_missing: MatchOnMissing::MatchOnMissing,
            dispatch: Box::new(crate::Dispatcher::build(&Default::default(), &ctx).unwrap()),
        };
        // `number` is absent; an absent exclude keyword is never treated as
        // excluded, so the lane still matches even with `MatchOnMissing` set.
        let mut request = Request::new();
        request.insert("class".to_string(), vec!["od".to_string()]);
        assert!(SelectDispatch::matches(&lane, &request));
    }

    /// Three lanes with overlapping select/exclude constraints, exercised
    /// against every `time x number` combination, assigning each to the
    /// first lane (in configured order) whose constraints match -- mirrors
    /// how `lane_for`/`archive` picks a lane for a write.
    #[test]
    fn first_matching_lane_wins_and_tallies_match_the_documented_split() {
        let ctx = DispatchContext::for_test();
        let build_lane = |id: &str, select: &[(&str, &str)], excludes: &[(&str, &str)]| Lane {
            id: id.to_string(),
            select: compile(&pattern_map(select)).unwrap(),
            excludes: compile(&pattern_map(excludes)).unwrap(),
            match_on_missing: MatchOnMissing::DontMatchOnMissing,
            dispatch: Box::new(crate::Dispatcher::build(&Default::default(), &ctx).unwrap()),
        };
        let lanes = vec![
            build_lane("lane-1", &[("time", "0000")], &[("number", "1|2")]),
            build_lane("lane-2", &[("time", "1200")], &[("number", "2")]),
            build_lane("lane-3", &[("number", "1|2")], &[]),
        ];

        let mut tallies = [0usize; 3];
        for time in ["0000", "1200"] {
            for number in ["1", "2", "3"] {
                let mut request = Request::new();
                request.insert("time".to_string(), vec![time.to_string()]);
                request.insert("number".to_string(), vec![number.to_string()]);
                let winner = lanes.iter().position(|lane| SelectDispatch::matches(lane, &request)).expect("one lane always matches");
                tallies[winner] += 1;
            }
        }
        assert_eq!(tallies, [1, 2, 3]);
    }
}
