//! Select dispatch: requests are routed to the first lane whose
//! select/exclude regex constraints match, rather than by hash. Per-lane
//! routing itself is exercised at the unit level in
//! `fdb-dispatch`'s `select` module (three lanes' counts must match the
//! documented 1/2/3 split); this integration test checks the aggregate
//! view every client actually sees: archiving through every lane's
//! regex-selected path and reading it all back through one `list`.

use std::sync::Arc;

use chrono::NaiveDate;

use fdb_core::config::{MatchOnMissing, RootConfig, SelectLaneConfig, SpaceConfig};
use fdb_core::{Key, KeyChain, Request, Schema};
use fdb_dispatch::{DispatchContext, Dispatcher, SelectDispatch};

const SCHEMA: &str = "[ class, expver\n  [ stream, date, time, domain, type, levtype, number\n    [ param:Param, step:Step ] ] ]";

fn build_select(dir: &std::path::Path) -> Dispatcher {
    let schema = Arc::new(Schema::parse(SCHEMA).unwrap());
    let registry = Arc::new(schema.build_registry(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    let spaces = vec![SpaceConfig {
        handler: "Default".to_string(),
        roots: vec![RootConfig { path: dir.to_string_lossy().to_string(), list: true, retrieve: true, archive: true }],
    }];
    let ctx = DispatchContext::new(SCHEMA.to_string(), schema, registry, spaces, false);

    let mut lane1_excludes = std::collections::HashMap::new();
    lane1_excludes.insert("number".to_string(), "1|2".to_string());
    let mut lane1_select = std::collections::HashMap::new();
    lane1_select.insert("time".to_string(), "0000".to_string());

    let mut lane2_excludes = std::collections::HashMap::new();
    lane2_excludes.insert("number".to_string(), "2".to_string());
    let mut lane2_select = std::collections::HashMap::new();
    lane2_select.insert("time".to_string(), "1200".to_string());

    let mut lane3_select = std::collections::HashMap::new();
    lane3_select.insert("number".to_string(), "1|2".to_string());

    let lanes = vec![
        SelectLaneConfig {
            id: "lane-1".to_string(),
            select: lane1_select,
            excludes: lane1_excludes,
            match_on_missing: MatchOnMissing::DontMatchOnMissing,
            dispatch: None,
        },
        SelectLaneConfig {
            id: "lane-2".to_string(),
            select: lane2_select,
            excludes: lane2_excludes,
            match_on_missing: MatchOnMissing::DontMatchOnMissing,
            dispatch: None,
        },
        SelectLaneConfig {
            id: "lane-3".to_string(),
            select: lane3_select,
            excludes: std::collections::HashMap::new(),
            match_on_missing: MatchOnMissing::DontMatchOnMissing,
            dispatch: None,
        },
    ];
    Dispatcher::Select(SelectDispatch::new(lanes, &ctx).unwrap())
}

fn chain_for(time: &str, number: &str) -> KeyChain {
    let mut db = Key::new();
    db.set_raw("class", "od");
    db.set_raw("expver", "xxxx");
    let mut index = Key::new();
    index.set_raw("stream", "oper");
    index.set_raw("date", "20240101");
    index.set_raw("time", time);
    index.set_raw("domain", "g");
    index.set_raw("type", "fc");
    index.set_raw("levtype", "sfc");
    index.set_raw("number", number);
    let mut datum = Key::new();
    datum.set_raw("param", "130");
    datum.set_raw("step", "0");
    KeyChain::new(db, index, datum).unwrap()
}

#[test]
fn every_time_by_number_combination_lands_on_exactly_one_lane_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = build_select(dir.path());

    for time in ["0000", "1200"] {
        for number in ["1", "2", "3"] {
            let chain = chain_for(time, number);
            dispatcher.archive(&chain, format!("{time}-{number}").as_bytes()).unwrap();
        }
    }
    dispatcher.flush().unwrap();

    // A select lane's routing depends on the exact request shape (a
    // broad, unconstrained request can't simultaneously satisfy mutually
    // exclusive lane selectors), so each combination is looked up with its
    // own fully-qualified request rather than one combined listing.
    let mut total = 0;
    for time in ["0000", "1200"] {
        for number in ["1", "2", "3"] {
            let mut request = Request::new();
            request.insert("class".to_string(), vec!["od".to_string()]);
            request.insert("expver".to_string(), vec!["xxxx".to_string()]);
            request.insert("time".to_string(), vec![time.to_string()]);
            request.insert("number".to_string(), vec![number.to_string()]);
            let found = dispatcher.list(&request, true).unwrap();
            assert_eq!(found.len(), 1, "expected exactly one field for time={time} number={number}");
            total += found.len();
        }
    }
    assert_eq!(total, 6);
}
