//! Dist fan-out: databases spread across lanes by rendezvous hashing on
//! their database key, with reads aggregated and deduplicated across every
//! lane regardless of which one a write landed on.

use std::sync::Arc;

use chrono::NaiveDate;

use fdb_core::config::{DistLaneConfig, RootConfig, SpaceConfig};
use fdb_core::{Key, KeyChain, Request, Schema};
use fdb_dispatch::{rendezvous, DispatchContext, Dispatcher, DistDispatch};

const SCHEMA: &str = "[ class, expver\n  [ stream, date, time, domain, type, levtype\n    [ param:Param, step:Step ] ] ]";

fn build_dist(dir: &std::path::Path, lane_ids: &[&str]) -> Dispatcher {
    let schema = Arc::new(Schema::parse(SCHEMA).unwrap());
    let registry = Arc::new(schema.build_registry(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    let spaces = vec![SpaceConfig {
        handler: "Default".to_string(),
        roots: vec![RootConfig { path: dir.to_string_lossy().to_string(), list: true, retrieve: true, archive: true }],
    }];
    let ctx = DispatchContext::new(SCHEMA.to_string(), schema, registry, spaces, false);
    let lanes = lane_ids.iter().map(|id| DistLaneConfig { id: id.to_string(), writable: true, dispatch: None }).collect();
    Dispatcher::Dist(DistDispatch::new(lanes, &ctx).unwrap())
}

fn chain_for(expver: &str, param: &str) -> KeyChain {
    let mut db = Key::new();
    db.set_raw("class", "od");
    db.set_raw("expver", expver);
    let mut index = Key::new();
    index.set_raw("stream", "oper");
    index.set_raw("date", "20240101");
    index.set_raw("time", "0000");
    index.set_raw("domain", "g");
    index.set_raw("type", "fc");
    index.set_raw("levtype", "sfc");
    let mut datum = Key::new();
    datum.set_raw("param", param);
    datum.set_raw("step", "0");
    KeyChain::new(db, index, datum).unwrap()
}

#[test]
fn nine_databases_distribute_across_three_lanes_and_list_aggregates_them_all() {
    let dir = tempfile::tempdir().unwrap();
    let lane_ids = ["lane-a", "lane-b", "lane-c"];
    let dispatcher = build_dist(dir.path(), &lane_ids);

    for param in 1..=9 {
        let expver = format!("xxx{param}");
        let chain = chain_for(&expver, &param.to_string());
        dispatcher.archive(&chain, format!("payload-{param}").as_bytes()).unwrap();
    }
    dispatcher.flush().unwrap();

    let expvers: Vec<String> = (1..=9).map(|param| format!("xxx{param}")).collect();
    let mut request = Request::new();
    request.insert("class".to_string(), vec!["od".to_string()]);
    request.insert("expver".to_string(), expvers);
    let found = dispatcher.list(&request, true).unwrap();
    assert_eq!(found.len(), 9);
}

#[test]
fn rendezvous_assignment_is_stable_for_a_fixed_database_key() {
    let lane_ids = ["lane-a", "lane-b", "lane-c"];
    for param in 1..=9 {
        let expver = format!("xxx{param}");
        let chain = chain_for(&expver, &param.to_string());
        let fingerprint = chain.db.fingerprint();
        let first = rendezvous::pick(&lane_ids, fingerprint);
        let second = rendezvous::pick(&lane_ids, fingerprint);
        assert_eq!(first, second);
        assert!(first.is_some());
    }
}
