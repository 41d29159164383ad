//! End-to-end scenarios against a single local database: archive+list,
//! step-unit canonicalization, deduplication, and purge. Dist/select
//! fan-out scenarios live in `tests/dist.rs`/`tests/select.rs`.

use fdb_core::{Key, KeyChain, Request};
use fdb_testing::ToyFdb;

fn db() -> Key {
    let mut db = Key::new();
    db.set_raw("class", "od");
    db.set_raw("expver", "xxxx");
    db
}

fn index(time: &str) -> Key {
    let mut index = Key::new();
    index.set_raw("stream", "oper");
    index.set_raw("date", "20101010");
    index.set_raw("time", time);
    index.set_raw("domain", "g");
    index.set_raw("type", "fc");
    index.set_raw("levtype", "sfc");
    index
}

fn request_for(class: &str, expver: &str) -> Request {
    let mut request = Request::new();
    request.insert("class".to_string(), vec![class.to_string()]);
    request.insert("expver".to_string(), vec![expver.to_string()]);
    request
}

#[test]
fn single_archive_and_list_round_trips_the_payload() {
    let fdb = ToyFdb::new();

    let mut datum = Key::new();
    datum.set_raw("param", "130");
    datum.set_raw("step", "1");
    let chain = KeyChain::new(db(), index("0000"), datum).unwrap();

    fdb.archive(&chain, b"Raining cats and dogs").unwrap();
    fdb.flush().unwrap();

    let found = fdb.list(&request_for("od", "xxxx"), true).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(fdb.read(&chain).unwrap().unwrap(), b"Raining cats and dogs");
}

#[test]
fn step_unit_suffixes_canonicalize_and_range_expansion_finds_both() {
    let fdb = ToyFdb::new();

    let mut hour_datum = Key::new();
    hour_datum.set_raw("param", "130");
    hour_datum.set_raw("step", "2");
    let hour_chain = KeyChain::new(db(), index("0000"), hour_datum).unwrap();
    fdb.archive(&hour_chain, b"hour step").unwrap();

    let mut minute_datum = Key::new();
    minute_datum.set_raw("param", "130");
    minute_datum.set_raw("step", "30m");
    let minute_chain = KeyChain::new(db(), index("0000"), minute_datum).unwrap();
    fdb.archive(&minute_chain, b"minute step").unwrap();
    fdb.flush().unwrap();

    let mut by_hour = request_for("od", "xxxx");
    by_hour.insert("step".to_string(), vec!["2".to_string()]);
    assert_eq!(fdb.list(&by_hour, true).unwrap().len(), 1);

    let mut by_minute = request_for("od", "xxxx");
    by_minute.insert("step".to_string(), vec!["30m".to_string()]);
    assert_eq!(fdb.list(&by_minute, true).unwrap().len(), 1);

    let steps = fdb_core::request::expand_values(fdb.registry(), "step", "0/to/2/by/30m").unwrap();
    assert_eq!(steps, vec!["0", "30m", "1", "90m", "2"]);

    let mut by_range = request_for("od", "xxxx");
    by_range.insert("step".to_string(), steps);
    let found = fdb.list(&by_range, true).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn deduplication_hypercube_keeps_only_the_latest_write_per_key() {
    let fdb = ToyFdb::new();

    let params = ["167", "168"];
    let steps = ["0", "1", "2"];
    for generation in 0..3u8 {
        for param in &params {
            for step in &steps {
                let mut datum = Key::new();
                datum.set_raw("param", *param);
                datum.set_raw("step", *step);
                let chain = KeyChain::new(db(), index("0000"), datum).unwrap();
                let payload = format!("gen{generation}-{param}-{step}");
                fdb.archive(&chain, payload.as_bytes()).unwrap();
            }
        }
        fdb.flush().unwrap();
    }

    let request = request_for("od", "xxxx");
    assert_eq!(fdb.list(&request, true).unwrap().len(), params.len() * steps.len());
    assert_eq!(fdb.list(&request, false).unwrap().len(), params.len() * steps.len() * 3);
}

#[test]
fn purge_preserves_live_writes_and_removes_masked_ones() {
    let fdb = ToyFdb::new();

    let params = ["167", "168"];
    let steps = ["0", "1", "2"];
    for generation in 0..3u8 {
        for param in &params {
            for step in &steps {
                let mut datum = Key::new();
                datum.set_raw("param", *param);
                datum.set_raw("step", *step);
                let chain = KeyChain::new(db(), index("0000"), datum).unwrap();
                let payload = format!("gen{generation}-{param}-{step}");
                fdb.archive(&chain, payload.as_bytes()).unwrap();
            }
        }
        fdb.flush().unwrap();
    }

    let request = request_for("od", "xxxx");
    assert_eq!(fdb.list(&request, false).unwrap().len(), params.len() * steps.len() * 3);

    fdb.purge(&request, false).unwrap();

    assert_eq!(fdb.list(&request, true).unwrap().len(), params.len() * steps.len());
    assert_eq!(fdb.list(&request, false).unwrap().len(), params.len() * steps.len());
}

#[test]
fn resolving_a_request_with_an_extra_mandatory_keyword_missing_errors() {
    let fdb = ToyFdb::new();

    // `stream` is mandatory at the index level and absent here, so this
    // can never resolve to a single field.
    let mut request = request_for("od", "xxxx");
    request.insert("param".to_string(), vec!["130".to_string()]);
    assert!(fdb.resolve_chain(&request).is_err());
}
