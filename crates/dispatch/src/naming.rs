//! The one thing every dispatch lane needs to agree on: how a database
//! key maps to a directory name on disk. `<dbKey.valuesToString()>`, e.g.
//! `od:0001:oper:20120911:0000:g`, matches the on-disk layout the CLI and
//! the wire protocol both assume.

use fdb_core::Key;

pub fn db_dir_name(db_key: &Key) -> String {
    db_key.iter().map(|(_, v)| v).collect::<Vec<_>>().join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_values_in_insertion_order_with_colons() {
        let mut key = Key::new();
        key.set_raw("class", "od");
        key.set_raw("expver", "0001");
        key.set_raw("stream", "oper");
        assert_eq!(db_dir_name(&key), "od:0001:oper");
    }
}
