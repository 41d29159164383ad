//! [`ListElement`]: one row of a `list`/`wipe --list` result -- the combined
//! key for a field plus, optionally, where it is stored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::{Key, KeyChain};
use crate::location::FieldLocation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListElement {
    pub key: Key,
    pub location: Option<FieldLocation>,
}

impl ListElement {
    pub fn new(chain: &KeyChain, location: Option<FieldLocation>) -> Self {
        Self { key: chain.combined(), location }
    }
}

impl fmt::Display for ListElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}  {loc}", self.key),
            None => write!(f, "{}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_location_omits_trailing_fields() {
        let mut db = Key::new();
        db.set_raw("class", "od");
        let chain = KeyChain::new(db, Key::new(), Key::new()).unwrap();
        let elem = ListElement::new(&chain, None);
        assert_eq!(elem.to_string(), "class=od");
    }
}
