//! `Key`: an ordered, keyword-unique association of strings, optionally bound
//! to a [`TypeRegistry`] for on-insert canonicalization. `KeyChain` is the
//! fixed (db, index, datum) triple that addresses one field.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::types::TypeRegistry;

/// An ordered keyword -> value map with at most one entry per keyword.
///
/// Equality compares the canonicalized dictionary, not insertion order: two
/// keys built in different orders but holding the same keyword/value pairs
/// (after canonicalization) are equal.
#[derive(Debug, Clone, Default)]
pub struct Key {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    registry: Option<Arc<TypeRegistry>>,
}

impl Key {
    pub fn new() -> Self {
        Self::default()
    }

    /// A key that canonicalizes every inserted value against `registry`.
    pub fn typed(registry: Arc<TypeRegistry>) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            registry: Some(registry),
        }
    }

    pub fn is_typed(&self) -> bool {
        self.registry.is_some()
    }

    /// Insert or overwrite `keyword`. If this key is typed, `value` is
    /// canonicalized against the registry before being stored.
    pub fn set(&mut self, keyword: impl Into<String>, value: impl Into<String>) -> Result<(), SchemaError> {
        let keyword = keyword.into();
        let value = value.into();

        let value = match &self.registry {
            Some(reg) => reg.canonicalize(&keyword, &value)?,
            None => value,
        };

        self.set_raw(keyword, value);
        Ok(())
    }

    /// Insert without canonicalization, bypassing the registry. Used when the
    /// caller has already canonicalized the value (e.g. schema expansion).
    pub fn set_raw(&mut self, keyword: impl Into<String>, value: impl Into<String>) {
        let keyword = keyword.into();
        let value = value.into();

        if let Some(&pos) = self.index.get(&keyword) {
            self.entries[pos].1 = value;
        } else {
            self.index.insert(keyword.clone(), self.entries.len());
            self.entries.push((keyword, value));
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.index.get(keyword).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn unset(&mut self, keyword: &str) -> Option<String> {
        let pos = self.index.remove(keyword)?;
        let (_, value) = self.entries.remove(pos);
        // Reindex entries shifted down by the removal.
        for idx in self.index.values_mut() {
            if *idx > pos {
                *idx -= 1;
            }
        }
        Some(value)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.index.contains_key(keyword)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate in insertion order (what a caller should use for display).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The canonical dictionary, keyword-sorted, used for equality,
    /// fingerprinting and serialization where order must not matter.
    fn canonical_dict(&self) -> BTreeMap<&str, &str> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    /// A stable 64-bit fingerprint over the canonical dictionary, used by
    /// the catalogue's index hash table to locate a datum key's slot.
    pub fn fingerprint(&self) -> u64 {
        fingerprint_pairs(self.canonical_dict().into_iter())
    }

    /// A fingerprint seeded by another key's fingerprint, so the same datum
    /// key fingerprints differently under sibling indexes (used to avoid
    /// cross-index aliasing in a shared hash table implementation).
    pub fn seeded_fingerprint(&self, seed: u64) -> u64 {
        let base = self.fingerprint();
        xxhash_rust::xxh3::xxh3_64_with_seed(&base.to_le_bytes(), seed)
    }

    pub fn merge_from(&mut self, other: &Key) {
        for (k, v) in other.iter() {
            self.set_raw(k, v);
        }
    }

    /// A copy of this key retaining only the given keywords, in their
    /// original relative order.
    pub fn project(&self, keywords: &[&str]) -> Key {
        let mut out = Key {
            entries: Vec::new(),
            index: HashMap::new(),
            registry: self.registry.clone(),
        };
        for (k, v) in self.iter() {
            if keywords.contains(&k) {
                out.set_raw(k, v);
            }
        }
        out
    }
}

pub(crate) fn fingerprint_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> u64 {
    let mut buf = Vec::new();
    for (k, v) in pairs {
        buf.extend_from_slice(k.as_bytes());
        buf.push(0);
        buf.extend_from_slice(v.as_bytes());
        buf.push(0);
    }
    xxhash_rust::xxh3::xxh3_64(&buf)
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_dict() == other.canonical_dict()
    }
}
impl Eq for Key {}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.entries.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries: Vec<(String, String)> = {
            let map: indexed_map::OrderedStringMap = Deserialize::deserialize(deserializer)?;
            map.0
        };
        let mut key = Key::new();
        for (k, v) in entries {
            key.set_raw(k, v);
        }
        Ok(key)
    }
}

/// Deserialize helper that preserves the order keys were written in a JSON
/// or YAML map (serde_json/serde_yaml both preserve map order on read).
mod indexed_map {
    use serde::de::{MapAccess, Visitor};
    use serde::Deserializer;
    use std::fmt;

    pub(super) struct OrderedStringMap(pub Vec<(String, String)>);

    impl<'de> serde::Deserialize<'de> for OrderedStringMap {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct MapVisitor;
            impl<'de> Visitor<'de> for MapVisitor {
                type Value = OrderedStringMap;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str("a map of string to string")
                }

                fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
                where
                    A: MapAccess<'de>,
                {
                    let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                    while let Some((k, v)) = access.next_entry::<String, String>()? {
                        entries.push((k, v));
                    }
                    Ok(OrderedStringMap(entries))
                }
            }
            deserializer.deserialize_map(MapVisitor)
        }
    }
}

/// The three-level key hierarchy: database, index, datum. Invariant: the
/// three sub-keys are disjoint (no keyword appears in more than one level).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChain {
    pub db: Key,
    pub index: Key,
    pub datum: Key,
}

impl KeyChain {
    pub fn new(db: Key, index: Key, datum: Key) -> Result<Self, SchemaError> {
        let chain = Self { db, index, datum };
        chain.check_disjoint()?;
        Ok(chain)
    }

    fn check_disjoint(&self) -> Result<(), SchemaError> {
        for kw in self.db.keywords() {
            if self.index.contains(kw) || self.datum.contains(kw) {
                tracing::warn!(keyword = kw, "keyword collision across key chain levels");
                return Err(SchemaError::KeywordCollision(kw.to_string()));
            }
        }
        for kw in self.index.keywords() {
            if self.datum.contains(kw) {
                tracing::warn!(keyword = kw, "keyword collision across key chain levels");
                return Err(SchemaError::KeywordCollision(kw.to_string()));
            }
        }
        Ok(())
    }

    /// The ordered union db ∪ index ∪ datum, each level folded in turn.
    /// Because the three sub-keys are disjoint, fold order never overwrites
    /// an earlier level's value -- it only determines display order.
    pub fn combined(&self) -> Key {
        let mut out = Key::new();
        out.merge_from(&self.db);
        out.merge_from(&self.index);
        out.merge_from(&self.datum);
        out
    }
}

impl Display for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.combined())
    }
}
