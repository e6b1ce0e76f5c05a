//! Debug-block hierarchy extraction.
//!
//! The flow is leaf-first: [`source`] loads the filtered lines of a chip
//! description, [`scan`] finds parenthesis-balanced blocks, [`extract`] keeps
//! the ones carrying debug-block identifiers, and [`expand`] turns
//! parameterized instance names into the keyed [`CanonicalRecordSet`].

use std::collections::BTreeSet;

use indexmap::IndexMap;
use jzon::JsonValue;

pub mod expand;
pub mod extract;
pub mod scan;
pub mod source;

/// Separator between module and instance in a canonical key.
pub const KEY_SEP: &str = "::";

pub fn make_key(module: &str, instance: &str) -> String {
    format!("{module}{KEY_SEP}{instance}")
}

/// Splits a canonical key at the last separator.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.rsplit_once(KEY_SEP)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub keyword: String,
    pub name: String,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierPair {
    pub identifier: String,
    pub display: String,
}

impl IdentifierPair {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display: String::new(),
        }
    }

    pub fn has_display(&self) -> bool {
        !self.display.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchicalRecord {
    pub module: String,
    pub instance: String,
    pub pairs: Vec<IdentifierPair>,
}

impl HierarchicalRecord {
    pub fn key(&self) -> String {
        make_key(&self.module, &self.instance)
    }
}

/// Hierarchical records addressed by `"{module}::{instance}"`, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecordSet {
    records: IndexMap<String, HierarchicalRecord>,
}

impl CanonicalRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under its own key, returning the record it replaced.
    pub fn insert(&mut self, record: HierarchicalRecord) -> Option<HierarchicalRecord> {
        self.records.insert(record.key(), record)
    }

    pub fn get(&self, key: &str) -> Option<&HierarchicalRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HierarchicalRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn modules(&self) -> BTreeSet<&str> {
        self.records.values().map(|r| r.module.as_str()).collect()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&HierarchicalRecord, &IdentifierPair)> {
        self.records
            .values()
            .flat_map(|r| r.pairs.iter().map(move |p| (r, p)))
    }
}

impl FromIterator<HierarchicalRecord> for CanonicalRecordSet {
    fn from_iter<T: IntoIterator<Item = HierarchicalRecord>>(iter: T) -> Self {
        let mut res = CanonicalRecordSet::new();
        for record in iter {
            res.insert(record);
        }
        res
    }
}

impl IntoIterator for CanonicalRecordSet {
    type Item = HierarchicalRecord;
    type IntoIter = indexmap::map::IntoValues<String, HierarchicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}

impl From<&IdentifierPair> for JsonValue {
    fn from(pair: &IdentifierPair) -> Self {
        jzon::object! {
            identifier: pair.identifier.as_str(),
            display: pair.display.as_str(),
        }
    }
}

impl From<&HierarchicalRecord> for JsonValue {
    fn from(record: &HierarchicalRecord) -> Self {
        jzon::object! {
            module: record.module.as_str(),
            instance: record.instance.as_str(),
            pairs: Vec::from_iter(record.pairs.iter().map(JsonValue::from)),
        }
    }
}

impl From<&CanonicalRecordSet> for JsonValue {
    fn from(set: &CanonicalRecordSet) -> Self {
        jzon::object::Object::from_iter(set.iter()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(module: &str, instance: &str, ids: &[&str]) -> HierarchicalRecord {
        HierarchicalRecord {
            module: module.to_string(),
            instance: instance.to_string(),
            pairs: ids.iter().map(|id| IdentifierPair::new(*id)).collect(),
        }
    }

    #[test]
    fn key_round_trips_through_last_separator() {
        let r = record("soc_top", "u_mid::x", &[]);
        assert_eq!(r.key(), "soc_top::u_mid::x");
        assert_eq!(split_key(&r.key()), Some(("soc_top::u_mid", "x")));
        assert_eq!(split_key("no_separator"), None);
    }

    #[test]
    fn later_insert_replaces_but_keeps_position() {
        let mut set = CanonicalRecordSet::new();
        assert!(set.insert(record("a", "0", &["x"])).is_none());
        assert!(set.insert(record("b", "0", &[])).is_none());
        let old = set.insert(record("a", "0", &["y", "z"])).unwrap();
        assert_eq!(old.pairs.len(), 1);
        let keys: Vec<_> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a::0", "b::0"]);
        assert_eq!(set.get("a::0").unwrap().pairs.len(), 2);
        assert_eq!(set.pairs().count(), 2);
        assert_eq!(Vec::from_iter(set.modules()), ["a", "b"]);
    }

    #[test]
    fn json_shape() {
        let set = CanonicalRecordSet::from_iter([record("blk", "I0", &["id_a"])]);
        let json = JsonValue::from(&set);
        assert_eq!(json["blk::I0"]["module"], "blk");
        assert_eq!(json["blk::I0"]["instance"], "I0");
        assert_eq!(json["blk::I0"]["pairs"][0]["identifier"], "id_a");
        assert_eq!(json["blk::I0"]["pairs"][0]["display"], "");
    }
}
