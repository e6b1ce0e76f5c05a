//! Mapping-table side of the flow: the externally authored table of
//! `(module, instance, identifier, display)` rows, its reconciliation against
//! the canonical record set, and the audit of what did not match.

use dfdmap_blocks::make_key;
use jzon::JsonValue;

pub mod analyze;
pub mod reconcile;
pub mod table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub module: String,
    pub instance: String,
    pub identifier: String,
    /// May be empty.
    pub display: String,
}

impl MappingEntry {
    pub fn key(&self) -> String {
        make_key(&self.module, &self.instance)
    }
}

impl From<&MappingEntry> for JsonValue {
    fn from(entry: &MappingEntry) -> Self {
        jzon::object! {
            module: entry.module.as_str(),
            instance: entry.instance.as_str(),
            identifier: entry.identifier.as_str(),
            display: entry.display.as_str(),
        }
    }
}
