//! Tile side of the flow.
//!
//! The reconciled displays name tiles; this crate indexes which debug clients
//! sit on which tile, loads the tile geometry, and lays out the annotations a
//! renderer draws on top of it.  Drawing itself happens elsewhere.

use dfdmap_blocks::{CanonicalRecordSet, KEY_SEP};
use indexmap::IndexMap;
use jzon::JsonValue;

pub mod geom;
pub mod layout;

/// Tile name to the debug clients placed on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileClients {
    tiles: IndexMap<String, Vec<String>>,
}

impl TileClients {
    /// Builds the index from reconciled records; client ids are
    /// `"{module}::{instance}::{identifier}"`, deduplicated per tile.
    pub fn from_records(canonical: &CanonicalRecordSet) -> Self {
        let mut res = TileClients::default();
        for (record, pair) in canonical.pairs() {
            if !pair.has_display() {
                continue;
            }
            let client = format!("{}{KEY_SEP}{}", record.key(), pair.identifier);
            let clients = res.tiles.entry(pair.display.clone()).or_default();
            if !clients.contains(&client) {
                clients.push(client);
            }
        }
        let multi = res.tiles.values().filter(|c| c.len() > 1).count();
        log::info!(
            "{n} tiles carry clients, {multi} of them more than one",
            n = res.tiles.len()
        );
        res
    }

    pub fn tile_has_client(&self, tile: &str) -> bool {
        self.tiles.contains_key(tile)
    }

    pub fn clients_for_tile(&self, tile: &str) -> &[String] {
        self.tiles.get(tile).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &str> {
        self.tiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl From<&TileClients> for JsonValue {
    fn from(clients: &TileClients) -> Self {
        jzon::object::Object::from_iter(
            clients
                .tiles
                .iter()
                .map(|(tile, c)| (tile.as_str(), c.clone())),
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use dfdmap_blocks::{HierarchicalRecord, IdentifierPair};

    use super::*;

    fn pair(identifier: &str, display: &str) -> IdentifierPair {
        IdentifierPair {
            identifier: identifier.into(),
            display: display.into(),
        }
    }

    #[test]
    fn index_from_reconciled_records() {
        let canonical = CanonicalRecordSet::from_iter([
            HierarchicalRecord {
                module: "pcs_wrapper_top".into(),
                instance: "u_0".into(),
                pairs: vec![
                    pair("PCSIP_DbgBlkId", "pcie_t0"),
                    pair("USB_DbgBlkId", "pcie_t0"),
                    pair("PCSIP_DbgBlkId", "pcie_t0"),
                    pair("NONE_DbgBlkId", ""),
                ],
            },
            HierarchicalRecord {
                module: "soc_df".into(),
                instance: "u_rpt".into(),
                pairs: vec![pair("RPT_DbgBlkId", "df_t")],
            },
        ]);
        let clients = TileClients::from_records(&canonical);
        assert_eq!(clients.len(), 2);
        assert!(clients.tile_has_client("pcie_t0"));
        assert!(!clients.tile_has_client("elsewhere"));
        assert_eq!(
            clients.clients_for_tile("pcie_t0"),
            [
                "pcs_wrapper_top::u_0::PCSIP_DbgBlkId",
                "pcs_wrapper_top::u_0::USB_DbgBlkId"
            ]
        );
        assert!(clients.clients_for_tile("elsewhere").is_empty());
        assert_eq!(Vec::from_iter(clients.tiles()), ["pcie_t0", "df_t"]);
        let json = JsonValue::from(&clients);
        assert_eq!(json["df_t"][0], "soc_df::u_rpt::RPT_DbgBlkId");
    }
}
