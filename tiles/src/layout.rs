use std::collections::BTreeSet;

use jzon::JsonValue;

use crate::{TileClients, geom::TileGeometry};

/// Marker offsets from the tile centroid, one per client: centre first,
/// then the four diagonals.
pub const CLIENT_OFFSETS: [(f64, f64); 5] = [
    (0.0, 0.0),
    (50.0, 50.0),
    (-50.0, 50.0),
    (-50.0, -50.0),
    (50.0, -50.0),
];

/// Offsets for the first `n` clients of a tile; clients past the fifth get no marker.
pub fn client_offsets(n: usize) -> &'static [(f64, f64)] {
    &CLIENT_OFFSETS[..n.min(CLIENT_OFFSETS.len())]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientMarker {
    pub client: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileAnnotation {
    pub tile: String,
    pub master: String,
    pub orient: String,
    pub centroid: (f64, f64),
    pub debug: bool,
    /// Named in the mapping table's display column.
    pub requested: bool,
    pub clients: Vec<ClientMarker>,
}

/// Annotations for every drawable tile that is a debug tile, is requested,
/// or carries clients.
pub fn annotate(
    geometry: &TileGeometry,
    clients: &TileClients,
    debug_tiles: &[String],
    requested_tiles: &[String],
) -> Vec<TileAnnotation> {
    let mut res = vec![];
    for (name, tile) in &geometry.tiles {
        let debug = debug_tiles.iter().any(|t| t == name);
        let requested = requested_tiles.iter().any(|t| t == name);
        let tile_clients = clients.clients_for_tile(name);
        if !debug && !requested && tile_clients.is_empty() {
            continue;
        }
        if !tile.is_drawable() {
            log::warn!(
                "tile {name} has {n} vertices, not annotated",
                n = tile.vertices.len()
            );
            continue;
        }
        let Some((cx, cy)) = tile.centroid() else {
            continue;
        };
        if tile_clients.len() > CLIENT_OFFSETS.len() {
            log::debug!(
                "tile {name}: {n} clients, only {m} placed",
                n = tile_clients.len(),
                m = CLIENT_OFFSETS.len()
            );
        }
        let markers = tile_clients
            .iter()
            .zip(client_offsets(tile_clients.len()))
            .map(|(client, &(dx, dy))| ClientMarker {
                client: client.clone(),
                x: cx + dx,
                y: cy + dy,
            })
            .collect();
        res.push(TileAnnotation {
            tile: name.clone(),
            master: tile.master.clone(),
            orient: tile.orient.clone(),
            centroid: (cx, cy),
            debug,
            requested,
            clients: markers,
        });
    }
    res
}

/// How many requested tiles exist in the geometry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileCoverage {
    /// Requested tiles absent from the geometry, sorted.
    pub missing: Vec<String>,
    pub available: usize,
    /// Distinct requested tiles.
    pub requested: usize,
}

impl TileCoverage {
    pub fn compute(geometry: &TileGeometry, requested: &[String]) -> Self {
        let requested: BTreeSet<&str> = requested.iter().map(String::as_str).collect();
        let missing: Vec<String> = requested
            .iter()
            .filter(|t| !geometry.contains(t))
            .map(|t| t.to_string())
            .collect();
        if !missing.is_empty() {
            log::warn!("{n} requested tiles missing from geometry", n = missing.len());
        }
        TileCoverage {
            missing,
            available: geometry.len(),
            requested: requested.len(),
        }
    }

    pub fn matched(&self) -> usize {
        self.requested - self.missing.len()
    }

    pub fn rate(&self) -> Option<f64> {
        if self.requested == 0 {
            None
        } else {
            Some(self.matched() as f64 * 100.0 / self.requested as f64)
        }
    }
}

impl From<&TileAnnotation> for JsonValue {
    fn from(ann: &TileAnnotation) -> Self {
        jzon::object! {
            tile: ann.tile.as_str(),
            master: ann.master.as_str(),
            orient: ann.orient.as_str(),
            centroid: jzon::array![ann.centroid.0, ann.centroid.1],
            debug: ann.debug,
            requested: ann.requested,
            clients: Vec::from_iter(ann.clients.iter().map(|m| jzon::object! {
                client: m.client.as_str(),
                x: m.x,
                y: m.y,
            })),
        }
    }
}
