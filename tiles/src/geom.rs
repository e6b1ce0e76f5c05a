use std::{error::Error, io::Read, path::Path};

use indexmap::IndexMap;
use simple_error::bail;

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub master: String,
    pub orient: String,
    /// Outline in vertex-index order.
    pub vertices: Vec<(f64, f64)>,
}

impl Tile {
    pub fn is_drawable(&self) -> bool {
        self.vertices.len() >= 3
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.vertices.is_empty() {
            return None;
        }
        let n = self.vertices.len() as f64;
        let (sx, sy) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
        Some((sx / n, sy / n))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TileGeometry {
    pub tiles: IndexMap<String, Tile>,
    /// Tile rows skipped for a missing or unparsable field.
    pub malformed: usize,
}

const COLUMNS: [&str; 7] = [
    "struct",
    "tile",
    "master",
    "orient",
    "vertex_index",
    "vertex_x",
    "vertex_y",
];

impl TileGeometry {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let res = Self::from_reader(std::fs::File::open(path.as_ref())?)?;
        log::info!(
            "parsed {n} tiles from {p}",
            n = res.tiles.len(),
            p = path.as_ref().display()
        );
        Ok(res)
    }

    /// Reads the geometry export: one row per tile vertex, only rows with
    /// `struct == "tile"` are used.
    pub fn from_reader(rdr: impl Read) -> Result<Self, Box<dyn Error>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
        let headers = reader.byte_headers()?.clone();
        let mut cols = [0; COLUMNS.len()];
        for (i, name) in COLUMNS.iter().enumerate() {
            let Some(pos) = headers.iter().position(|h| h == name.as_bytes()) else {
                bail!("geometry csv lacks column {}", name);
            };
            cols[i] = pos;
        }
        let [c_struct, c_tile, c_master, c_orient, c_idx, c_x, c_y] = cols;

        let mut res = TileGeometry::default();
        let mut raw: IndexMap<String, (Tile, Vec<(u32, f64, f64)>)> = IndexMap::new();
        for record in reader.byte_records() {
            let record = record?;
            let field = |i: usize| {
                record
                    .get(i)
                    .map(|f| String::from_utf8_lossy(f).trim().to_string())
            };
            if field(c_struct).as_deref() != Some("tile") {
                continue;
            }
            let parsed = (|| {
                let tile = field(c_tile).filter(|t| !t.is_empty())?;
                let idx: u32 = field(c_idx)?.parse().ok()?;
                let x: f64 = field(c_x)?.parse().ok()?;
                let y: f64 = field(c_y)?.parse().ok()?;
                Some((tile, idx, x, y))
            })();
            let Some((tile, idx, x, y)) = parsed else {
                log::debug!("skipping malformed geometry row {:?}", record.position());
                res.malformed += 1;
                continue;
            };
            let entry = raw.entry(tile).or_insert_with(|| {
                (
                    Tile {
                        master: field(c_master).unwrap_or_default(),
                        orient: field(c_orient).unwrap_or_default(),
                        vertices: vec![],
                    },
                    vec![],
                )
            });
            entry.1.push((idx, x, y));
        }
        if res.malformed != 0 {
            log::warn!("skipped {n} malformed geometry rows", n = res.malformed);
        }
        for (name, (mut tile, mut vertices)) in raw {
            vertices.sort_by_key(|&(idx, _, _)| idx);
            tile.vertices = vertices.into_iter().map(|(_, x, y)| (x, y)).collect();
            res.tiles.insert(name, tile);
        }
        Ok(res)
    }

    pub fn contains(&self, tile: &str) -> bool {
        self.tiles.contains_key(tile)
    }

    pub fn get(&self, tile: &str) -> Option<&Tile> {
        self.tiles.get(tile)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
