use std::{error::Error, fs::read_to_string, path::Path};

use dfdmap_blocks::expand::ExpansionTable;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub inputs: Inputs,
    /// Instance expansion table, handed to the expander as-is.
    pub expand: ExpansionTable,
    pub tiles: TilesConfig,
}

/// Input file names, relative to the input directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Inputs {
    pub chip: String,
    pub mapping: String,
    pub geometry: String,
}

impl Default for Inputs {
    fn default() -> Self {
        Inputs {
            chip: "CHIP.txt".into(),
            mapping: "Mapping.csv".into(),
            geometry: "MID.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TilesConfig {
    /// Tiles annotated as debug repeaters whether or not they carry clients.
    pub debug: Vec<String>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let s = read_to_string(path)?;
        Self::parse(&s)
    }

    pub fn parse(s: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(s)?)
    }
}
