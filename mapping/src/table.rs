use std::{error::Error, path::Path};

use crate::MappingEntry;

// Column positions in the spreadsheet export (A, B, C, F).
pub const COL_MODULE: usize = 0;
pub const COL_INSTANCE: usize = 1;
pub const COL_IDENTIFIER: usize = 2;
pub const COL_DISPLAY: usize = 5;

/// Mapping spreadsheet exported as CSV; the header row is not kept.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MappingRows {
    pub entries: Vec<MappingEntry>,
    /// Rows skipped for lacking module, instance or identifier.
    pub malformed: usize,
}

impl MappingTable {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())?;
        let mut rows = vec![];
        for record in reader.byte_records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|c| String::from_utf8_lossy(c).trim().to_string())
                    .collect(),
            );
        }
        log::info!(
            "read {n} mapping rows from {p}",
            n = rows.len(),
            p = path.as_ref().display()
        );
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Trimmed cell contents; missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.trim())
            .unwrap_or("")
    }

    /// Non-empty values of one column, in row order.
    pub fn column_values(&self, col: usize) -> Vec<String> {
        (0..self.rows.len())
            .map(|row| self.cell(row, col))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn entries(&self) -> MappingRows {
        let mut res = MappingRows::default();
        for row in 0..self.rows.len() {
            let module = self.cell(row, COL_MODULE);
            let instance = self.cell(row, COL_INSTANCE);
            let identifier = self.cell(row, COL_IDENTIFIER);
            if module.is_empty() || instance.is_empty() || identifier.is_empty() {
                log::debug!("mapping row {row}: missing module, instance or identifier");
                res.malformed += 1;
                continue;
            }
            res.entries.push(MappingEntry {
                module: module.to_string(),
                instance: instance.to_string(),
                identifier: identifier.to_string(),
                display: self.cell(row, COL_DISPLAY).to_string(),
            });
        }
        if res.malformed != 0 {
            log::warn!("skipped {n} incomplete mapping rows", n = res.malformed);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
BIA module,BIA instance,DbgBlkId,flatten module,flatten instance,tile name
pcs_wrapper_top,u_0,PCSIP_dbg_client_DbgBlkId,x,y,pcie_t0
pcs_wrapper_top,u_0, USB_DbgBlkId ,x,y,
,u_1,Z_DbgBlkId,x,y,pcie_t1
soc_df,u_rpt,,x,y,df_t
soc_df,u_rpt,RPT_DbgBlkId
";

    #[test]
    fn reads_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Mapping.csv");
        std::fs::write(&path, CSV).unwrap();
        let table = MappingTable::from_csv(&path).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.column_values(COL_DISPLAY), ["pcie_t0", "pcie_t1", "df_t"]);

        let rows = table.entries();
        assert_eq!(rows.malformed, 2);
        assert_eq!(rows.entries.len(), 3);
        assert_eq!(
            rows.entries[1],
            MappingEntry {
                module: "pcs_wrapper_top".into(),
                instance: "u_0".into(),
                identifier: "USB_DbgBlkId".into(),
                display: "".into(),
            }
        );
        // short row: display column absent
        assert_eq!(rows.entries[2].identifier, "RPT_DbgBlkId");
        assert_eq!(rows.entries[2].display, "");
        assert_eq!(rows.entries[0].key(), "pcs_wrapper_top::u_0");
    }

    #[test]
    fn missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MappingTable::from_csv(dir.path().join("nope.csv")).is_err());
    }
}
