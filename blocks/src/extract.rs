use crate::{HierarchicalRecord, IdentifierPair, RawBlock};

/// Body lines containing this carry a debug-block identifier.
pub const DEBUG_MARKER: &str = "DbgBlkId";

/// Turns a block into a hierarchical record if any body line carries the marker.
pub fn extract(block: RawBlock) -> Option<HierarchicalRecord> {
    let pairs: Vec<_> = block
        .body
        .iter()
        .filter(|l| l.contains(DEBUG_MARKER))
        .map(|l| IdentifierPair::new(l.trim()))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    Some(HierarchicalRecord {
        module: block.keyword.trim().to_string(),
        instance: block.name.trim().to_string(),
        pairs,
    })
}

pub fn extract_all(blocks: Vec<RawBlock>) -> Vec<HierarchicalRecord> {
    let total = blocks.len();
    let res: Vec<_> = blocks.into_iter().filter_map(extract).collect();
    log::info!("{n} of {total} blocks carry debug identifiers", n = res.len());
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Scanner;

    #[test]
    fn chip_mid_block_yields_one_record() {
        let lines = [
            "block CHIP_MID (",
            "    .PCSIP_dbg_client_DbgBlkId(0),",
            "    .USB_dbg_client_DbgBlkId(1)",
            ")",
        ];
        let scan = Scanner::new().scan(&lines);
        let records = extract_all(scan.blocks);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.module, "block");
        assert_eq!(r.instance, "CHIP_MID");
        assert_eq!(r.pairs.len(), 2);
        assert_eq!(r.pairs[0].identifier, ".PCSIP_dbg_client_DbgBlkId(0),");
        assert_eq!(r.pairs[1].identifier, ".USB_dbg_client_DbgBlkId(1)");
        assert!(r.pairs.iter().all(|p| p.display.is_empty()));
    }

    #[test]
    fn block_without_marker_yields_nothing() {
        let block = RawBlock {
            keyword: "block".into(),
            name: "QUIET".into(),
            body: vec![".clk(clk),".into(), ".rst(rst)".into()],
        };
        assert_eq!(extract(block), None);
    }
}
