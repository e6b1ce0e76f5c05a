//! Plain-text analysis report written at the end of a run.

use itertools::Itertools;

use crate::run::{RunSummary, Stage, StageStatus};

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub text: String,
    /// One line per condition worth a second look; also printed by the binary.
    pub warnings: Vec<String>,
}

const RULE: &str = "------------------------------------------------------------";
const SUBRULE: &str = "----------------------------------------";

fn push_list(lines: &mut Vec<String>, items: impl IntoIterator<Item = impl AsRef<str>>) {
    for (i, item) in items.into_iter().enumerate() {
        lines.push(format!("{n:3}. {item}", n = i + 1, item = item.as_ref()));
    }
}

fn mapping_part(summary: &RunSummary, lines: &mut Vec<String>, warnings: &mut Vec<String>) {
    lines.push("Part 1: mapping table against extracted blocks".into());
    lines.push(SUBRULE.into());
    let Some(rec) = &summary.reconcile else {
        let why = match summary.status(Stage::Reconcile) {
            Some(StageStatus::Skipped(why)) => format!("skipped, {why}"),
            Some(StageStatus::Failed(fail)) => {
                warnings.push(fail.to_string());
                fail.to_string()
            }
            _ => "not run".to_string(),
        };
        lines.push(format!("No reconciliation data ({why})."));
        return;
    };
    let report = &rec.report;
    lines.push("Overview:".into());
    lines.push(format!(
        "  unmatched mapping entries: {n}",
        n = report.unmatched_entries.len()
    ));
    lines.push(format!(
        "  unmatched mapping modules (distinct): {n}",
        n = report.unmatched_modules.len()
    ));
    lines.push(format!(
        "  modules in extracted blocks: {n}",
        n = report.canonical_modules.len()
    ));
    lines.push(format!("  keys matched: {n}", n = rec.matched_keys));
    lines.push(format!("  displays filled this run: {n}", n = rec.filled));
    lines.push(format!(
        "  display fill rate: {r} ({f} of {t} pairs)",
        r = report.fill.rate_display(),
        f = report.fill.filled,
        t = report.fill.total
    ));
    if rec.malformed_rows != 0 {
        lines.push(format!(
            "  incomplete mapping rows skipped: {n}",
            n = rec.malformed_rows
        ));
    }
    for (title, modules) in [
        ("Modules only in the mapping table", &report.only_in_mapping),
        ("Modules only in the extracted blocks", &report.only_in_canonical),
        ("Modules on both sides with unmatched entries", &report.in_both),
    ] {
        lines.push(String::new());
        lines.push(format!("{title} ({n}):", n = modules.len()));
        push_list(lines, modules);
    }
    if !report.unmatched_modules.is_empty() {
        warnings.push(format!(
            "unmatched mapping modules: {n} ({m})",
            n = report.unmatched_modules.len(),
            m = report.unmatched_modules.iter().take(5).join(", ")
        ));
    }
}

fn tiles_part(summary: &RunSummary, lines: &mut Vec<String>, warnings: &mut Vec<String>) {
    lines.push("Part 2: requested tiles against tile geometry".into());
    lines.push(SUBRULE.into());
    let Some(tiles) = &summary.tiles else {
        if let Some(StageStatus::Failed(fail)) = summary.status(Stage::Tiles) {
            lines.push(format!("No tile data ({fail})."));
            warnings.push(fail.to_string());
        } else {
            lines.push("No tile data.".into());
        }
        return;
    };
    let cov = &tiles.coverage;
    lines.push(format!(
        "{n} requested tiles are missing from the geometry.",
        n = cov.missing.len()
    ));
    push_list(lines, &cov.missing);
    lines.push(String::new());
    lines.push(format!("tiles in geometry: {n}", n = cov.available));
    lines.push(format!("tiles requested: {n}", n = cov.requested));
    lines.push(format!("tiles matched: {n}", n = cov.matched()));
    if let Some(rate) = cov.rate() {
        lines.push(format!("match rate: {rate:.1}%"));
    }
    lines.push(format!(
        "tiles carrying clients: {n}, annotated: {a}",
        n = tiles.client_tiles,
        a = tiles.annotated
    ));
    if tiles.malformed_rows != 0 {
        lines.push(format!(
            "malformed geometry rows skipped: {n}",
            n = tiles.malformed_rows
        ));
    }
    if !cov.missing.is_empty() {
        warnings.push(format!(
            "requested tiles missing from geometry: {n}",
            n = cov.missing.len()
        ));
    }
}

fn structure_part(summary: &RunSummary, lines: &mut Vec<String>, warnings: &mut Vec<String>) {
    lines.push("Part 3: source structure".into());
    lines.push(SUBRULE.into());
    let Some(blocks) = &summary.blocks else {
        lines.push("No block data.".into());
        return;
    };
    lines.push(format!(
        "{b} blocks scanned, {r} carry debug identifiers, {c} canonical records",
        b = blocks.raw_blocks,
        r = blocks.records,
        c = blocks.canonical.len()
    ));
    if blocks.collisions != 0 {
        lines.push(format!(
            "{n} expanded keys replaced an earlier record",
            n = blocks.collisions
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Unbalanced blocks ({n}):",
        n = blocks.dangling.len()
    ));
    push_list(
        lines,
        blocks.dangling.iter().map(|d| {
            let head = format!(
                "{k} {n} (line {l}",
                k = d.block.keyword,
                n = d.block.name,
                l = d.header_line
            );
            match d.overshoot_line {
                Some(o) => format!("{head}, extra ')' at line {o})"),
                None => format!("{head}, never closes)"),
            }
        }),
    );
    lines.push(String::new());
    lines.push(format!(
        "Instances with unexpanded variables ({n}):",
        n = blocks.unresolved.len()
    ));
    push_list(
        lines,
        blocks
            .unresolved
            .iter()
            .map(|(key, vars)| format!("{key}: {v}", v = vars.iter().join(", "))),
    );
    if !blocks.dangling.is_empty() {
        warnings.push(format!(
            "unbalanced blocks dropped: {n}",
            n = blocks.dangling.len()
        ));
    }
    if !blocks.unresolved.is_empty() {
        warnings.push(format!(
            "instances with unexpanded variables: {n}",
            n = blocks.unresolved.len()
        ));
    }
}

pub fn render(summary: &RunSummary) -> Report {
    let mut lines = vec!["Debug block analysis report".to_string(), RULE.to_string()];
    let mut warnings = vec![];
    mapping_part(summary, &mut lines, &mut warnings);
    lines.push(String::new());
    tiles_part(summary, &mut lines, &mut warnings);
    lines.push(String::new());
    structure_part(summary, &mut lines, &mut warnings);
    lines.push(String::new());
    Report {
        text: lines.join("\n"),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use dfdmap_blocks::{
        CanonicalRecordSet, HierarchicalRecord, IdentifierPair,
        scan::{DanglingBlock, Unbalanced},
    };
    use dfdmap_mapping::{MappingEntry, analyze::analyze};
    use dfdmap_tiles::layout::TileCoverage;

    use super::*;
    use crate::run::{
        BlocksOutcome, DroppedBlock, ErrorKind, ReconcileOutcome, StageFailure, TilesOutcome,
    };

    fn summary() -> RunSummary {
        let canonical = CanonicalRecordSet::from_iter([HierarchicalRecord {
            module: "pcs_wrapper_top".into(),
            instance: "u_0".into(),
            pairs: vec![IdentifierPair {
                identifier: "PCSIP_DbgBlkId".into(),
                display: "pcie_t0".into(),
            }],
        }]);
        let unmatched = vec![MappingEntry {
            module: "ghost".into(),
            instance: "u".into(),
            identifier: "G_DbgBlkId".into(),
            display: "g_t".into(),
        }];
        RunSummary {
            stages: vec![],
            reconcile: Some(ReconcileOutcome {
                report: analyze(&canonical, &unmatched),
                records: canonical.clone(),
                filled: 1,
                matched_keys: 1,
                malformed_rows: 0,
                requested_tiles: vec!["pcie_t0".into(), "g_t".into()],
            }),
            tiles: Some(TilesOutcome {
                coverage: TileCoverage {
                    missing: vec!["g_t".into()],
                    available: 10,
                    requested: 2,
                },
                annotated: 1,
                client_tiles: 1,
                malformed_rows: 0,
            }),
            blocks: Some(BlocksOutcome {
                canonical,
                raw_blocks: 3,
                records: 1,
                collisions: 0,
                dangling: vec![
                    DroppedBlock {
                        block: DanglingBlock {
                            keyword: "block".into(),
                            name: "BROKEN".into(),
                            line: 4,
                            kind: Unbalanced::NeverCloses,
                        },
                        header_line: 9,
                        overshoot_line: None,
                    },
                    DroppedBlock {
                        block: DanglingBlock {
                            keyword: "block".into(),
                            name: "OVER".into(),
                            line: 6,
                            kind: Unbalanced::Overshoot(7),
                        },
                        header_line: 12,
                        overshoot_line: Some(14),
                    },
                ],
                unresolved: vec![],
            }),
            warnings: vec![],
        }
    }

    #[test]
    fn three_parts_and_warnings() {
        let report = render(&summary());
        assert!(report.text.contains("Part 1: mapping table"));
        assert!(report.text.contains("Modules only in the mapping table (1):\n  1. ghost"));
        assert!(report.text.contains("display fill rate: 100.0% (1 of 1 pairs)"));
        assert!(report.text.contains("  1. g_t"));
        assert!(report.text.contains("match rate: 50.0%"));
        assert!(report.text.contains("  1. block BROKEN (line 9, never closes)"));
        assert!(report.text.contains("  2. block OVER (line 12, extra ')' at line 14)"));
        assert_eq!(
            report.warnings,
            [
                "unmatched mapping modules: 1 (ghost)",
                "requested tiles missing from geometry: 1",
                "unbalanced blocks dropped: 2",
            ]
        );
    }

    #[test]
    fn skipped_reconcile_is_explained() {
        let mut summary = summary();
        summary.reconcile = None;
        summary
            .stages
            .push((Stage::Reconcile, StageStatus::Skipped("Mapping.csv not found".into())));
        let report = render(&summary);
        assert!(
            report
                .text
                .contains("No reconciliation data (skipped, Mapping.csv not found).")
        );
        assert!(!report.warnings.iter().any(|w| w.contains("reconcile")));
    }

    #[test]
    fn failed_reconcile_raises_a_warning() {
        let mut summary = summary();
        summary.reconcile = None;
        let fail = StageFailure {
            stage: Stage::Reconcile,
            kind: ErrorKind::MalformedInput,
            message: "Mapping.csv: bad row".into(),
        };
        summary
            .stages
            .push((Stage::Reconcile, StageStatus::Failed(fail.clone())));
        let report = render(&summary);
        assert!(report.text.contains(&format!("No reconciliation data ({fail}).")));
        assert_eq!(report.warnings[0], fail.to_string());
    }
}
