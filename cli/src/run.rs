use core::fmt;
use std::{
    error::Error,
    io,
    path::{Path, PathBuf},
};

use dfdmap_blocks::{
    CanonicalRecordSet,
    expand::{Expander, build_canonical},
    extract::extract_all,
    scan::{DanglingBlock, Scanner, Unbalanced},
    source::load_source_lines,
};
use dfdmap_mapping::{
    analyze::{ReconciliationReport, analyze},
    reconcile::reconcile,
    table::{COL_DISPLAY, MappingTable},
};
use dfdmap_tiles::{
    TileClients,
    geom::TileGeometry,
    layout::{TileCoverage, annotate},
};
use jzon::JsonValue;

use crate::{config::Config, output, report};

pub const BLOCKS_FILE: &str = "chip_blocks.json";
pub const INTEGRATED_FILE: &str = "chip_blocks_integrated.json";
pub const UNMATCHED_FILE: &str = "unmatched_analysis_report.json";
pub const ANNOTATIONS_FILE: &str = "tile_annotations.json";
pub const REPORT_FILE: &str = "data_analysis_report.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Blocks,
    Reconcile,
    Tiles,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Stage::Blocks => "blocks",
            Stage::Reconcile => "reconcile",
            Stage::Tiles => "tiles",
            Stage::Report => "report",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingInput,
    MalformedInput,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{stage} stage failed ({kind:?}): {msg}",
            stage = self.stage,
            kind = self.kind,
            msg = self.message
        )
    }
}

impl Error for StageFailure {}

impl StageFailure {
    fn new(stage: Stage, kind: ErrorKind, message: impl Into<String>) -> Self {
        StageFailure {
            stage,
            kind,
            message: message.into(),
        }
    }

    fn io(stage: Stage, path: &Path, err: io::Error) -> Self {
        let kind = if err.kind() == io::ErrorKind::NotFound {
            ErrorKind::MissingInput
        } else {
            ErrorKind::Io
        };
        Self::new(stage, kind, format!("{p}: {err}", p = path.display()))
    }

    fn write(stage: Stage, path: &Path, err: io::Error) -> Self {
        Self::new(
            stage,
            ErrorKind::Io,
            format!("writing {p}: {err}", p = path.display()),
        )
    }

    fn malformed(stage: Stage, path: &Path, err: Box<dyn Error>) -> Self {
        Self::new(
            stage,
            ErrorKind::MalformedInput,
            format!("{p}: {err}", p = path.display()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Done(String),
    Skipped(String),
    Failed(StageFailure),
}

/// An unbalanced block located in the chip source (1-based file lines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedBlock {
    pub block: DanglingBlock,
    pub header_line: usize,
    /// Line where the balance went below zero.
    pub overshoot_line: Option<usize>,
}

#[derive(Debug)]
pub struct BlocksOutcome {
    pub canonical: CanonicalRecordSet,
    pub raw_blocks: usize,
    pub records: usize,
    pub collisions: usize,
    pub dangling: Vec<DroppedBlock>,
    pub unresolved: Vec<(String, Vec<String>)>,
}

#[derive(Debug)]
pub struct ReconcileOutcome {
    pub records: CanonicalRecordSet,
    pub report: ReconciliationReport,
    pub filled: usize,
    pub matched_keys: usize,
    pub malformed_rows: usize,
    /// Tile names listed in the display column, in row order.
    pub requested_tiles: Vec<String>,
}

#[derive(Debug)]
pub struct TilesOutcome {
    pub coverage: TileCoverage,
    pub annotated: usize,
    pub client_tiles: usize,
    pub malformed_rows: usize,
}

/// Everything one run produced, stage by stage.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub stages: Vec<(Stage, StageStatus)>,
    pub blocks: Option<BlocksOutcome>,
    pub reconcile: Option<ReconcileOutcome>,
    pub tiles: Option<TilesOutcome>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, st)| st)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageFailure> {
        self.stages.iter().filter_map(|(_, st)| match st {
            StageStatus::Failed(f) => Some(f),
            _ => None,
        })
    }

    pub fn blocks_failed(&self) -> bool {
        matches!(self.status(Stage::Blocks), Some(StageStatus::Failed(_)))
    }

    fn record<T>(
        &mut self,
        stage: Stage,
        res: Result<(T, String), StageFailure>,
    ) -> Option<T> {
        match res {
            Ok((val, msg)) => {
                log::info!("{stage}: {msg}");
                self.stages.push((stage, StageStatus::Done(msg)));
                Some(val)
            }
            Err(fail) => {
                log::error!("{fail}");
                self.stages.push((stage, StageStatus::Failed(fail)));
                None
            }
        }
    }

    fn skip(&mut self, stage: Stage, why: impl Into<String>) {
        let why = why.into();
        log::info!("{stage}: skipped, {why}");
        self.stages.push((stage, StageStatus::Skipped(why)));
    }
}

fn run_blocks(
    config: &Config,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<(BlocksOutcome, String), StageFailure> {
    let stage = Stage::Blocks;
    let path = input_dir.join(&config.inputs.chip);
    let lines = load_source_lines(&path).map_err(|e| StageFailure::io(stage, &path, e))?;
    let scan = Scanner::new().scan(&lines);
    let raw_blocks = scan.blocks.len();
    let records = extract_all(scan.blocks);
    let number = |idx: usize| lines.get(idx).map_or(idx + 1, |l| l.number);
    let dangling = Vec::from_iter(scan.dangling.into_iter().map(|block| DroppedBlock {
        header_line: number(block.line),
        overshoot_line: match block.kind {
            Unbalanced::Overshoot(j) => Some(number(j)),
            Unbalanced::NeverCloses => None,
        },
        block,
    }));
    let record_count = records.len();
    let expander = Expander::new(config.expand.clone());
    let build = build_canonical(records, &expander);

    let out = output_dir.join(BLOCKS_FILE);
    output::write_json(&out, &JsonValue::from(&build.records))
        .map_err(|e| StageFailure::write(stage, &out, e))?;
    let msg = format!(
        "{raw_blocks} blocks, {record_count} debug records, {n} canonical records",
        n = build.records.len()
    );
    Ok((
        BlocksOutcome {
            canonical: build.records,
            raw_blocks,
            records: record_count,
            collisions: build.collisions,
            dangling,
            unresolved: build.unresolved,
        },
        msg,
    ))
}

fn run_reconcile(
    canonical: CanonicalRecordSet,
    path: &Path,
    output_dir: &Path,
) -> Result<(ReconcileOutcome, String), StageFailure> {
    let stage = Stage::Reconcile;
    let table = MappingTable::from_csv(path).map_err(|e| StageFailure::malformed(stage, path, e))?;
    let rows = table.entries();
    let res = reconcile(canonical, &rows.entries);
    let report = analyze(&res.records, &res.unmatched);

    let out = output_dir.join(INTEGRATED_FILE);
    output::write_json(&out, &JsonValue::from(&res.records))
        .map_err(|e| StageFailure::write(stage, &out, e))?;
    let mut json = JsonValue::from(&report);
    json["unmatched_entries"] =
        Vec::from_iter(report.unmatched_entries.iter().map(JsonValue::from)).into();
    let out = output_dir.join(UNMATCHED_FILE);
    output::write_json(&out, &json).map_err(|e| StageFailure::write(stage, &out, e))?;

    let msg = format!(
        "{e} mapping entries, {f} displays filled, {u} entries unmatched, fill {r}",
        e = rows.entries.len(),
        f = res.filled,
        u = res.unmatched.len(),
        r = report.fill.rate_display()
    );
    Ok((
        ReconcileOutcome {
            records: res.records,
            filled: res.filled,
            matched_keys: res.matched_keys,
            malformed_rows: rows.malformed,
            requested_tiles: table.column_values(COL_DISPLAY),
            report,
        },
        msg,
    ))
}

fn run_tiles(
    config: &Config,
    records: &CanonicalRecordSet,
    requested: &[String],
    input_dir: &Path,
    output_dir: &Path,
) -> Result<(TilesOutcome, String), StageFailure> {
    let stage = Stage::Tiles;
    let path = input_dir.join(&config.inputs.geometry);
    if !path.exists() {
        return Err(StageFailure::new(
            stage,
            ErrorKind::MissingInput,
            format!("{p} not found", p = path.display()),
        ));
    }
    let geometry =
        TileGeometry::from_csv(&path).map_err(|e| StageFailure::malformed(stage, &path, e))?;
    let clients = TileClients::from_records(records);
    let annotations = annotate(&geometry, &clients, &config.tiles.debug, requested);
    let coverage = TileCoverage::compute(&geometry, requested);

    let out = output_dir.join(ANNOTATIONS_FILE);
    let json = jzon::object! {
        tiles: Vec::from_iter(annotations.iter().map(JsonValue::from)),
        clients: JsonValue::from(&clients),
    };
    output::write_json(&out, &json).map_err(|e| StageFailure::write(stage, &out, e))?;

    let msg = format!(
        "{a} tiles annotated, {m} of {r} requested tiles missing from geometry",
        a = annotations.len(),
        m = coverage.missing.len(),
        r = coverage.requested
    );
    Ok((
        TilesOutcome {
            annotated: annotations.len(),
            client_tiles: clients.len(),
            malformed_rows: geometry.malformed,
            coverage,
        },
        msg,
    ))
}

/// Runs every stage in order, converting stage errors into [`StageFailure`]s.
///
/// Only a blocks failure stops the run; the later stages depend on it.
pub fn run(config: &Config, input_dir: &Path, output_dir: &Path) -> RunSummary {
    let mut summary = RunSummary::default();
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        let fail = StageFailure::write(Stage::Blocks, output_dir, e);
        log::error!("{fail}");
        summary.stages.push((Stage::Blocks, StageStatus::Failed(fail)));
        return summary;
    }

    let res = run_blocks(config, input_dir, output_dir);
    let Some(blocks) = summary.record(Stage::Blocks, res) else {
        for stage in [Stage::Reconcile, Stage::Tiles, Stage::Report] {
            summary.skip(stage, "no canonical records");
        }
        return summary;
    };

    let mapping: PathBuf = input_dir.join(&config.inputs.mapping);
    if mapping.exists() {
        let res = run_reconcile(blocks.canonical.clone(), &mapping, output_dir);
        summary.reconcile = summary.record(Stage::Reconcile, res);
    } else {
        summary.skip(
            Stage::Reconcile,
            format!("{p} not found", p = mapping.display()),
        );
    }

    let (records, requested) = match &summary.reconcile {
        Some(rec) => (&rec.records, rec.requested_tiles.as_slice()),
        None => (&blocks.canonical, &[][..]),
    };
    let res = run_tiles(config, records, requested, input_dir, output_dir);
    summary.tiles = summary.record(Stage::Tiles, res);
    summary.blocks = Some(blocks);

    let report = report::render(&summary);
    let out = output_dir.join(REPORT_FILE);
    let res = output::write_atomic(&out, report.text.as_bytes())
        .map(|()| ((), format!("{n} warnings", n = report.warnings.len())))
        .map_err(|e| StageFailure::write(Stage::Report, &out, e));
    summary.record(Stage::Report, res);
    summary.warnings = report.warnings;
    summary
}
