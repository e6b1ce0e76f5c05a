use std::collections::BTreeSet;

use dfdmap_blocks::CanonicalRecordSet;
use itertools::Itertools;
use jzon::JsonValue;

use crate::MappingEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillStats {
    pub total: usize,
    pub filled: usize,
}

impl FillStats {
    pub fn of(canonical: &CanonicalRecordSet) -> Self {
        let mut res = FillStats::default();
        for (_, pair) in canonical.pairs() {
            res.total += 1;
            if pair.has_display() {
                res.filled += 1;
            }
        }
        res
    }

    /// Filled share in percent; `None` when there are no pairs at all.
    pub fn rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.filled as f64 * 100.0 / self.total as f64)
        }
    }

    pub fn rate_display(&self) -> String {
        match self.rate() {
            Some(rate) => format!("{rate:.1}%"),
            None => "n/a".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationReport {
    pub unmatched_entries: Vec<MappingEntry>,
    /// Distinct modules among the unmatched entries.
    pub unmatched_modules: Vec<String>,
    pub canonical_modules: Vec<String>,
    pub only_in_mapping: Vec<String>,
    pub only_in_canonical: Vec<String>,
    /// Present on both sides yet still carrying unmatched entries.
    pub in_both: Vec<String>,
    pub fill: FillStats,
}

// Set iteration order is already sorted.
fn owned<'a>(it: impl Iterator<Item = &'a str>) -> Vec<String> {
    it.map(str::to_string).collect_vec()
}

pub fn analyze(canonical: &CanonicalRecordSet, unmatched: &[MappingEntry]) -> ReconciliationReport {
    let canonical_modules = canonical.modules();
    let unmatched_modules: BTreeSet<&str> = unmatched.iter().map(|e| e.module.as_str()).collect();
    let res = ReconciliationReport {
        unmatched_entries: unmatched.to_vec(),
        unmatched_modules: owned(unmatched_modules.iter().copied()),
        canonical_modules: owned(canonical_modules.iter().copied()),
        only_in_mapping: owned(unmatched_modules.difference(&canonical_modules).copied()),
        only_in_canonical: owned(canonical_modules.difference(&unmatched_modules).copied()),
        in_both: owned(canonical_modules.intersection(&unmatched_modules).copied()),
        fill: FillStats::of(canonical),
    };
    log::info!(
        "modules: {a} only in mapping, {b} only in canonical, {c} in both but unmatched; fill {f}",
        a = res.only_in_mapping.len(),
        b = res.only_in_canonical.len(),
        c = res.in_both.len(),
        f = res.fill.rate_display()
    );
    res
}

impl From<&ReconciliationReport> for JsonValue {
    fn from(report: &ReconciliationReport) -> Self {
        jzon::object! {
            counts: jzon::object! {
                unmatched_entries: report.unmatched_entries.len(),
                unmatched_modules: report.unmatched_modules.len(),
                canonical_modules: report.canonical_modules.len(),
                only_in_mapping: report.only_in_mapping.len(),
                only_in_canonical: report.only_in_canonical.len(),
                in_both: report.in_both.len(),
                pairs_total: report.fill.total,
                pairs_filled: report.fill.filled,
                fill_rate: match report.fill.rate() {
                    Some(rate) => JsonValue::from((rate * 10.0).round() / 10.0),
                    None => JsonValue::Null,
                },
            },
            unmatched_modules: report.unmatched_modules.clone(),
            only_in_mapping: report.only_in_mapping.clone(),
            only_in_canonical: report.only_in_canonical.clone(),
            in_both: report.in_both.clone(),
        }
    }
}
