use std::{collections::HashSet, sync::LazyLock};

use dfdmap_blocks::{CanonicalRecordSet, HierarchicalRecord, IdentifierPair};
use indexmap::IndexMap;
use regex::Regex;

use crate::MappingEntry;

static PAREN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\),*").unwrap());

fn normalize_step(s: &str) -> String {
    let s = s.trim().trim_start_matches('.');
    let s = PAREN_SUFFIX.replace_all(s, "");
    s.trim().trim_end_matches(',').to_string()
}

/// Cleans a raw identifier line into its bare symbolic name.
///
/// `.PCSIP_dbg_client_DbgBlkId(0),` becomes `PCSIP_dbg_client_DbgBlkId`.
/// Applying it to an already clean name is a no-op.
pub fn normalize_identifier(raw: &str) -> String {
    let mut cur = normalize_step(raw);
    loop {
        let next = normalize_step(&cur);
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

#[derive(Debug, Default)]
pub struct Reconciliation {
    pub records: CanonicalRecordSet,
    /// Mapping entries whose key never matched, in input order.
    pub unmatched: Vec<MappingEntry>,
    pub normalized: usize,
    pub filled: usize,
    pub matched_keys: usize,
}

/// Joins canonical records against mapping entries by key and clean identifier.
///
/// Each pair gets its identifier normalized and, if its display is empty,
/// takes the display of the first candidate with the same identifier and a
/// non-empty display.  A key counts as matched once any of its pairs was
/// filled (or already carried exactly the candidate's display).
pub fn reconcile(canonical: CanonicalRecordSet, entries: &[MappingEntry]) -> Reconciliation {
    let mut lookup: IndexMap<String, Vec<&MappingEntry>> = IndexMap::new();
    for entry in entries {
        lookup.entry(entry.key()).or_default().push(entry);
    }
    log::info!(
        "{n} mapping entries under {k} module::instance keys",
        n = entries.len(),
        k = lookup.len()
    );

    let mut res = Reconciliation::default();
    let mut matched: HashSet<String> = HashSet::new();
    for record in canonical {
        let key = record.key();
        let candidates = lookup.get(&key).map(Vec::as_slice).unwrap_or_default();
        let mut pairs = Vec::with_capacity(record.pairs.len());
        for pair in record.pairs {
            let identifier = normalize_identifier(&pair.identifier);
            res.normalized += 1;
            let mut display = pair.display;
            for cand in candidates {
                if cand.identifier != identifier || cand.display.is_empty() {
                    continue;
                }
                if display.is_empty() {
                    log::debug!("{key}: {identifier} -> {d}", d = cand.display);
                    display = cand.display.clone();
                    res.filled += 1;
                } else if display != cand.display {
                    continue;
                }
                matched.insert(key.clone());
                break;
            }
            pairs.push(IdentifierPair {
                identifier,
                display,
            });
        }
        res.records.insert(HierarchicalRecord {
            module: record.module,
            instance: record.instance,
            pairs,
        });
    }

    res.unmatched = entries
        .iter()
        .filter(|e| !matched.contains(&e.key()))
        .cloned()
        .collect();
    res.matched_keys = matched.len();
    log::info!(
        "normalized {n} identifiers, filled {f} displays, {u} mapping entries unmatched",
        n = res.normalized,
        f = res.filled,
        u = res.unmatched.len()
    );
    res
}
