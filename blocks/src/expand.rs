//! Instance-name expansion.
//!
//! An instance name may reference one variable as `{$IDENT}`; the expansion
//! table lists the values it takes.  The table is loaded once per run and
//! handed to [`Expander::new`]; it is never modified afterwards.

use core::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::{CanonicalRecordSet, HierarchicalRecord};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExpandValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for ExpandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpandValue::Int(v) => write!(f, "{v}"),
            ExpandValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ExpandValue {
    fn from(v: i64) -> Self {
        ExpandValue::Int(v)
    }
}

/// Variable name (including the `$`) to its values, in substitution order.
pub type ExpansionTable = IndexMap<String, Vec<ExpandValue>>;

static RE_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\$(\w+)\}").unwrap());

#[derive(Debug)]
pub struct Expander {
    table: ExpansionTable,
}

impl Expander {
    pub fn new(table: ExpansionTable) -> Self {
        Self { table }
    }

    /// Distinct variables referenced by `name`, in order of first appearance.
    pub fn variables(&self, name: &str) -> Vec<String> {
        let mut res: Vec<String> = vec![];
        for cap in RE_VAR.captures_iter(name) {
            let var = format!("${}", &cap[1]);
            if !res.contains(&var) {
                res.push(var);
            }
        }
        res
    }

    fn first_values(&self, name: &str) -> Option<(String, &[ExpandValue])> {
        let cap = RE_VAR.captures(name)?;
        let values = self.table.get(&format!("${}", &cap[1]))?;
        if values.is_empty() {
            return None;
        }
        Some((cap[0].to_string(), values))
    }

    /// Expands the first referenced variable into one name per table value.
    ///
    /// Every occurrence of that variable's token is substituted.  Names
    /// without a known variable (or whose variable has no values) come back
    /// unchanged, so the result is never empty.
    pub fn expand(&self, name: &str) -> Vec<String> {
        match self.first_values(name) {
            None => vec![name.to_string()],
            Some((token, values)) => values
                .iter()
                .map(|v| name.replace(&token, &v.to_string()))
                .collect(),
        }
    }

    /// Variables that [`Expander::expand`] leaves in place.
    pub fn unresolved_variables(&self, name: &str) -> Vec<String> {
        let mut vars = self.variables(name);
        if self.first_values(name).is_some() {
            vars.remove(0);
        }
        vars
    }
}

#[derive(Debug, Default)]
pub struct CanonicalBuild {
    pub records: CanonicalRecordSet,
    /// Expanded keys that replaced an earlier record.
    pub collisions: usize,
    /// Source keys whose instance still references variables, with those variables.
    pub unresolved: Vec<(String, Vec<String>)>,
}

pub fn build_canonical(records: Vec<HierarchicalRecord>, expander: &Expander) -> CanonicalBuild {
    let mut res = CanonicalBuild::default();
    let total = records.len();
    for record in records {
        let unresolved = expander.unresolved_variables(&record.instance);
        if !unresolved.is_empty() {
            log::warn!(
                "{key}: unresolved variables {unresolved:?}",
                key = record.key()
            );
            res.unresolved.push((record.key(), unresolved));
        }
        for instance in expander.expand(&record.instance) {
            let expanded = HierarchicalRecord {
                instance,
                ..record.clone()
            };
            if res.records.insert(expanded).is_some() {
                res.collisions += 1;
            }
        }
    }
    log::info!(
        "expanded {total} records into {n} canonical records",
        n = res.records.len()
    );
    res
}
