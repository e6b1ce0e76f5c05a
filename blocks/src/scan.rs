//! Parenthesis-balanced block scanner.
//!
//! Only enough structure is recovered to find block boundaries: a header line
//! of the form `KEYWORD NAME (` opens a block, and the block ends on the first
//! following line where the running parenthesis balance returns to zero.
//! A block whose balance drops below zero first is dropped and reported.

use std::sync::LazyLock;

use regex::Regex;

use crate::RawBlock;

/// Module names longer than this are accepted as instantiations.
pub const INSTANCE_MODULE_MIN_LEN: usize = 10;
/// Module names containing one of these are accepted as instantiations.
pub const INSTANCE_MODULE_MARKERS: [&str; 2] = ["_wrapper_", "_container_"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Block { keyword: String, name: String },
    Instance { module: String, instance: String },
    Neither,
}

impl Header {
    /// The `(keyword, name)` pair a header opens a block with.
    pub fn into_parts(self) -> Option<(String, String)> {
        match self {
            Header::Block { keyword, name } => Some((keyword, name)),
            Header::Instance { module, instance } => Some((module, instance)),
            Header::Neither => None,
        }
    }
}

/// Heuristic separating real instantiations from ordinary statements.
pub fn is_instance_module(module: &str) -> bool {
    module.len() > INSTANCE_MODULE_MIN_LEN
        || INSTANCE_MODULE_MARKERS.iter().any(|m| module.contains(m))
}

static RE_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\w+)\s+([^(]+)\($").unwrap());
static RE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderClassifier;

impl HeaderClassifier {
    pub fn new() -> Self {
        HeaderClassifier
    }

    pub fn classify(&self, line: &str) -> Header {
        let Some(cap) = RE_HEADER.captures(line.trim()) else {
            return Header::Neither;
        };
        let first = cap[1].to_string();
        let second = cap[2].trim().to_string();
        if RE_IDENT.is_match(&first) && is_instance_module(&first) {
            Header::Instance {
                module: first,
                instance: second,
            }
        } else {
            Header::Block {
                keyword: first,
                name: second,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unbalanced {
    /// Input ended with the balance still positive.
    NeverCloses,
    /// The balance went below zero on this line (index into the scanned lines).
    Overshoot(usize),
}

/// A header whose parentheses never returned to a zero balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingBlock {
    pub keyword: String,
    pub name: String,
    /// Index of the header in the scanned line sequence.
    pub line: usize,
    pub kind: Unbalanced,
}

#[derive(Debug, Default)]
pub struct Scan {
    pub blocks: Vec<RawBlock>,
    pub dangling: Vec<DanglingBlock>,
}

pub fn paren_delta(line: &str) -> isize {
    line.chars().fold(0, |acc, c| match c {
        '(' => acc + 1,
        ')' => acc - 1,
        _ => acc,
    })
}

#[derive(Debug, Default)]
pub struct Scanner {
    classifier: HeaderClassifier,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan<S: AsRef<str>>(&self, lines: &[S]) -> Scan {
        let mut res = Scan::default();
        let mut i = 0;
        while i < lines.len() {
            let Some((keyword, name)) = self.classifier.classify(lines[i].as_ref()).into_parts()
            else {
                i += 1;
                continue;
            };
            let mut balance = 1;
            let mut end = Err(Unbalanced::NeverCloses);
            for (j, line) in lines.iter().enumerate().skip(i + 1) {
                balance += paren_delta(line.as_ref());
                if balance == 0 {
                    end = Ok(j);
                    break;
                }
                if balance < 0 {
                    end = Err(Unbalanced::Overshoot(j));
                    break;
                }
            }
            match end {
                Ok(end) => {
                    log::debug!("block {keyword} {name}: lines {i}..={end}");
                    res.blocks.push(RawBlock {
                        keyword,
                        name,
                        body: lines[i + 1..end]
                            .iter()
                            .map(|l| l.as_ref().to_string())
                            .collect(),
                    });
                    i = end + 1;
                }
                Err(kind) => {
                    log::warn!(
                        "block {keyword} {name} at line {i} is unbalanced ({kind:?}), dropped"
                    );
                    res.dangling.push(DanglingBlock {
                        keyword,
                        name,
                        line: i,
                        kind,
                    });
                    i = match kind {
                        Unbalanced::NeverCloses => lines.len(),
                        Unbalanced::Overshoot(j) => j + 1,
                    };
                }
            }
        }
        log::info!(
            "scanned {n} blocks ({d} dangling)",
            n = res.blocks.len(),
            d = res.dangling.len()
        );
        res
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn classify_shapes() {
        let c = HeaderClassifier::new();
        assert_eq!(
            c.classify("  block CHIP_MID ("),
            Header::Block {
                keyword: "block".into(),
                name: "CHIP_MID".into()
            }
        );
        assert_eq!(
            c.classify("pcie_phy_top u_phy_{$SSB} ("),
            Header::Instance {
                module: "pcie_phy_top".into(),
                instance: "u_phy_{$SSB}".into()
            }
        );
        assert_matches!(c.classify("a_wrapper_b u0("), Header::Instance { .. });
        assert_matches!(c.classify("x_container_ u0("), Header::Instance { .. });
        // short identifiers stay plain blocks
        assert_matches!(c.classify("assign foo ("), Header::Block { .. });
        assert_eq!(c.classify("assign foo = (a);"), Header::Neither);
        assert_eq!(c.classify("block CHIP_MID ( x"), Header::Neither);
        assert_eq!(c.classify("block("), Header::Neither);
        assert_eq!(c.classify(")"), Header::Neither);
    }

    #[test]
    fn instance_heuristic_boundary() {
        assert!(!is_instance_module("abcdefghij"));
        assert!(is_instance_module("abcdefghijk"));
        assert!(is_instance_module("m_wrapper_"));
    }

    #[test]
    fn scans_nested_block() {
        let lines = [
            "block CHIP_MID (",
            "  .a_DbgBlkId(0),",
            "  inner_module_long u_in (",
            "    .b(c)",
            "  )",
            ")",
            "stray line",
        ];
        let scan = Scanner::new().scan(&lines);
        assert!(scan.dangling.is_empty());
        assert_eq!(scan.blocks.len(), 1);
        let b = &scan.blocks[0];
        assert_eq!(b.keyword, "block");
        assert_eq!(b.name, "CHIP_MID");
        assert_eq!(b.body, &lines[1..5]);
    }

    #[test]
    fn consecutive_blocks() {
        let lines = ["block A (", "x", ")", "block B (", ")"];
        let scan = Scanner::new().scan(&lines);
        let names: Vec<_> = scan.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert!(scan.blocks[1].body.is_empty());
    }

    #[test]
    fn unbalanced_block_is_reported() {
        let lines = ["block A (", ")", "block B (", "  (x", ")"];
        let scan = Scanner::new().scan(&lines);
        assert_eq!(scan.blocks.len(), 1);
        assert_eq!(
            scan.dangling,
            [DanglingBlock {
                keyword: "block".into(),
                name: "B".into(),
                line: 2,
                kind: Unbalanced::NeverCloses,
            }]
        );
    }

    #[test]
    fn balance_is_positive_inside_and_zero_at_terminator() {
        let lines = [
            "block TOP (",
            "  foo_wrapper_bar u0 (",
            "    .p((q)),",
            "    .r(s)",
            "  );",
            "  .t_DbgBlkId(1)",
            ")",
            "block NEXT (",
            "  (",
            "  )",
            ")",
        ];
        let scan = Scanner::new().scan(&lines);
        assert_eq!(scan.blocks.len(), 2);
        for block in &scan.blocks {
            let mut balance = 1;
            for line in &block.body {
                balance += paren_delta(line);
                assert!(balance > 0);
            }
        }
        assert_eq!(
            1 + scan.blocks[0].body.iter().map(|l| paren_delta(l)).sum::<isize>()
                + paren_delta(lines[6]),
            0
        );
    }

    #[test]
    fn overshooting_block_is_dropped_and_scan_resumes() {
        let lines = [
            "block A (",
            "  .x_DbgBlkId(0))),",
            "  (",
            "block B (",
            "  .y_DbgBlkId(1)",
            ")",
        ];
        let scan = Scanner::new().scan(&lines);
        assert_eq!(
            scan.dangling,
            [DanglingBlock {
                keyword: "block".into(),
                name: "A".into(),
                line: 0,
                kind: Unbalanced::Overshoot(1),
            }]
        );
        let names: Vec<_> = scan.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["B"]);
        for block in &scan.blocks {
            let mut balance = 1;
            for line in &block.body {
                balance += paren_delta(line);
                assert!(balance > 0, "block {} at balance {balance}", block.name);
            }
        }
    }
}
