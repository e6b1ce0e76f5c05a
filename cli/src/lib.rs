//! Driver for the full flow: blocks, reconciliation, tiles and the text report.

pub mod config;
pub mod output;
pub mod report;
pub mod run;
