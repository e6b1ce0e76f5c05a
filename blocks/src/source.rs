use std::path::Path;

use encoding_rs::GBK;

/// Lines starting with this (after leading whitespace) are comments.
pub const COMMENT_MARKER: char = '#';

/// A kept source line with its 1-based line number in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

impl AsRef<str> for SourceLine {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Decodes source bytes as UTF-8, then GBK, then Latin-1.
///
/// The Latin-1 step maps every byte to the code point of the same value, so
/// decoding cannot fail.
pub fn decode_source(bytes: Vec<u8>) -> String {
    let err = match String::from_utf8(bytes) {
        Ok(s) => return s,
        Err(e) => e,
    };
    let bytes = err.as_bytes();
    if let Some(s) = GBK.decode_without_bom_handling_and_without_replacement(bytes) {
        log::warn!(
            "source is not valid UTF-8 ({}), decoded as GBK",
            err.utf8_error()
        );
        return s.into_owned();
    }
    log::warn!(
        "source is neither UTF-8 ({}) nor GBK, decoding as Latin-1",
        err.utf8_error()
    );
    bytes.iter().copied().map(char::from).collect()
}

/// Drops blank and comment lines and right-trims the rest.
pub fn filter_lines(text: &str) -> Vec<SourceLine> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| {
            let l = l.trim_start();
            !l.is_empty() && !l.starts_with(COMMENT_MARKER)
        })
        .map(|(i, l)| SourceLine {
            number: i + 1,
            text: l.trim_end().to_string(),
        })
        .collect()
}

pub fn load_source_lines(path: impl AsRef<Path>) -> std::io::Result<Vec<SourceLine>> {
    let bytes = std::fs::read(path.as_ref())?;
    let lines = filter_lines(&decode_source(bytes));
    log::info!(
        "loaded {n} source lines from {p}",
        n = lines.len(),
        p = path.as_ref().display()
    );
    Ok(lines)
}
