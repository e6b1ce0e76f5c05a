use std::{io::Write, path::Path};

use jzon::JsonValue;
use tempfile::NamedTempFile;

/// Writes `data` to `path` through a temporary file in the same directory,
/// so the target is either the old or the complete new content.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    log::info!("wrote {p}", p = path.display());
    Ok(())
}

pub fn write_json(path: &Path, value: &JsonValue) -> std::io::Result<()> {
    let mut text = value.pretty(2);
    text.push('\n');
    write_atomic(path, text.as_bytes())
}
