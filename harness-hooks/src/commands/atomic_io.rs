use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

/// Replace `path` with `content` so readers see either the old or the new
/// document, never a partial one.
///
/// The bytes go to a hidden sibling (`.team-metrics.json.XXXXXX.tmp`), are
/// fsynced, then renamed over `path`. A failed rename drops the sibling.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let stem = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let mut tmp = Builder::new()
        .prefix(&format!(".{}.", stem))
        .suffix(".tmp")
        .tempfile_in(dir)?;

    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
