use std::{
    fmt::Write as _,
    fs::{self, File, Permissions},
    io::{self, Write},
    os::unix::fs::PermissionsExt,
    path::Path,
};

use chrono::{Local, TimeZone};
use snapward_fs::EntryMetadata;
use tempfile::NamedTempFile;

use crate::error::SnapshotError;

/// Layout of `ctime(3)`, e.g. `Wed Jun 30 21:49:08 1993`.
const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

const DOCUMENT_MODE: u32 = 0o644;

/// Render records as a snapshot document: four field lines per record
/// followed by a blank separator line.
pub fn render(records: &[EntryMetadata]) -> String {
    let mut out = String::new();
    for rec in records {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "Name: {}\nMode: {:o}\nSize: {} bytes\nLast modified: {}\n\n",
            rec.name.display(),
            rec.mode,
            rec.size,
            format_mtime(rec.mtime_secs)
        );
    }
    out
}

fn format_mtime(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(t) => t.format(CTIME_FORMAT).to_string(),
        None => secs.to_string(),
    }
}

pub fn write_document(path: &Path, records: &[EntryMetadata]) -> Result<(), SnapshotError> {
    write_atomic(path, render(records).as_bytes()).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `contents` via a temp file in the same directory, so
/// readers see either the old document or the new one, never a mix.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file()
        .set_permissions(Permissions::from_mode(DOCUMENT_MODE))?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| e.error)?;

    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
