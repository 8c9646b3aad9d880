use std::{
    fs::{self, read_dir},
    io,
    path::Path,
};

use log::debug;
use snapward_fs::{EntryKind, EntryMetadata};

use crate::error::QuarantineError;

/// Regular files directly inside `dir`, in enumeration order.
///
/// Entries that vanish between enumeration and `lstat` are skipped.
pub fn scan_regular_files(dir: &Path) -> Result<Vec<EntryMetadata>, QuarantineError> {
    let scan_err = |source| QuarantineError::ScanDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry_res in read_dir(dir).map_err(scan_err)? {
        let path = entry_res.map_err(scan_err)?.path();

        let meta = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("[quarantine] {:?} vanished during scan", path);
                continue;
            }
            Err(source) => {
                return Err(QuarantineError::ScanDir { path, source });
            }
        };

        let rec = EntryMetadata::from_metadata(path, &meta);
        if rec.kind() == EntryKind::File {
            files.push(rec);
        }
    }

    Ok(files)
}

#[cfg(test)]
#[path = "candidate_tests.rs"]
mod tests;
