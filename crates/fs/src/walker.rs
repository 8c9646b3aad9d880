use std::{
    fs::read_dir,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    error::WalkError,
    metadata::read_metadata,
    record::{EntryKind, EntryMetadata},
};

#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    /// Refuse directories holding more than this many entries.
    pub max_entries: Option<usize>,
}

/// Captured state of one directory level and, recursively, its subdirectories.
#[derive(Debug, Clone)]
pub struct DirSnapshot {
    /// Path used to reach the directory.
    pub path: PathBuf,
    /// Path below the traversal root; empty for the root itself.
    pub relative: PathBuf,
    /// Entries directly inside this directory, in enumeration order.
    pub entries: Vec<EntryMetadata>,
    /// Snapshots of the subdirectories found in `entries`.
    pub children: Vec<DirSnapshot>,
}

impl DirSnapshot {
    /// Pre-order iteration over this directory and every directory below it.
    pub fn iter(&self) -> impl Iterator<Item = &DirSnapshot> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    pub fn dir_count(&self) -> usize {
        self.iter().count()
    }
}

/// Capture `root` and every directory below it.
///
/// Symlinks are recorded as themselves and never followed. Entry order is the
/// order the OS enumerates them in; it is not sorted. The first entry that
/// cannot be read aborts the whole traversal.
pub fn traverse(root: &Path, opts: &TraverseOptions) -> Result<DirSnapshot, WalkError> {
    debug!("[walk] traversing {:?}", root);
    snapshot_dir(root, PathBuf::new(), opts)
}

fn snapshot_dir(
    dir: &Path,
    relative: PathBuf,
    opts: &TraverseOptions,
) -> Result<DirSnapshot, WalkError> {
    let entries = read_level(dir, opts)?;

    // The directory handle is closed before recursing so that deep trees do
    // not hold one descriptor per level.
    let mut children = Vec::new();
    for entry in entries.iter().filter(|e| e.kind() == EntryKind::Directory) {
        let Some(base) = entry.name.file_name() else {
            continue;
        };
        children.push(snapshot_dir(&entry.name, relative.join(base), opts)?);
    }

    debug!(
        "[walk] {:?}: {} entries, {} subdirectories",
        dir,
        entries.len(),
        children.len()
    );

    Ok(DirSnapshot {
        path: dir.to_path_buf(),
        relative,
        entries,
        children,
    })
}

/// Read the metadata of every entry directly inside `dir`.
fn read_level(dir: &Path, opts: &TraverseOptions) -> Result<Vec<EntryMetadata>, WalkError> {
    let read_dir_err = |source| WalkError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let rd = read_dir(dir).map_err(read_dir_err)?;

    let mut entries = Vec::new();
    for entry_res in rd {
        let entry = entry_res.map_err(read_dir_err)?;

        if let Some(limit) = opts.max_entries
            && entries.len() >= limit
        {
            return Err(WalkError::EntryLimit {
                path: dir.to_path_buf(),
                limit,
            });
        }

        entries.push(read_metadata(&dir.join(entry.file_name()))?);
    }

    Ok(entries)
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
