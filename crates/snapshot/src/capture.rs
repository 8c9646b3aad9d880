use std::path::{Path, PathBuf};

use log::{debug, info};
use snapward_fs::{DirSnapshot, TraverseOptions, traverse};

use crate::{document::write_document, error::SnapshotError, naming::DocumentNaming};

/// A snapshot document produced for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDocument {
    pub directory: PathBuf,
    pub document: PathBuf,
    pub records: usize,
}

/// Traverse `root` and write one snapshot document per directory into `out_dir`.
///
/// The whole tree is captured before anything is written, so a traversal
/// failure leaves no documents behind for that root.
pub fn capture(
    root: &Path,
    out_dir: &Path,
    opts: &TraverseOptions,
    naming: DocumentNaming,
) -> Result<(DirSnapshot, Vec<WrittenDocument>), SnapshotError> {
    let tree = traverse(root, opts)?;
    let written = write_tree(&tree, out_dir, naming)?;

    info!(
        "[snapshot] {:?}: {} documents written to {:?}",
        root,
        written.len(),
        out_dir
    );

    Ok((tree, written))
}

/// Serialize every directory of `tree` into `out_dir`, parents first.
pub fn write_tree(
    tree: &DirSnapshot,
    out_dir: &Path,
    naming: DocumentNaming,
) -> Result<Vec<WrittenDocument>, SnapshotError> {
    let mut written = Vec::with_capacity(tree.dir_count());

    for dir in tree.iter() {
        let document = out_dir.join(naming.file_name(&tree.path, &dir.relative));
        write_document(&document, &dir.entries)?;
        debug!("[snapshot] {:?} -> {:?}", dir.path, document);

        written.push(WrittenDocument {
            directory: dir.path.clone(),
            document,
            records: dir.entries.len(),
        });
    }

    Ok(written)
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
