use std::{fs, path::Path};

use crate::{error::WalkError, record::EntryMetadata};

/// Capture metadata for `path` without following a trailing symlink.
pub fn read_metadata(path: &Path) -> Result<EntryMetadata, WalkError> {
    let meta = fs::symlink_metadata(path).map_err(|source| WalkError::Stat {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(EntryMetadata::from_metadata(path.to_path_buf(), &meta))
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
