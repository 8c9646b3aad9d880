use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure while capturing a directory tree. Any of these aborts the
/// traversal of the root it occurred under.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("cannot stat {path:?}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory {path:?} has more than {limit} entries")]
    EntryLimit { path: PathBuf, limit: usize },
}

impl WalkError {
    pub fn path(&self) -> &PathBuf {
        match self {
            WalkError::Stat { path, .. }
            | WalkError::ReadDir { path, .. }
            | WalkError::EntryLimit { path, .. } => path,
        }
    }
}
