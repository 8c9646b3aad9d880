use std::{io, path::PathBuf};

use snapward_fs::WalkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("cannot write snapshot document {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read snapshot document {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),
}
