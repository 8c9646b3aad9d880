use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Failures that abort quarantine for a whole directory or run.
#[derive(Error, Debug)]
pub enum QuarantineError {
    #[error("cannot scan {path:?} for quarantine candidates: {source}")]
    ScanDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create isolation directory {path:?}: {source}")]
    CreateIsolation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to obtain a verdict for one candidate.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("cannot launch classifier {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("waiting for classifier on {path:?} failed: {source}")]
    Wait {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("classifier on {path:?} did not finish within {timeout:?}")]
    TimedOut { path: PathBuf, timeout: Duration },

    #[error("classifier on {path:?} was terminated by a signal")]
    Terminated { path: PathBuf },

    #[error("classifier worker for {path:?} panicked")]
    Panicked { path: PathBuf },
}

/// Failure to move one suspicious file into isolation.
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("{path:?} disappeared before it could be quarantined")]
    Vanished { path: PathBuf },

    #[error("{path:?} changed since it was classified and is no longer a candidate")]
    NoLongerCandidate { path: PathBuf },

    #[error("cannot move {path:?} into isolation: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
