use std::path::PathBuf;

use snapward_quarantine::DispatchReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentChange {
    /// Written straight into the output directory.
    Written,
    /// Compare mode, no previous document existed.
    Created,
    Unchanged,
    Changed { first_difference: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub directory: PathBuf,
    pub document: PathBuf,
    pub records: usize,
    pub change: DocumentChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// `code` is 0 on full success, 1 when some candidate could not be
    /// classified or moved.
    Completed { code: i32 },
    /// A fatal error ended this unit; other units are unaffected.
    Aborted { error: String },
    /// The worker thread panicked.
    Panicked,
}

/// Everything one top-level directory produced during a run.
#[derive(Debug)]
pub struct UnitReport {
    pub root: PathBuf,
    pub status: UnitStatus,
    pub documents: Vec<DocumentReport>,
    pub quarantine: Vec<DispatchReport>,
}

impl UnitReport {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            status: UnitStatus::Completed { code: 0 },
            documents: Vec::new(),
            quarantine: Vec::new(),
        }
    }

    pub(crate) fn abort(&mut self, error: &anyhow::Error) {
        self.status = UnitStatus::Aborted {
            error: format!("{error:#}"),
        };
    }

    pub fn is_success(&self) -> bool {
        self.status == UnitStatus::Completed { code: 0 }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.units.iter().all(UnitReport::is_success)
    }
}
