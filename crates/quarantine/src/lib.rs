//! Detection and isolation of files that grant no access to anyone.
//!
//! A [`QuarantineCoordinator`] runs in two halves: [`dispatch`] scans
//! directories and classifies every candidate concurrently, and [`relocate`]
//! moves the files the classifier flagged. Callers decide when the second half
//! runs, which lets an orchestrator wait for every classifier first.
//!
//! [`dispatch`]: QuarantineCoordinator::dispatch
//! [`relocate`]: QuarantineCoordinator::relocate

mod candidate;
mod classifier;
mod coordinator;
mod error;
mod relocate;

pub use candidate::scan_regular_files;
pub use classifier::{Classifier, ExternalClassifier, OutputDrain, Verdict, output_channel};
pub use coordinator::{DispatchReport, FileReport, Outcome, QuarantineCoordinator};
pub use error::{ClassifyError, QuarantineError, RelocateError};
pub use relocate::{CollisionPolicy, relocate};

/// Upper bound on classifier processes running at once.
pub const DEFAULT_MAX_CLASSIFIERS: usize = 32;
