//! Snapshot documents: rendering, naming, writing and comparison.

mod capture;
mod diff;
mod document;
mod error;
mod naming;

pub use capture::{WrittenDocument, capture, write_tree};
pub use diff::{DiffOutcome, diff};
pub use document::{render, write_atomic, write_document};
pub use error::SnapshotError;
pub use naming::DocumentNaming;
