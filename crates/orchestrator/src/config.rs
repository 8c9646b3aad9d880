use std::{path::PathBuf, sync::Arc};

use snapward_fs::TraverseOptions;
use snapward_quarantine::{Classifier, CollisionPolicy};
use snapward_snapshot::DocumentNaming;

pub struct QuarantineSettings {
    pub isolation_dir: PathBuf,
    pub classifier: Arc<dyn Classifier>,
    pub collision: CollisionPolicy,
}

pub struct RunConfig {
    /// Where snapshot documents are written.
    pub output_dir: PathBuf,
    pub naming: DocumentNaming,
    pub traverse: TraverseOptions,
    /// `None` disables the quarantine phases.
    pub quarantine: Option<QuarantineSettings>,
    /// Diff fresh documents against the ones already in `output_dir`.
    pub compare: bool,
}

impl RunConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            naming: DocumentNaming::default(),
            traverse: TraverseOptions::default(),
            quarantine: None,
            compare: false,
        }
    }
}
