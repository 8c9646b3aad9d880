use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    thread,
};

use anyhow::{Context, Result, bail};
use log::{error, info, warn};
use snapward_fs::DirSnapshot;
use snapward_quarantine::{DispatchReport, QuarantineCoordinator, output_channel};
use snapward_runtime::{
    MAX_INPUT_DIRS,
    journal::{JournalKind, JournalStore},
};
use snapward_snapshot::{DiffOutcome, WrittenDocument, capture, diff};
use tempfile::TempDir;

use crate::{
    config::RunConfig,
    report::{DocumentChange, DocumentReport, RunReport, UnitReport, UnitStatus},
};

/// Runs snapshot and quarantine work for a set of top-level directories.
///
/// A run has three phases separated by full joins:
/// 1. every root is traversed and its documents written, one thread per root;
/// 2. every successfully traversed root scans its directories and classifies
///    the candidates it finds, one thread per root;
/// 3. files flagged in phase 2 are moved into isolation.
///
/// A failure inside one root's unit of work never stops the others.
pub struct JobOrchestrator {
    config: RunConfig,
    journal: Option<JournalStore>,
}

impl JobOrchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Option<JournalStore>) -> Self {
        self.journal = journal;
        self
    }

    /// Run every phase over `dirs`. Classifier output is written to `console`.
    ///
    /// Errors are returned only for problems that affect the whole run:
    /// invalid input, an unusable output directory, or an isolation
    /// directory that cannot be created.
    pub fn run<W>(&self, dirs: &[PathBuf], console: W) -> Result<RunReport>
    where
        W: Write + Send + 'static,
    {
        validate_dirs(dirs)?;

        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;

        let staging = if self.config.compare {
            let dir = tempfile::Builder::new()
                .prefix(".staging-")
                .tempdir_in(output_dir)
                .with_context(|| {
                    format!("cannot create staging directory in {}", output_dir.display())
                })?;
            Some(dir)
        } else {
            None
        };

        let mut units: Vec<UnitReport> = dirs.iter().cloned().map(UnitReport::new).collect();
        let trees = self.snapshot_phase(&mut units, staging.as_ref());
        warn_on_shared_documents(&units);

        if let Some(settings) = &self.config.quarantine {
            let coordinator =
                QuarantineCoordinator::new(settings.classifier.clone(), &settings.isolation_dir)
                    .with_collision_policy(settings.collision);

            self.dispatch_phase(&coordinator, &mut units, &trees, console);
            self.relocate_phase(&coordinator, &mut units)?;
        }

        self.record_journal(&units);

        Ok(RunReport { units })
    }

    /// Phase 1. Returns the captured tree of every unit that completed.
    fn snapshot_phase(
        &self,
        units: &mut [UnitReport],
        staging: Option<&TempDir>,
    ) -> Vec<Option<DirSnapshot>> {
        thread::scope(|s| {
            let handles: Vec<_> = units
                .iter()
                .enumerate()
                .map(|(idx, unit)| {
                    let root = unit.root.clone();
                    let target = match staging {
                        // Per-unit staging dirs keep same-named documents of
                        // different roots from racing each other.
                        Some(dir) => dir.path().join(idx.to_string()),
                        None => self.config.output_dir.clone(),
                    };
                    s.spawn(move || self.snapshot_root(&root, &target))
                })
                .collect();

            handles
                .into_iter()
                .zip(units.iter_mut())
                .map(|(handle, unit)| match handle.join() {
                    // Folding runs here, one root at a time in input order,
                    // because roots may share documents in the output dir.
                    Ok(Ok((tree, written))) => match self.fold_documents(written) {
                        Ok(documents) => {
                            unit.documents = documents;
                            Some(tree)
                        }
                        Err(e) => {
                            error!("[run] {e:#}");
                            unit.abort(&e);
                            None
                        }
                    },
                    Ok(Err(e)) => {
                        error!("[run] {e:#}");
                        unit.abort(&e);
                        None
                    }
                    Err(_) => {
                        error!("[run] snapshot worker for {:?} panicked", unit.root);
                        unit.status = UnitStatus::Panicked;
                        None
                    }
                })
                .collect()
        })
    }

    fn snapshot_root(
        &self,
        root: &Path,
        target: &Path,
    ) -> Result<(DirSnapshot, Vec<WrittenDocument>)> {
        capture(root, target, &self.config.traverse, self.config.naming)
            .with_context(|| format!("snapshot of {} failed", root.display()))
    }

    fn fold_documents(&self, written: Vec<WrittenDocument>) -> Result<Vec<DocumentReport>> {
        if self.config.compare {
            return written
                .into_iter()
                .map(|doc| self.compare_document(doc))
                .collect();
        }

        Ok(written
            .into_iter()
            .map(|doc| DocumentReport {
                directory: doc.directory,
                document: doc.document,
                records: doc.records,
                change: DocumentChange::Written,
            })
            .collect())
    }

    /// Fold a staged document into the output directory.
    fn compare_document(&self, staged: WrittenDocument) -> Result<DocumentReport> {
        let file_name = staged
            .document
            .file_name()
            .context("staged document has no file name")?;
        let previous = self.config.output_dir.join(file_name);
        let existed = previous.exists();

        let outcome = diff(&previous, &staged.document).with_context(|| {
            format!(
                "cannot compare {} with {}",
                previous.display(),
                staged.document.display()
            )
        })?;

        let change = match outcome {
            DiffOutcome::Identical => DocumentChange::Unchanged,
            DiffOutcome::Updated { .. } if !existed => DocumentChange::Created,
            DiffOutcome::Updated { first_difference } => {
                DocumentChange::Changed { first_difference }
            }
        };

        Ok(DocumentReport {
            directory: staged.directory,
            document: previous,
            records: staged.records,
            change,
        })
    }

    /// Phase 2. Joins on every unit, and on the drain of classifier output,
    /// before returning.
    fn dispatch_phase<W>(
        &self,
        coordinator: &QuarantineCoordinator,
        units: &mut [UnitReport],
        trees: &[Option<DirSnapshot>],
        console: W,
    ) where
        W: Write + Send + 'static,
    {
        let (output, drain) = output_channel(console);

        thread::scope(|s| {
            let handles: Vec<_> = trees
                .iter()
                .map(|tree| {
                    let tree = tree.as_ref()?;
                    let output = output.clone();
                    Some(s.spawn(move || {
                        coordinator.dispatch(tree.iter().map(|d| d.path.as_path()), &output)
                    }))
                })
                .collect();

            for (handle, unit) in handles.into_iter().zip(units.iter_mut()) {
                let Some(handle) = handle else {
                    continue;
                };
                match handle.join() {
                    Ok(Ok(reports)) => unit.quarantine = reports,
                    Ok(Err(e)) => {
                        let e = anyhow::Error::new(e);
                        error!("[run] {e:#}");
                        unit.abort(&e);
                    }
                    Err(_) => {
                        error!("[run] quarantine worker for {:?} panicked", unit.root);
                        unit.status = UnitStatus::Panicked;
                    }
                }
            }
        });

        // Every sender clone is gone once the scope ends; drop ours so the
        // drain can see end-of-stream.
        drop(output);
        if let Err(e) = drain.finish() {
            warn!("[run] classifier output was not fully written: {e}");
        }
    }

    /// Phase 3.
    fn relocate_phase(
        &self,
        coordinator: &QuarantineCoordinator,
        units: &mut [UnitReport],
    ) -> Result<()> {
        for unit in units.iter_mut() {
            coordinator.relocate(&mut unit.quarantine)?;

            if unit.quarantine.iter().any(DispatchReport::has_failures)
                && unit.status == (UnitStatus::Completed { code: 0 })
            {
                unit.status = UnitStatus::Completed { code: 1 };
            }
        }
        Ok(())
    }

    fn record_journal(&self, units: &[UnitReport]) {
        let Some(journal) = &self.journal else {
            return;
        };

        for unit in units {
            for doc in &unit.documents {
                if let DocumentChange::Changed { first_difference } = doc.change {
                    journal.record(JournalKind::SnapshotChanged {
                        document: doc.document.clone(),
                        first_difference,
                    });
                }
            }
            let moved = unit.quarantine.iter().flat_map(|r| r.quarantined());
            for (source, destination, status) in moved {
                journal.record(JournalKind::Quarantined {
                    source: source.to_path_buf(),
                    destination: destination.to_path_buf(),
                    classifier_status: status,
                });
            }
        }
    }
}

fn validate_dirs(dirs: &[PathBuf]) -> Result<()> {
    if dirs.is_empty() {
        bail!("no directories given");
    }
    if dirs.len() > MAX_INPUT_DIRS {
        bail!(
            "too many directories: {} given, at most {MAX_INPUT_DIRS} allowed",
            dirs.len()
        );
    }

    // Compare resolved paths so aliases like `d/../d` or a symlink to `d`
    // are caught. A root that cannot be resolved fails in its own unit.
    let mut seen: Vec<(PathBuf, &Path)> = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let resolved = fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
        for (other_resolved, other) in &seen {
            if *other_resolved == resolved {
                bail!(
                    "directory {} given more than once (also as {})",
                    dir.display(),
                    other.display()
                );
            }
            if resolved.starts_with(other_resolved) || other_resolved.starts_with(&resolved) {
                bail!(
                    "directories {} and {} overlap",
                    other.display(),
                    dir.display()
                );
            }
        }
        seen.push((resolved, dir));
    }

    info!("[run] {} directories to process", dirs.len());
    Ok(())
}

/// Base-name document naming lets two directories land on the same
/// document; the later write wins.
fn warn_on_shared_documents(units: &[UnitReport]) {
    let mut owners: HashMap<&Path, &Path> = HashMap::new();
    for doc in units.iter().flat_map(|u| u.documents.iter()) {
        if let Some(first) = owners.insert(&doc.document, &doc.directory) {
            warn!(
                "[run] {:?} and {:?} share snapshot document {:?}",
                first, doc.directory, doc.document
            );
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
