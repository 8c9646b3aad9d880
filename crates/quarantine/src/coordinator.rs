use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use crossbeam::channel::{self, Sender};
use log::{debug, error, info, warn};

use crate::{
    DEFAULT_MAX_CLASSIFIERS,
    candidate::scan_regular_files,
    classifier::{Classifier, Verdict},
    error::{ClassifyError, QuarantineError, RelocateError},
    relocate::{CollisionPolicy, relocate},
};

/// Where a single regular file ended up.
#[derive(Debug)]
pub enum Outcome {
    /// The file grants some access to someone and was never classified.
    NotACandidate,
    VerifiedClean,
    /// Flagged by the classifier; waiting for the relocate pass.
    VerifiedSuspicious { status: i32 },
    Quarantined { destination: PathBuf, status: i32 },
    VerificationFailed(ClassifyError),
    MoveFailed { status: i32, error: RelocateError },
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: Outcome,
}

/// Outcome of every regular file directly inside one directory.
#[derive(Debug)]
pub struct DispatchReport {
    pub source_dir: PathBuf,
    pub files: Vec<FileReport>,
}

impl DispatchReport {
    /// `(source, destination, classifier status)` of every file moved into isolation.
    pub fn quarantined(&self) -> impl Iterator<Item = (&Path, &Path, i32)> + '_ {
        self.files.iter().filter_map(|f| match &f.outcome {
            Outcome::Quarantined {
                destination,
                status,
            } => Some((f.path.as_path(), destination.as_path(), *status)),
            _ => None,
        })
    }

    /// True when some candidate could not be classified or moved.
    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| {
            matches!(
                f.outcome,
                Outcome::VerificationFailed(_) | Outcome::MoveFailed { .. }
            )
        })
    }
}

pub struct QuarantineCoordinator {
    classifier: Arc<dyn Classifier>,
    isolation_dir: PathBuf,
    collision: CollisionPolicy,
    max_parallel: usize,
}

impl QuarantineCoordinator {
    pub fn new(classifier: Arc<dyn Classifier>, isolation_dir: impl Into<PathBuf>) -> Self {
        Self {
            classifier,
            isolation_dir: isolation_dir.into(),
            collision: CollisionPolicy::default(),
            max_parallel: DEFAULT_MAX_CLASSIFIERS,
        }
    }

    pub fn with_collision_policy(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Cap on classifiers running at once; at least one always runs.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Scan and classify, then move everything flagged: the whole pipeline
    /// for a single directory.
    pub fn quarantine(
        &self,
        source_dir: &Path,
        output: &Sender<String>,
    ) -> Result<DispatchReport, QuarantineError> {
        let mut reports = self.dispatch([source_dir], output)?;
        self.relocate(&mut reports)?;

        match reports.pop() {
            Some(report) => Ok(report),
            None => Ok(DispatchReport {
                source_dir: source_dir.to_path_buf(),
                files: Vec::new(),
            }),
        }
    }

    /// Scan every directory in `dirs` for regular files and classify all the
    /// candidates among them concurrently. Returns once every classifier has
    /// finished. Nothing is moved.
    pub fn dispatch<'a, I>(
        &self,
        dirs: I,
        output: &Sender<String>,
    ) -> Result<Vec<DispatchReport>, QuarantineError>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut reports = Vec::new();
        // (report index, file index) of each candidate, parallel to `paths`.
        let mut slots = Vec::new();
        let mut paths = Vec::new();

        for dir in dirs {
            let files = scan_regular_files(dir)?;
            let report_idx = reports.len();

            let files = files
                .into_iter()
                .enumerate()
                .map(|(file_idx, rec)| {
                    if rec.is_quarantine_candidate() {
                        slots.push((report_idx, file_idx));
                        paths.push(rec.name.clone());
                    }
                    FileReport {
                        path: rec.name,
                        outcome: Outcome::NotACandidate,
                    }
                })
                .collect();

            reports.push(DispatchReport {
                source_dir: dir.to_path_buf(),
                files,
            });
        }

        debug!(
            "[quarantine] {} candidates across {} directories",
            paths.len(),
            reports.len()
        );

        let verdicts = self.classify_all(&paths, output);
        for ((report_idx, file_idx), verdict) in slots.into_iter().zip(verdicts) {
            let file = &mut reports[report_idx].files[file_idx];
            file.outcome = match verdict {
                Ok(Verdict::Clean) => {
                    debug!("[quarantine] {:?} is clean", file.path);
                    Outcome::VerifiedClean
                }
                Ok(Verdict::Suspicious { status }) => {
                    info!("[quarantine] {:?} flagged (status {status})", file.path);
                    Outcome::VerifiedSuspicious { status }
                }
                Err(e) => {
                    error!("[quarantine] {e}");
                    Outcome::VerificationFailed(e)
                }
            };
        }

        Ok(reports)
    }

    /// Run the classifier over `paths` on a bounded pool of workers. The
    /// result at index `i` belongs to `paths[i]`.
    fn classify_all(
        &self,
        paths: &[PathBuf],
        output: &Sender<String>,
    ) -> Vec<Result<Verdict, ClassifyError>> {
        if paths.is_empty() {
            return Vec::new();
        }

        let (work_tx, work_rx) = channel::unbounded::<usize>();
        for i in 0..paths.len() {
            let _ = work_tx.send(i);
        }
        drop(work_tx);

        let (result_tx, result_rx) = channel::unbounded();
        let workers = self.max_parallel.min(paths.len());
        let classifier = &*self.classifier;

        thread::scope(|s| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let output = output.clone();

                s.spawn(move || {
                    for i in work_rx {
                        let path = &paths[i];
                        let attempt = AssertUnwindSafe(|| classifier.classify(path, &output));
                        let verdict = panic::catch_unwind(attempt).unwrap_or_else(|_| {
                            Err(ClassifyError::Panicked { path: path.clone() })
                        });
                        if result_tx.send((i, verdict)).is_err() {
                            return;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<Option<Result<Verdict, ClassifyError>>> =
            paths.iter().map(|_| None).collect();
        for (i, verdict) in result_rx.iter() {
            results[i] = Some(verdict);
        }

        results
            .into_iter()
            .zip(paths)
            .map(|(r, path)| {
                r.unwrap_or_else(|| Err(ClassifyError::Panicked { path: path.clone() }))
            })
            .collect()
    }

    /// Move every file still marked suspicious into the isolation directory,
    /// creating it if needed. Per-file failures are recorded in the reports;
    /// only failing to create the isolation directory is returned as an error.
    pub fn relocate(&self, reports: &mut [DispatchReport]) -> Result<(), QuarantineError> {
        let pending = reports
            .iter()
            .flat_map(|r| r.files.iter())
            .any(|f| matches!(f.outcome, Outcome::VerifiedSuspicious { .. }));
        if !pending {
            return Ok(());
        }

        fs::create_dir_all(&self.isolation_dir).map_err(|source| {
            QuarantineError::CreateIsolation {
                path: self.isolation_dir.clone(),
                source,
            }
        })?;

        for file in reports.iter_mut().flat_map(|r| r.files.iter_mut()) {
            let Outcome::VerifiedSuspicious { status } = file.outcome else {
                continue;
            };

            file.outcome = match relocate(&file.path, &self.isolation_dir, self.collision) {
                Ok(destination) => {
                    info!("[quarantine] moved {:?} to {:?}", file.path, destination);
                    Outcome::Quarantined {
                        destination,
                        status,
                    }
                }
                Err(error) => {
                    warn!("[quarantine] {error}");
                    Outcome::MoveFailed { status, error }
                }
            };
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
