use std::{io, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Args;
use log::error;
use snapward_fs::TraverseOptions;
use snapward_orchestrator::{JobOrchestrator, QuarantineSettings, RunConfig};
use snapward_quarantine::{CollisionPolicy, ExternalClassifier};
use snapward_runtime::{
    DEFAULT_CLASSIFIER_TIMEOUT_SECS, MAX_INPUT_DIRS, default_classifier, journal::JournalStore,
};
use snapward_snapshot::DocumentNaming;

use crate::printer::make_printer;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory that receives the snapshot documents
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Isolation directory for suspicious files; enables quarantine
    #[arg(short = 's', long = "isolation", value_name = "DIR")]
    pub isolation_dir: Option<PathBuf>,

    /// Program run as `<PROGRAM> <file>` on every candidate
    /// [default: $SNAPWARD_CLASSIFIER or ./verify_for_malicious.sh]
    #[arg(long, value_name = "PROGRAM")]
    pub classifier: Option<PathBuf>,

    /// Seconds before a classifier is killed; 0 waits forever
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_CLASSIFIER_TIMEOUT_SECS)]
    pub classifier_timeout: u64,

    /// Name documents after the directory's path below its root
    #[arg(long)]
    pub name_by_path: bool,

    /// Keep both files when a quarantined name already exists in isolation
    #[arg(long)]
    pub keep_collisions: bool,

    /// Diff against the documents already in the output directory
    #[arg(long)]
    pub compare: bool,

    /// Fail a directory holding more than N entries
    #[arg(long, value_name = "N")]
    pub max_entries: Option<usize>,

    /// Print the run report as NDJSON
    #[arg(long)]
    pub json: bool,

    /// Directories to process
    #[arg(required = true, num_args = 1..=MAX_INPUT_DIRS, value_name = "DIR")]
    pub dirs: Vec<PathBuf>,
}

/// Stream that receives classifier output during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierConsole {
    Stdout,
    Stderr,
}

impl RunArgs {
    /// With `--json`, stdout carries only the NDJSON report.
    pub fn classifier_console(&self) -> ClassifierConsole {
        if self.json {
            ClassifierConsole::Stderr
        } else {
            ClassifierConsole::Stdout
        }
    }

    pub fn to_config(&self) -> RunConfig {
        let quarantine = self.isolation_dir.as_ref().map(|isolation_dir| {
            let program = self.classifier.clone().unwrap_or_else(default_classifier);
            let timeout = (self.classifier_timeout > 0)
                .then(|| Duration::from_secs(self.classifier_timeout));

            QuarantineSettings {
                isolation_dir: isolation_dir.clone(),
                classifier: Arc::new(ExternalClassifier::new(program).with_timeout(timeout)),
                collision: if self.keep_collisions {
                    CollisionPolicy::Suffix
                } else {
                    CollisionPolicy::Overwrite
                },
            }
        });

        RunConfig {
            output_dir: self.output_dir.clone(),
            naming: if self.name_by_path {
                DocumentNaming::RelativePath
            } else {
                DocumentNaming::BaseName
            },
            traverse: TraverseOptions {
                max_entries: self.max_entries,
            },
            quarantine,
            compare: self.compare,
        }
    }
}

pub fn run(args: RunArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("[run] {e:#}");
            eprintln!("[run] {e:#}");
            ExitCode::from(1)
        }
    }
}

fn execute(args: RunArgs) -> Result<ExitCode> {
    let orchestrator = JobOrchestrator::new(args.to_config()).with_journal(JournalStore::new());
    let report = match args.classifier_console() {
        ClassifierConsole::Stdout => orchestrator.run(&args.dirs, io::stdout())?,
        ClassifierConsole::Stderr => orchestrator.run(&args.dirs, io::stderr())?,
    };

    let mut printer = make_printer(args.json);
    for unit in &report.units {
        printer.print_unit(unit)?;
    }
    printer.finish(&report)?;

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
