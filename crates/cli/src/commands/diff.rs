use std::{path::PathBuf, process::ExitCode};

use clap::Args;
use log::error;
use snapward_snapshot::{DiffOutcome, diff};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Previous snapshot document; replaced when the documents differ
    pub old: PathBuf,

    /// Fresh snapshot document
    pub new: PathBuf,
}

pub fn run(args: DiffArgs) -> ExitCode {
    match diff(&args.old, &args.new) {
        Ok(DiffOutcome::Identical) => {
            println!("identical");
            ExitCode::SUCCESS
        }
        Ok(DiffOutcome::Updated { first_difference }) => {
            println!("updated (first difference at line {first_difference})");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[diff] {e}");
            eprintln!("[diff] {e}");
            ExitCode::from(1)
        }
    }
}
