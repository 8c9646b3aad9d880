use std::process::ExitCode;

use clap::Parser;

mod commands;
mod printer;

use commands::Command;
use snapward_runtime::logging;

#[derive(Debug, Parser)]
#[command(
    name = "snapward",
    version,
    about = "Directory snapshots, change detection and quarantine of permission-less files",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not errors.
            let code = if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    match cli.command {
        Command::Run(args) => commands::run::run(args),
        Command::Diff(args) => commands::diff::run(args),
        Command::Journal(args) => commands::journal::run(args),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
