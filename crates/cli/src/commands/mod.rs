pub mod diff;
pub mod journal;
pub mod run;

use clap::Subcommand;
pub use diff::DiffArgs;
pub use journal::JournalArgs;
pub use run::RunArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Snapshot directories and, with -s, quarantine permission-less files.
    ///
    /// Example:
    ///   snapward run -o /var/snapshots /srv/www /home/shared
    ///   snapward run -o out -s /var/quarantine --classifier ./check.sh data
    Run(RunArgs),

    /// Compare two snapshot documents; replace OLD with NEW when they differ.
    Diff(DiffArgs),

    /// Show what past runs quarantined or found changed.
    Journal(JournalArgs),
}
