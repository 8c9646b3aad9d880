use std::process::ExitCode;

use clap::Args;
use log::{error, info};
use snapward_runtime::journal::{JournalKind, JournalStore};

#[derive(Debug, Args)]
pub struct JournalArgs {
    /// Number of entries to display
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,

    /// Clear the journal
    #[arg(long)]
    pub clear: bool,
}

pub fn run(args: JournalArgs) -> ExitCode {
    let store = match JournalStore::new() {
        Some(s) => s,
        None => {
            info!("[journal] journal is disabled");
            println!("Journal is disabled.");
            return ExitCode::SUCCESS;
        }
    };

    if args.clear {
        return match store.clear() {
            Ok(()) => {
                println!("Journal cleared");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("[journal] failed to clear {:?}: {e}", store.path());
                eprintln!("[journal] failed to clear {}: {e}", store.path().display());
                ExitCode::from(1)
            }
        };
    }

    let events = store.recent(args.limit);
    if events.is_empty() {
        println!("No journal entries yet.");
        return ExitCode::SUCCESS;
    }

    println!("{:<20}  {:<12}  DETAIL", "TIMESTAMP", "EVENT");
    println!("{}", "-".repeat(72));

    for event in events {
        let ts = event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let (label, detail) = match &event.kind {
            JournalKind::Quarantined {
                source,
                destination,
                classifier_status,
            } => (
                "quarantined",
                format!(
                    "{} -> {} (status {classifier_status})",
                    source.display(),
                    destination.display()
                ),
            ),
            JournalKind::SnapshotChanged {
                document,
                first_difference,
            } => (
                "changed",
                format!("{} at line {first_difference}", document.display()),
            ),
        };
        println!("{ts:<20}  {label:<12}  {detail}");
    }

    let total = store.count();
    if total > args.limit {
        println!(
            "\n({} more entries, use --limit to show more)",
            total - args.limit
        );
    }

    ExitCode::SUCCESS
}
