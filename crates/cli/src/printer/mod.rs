use std::io::{self, Write};

use snapward_orchestrator::{DocumentChange, RunReport, UnitReport, UnitStatus};
use snapward_quarantine::Outcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Human,
    /// NDJSON (newline-delimited JSON) for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// Trait for printing the outcome of a run.
///
/// Units arrive in the order the directories were given; `finish` is called
/// once after the last one.
pub trait ReportPrinter {
    fn print_unit(&mut self, unit: &UnitReport) -> io::Result<()>;

    fn finish(&mut self, report: &RunReport) -> io::Result<()>;
}

pub fn make_printer(json: bool) -> Box<dyn ReportPrinter> {
    match OutputFormat::from_json_flag(json) {
        OutputFormat::Human => Box::new(HumanPrinter::new(io::stdout(), io::stderr())),
        OutputFormat::Json => Box::new(JsonPrinter::new(io::stdout(), io::stderr())),
    }
}

fn change_label(change: DocumentChange) -> String {
    match change {
        DocumentChange::Written => "written".to_owned(),
        DocumentChange::Created => "created".to_owned(),
        DocumentChange::Unchanged => "unchanged".to_owned(),
        DocumentChange::Changed { first_difference } => {
            format!("changed at line {first_difference}")
        }
    }
}

fn status_code(status: &UnitStatus) -> i32 {
    match status {
        UnitStatus::Completed { code } => *code,
        UnitStatus::Aborted { .. } | UnitStatus::Panicked => 1,
    }
}

/// Human-readable printer. Diagnostics go to `err`.
pub struct HumanPrinter<W: Write, E: Write> {
    out: W,
    err: E,
}

impl<W: Write, E: Write> HumanPrinter<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self { out, err }
    }
}

impl<W: Write, E: Write> ReportPrinter for HumanPrinter<W, E> {
    fn print_unit(&mut self, unit: &UnitReport) -> io::Result<()> {
        writeln!(self.out, "{}", unit.root.display())?;

        for doc in &unit.documents {
            writeln!(
                self.out,
                "  {} ({} entries, {})",
                doc.document.display(),
                doc.records,
                change_label(doc.change)
            )?;
        }

        for dispatch in &unit.quarantine {
            for file in &dispatch.files {
                match &file.outcome {
                    Outcome::Quarantined {
                        destination,
                        status,
                    } => writeln!(
                        self.out,
                        "  quarantined {} -> {} (status {status})",
                        file.path.display(),
                        destination.display()
                    )?,
                    Outcome::VerifiedSuspicious { status } => writeln!(
                        self.out,
                        "  suspicious {} (status {status}), not moved",
                        file.path.display()
                    )?,
                    Outcome::VerificationFailed(e) => {
                        writeln!(self.err, "[run] {}: {e}", file.path.display())?
                    }
                    Outcome::MoveFailed { error, .. } => {
                        writeln!(self.err, "[run] {}: {error}", file.path.display())?
                    }
                    Outcome::NotACandidate | Outcome::VerifiedClean => {}
                }
            }
        }

        match &unit.status {
            UnitStatus::Completed { .. } => Ok(()),
            UnitStatus::Aborted { error } => {
                writeln!(self.err, "[run] {}: {error}", unit.root.display())
            }
            UnitStatus::Panicked => {
                writeln!(self.err, "[run] {}: worker panicked", unit.root.display())
            }
        }
    }

    fn finish(&mut self, report: &RunReport) -> io::Result<()> {
        let failed = report.units.iter().filter(|u| !u.is_success()).count();
        let documents: usize = report.units.iter().map(|u| u.documents.len()).sum();
        let quarantined: usize = report
            .units
            .iter()
            .flat_map(|u| &u.quarantine)
            .map(|d| d.quarantined().count())
            .sum();

        let directories = report.units.len();
        writeln!(
            self.err,
            "\n[run] {directories} directories, {documents} documents, \
             {quarantined} quarantined, {failed} failed"
        )
    }
}

/// One JSON object per unit on `out`, followed by a summary object.
pub struct JsonPrinter<W: Write, E: Write> {
    out: W,
    err: E,
}

impl<W: Write, E: Write> JsonPrinter<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self { out, err }
    }
}

impl<W: Write, E: Write> ReportPrinter for JsonPrinter<W, E> {
    fn print_unit(&mut self, unit: &UnitReport) -> io::Result<()> {
        let documents: Vec<_> = unit
            .documents
            .iter()
            .map(|doc| {
                serde_json::json!({
                    "directory": doc.directory.display().to_string(),
                    "document": doc.document.display().to_string(),
                    "records": doc.records,
                    "change": change_label(doc.change),
                })
            })
            .collect();

        let quarantined: Vec<_> = unit
            .quarantine
            .iter()
            .flat_map(|d| d.quarantined())
            .map(|(source, destination, status)| {
                serde_json::json!({
                    "source": source.display().to_string(),
                    "destination": destination.display().to_string(),
                    "status": status,
                })
            })
            .collect();

        let failures: Vec<_> = unit
            .quarantine
            .iter()
            .flat_map(|d| &d.files)
            .filter_map(|f| match &f.outcome {
                Outcome::VerificationFailed(e) => Some((f, e.to_string())),
                Outcome::MoveFailed { error, .. } => Some((f, error.to_string())),
                _ => None,
            })
            .map(|(f, error)| {
                serde_json::json!({
                    "path": f.path.display().to_string(),
                    "error": error,
                })
            })
            .collect();

        let error = match &unit.status {
            UnitStatus::Aborted { error } => Some(error.clone()),
            UnitStatus::Panicked => Some("worker panicked".to_owned()),
            UnitStatus::Completed { .. } => None,
        };

        let obj = serde_json::json!({
            "type": "unit",
            "root": unit.root.display().to_string(),
            "code": status_code(&unit.status),
            "error": error,
            "documents": documents,
            "quarantined": quarantined,
            "failures": failures,
        });
        writeln!(self.out, "{obj}")
    }

    fn finish(&mut self, report: &RunReport) -> io::Result<()> {
        let obj = serde_json::json!({
            "type": "summary",
            "directories": report.units.len(),
            "failed": report.units.iter().filter(|u| !u.is_success()).count(),
            "success": report.is_success(),
        });
        writeln!(self.err, "{obj}")
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
