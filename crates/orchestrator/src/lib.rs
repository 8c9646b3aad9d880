mod config;
mod report;
mod run;

pub use config::{QuarantineSettings, RunConfig};
pub use report::{DocumentChange, DocumentReport, RunReport, UnitReport, UnitStatus};
pub use run::JobOrchestrator;
