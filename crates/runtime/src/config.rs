use std::path::PathBuf;

pub const PROGRAM_NAME: &str = "snapward";
pub const PROGRAM_LOG_LEVEL: &str = "SNAPWARD_LOG_LEVEL";

/// Snapshot documents are named `Snapshot_<key>.txt`.
pub const SNAPSHOT_PREFIX: &str = "Snapshot_";
pub const SNAPSHOT_SUFFIX: &str = ".txt";

/// Upper bound on top-level directories accepted by a single run.
pub const MAX_INPUT_DIRS: usize = 10;

/// External classifier used when neither the CLI nor the environment names one.
pub const DEFAULT_CLASSIFIER: &str = "./verify_for_malicious.sh";
pub const CLASSIFIER_ENV: &str = "SNAPWARD_CLASSIFIER";
pub const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 60;

pub const JOURNAL_FILE_NAME: &str = "journal.log";
pub const JOURNAL_DISABLED_ENV: &str = "SNAPWARD_JOURNAL";

/// Classifier program from `SNAPWARD_CLASSIFIER`, falling back to the default script.
pub fn default_classifier() -> PathBuf {
    match std::env::var_os(CLASSIFIER_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(DEFAULT_CLASSIFIER),
    }
}

pub fn state_dir() -> Option<PathBuf> {
    // Check XDG_STATE_HOME first (Linux)
    if let Some(xdg_state) = std::env::var_os("XDG_STATE_HOME")
        && !xdg_state.is_empty()
    {
        return Some(PathBuf::from(xdg_state).join(PROGRAM_NAME));
    }

    // Fall back to dirs crate
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join(PROGRAM_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
