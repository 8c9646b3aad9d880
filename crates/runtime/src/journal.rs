//! Append-only record of what a run changed on disk.
//!
//! Each line of the journal is one JSON-encoded [`JournalEvent`]. The journal
//! is advisory: failing to append never fails the run that produced the event.

use std::{
    env,
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{JOURNAL_DISABLED_ENV, JOURNAL_FILE_NAME, state_dir};

pub const JOURNAL_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum JournalKind {
    /// A suspicious file was moved into the isolation directory.
    Quarantined {
        source: PathBuf,
        destination: PathBuf,
        /// Exit status reported by the classifier.
        classifier_status: i32,
    },
    /// A snapshot document differed from the previous run's and was replaced.
    SnapshotChanged {
        document: PathBuf,
        first_difference: usize,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JournalEvent {
    /// Schema version
    pub version: u8,
    pub timestamp: DateTime<Utc>,
    pub kind: JournalKind,
}

impl JournalEvent {
    pub fn new(kind: JournalKind) -> Self {
        Self {
            version: JOURNAL_VERSION,
            timestamp: Utc::now(),
            kind,
        }
    }
}

pub struct JournalStore {
    path: PathBuf,
}

pub fn journal_path() -> Option<PathBuf> {
    state_dir().map(|d| d.join(JOURNAL_FILE_NAME))
}

fn journal_disabled() -> bool {
    match env::var(JOURNAL_DISABLED_ENV) {
        Ok(val) => val == "0" || val.eq_ignore_ascii_case("false"),
        Err(_) => false,
    }
}

impl JournalStore {
    /// Journal in the state directory, or `None` when disabled or no state
    /// directory can be resolved.
    pub fn new() -> Option<Self> {
        if journal_disabled() {
            return None;
        }

        let path = journal_path()?;
        Some(Self { path })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, kind: JournalKind) {
        if let Err(e) = self.append_event(&JournalEvent::new(kind)) {
            debug!("[journal] failed to append to {:?}: {e}", self.path);
        }
    }

    fn append_event(&self, event: &JournalEvent) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(event).map_err(io::Error::other)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // One write per event; O_APPEND keeps concurrent appenders from
        // clobbering each other but a torn line is still possible on failure.
        file.write_all(line.as_bytes())?;

        Ok(())
    }

    pub fn iter_events(&self) -> impl Iterator<Item = JournalEvent> {
        self.read_events().into_iter().flatten()
    }

    fn read_events(&self) -> Option<Vec<JournalEvent>> {
        let file = File::open(&self.path).ok()?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            match line {
                Ok(line) => match serde_json::from_str(&line) {
                    Ok(ev) => events.push(ev),
                    Err(e) => debug!("[journal] skipping malformed line: {e}"),
                },
                Err(e) => {
                    debug!("[journal] error reading {:?}: {e}", self.path);
                    break;
                }
            }
        }
        Some(events)
    }

    /// Most recent events first.
    pub fn recent(&self, limit: usize) -> Vec<JournalEvent> {
        let mut events: Vec<JournalEvent> = self.iter_events().collect();
        events.reverse();
        events.truncate(limit);
        events
    }

    pub fn count(&self) -> usize {
        self.iter_events().count()
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
