use std::{fs::Metadata, os::unix::fs::MetadataExt, path::PathBuf};

use bitflags::bitflags;

const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFLNK: u32 = 0o120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, fifos, device nodes.
    Other,
}

impl EntryKind {
    /// Derive the entry kind from the `S_IFMT` bits of a raw mode.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => EntryKind::File,
            S_IFDIR => EntryKind::Directory,
            S_IFLNK => EntryKind::Symlink,
            _ => EntryKind::Other,
        }
    }
}

bitflags! {
    /// Read/write/execute bits for owner, group and other.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeBits: u32 {
        const OWNER_READ  = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC  = 0o100;
        const GROUP_READ  = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC  = 0o010;
        const OTHER_READ  = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXEC  = 0o001;
    }
}

/// Metadata for one filesystem entry, as captured by `lstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Path used to reach the entry.
    pub name: PathBuf,
    /// Raw `st_mode`, file type bits included.
    pub mode: u32,
    pub size: u64,
    /// Last modification, seconds since the Unix epoch.
    pub mtime_secs: i64,
}

impl EntryMetadata {
    pub fn from_metadata(name: PathBuf, meta: &Metadata) -> Self {
        Self {
            name,
            mode: meta.mode(),
            size: meta.size(),
            mtime_secs: meta.mtime(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        EntryKind::from_mode(self.mode)
    }

    pub fn permissions(&self) -> ModeBits {
        ModeBits::from_bits_truncate(self.mode)
    }

    /// A regular file that grants no access to anyone.
    pub fn is_quarantine_candidate(&self) -> bool {
        self.kind() == EntryKind::File && self.permissions().is_empty()
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
