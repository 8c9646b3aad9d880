use std::{
    ffi::OsStr,
    fs::{self, Permissions},
    io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use log::debug;
use snapward_fs::EntryMetadata;

use crate::error::RelocateError;

/// What to do when the isolation directory already holds a file of the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Replace the file already in isolation.
    #[default]
    Overwrite,
    /// Keep both; the newcomer gets a `.1`, `.2`, ... suffix.
    Suffix,
}

/// Move `path` into `isolation_dir`, keeping its base name.
///
/// The file is re-examined first: it must still exist and still grant no
/// access to anyone. `isolation_dir` must already exist.
pub fn relocate(
    path: &Path,
    isolation_dir: &Path,
    policy: CollisionPolicy,
) -> Result<PathBuf, RelocateError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => EntryMetadata::from_metadata(path.to_path_buf(), &m),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RelocateError::Vanished {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(RelocateError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if !meta.is_quarantine_candidate() {
        return Err(RelocateError::NoLongerCandidate {
            path: path.to_path_buf(),
        });
    }

    let io_err = |source| RelocateError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| io_err(io::Error::other("path has no file name")))?;
    let destination = destination_for(isolation_dir, file_name, policy);

    move_file(path, &destination, meta.mode).map_err(io_err)?;
    Ok(destination)
}

fn destination_for(isolation_dir: &Path, file_name: &OsStr, policy: CollisionPolicy) -> PathBuf {
    let plain = isolation_dir.join(file_name);
    if policy == CollisionPolicy::Overwrite || fs::symlink_metadata(&plain).is_err() {
        return plain;
    }

    (1..)
        .map(|n| {
            let mut name = file_name.to_os_string();
            name.push(format!(".{n}"));
            isolation_dir.join(name)
        })
        .find(|candidate| fs::symlink_metadata(candidate).is_err())
        .unwrap_or(plain)
}

/// Rename, or copy and delete when source and destination are on different
/// filesystems.
fn move_file(src: &Path, dst: &Path, mode: u32) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("[relocate] {:?} is on another device, copying", src);
            copy_then_remove(src, dst, mode)
        }
        Err(e) => Err(e),
    }
}

fn copy_then_remove(src: &Path, dst: &Path, mode: u32) -> io::Result<()> {
    let mode = mode & 0o7777;
    // The source grants no read access, so open it up just long enough to copy.
    fs::set_permissions(src, Permissions::from_mode(0o400))?;
    let copied = fs::copy(src, dst);
    let restored = fs::set_permissions(src, Permissions::from_mode(mode));

    let moved = copied
        .and(restored)
        .and_then(|()| fs::set_permissions(dst, Permissions::from_mode(mode)))
        .and_then(|()| fs::remove_file(src));

    // The file must live in exactly one place.
    if moved.is_err()
        && let Err(e) = fs::remove_file(dst)
        && e.kind() != io::ErrorKind::NotFound
    {
        debug!("[relocate] cannot remove partial copy {:?}: {e}", dst);
    }
    moved
}

#[cfg(test)]
#[path = "relocate_tests.rs"]
mod tests;
