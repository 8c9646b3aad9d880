use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader},
    path::Path,
};

use log::{debug, info};

use crate::{document::write_atomic, error::SnapshotError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    Identical,
    /// The old document was replaced with the new one.
    Updated {
        /// 1-based line number of the first differing line.
        first_difference: usize,
    },
}

/// Compare the documents at `old` and `new`; when they differ, replace `old`
/// with the contents of `new`.
///
/// A missing `old` document compares as empty.
pub fn diff(old: &Path, new: &Path) -> Result<DiffOutcome, SnapshotError> {
    let read_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SnapshotError::Read { path, source }
    };

    let old_reader: Box<dyn BufRead> = match File::open(old) {
        Ok(f) => Box::new(BufReader::new(f)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("[diff] {:?} does not exist yet", old);
            Box::new(io::empty())
        }
        Err(e) => return Err(read_err(old)(e)),
    };
    let new_reader = BufReader::new(File::open(new).map_err(read_err(new))?);

    let compared = first_difference(old_reader, new_reader).map_err(|(side, e)| match side {
        Side::Old => read_err(old)(e),
        Side::New => read_err(new)(e),
    });
    let Some(line) = compared? else {
        debug!("[diff] {:?} and {:?} are identical", old, new);
        return Ok(DiffOutcome::Identical);
    };

    let contents = fs::read(new).map_err(read_err(new))?;
    write_atomic(old, &contents).map_err(|source| SnapshotError::Write {
        path: old.to_path_buf(),
        source,
    })?;

    info!("[diff] {:?} changed at line {line}, updated from {:?}", old, new);
    Ok(DiffOutcome::Updated {
        first_difference: line,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Old,
    New,
}

/// Walk both inputs line by line. Lines are compared with their terminators,
/// and running out of lines on one side only counts as a difference.
fn first_difference(
    mut old: impl BufRead,
    mut new: impl BufRead,
) -> Result<Option<usize>, (Side, io::Error)> {
    let mut old_line = Vec::new();
    let mut new_line = Vec::new();
    let mut line_no = 0;

    loop {
        old_line.clear();
        new_line.clear();
        line_no += 1;

        let old_read = old
            .read_until(b'\n', &mut old_line)
            .map_err(|e| (Side::Old, e))?;
        let new_read = new
            .read_until(b'\n', &mut new_line)
            .map_err(|e| (Side::New, e))?;

        if old_read == 0 && new_read == 0 {
            return Ok(None);
        }
        if old_line != new_line {
            return Ok(Some(line_no));
        }
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
