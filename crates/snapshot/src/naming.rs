use std::path::{Component, Path};

use snapward_runtime::{SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX};

/// Separator placed between path components in [`DocumentNaming::RelativePath`] keys.
const COMPONENT_SEPARATOR: &str = "%2F";

/// How a directory maps onto its snapshot document file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentNaming {
    /// `Snapshot_<base name>.txt`. Same-named directories share a document.
    #[default]
    BaseName,
    /// `Snapshot_<root>%2F<sub>%2F<dir>.txt`. Unique per directory within a root.
    RelativePath,
}

impl DocumentNaming {
    /// Document file name for the directory at `relative` below `root`.
    pub fn file_name(self, root: &Path, relative: &Path) -> String {
        format!("{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}", self.key(root, relative))
    }

    fn key(self, root: &Path, relative: &Path) -> String {
        match self {
            DocumentNaming::BaseName => match relative.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => root_name(root),
            },
            DocumentNaming::RelativePath => {
                let mut parts = vec![escape(&root_name(root))];
                parts.extend(relative.components().filter_map(|c| match c {
                    Component::Normal(s) => Some(escape(&s.to_string_lossy())),
                    _ => None,
                }));
                parts.join(COMPONENT_SEPARATOR)
            }
        }
    }
}

/// Base name of a traversal root. `.`, `..` and `/` have no base name of
/// their own, so the canonical path is consulted for them.
fn root_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            root.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "root".to_owned())
}

fn escape(component: &str) -> String {
    component.replace('%', "%25")
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
