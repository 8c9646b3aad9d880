//! Link-aware metadata capture and recursive directory traversal.

mod error;
mod metadata;
mod record;
mod walker;

pub use error::WalkError;
pub use metadata::read_metadata;
pub use record::{EntryKind, EntryMetadata, ModeBits};
pub use walker::{DirSnapshot, TraverseOptions, traverse};
