//! Path table for files that declare indexed symbols.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use crate::base::FileId;

/// The set of source files the symbol index refers to.
///
/// A file's [`FileId`] is its insertion position, so ids are stable for the
/// lifetime of the root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceRoot {
    files: IndexSet<PathBuf>,
}

impl SourceRoot {
    /// Create a new empty source root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, returning its id. Adding a known path returns the existing id.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> FileId {
        let (idx, _) = self.files.insert_full(path.into());
        FileId::new(idx as u32)
    }

    /// Look up the id of a known path.
    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.files.get_index_of(path).map(|idx| FileId::new(idx as u32))
    }

    /// Get the path for a file.
    pub fn path(&self, file: FileId) -> Option<&Path> {
        self.files.get_index(file.index() as usize).map(PathBuf::as_path)
    }

    pub fn contains(&self, file: FileId) -> bool {
        (file.index() as usize) < self.files.len()
    }

    /// Iterate over all files in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FileId, &Path)> + '_ {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, path)| (FileId::new(idx as u32), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
