//! De-duplicated set of files picked for upload

use crate::file::{self, FileKey, SourceFile};

/// Files chosen for the next batch, keyed by [`FileKey`] and kept in pick order
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    files: Vec<SourceFile>,
    max_files: Option<usize>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection that never holds more than `max_files` files
    pub fn with_max_files(max_files: usize) -> Self {
        Self {
            files: Vec::new(),
            max_files: Some(max_files),
        }
    }

    pub fn max_files(&self) -> Option<usize> {
        self.max_files
    }

    /// Add files not already selected; files beyond the cap are dropped.
    ///
    /// Returns how many files were actually added.
    pub fn add(&mut self, files: impl IntoIterator<Item = SourceFile>) -> usize {
        let mut added = 0;

        for source in files {
            if self.max_files.is_some_and(|max| self.files.len() >= max) {
                tracing::debug!(file = %source.name(), "Selection is full, dropping file");
                continue;
            }

            let key = source.key();
            if self.contains(&key) {
                tracing::debug!(key = %key, "File already selected");
                continue;
            }

            self.files.push(source);
            added += 1;
        }

        added
    }

    /// Remove the file with `key`, returning it if it was selected
    pub fn remove(&mut self, key: &FileKey) -> Option<SourceFile> {
        let index = self.files.iter().position(|f| &f.key() == key)?;
        Some(self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn contains(&self, key: &FileKey) -> bool {
        self.files.iter().any(|f| &f.key() == key)
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether the backend accepts files named like `name`
    pub fn is_supported(name: &str) -> bool {
        file::is_supported(name)
    }

    pub fn into_files(self) -> Vec<SourceFile> {
        self.files
    }
}
