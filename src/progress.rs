//! Per-chapter read marks, persisted as JSON.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::catalog;
use crate::error::{CatalogError, ProgressError};

/// Book name to one flag per chapter (index 0 is chapter 1)
pub type ReadMap = BTreeMap<String, Vec<bool>>;

pub struct ReadProgress {
    books: ReadMap,
    path: PathBuf,
}

impl ReadProgress {
    /// Load progress from disk. Missing or malformed storage starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let books = match Self::read_file(&path) {
            Ok(books) => books,
            Err(e) => {
                warn!("Starting with empty reading progress: {}", e);
                ReadMap::new()
            }
        };

        Self { books, path }
    }

    fn read_file(path: &Path) -> Result<ReadMap, ProgressError> {
        if !path.exists() {
            return Ok(ReadMap::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ProgressError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&self.books)?;
        std::fs::write(&self.path, content)?;
        debug!("Reading progress saved to {}", self.path.display());
        Ok(())
    }

    fn save_logged(&self) {
        if let Err(e) = self.save() {
            warn!("{}", e.user_message());
        }
    }

    fn flags_mut(&mut self, book: &str, chapters: u32) -> &mut Vec<bool> {
        let flags = self.books.entry(book.to_string()).or_default();
        if flags.len() < chapters as usize {
            flags.resize(chapters as usize, false);
        }
        flags
    }

    /// Flip a chapter's mark and save. Returns the new state.
    pub fn toggle(&mut self, book: &str, chapter: u32) -> Result<bool, CatalogError> {
        let entry = catalog::validate(book, chapter)?;
        let flags = self.flags_mut(entry.name, entry.chapters);
        let index = (chapter - 1) as usize;
        flags[index] = !flags[index];
        let now_read = flags[index];

        self.save_logged();
        Ok(now_read)
    }

    /// Mark a chapter read; saves only when it changes
    pub fn mark_read(&mut self, book: &str, chapter: u32) -> Result<(), CatalogError> {
        if !self.is_read(book, chapter) {
            self.toggle(book, chapter)?;
        }
        Ok(())
    }

    pub fn is_read(&self, book: &str, chapter: u32) -> bool {
        chapter > 0
            && self
                .books
                .get(book.trim())
                .and_then(|flags| flags.get((chapter - 1) as usize))
                .copied()
                .unwrap_or(false)
    }

    pub fn read_count(&self, book: &str) -> usize {
        self.books
            .get(book.trim())
            .map(|flags| flags.iter().filter(|&&read| read).count())
            .unwrap_or(0)
    }

    pub fn total_read(&self) -> usize {
        self.books.keys().map(|book| self.read_count(book)).sum()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
