//! Contact store - whole-book JSON persistence
//!
//! The book is written as one JSON array, replacing the previous file on
//! every save. There are no partial writes and no schema versioning.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::AddressBook;
use crate::Result;

/// File name used when no path is given
pub const DEFAULT_CONTACTS_FILE: &str = "contacts.json";

/// File-backed storage for an [`AddressBook`].
#[derive(Debug, Clone)]
pub struct ContactStore {
    path: PathBuf,
}

impl Default for ContactStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONTACTS_FILE)
    }
}

impl ContactStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the book; a missing file is an empty book (first run).
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<AddressBook> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No contact file yet, starting empty");
            return Ok(AddressBook::default());
        }

        let text = std::fs::read_to_string(&self.path)?;
        let book: AddressBook = serde_json::from_str(&text)?;
        debug!(contacts = book.len(), "Loaded contacts");
        Ok(book)
    }

    /// Overwrite the file with the whole book.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save(&self, book: &AddressBook) -> Result<()> {
        let json = serde_json::to_string_pretty(book)?;
        std::fs::write(&self.path, json)?;
        debug!(contacts = book.len(), path = %self.path.display(), "Saved contacts");
        Ok(())
    }
}
