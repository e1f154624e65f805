//! Name-keyed view of the device's flash directory.
//!
//! The inventory is a cache, not the source of truth: the device's flash
//! is authoritative and the cache is only as fresh as the last listing
//! refresh. There is no incremental update path: every refresh replaces
//! the whole record set, so the cache can never diverge through a stale
//! partial merge.

use super::{FileRecord, Listing};
use crate::errors::FileError;

/// The most recent parsed listing, keyed by file name, in listing order.
///
/// Created empty when a device session opens and exclusively owned by it;
/// discarded when the session closes.
#[derive(Debug, Default)]
pub struct Inventory {
    files: Vec<FileRecord>,
    total_bytes: u64,
    free_bytes: u64,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// File names in device listing order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }

    /// All records in device listing order.
    pub fn items(&self) -> &[FileRecord] {
        &self.files
    }

    /// Number of files in the last listing.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether `name` appeared in the last listing.
    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    /// Look up a record by name.
    pub fn get(&self, name: &str) -> Result<&FileRecord, FileError> {
        self.files
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| FileError::NotFound(name.to_string()))
    }

    /// Total flash size from the last listing trailer.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Free flash size from the last listing trailer.
    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    /// Replace the entire record set with a freshly parsed listing.
    pub(crate) fn replace(&mut self, listing: Listing) {
        self.files = listing.files;
        self.total_bytes = listing.total_bytes;
        self.free_bytes = listing.free_bytes;
    }

    /// Attach fetched content to a record. Returns false when the name is
    /// not present (the caller decides whether that is an error).
    pub(crate) fn set_content(&mut self, name: &str, content: String) -> bool {
        match self.files.iter_mut().find(|f| f.name == name) {
            Some(record) => {
                record.content = Some(content);
                true
            }
            None => false,
        }
    }
}
