//! Flash directory data model: records, listing parser, inventory.

pub mod inventory;
pub mod listing;

pub use inventory::Inventory;
pub use listing::{parse_listing, Listing};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One entry in the device's flash directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name, unique within the inventory.
    pub name: String,
    /// Permission token exactly as the device reports it (`rw`, `r-`, `--`).
    pub permission: String,
    /// Bytes allocated in flash.
    pub flash_size: u64,
    /// Payload size; `None` when the device reports the `--` placeholder.
    pub data_size: Option<u64>,
    /// Modification timestamp from the listing.
    pub modified: NaiveDateTime,
    /// File content, populated lazily on fetch; never part of the listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
