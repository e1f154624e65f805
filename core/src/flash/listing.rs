//! Parser for the device's `dir` output.
//!
//! The listing is a fixed tabular shape: a `Directory of flash:` banner, a
//! column header, a dashed separator, one row per file, and a two-line
//! total/free summary trailer. Rows keep their listing order in the output;
//! a row with an unexpected column count is a parse error, not a silent
//! drop.

use chrono::NaiveDateTime;

use super::FileRecord;
use crate::errors::ParseError;

/// Timestamp format in the `Modified` column, e.g. `01-Oct-2006 01:12:44`.
pub const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// A fully parsed directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Records in device listing order.
    pub files: Vec<FileRecord>,
    /// Total flash size reported by the trailer.
    pub total_bytes: u64,
    /// Free flash size reported by the trailer.
    pub free_bytes: u64,
}

/// Parse raw `dir` output into a [`Listing`].
pub fn parse_listing(raw: &str) -> Result<Listing, ParseError> {
    let mut files = Vec::new();
    let mut total_bytes = None;
    let mut free_bytes = None;
    let mut seen_banner = false;
    let mut in_rows = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !seen_banner {
            if trimmed.starts_with("Directory of") {
                seen_banner = true;
                continue;
            }
            return Err(ParseError::MissingBanner);
        }

        if trimmed.contains("File Name") && trimmed.contains("Permission") {
            continue;
        }
        if trimmed.chars().all(|c| c == '-' || c == ' ') {
            // Dashed separator under the header; rows follow.
            in_rows = true;
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("Total size of flash:") {
            total_bytes = Some(parse_summary(rest)?);
            in_rows = false;
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("Free size of flash:") {
            free_bytes = Some(parse_summary(rest)?);
            in_rows = false;
            continue;
        }
        if in_rows {
            files.push(parse_row(trimmed)?);
        }
    }

    if !seen_banner {
        return Err(ParseError::MissingBanner);
    }
    match (total_bytes, free_bytes) {
        (Some(total_bytes), Some(free_bytes)) => Ok(Listing {
            files,
            total_bytes,
            free_bytes,
        }),
        _ => Err(ParseError::MissingSummary),
    }
}

/// Parse one file row: name, permission, flash size, data size, date, time.
fn parse_row(line: &str) -> Result<FileRecord, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(ParseError::MalformedRow(line.to_string()));
    }

    let flash_size = parse_size(fields[2])?;
    let data_size = match fields[3] {
        "--" => None,
        other => Some(parse_size(other)?),
    };

    let stamp = format!("{} {}", fields[4], fields[5]);
    let modified = NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::InvalidTimestamp(stamp.clone()))?;

    Ok(FileRecord {
        name: fields[0].to_string(),
        permission: fields[1].to_string(),
        flash_size,
        data_size,
        modified,
        content: None,
    })
}

fn parse_size(field: &str) -> Result<u64, ParseError> {
    field
        .parse()
        .map_err(|_| ParseError::InvalidSize(field.to_string()))
}

/// Extract the byte count from a trailer remainder like ` 15990784 bytes`.
fn parse_summary(rest: &str) -> Result<u64, ParseError> {
    let field = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::InvalidSize(rest.trim().to_string()))?;
    parse_size(field)
}
