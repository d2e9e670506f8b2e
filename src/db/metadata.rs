// Per-series bookkeeping kept next to the raw snapshots.  One JSON file per
// source+identifier, read-modify-written on every extraction attempt and
// never deleted by normal operation.

use std::fs::{self, File};
use std::path::Path;

use jiff::civil::Date;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::errors::EtlError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// Date of the newest observation seen so far.  Monotonically
    /// non-decreasing across successful runs with non-empty results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_observation_date: Option<Date>,
    /// SHA-256 hex digest of the last-seen normalized payload.
    pub last_hash: String,
    pub last_updated: Timestamp,
}

/// Absent file means the series has never been extracted.
pub fn read_metadata(path: &Path) -> Result<Option<SeriesMetadata>, EtlError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let metadata: SeriesMetadata = serde_json::from_reader(file)?;
    Ok(Some(metadata))
}

pub fn write_metadata(path: &Path, metadata: &SeriesMetadata) -> Result<(), EtlError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, metadata)?;
    Ok(())
}
