//! Durable record of serials whose last delivery attempt failed.
//!
//! The ledger is a single JSON document, read once at the start of a run and
//! fully replaced at the end. Replacement is deliberate: a serial is retried
//! on the next run and dropped if it can no longer be resolved, bounding
//! retries instead of accumulating them forever.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from persisting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk shape: `{"assets": ["SERIAL", ...]}`.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    assets: Vec<String>,
}

/// File-backed retry ledger.
pub struct RetryLedger {
    path: PathBuf,
}

impl RetryLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Reads the persisted failure set.
    ///
    /// A missing or unreadable store degrades to the empty set; a run must
    /// never be blocked by its retry state.
    pub fn load(&self) -> HashSet<String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no retry ledger yet");
                return HashSet::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "retry ledger unreadable; starting empty");
                return HashSet::new();
            }
        };

        match serde_json::from_str::<LedgerFile>(&contents) {
            Ok(file) => file.assets.into_iter().collect(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "retry ledger corrupt; starting empty");
                HashSet::new()
            }
        }
    }

    /// Overwrites the store with this run's failure set.
    ///
    /// Not a merge: serials absent from `serials` are dropped. The document
    /// is written to a sibling temp file and renamed into place so a crash
    /// mid-write cannot truncate the previous ledger.
    pub fn save(&self, serials: &HashSet<String>) -> Result<(), LedgerError> {
        let mut assets: Vec<String> = serials.iter().cloned().collect();
        assets.sort_unstable();
        let contents = serde_json::to_string_pretty(&LedgerFile { assets })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = serials.len(), "retry ledger saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn set(serials: &[&str]) -> HashSet<String> {
        serials.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let ledger = RetryLedger::new(dir.path().join("failed_assets.json"));

        let saved = set(&["SER-1", "SER-2", "SER-3"]);
        ledger.save(&saved).unwrap();
        assert_eq!(ledger.load(), saved);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let ledger = RetryLedger::new(dir.path().join("nope.json"));
        assert!(ledger.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failed_assets.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(RetryLedger::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_replaces_rather_than_merges() {
        let dir = tempdir().unwrap();
        let ledger = RetryLedger::new(dir.path().join("failed_assets.json"));

        ledger.save(&set(&["OLD-1", "OLD-2"])).unwrap();
        ledger.save(&set(&["NEW-1"])).unwrap();
        assert_eq!(ledger.load(), set(&["NEW-1"]));
    }

    #[test]
    fn test_save_empty_set_clears_ledger() {
        let dir = tempdir().unwrap();
        let ledger = RetryLedger::new(dir.path().join("failed_assets.json"));

        ledger.save(&set(&["SER-1"])).unwrap();
        ledger.save(&HashSet::new()).unwrap();
        assert!(ledger.load().is_empty());
    }

    #[test]
    fn test_save_to_unwritable_path_is_an_error() {
        let ledger = RetryLedger::new("/nonexistent-dir/failed_assets.json");
        assert!(matches!(
            ledger.save(&set(&["SER-1"])),
            Err(LedgerError::Io(_))
        ));
    }

    #[test]
    fn test_on_disk_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failed_assets.json");
        RetryLedger::new(&path).save(&set(&["B", "A"])).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["assets"], serde_json::json!(["A", "B"]));
    }
}
