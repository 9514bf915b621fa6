//! Durable record of which ligands have already been dispatched.
//!
//! The ledger is a newline-delimited file of raw ligand file names. It is only
//! ever appended to; duplicates left behind by a crash collapse on load.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use vscreen_common::{Result, ScreeningError};

use crate::fsutil;

pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every recorded completion. A missing ledger is an empty one.
    pub async fn load(&self) -> Result<HashSet<String>> {
        let content = fsutil::read_optional(&self.path)
            .await
            .map_err(|e| ScreeningError::Ledger(format!("reading {:?}: {}", self.path, e)))?;

        let completed: HashSet<String> = content
            .as_deref()
            .unwrap_or_default()
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        debug!(ledger = %self.path.display(), entries = completed.len(), "Ledger loaded");
        Ok(completed)
    }

    /// Append one completion and sync it before returning.
    pub async fn record(&self, raw_name: &str) -> Result<()> {
        let line = format!("{}\n", raw_name);
        fsutil::append_synced(&self.path, line.as_bytes())
            .await
            .map_err(|e| ScreeningError::Ledger(format!("appending to {:?}: {}", self.path, e)))
    }
}
