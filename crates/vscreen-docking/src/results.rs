//! Append-only table of every docking attempt and its score.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use vscreen_common::{Result, Score, ScreeningError};

use crate::fsutil;

/// Column headers shared by the results table and the ranked summary.
pub const RESULTS_HEADER: [&str; 2] = ["Ligand", "Binding free energy kcal/mol"];

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub base_name: String,
    pub score: Score,
}

impl ResultRecord {
    pub fn new(base_name: impl Into<String>, score: Score) -> Self {
        Self {
            base_name: base_name.into(),
            score,
        }
    }
}

/// Serialise rows as CSV, optionally preceded by the header.
pub(crate) fn encode_rows<'a, I>(rows: I, with_header: bool) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a ResultRecord>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    if with_header {
        writer.write_record(RESULTS_HEADER)?;
    }
    for row in rows {
        writer.write_record([row.base_name.as_str(), row.score.to_string().as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| ScreeningError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}

pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the table is new.
    /// The row is synced to disk before this returns.
    pub async fn append(&self, base_name: &str, score: Score) -> Result<()> {
        let store_err = |e: std::io::Error| {
            ScreeningError::ResultStore(format!("appending to {:?}: {}", self.path, e))
        };

        let needs_header = fsutil::is_missing_or_empty(&self.path).await.map_err(store_err)?;
        let record = ResultRecord::new(base_name, score);
        let bytes = encode_rows(std::iter::once(&record), needs_header)
            .map_err(|e| ScreeningError::ResultStore(e.to_string()))?;

        fsutil::append_synced(&self.path, &bytes).await.map_err(store_err)
    }

    /// Every row in append order. Rows that cannot be read back (e.g. a line
    /// torn by a crash) are skipped with a warning.
    pub async fn read_all(&self) -> Result<Vec<ResultRecord>> {
        let content = match fsutil::read_optional(&self.path).await? {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!(table = %self.path.display(), row = idx + 1, error = %e, "Skipping unreadable result row");
                    continue;
                }
            };
            if row.len() != 2 || row[0].is_empty() {
                warn!(table = %self.path.display(), row = idx + 1, fields = row.len(), "Skipping malformed result row");
                continue;
            }

            let score = row[1].parse::<Score>().unwrap_or_else(|_| {
                warn!(table = %self.path.display(), ligand = &row[0], value = &row[1], "Unparseable score, treating as unavailable");
                Score::Unavailable
            });
            records.push(ResultRecord::new(&row[0], score));
        }

        Ok(records)
    }
}
