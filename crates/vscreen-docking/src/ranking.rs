//! Ranked summary of all docking results.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use vscreen_common::{Result, ScreeningError};

use crate::results::{encode_rows, ResultRecord, ResultStore};

/// Drop rows without a score and sort the rest by ascending affinity.
///
/// The sort is stable, so equal scores keep their dispatch order.
pub fn rank(records: Vec<ResultRecord>) -> Vec<ResultRecord> {
    let mut ranked: Vec<ResultRecord> = records
        .into_iter()
        .filter(|r| r.score.is_available())
        .collect();
    ranked.sort_by(|a, b| {
        let a = a.score.value().unwrap_or(f64::INFINITY);
        let b = b.score.value().unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
    ranked
}

/// Rewrites the ranked summary from the results table.
pub struct Ranker {
    ranked_path: PathBuf,
}

impl Ranker {
    pub fn new<P: AsRef<Path>>(ranked_path: P) -> Self {
        Self {
            ranked_path: ranked_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.ranked_path
    }

    /// Rebuild the summary from scratch and atomically replace the old one.
    /// Returns the rows written, best first.
    pub async fn rebuild(&self, store: &ResultStore) -> Result<Vec<ResultRecord>> {
        let records = store
            .read_all()
            .await
            .map_err(|e| ScreeningError::Summary(format!("reading results: {}", e)))?;
        let total = records.len();
        let ranked = rank(records);

        let bytes = encode_rows(&ranked, true)?;
        let target = self.ranked_path.clone();
        tokio::task::spawn_blocking(move || replace_file(&target, &bytes))
            .await
            .map_err(|e| ScreeningError::Summary(format!("summary writer panicked: {}", e)))??;

        debug!(
            summary = %self.ranked_path.display(),
            total_rows = total,
            ranked_rows = ranked.len(),
            "Ranked summary rebuilt"
        );
        Ok(ranked)
    }
}

/// Write to a sibling temp file, sync it, then rename over `target`.
fn replace_file(target: &Path, bytes: &[u8]) -> Result<()> {
    let summary_err =
        |e: std::io::Error| ScreeningError::Summary(format!("writing {:?}: {}", target, e));

    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(summary_err)?;
    tmp.write_all(bytes).map_err(summary_err)?;
    tmp.as_file().sync_all().map_err(summary_err)?;
    tmp.persist(target).map_err(|e| summary_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vscreen_common::Score;

    #[test]
    fn test_rank_filters_and_sorts() {
        let records = vec![
            ResultRecord::new("a", Score::Value(-6.1)),
            ResultRecord::new("b", Score::Unavailable),
            ResultRecord::new("c", Score::Value(-9.4)),
            ResultRecord::new("d", Score::Value(-7.0)),
        ];
        let names: Vec<_> = rank(records).into_iter().map(|r| r.base_name).collect();
        assert_eq!(names, vec!["c", "d", "a"]);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let records = vec![
            ResultRecord::new("first", Score::Value(-7.0)),
            ResultRecord::new("best", Score::Value(-8.0)),
            ResultRecord::new("second", Score::Value(-7.0)),
        ];
        let names: Vec<_> = rank(records).into_iter().map(|r| r.base_name).collect();
        assert_eq!(names, vec!["best", "first", "second"]);
    }

    #[test]
    fn test_rank_row_count_excludes_unavailable() {
        let records: Vec<_> = (0..10)
            .map(|i| {
                let score = if i % 3 == 0 {
                    Score::Unavailable
                } else {
                    Score::Value(-(i as f64))
                };
                ResultRecord::new(format!("lig{}", i), score)
            })
            .collect();
        let unavailable = records.iter().filter(|r| !r.score.is_available()).count();

        let ranked = rank(records.clone());
        assert_eq!(ranked.len(), records.len() - unavailable);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].score.value().unwrap() <= w[1].score.value().unwrap()));
    }

    #[tokio::test]
    async fn test_rebuild_with_no_rows_writes_header_only() {
        let dir = tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("logfile_summary.csv"));
        let ranker = Ranker::new(dir.path().join("ranked_summary.csv"));

        let ranked = ranker.rebuild(&store).await.unwrap();
        assert!(ranked.is_empty());

        let content = tokio::fs::read_to_string(ranker.path()).await.unwrap();
        assert_eq!(content, "Ligand,Binding free energy kcal/mol\n");
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_summary() {
        let dir = tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("logfile_summary.csv"));
        let ranker = Ranker::new(dir.path().join("ranked_summary.csv"));
        tokio::fs::write(ranker.path(), "stale,content\nfrom,before\n").await.unwrap();

        store.append("weak", Score::Value(-5.5)).await.unwrap();
        store.append("failed", Score::Unavailable).await.unwrap();
        store.append("strong", Score::Value(-10.25)).await.unwrap();
        ranker.rebuild(&store).await.unwrap();

        let content = tokio::fs::read_to_string(ranker.path()).await.unwrap();
        assert_eq!(
            content,
            "Ligand,Binding free energy kcal/mol\nstrong,-10.25\nweak,-5.5\n"
        );
    }
}
