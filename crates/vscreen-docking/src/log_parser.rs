//! Best-pose affinity extraction from AutoDock Vina logs.
//!
//! Vina ends its log with a result table:
//!
//! ```text
//! mode |   affinity | dist from best mode
//!      | (kcal/mol) | rmsd l.b.| rmsd u.b.
//! -----+------------+----------+----------
//!    1         -7.4      0.000      0.000
//!    2         -7.1      1.842      2.310
//! ```
//!
//! The score is read from the first row whose leading token is the rank
//! marker `1`. The positions below are part of the engine's output format;
//! if the engine changes its table layout, update them here and bump
//! [`LOG_FORMAT_VERSION`].

use std::path::Path;
use tracing::{debug, warn};
use vscreen_common::Score;

use crate::fsutil;

/// Table layout these constants were validated against.
pub const LOG_FORMAT_VERSION: &str = "vina-1.x-result-table";

/// Leading token of the best-pose row.
pub const RANK_MARKER: &str = "1";

/// Whitespace-delimited field holding the affinity on that row.
pub const SCORE_FIELD: usize = 1;

/// Extract the best-pose score from log text.
///
/// Only the first row carrying [`RANK_MARKER`] is considered. A missing row
/// or an unparseable field yields `Score::Unavailable`.
pub fn parse_score(log: &str) -> Score {
    for line in log.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&RANK_MARKER) {
            continue;
        }
        return fields
            .get(SCORE_FIELD)
            .and_then(|field| field.parse::<f64>().ok())
            .map(Score::from_value)
            .unwrap_or(Score::Unavailable);
    }
    Score::Unavailable
}

/// Read a log file and extract its score. Never fails: an absent or
/// unreadable log is reported as `Unavailable`.
pub async fn extract_score(log_path: &Path) -> Score {
    match fsutil::read_optional(log_path).await {
        Ok(Some(content)) => {
            let score = parse_score(&content);
            if !score.is_available() {
                debug!(log = %log_path.display(), format = LOG_FORMAT_VERSION, "No best-pose row in log");
            }
            score
        }
        Ok(None) => {
            debug!(log = %log_path.display(), "Log file not found");
            Score::Unavailable
        }
        Err(e) => {
            warn!(log = %log_path.display(), error = %e, "Could not read log file");
            Score::Unavailable
        }
    }
}
