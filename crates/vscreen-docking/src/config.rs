//! Configuration for a screening run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vscreen_common::{Result, ScreeningError};

/// What the loop does when the ligand directory cannot be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryErrorPolicy {
    /// Log the error, count the poll as idle and try again next cycle.
    #[default]
    Retry,
    /// Stop the run and return the error.
    Abort,
}

/// Everything the orchestrator needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory scanned for ligand files every poll
    pub ligand_dir: PathBuf,

    /// Ligand file extension, without the dot (default: pdbqt)
    pub ligand_extension: String,

    /// AutoDock Vina executable
    pub vina_path: PathBuf,

    /// Vina config file (receptor, search box, exhaustiveness)
    pub vina_config: PathBuf,

    /// Per-ligand engine logs land here
    pub log_dir: PathBuf,

    /// Per-ligand docked poses land here
    pub output_dir: PathBuf,

    /// Append-only list of processed ligand file names
    pub ledger_path: PathBuf,

    /// Append-only, unsorted results table
    pub results_path: PathBuf,

    /// Ranked summary, rewritten every cycle
    pub ranked_path: PathBuf,

    /// Optional listing of the ligands seen on the latest poll
    pub manifest_path: Option<PathBuf>,

    /// Pause between polls (default: 30s)
    pub poll_interval: Duration,

    /// Consecutive polls without new ligands before the run ends (default: 3)
    pub quiescence_polls: u32,

    /// Kill the engine after this long. `None` waits indefinitely.
    pub engine_timeout: Option<Duration>,

    pub discovery_error_policy: DiscoveryErrorPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::rooted_at(".")
    }
}

impl OrchestratorConfig {
    /// Default layout with every path placed under `root`.
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            ligand_dir: root.join("ligand"),
            ligand_extension: "pdbqt".to_string(),
            vina_path: root.join("vina"),
            vina_config: root.join("config.txt"),
            log_dir: root.join("logfile"),
            output_dir: root.join("out"),
            ledger_path: root.join("processed_ligands.txt"),
            results_path: root.join("logfile_summary.csv"),
            ranked_path: root.join("ranked_summary.csv"),
            manifest_path: Some(root.join("ligand.txt")),
            poll_interval: Duration::from_secs(30),
            quiescence_polls: 3,
            engine_timeout: None,
            discovery_error_policy: DiscoveryErrorPolicy::Retry,
        }
    }

    pub fn with_ligand_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ligand_dir = dir.into();
        self
    }

    pub fn with_vina(mut self, executable: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        self.vina_path = executable.into();
        self.vina_config = config.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_quiescence_polls(mut self, polls: u32) -> Self {
        self.quiescence_polls = polls;
        self
    }

    pub fn with_engine_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.engine_timeout = timeout;
        self
    }

    pub fn with_manifest(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_path = path;
        self
    }

    pub fn with_discovery_error_policy(mut self, policy: DiscoveryErrorPolicy) -> Self {
        self.discovery_error_policy = policy;
        self
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.quiescence_polls == 0 {
            return Err(ScreeningError::Config(
                "quiescence_polls must be at least 1".to_string(),
            ));
        }
        if self.ligand_extension.is_empty() || self.ligand_extension.starts_with('.') {
            return Err(ScreeningError::Config(format!(
                "ligand_extension must be a bare extension, got {:?}",
                self.ligand_extension
            )));
        }
        if self.engine_timeout == Some(Duration::ZERO) {
            return Err(ScreeningError::Config(
                "engine_timeout must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
