//! Configuration loading for vscreen.
//! Reads vscreen.toml from the current directory or the path given with
//! `--config` / VSCREEN_CONFIG.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vscreen_docking::{DiscoveryErrorPolicy, OrchestratorConfig};

pub const DEFAULT_CONFIG_FILE: &str = "vscreen.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_ligand_dir")]
    pub ligand_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_ledger")]
    pub ledger: PathBuf,
    #[serde(default = "default_results")]
    pub results: PathBuf,
    #[serde(default = "default_ranked")]
    pub ranked: PathBuf,
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    #[serde(default = "bool_true")]
    pub write_manifest: bool,
}

fn default_ligand_dir() -> PathBuf { PathBuf::from("ligand") }
fn default_log_dir()    -> PathBuf { PathBuf::from("logfile") }
fn default_output_dir() -> PathBuf { PathBuf::from("out") }
fn default_ledger()     -> PathBuf { PathBuf::from("processed_ligands.txt") }
fn default_results()    -> PathBuf { PathBuf::from("logfile_summary.csv") }
fn default_ranked()     -> PathBuf { PathBuf::from("ranked_summary.csv") }
fn default_manifest()   -> PathBuf { PathBuf::from("ligand.txt") }
fn bool_true()          -> bool    { true }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ligand_dir: default_ligand_dir(),
            log_dir: default_log_dir(),
            output_dir: default_output_dir(),
            ledger: default_ledger(),
            results: default_results(),
            ranked: default_ranked(),
            manifest: default_manifest(),
            write_manifest: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_vina_path")]
    pub vina_path: PathBuf,
    #[serde(default = "default_vina_config")]
    pub vina_config: PathBuf,
    /// Unset means wait for the engine indefinitely.
    pub timeout_secs: Option<u64>,
}

fn default_vina_path()   -> PathBuf { PathBuf::from("./vina") }
fn default_vina_config() -> PathBuf { PathBuf::from("config.txt") }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vina_path: default_vina_path(),
            vina_config: default_vina_config(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_quiescence_polls")]
    pub quiescence_polls: u32,
    #[serde(default)]
    pub on_discovery_error: DiscoveryErrorPolicy,
}

fn default_interval_secs()    -> u64 { 30 }
fn default_quiescence_polls() -> u32 { 3 }

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            quiescence_polls: default_quiescence_polls(),
            on_discovery_error: DiscoveryErrorPolicy::default(),
        }
    }
}


impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, vscreen.toml is read if
    /// present and defaults are used otherwise. The returned flag says
    /// whether a file was actually read.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, bool)> {
        let path = match explicit.map(Path::to_path_buf) {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                p
            }
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    return Ok((Config::default(), false));
                }
                p
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok((config, true))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the orchestrator configuration this file describes.
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        let paths = &self.paths;
        let mut config = OrchestratorConfig::default()
            .with_ligand_dir(&paths.ligand_dir)
            .with_vina(&self.engine.vina_path, &self.engine.vina_config)
            .with_poll_interval(Duration::from_secs(self.polling.interval_secs))
            .with_quiescence_polls(self.polling.quiescence_polls)
            .with_engine_timeout(self.engine.timeout_secs.map(Duration::from_secs))
            .with_discovery_error_policy(self.polling.on_discovery_error)
            .with_manifest(paths.write_manifest.then(|| paths.manifest.clone()));

        config.log_dir = paths.log_dir.clone();
        config.output_dir = paths.output_dir.clone();
        config.ledger_path = paths.ledger.clone();
        config.results_path = paths.results.clone();
        config.ranked_path = paths.ranked.clone();
        config
    }
}
