//! Molecular docking using AutoDock Vina.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use vscreen_common::{Result, ScreeningError};

use crate::config::OrchestratorConfig;
use crate::ligand::WorkItem;

/// Paths for one engine invocation, derived from the ligand's base name so
/// that re-runs overwrite instead of accumulating files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockingJob {
    pub ligand: PathBuf,
    pub log: PathBuf,
    pub out: PathBuf,
}

/// What came back from one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    /// Exit status 0 and finished within any configured timeout
    pub ok: bool,
    pub log_path: PathBuf,
    pub output_path: PathBuf,
}

/// Runs the external docking engine for one ligand.
///
/// Implementations block (asynchronously) until the engine is done. A
/// non-zero exit is reported as `ok == false`; only a failure to start the
/// engine at all is an error.
#[async_trait]
pub trait DockingEngine: Send + Sync {
    async fn run(&self, item: &WorkItem) -> Result<EngineOutcome>;
}

/// Wrapper for AutoDock Vina execution.
pub struct VinaEngine {
    executable_path: PathBuf,
    config_path: PathBuf,
    ligand_dir: PathBuf,
    log_dir: PathBuf,
    output_dir: PathBuf,
    timeout: Option<Duration>,
}

impl VinaEngine {
    /// Create a new VinaEngine using the default directory layout.
    pub fn new<P: AsRef<Path>, C: AsRef<Path>>(executable_path: P, config_path: C) -> Self {
        let config = OrchestratorConfig::default()
            .with_vina(executable_path.as_ref(), config_path.as_ref());
        Self::from_config(&config)
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            executable_path: config.vina_path.clone(),
            config_path: config.vina_config.clone(),
            ligand_dir: config.ligand_dir.clone(),
            log_dir: config.log_dir.clone(),
            output_dir: config.output_dir.clone(),
            timeout: config.engine_timeout,
        }
    }

    pub fn with_dirs(
        mut self,
        ligand_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        self.ligand_dir = ligand_dir.into();
        self.log_dir = log_dir.into();
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn job_for(&self, item: &WorkItem) -> DockingJob {
        DockingJob {
            ligand: self.ligand_dir.join(item.raw_name()),
            log: self.log_dir.join(format!("{}_log.log", item.base_name())),
            out: self.output_dir.join(format!("{}_out.pdbqt", item.base_name())),
        }
    }

    fn command(&self, job: &DockingJob) -> Command {
        let mut cmd = Command::new(&self.executable_path);
        cmd.arg("--config")
            .arg(&self.config_path)
            .arg("--ligand")
            .arg(&job.ligand)
            .arg("--log")
            .arg(&job.log)
            .arg("--out")
            .arg(&job.out)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl DockingEngine for VinaEngine {
    async fn run(&self, item: &WorkItem) -> Result<EngineOutcome> {
        let job = self.job_for(item);
        info!("Running AutoDock Vina on {:?}", job.ligand);

        let pending = self.command(&job).output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(ligand = item.raw_name(), timeout_secs = limit.as_secs_f64(), "AutoDock Vina timed out, process killed");
                    return Ok(EngineOutcome {
                        ok: false,
                        log_path: job.log,
                        output_path: job.out,
                    });
                }
            },
            None => pending.await,
        };

        let output = output.map_err(|source| ScreeningError::EngineLaunch {
            program: self.executable_path.clone(),
            source,
        })?;

        let ok = output.status.success();
        if ok {
            debug!("AutoDock Vina completed successfully. Output in {:?}", job.out);
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                ligand = item.raw_name(),
                status = %output.status,
                "AutoDock Vina failed: {}",
                stderr.trim()
            );
        }

        Ok(EngineOutcome {
            ok,
            log_path: job.log,
            output_path: job.out,
        })
    }
}
