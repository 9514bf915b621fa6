//! Watch-and-dispatch loop for a screening run.
//!
//! Each cycle:
//!   1. Lists the ligand directory and loads the ledger
//!   2. Docks every ligand not yet in the ledger, in discovery order
//!   3. Appends the score to the results table, then records the ligand in
//!      the ledger (so a crash in between only causes a retry)
//!   4. Rebuilds the ranked summary
//!   5. Counts idle polls and stops after `quiescence_polls` in a row
//!
//! Cancellation is checked between ligands and while sleeping between polls,
//! never during an engine run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use vscreen_common::{Result, Score, ScreeningError};

use crate::config::{DiscoveryErrorPolicy, OrchestratorConfig};
use crate::docking::{DockingEngine, VinaEngine};
use crate::ledger::Ledger;
use crate::ligand::{discover_ligands, write_manifest, WorkItem};
use crate::log_parser::extract_score;
use crate::ranking::Ranker;
use crate::results::ResultStore;

// ── Progress events ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Polling,
    Docking,
    Docked,
    EngineFailed,
    Idle,
    Finished,
}

/// Progress event emitted during a run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct DockingProgress {
    pub run_id: Uuid,
    pub stage: ProgressStage,
    pub ligand: Option<String>,
    pub score: Option<Score>,
    pub dispatched: usize,
    pub message: String,
}

// ── Run summary ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub polls: u32,
    pub idle_polls: u32,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Engine succeeded but no score could be read from its log
    pub unavailable_scores: usize,
    /// Distinct ligand names rejected for an empty identifier
    pub skipped_invalid: usize,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            polls: 0,
            idle_polls: 0,
            dispatched: 0,
            succeeded: 0,
            failed: 0,
            unavailable_scores: 0,
            skipped_invalid: 0,
            cancelled: false,
            duration_ms: 0,
        }
    }
}

/// Result of one poll-and-dispatch pass.
struct CycleOutcome {
    new_items: usize,
    interrupted: bool,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct DockingOrchestrator {
    config: OrchestratorConfig,
    engine: Arc<dyn DockingEngine>,
    ledger: Ledger,
    results: ResultStore,
    ranker: Ranker,
    progress_tx: Option<broadcast::Sender<DockingProgress>>,
    run_id: Uuid,
}

impl DockingOrchestrator {
    /// Build an orchestrator that runs AutoDock Vina as configured.
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let engine = Arc::new(VinaEngine::from_config(&config));
        Self::with_engine(config, engine)
    }

    /// Build an orchestrator around any docking engine.
    pub fn with_engine(config: OrchestratorConfig, engine: Arc<dyn DockingEngine>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger: Ledger::new(&config.ledger_path),
            results: ResultStore::new(&config.results_path),
            ranker: Ranker::new(&config.ranked_path),
            config,
            engine,
            progress_tx: None,
            run_id: Uuid::new_v4(),
        })
    }

    /// Publish progress events on `tx`.
    pub fn with_progress(mut self, tx: broadcast::Sender<DockingProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run until quiescence or cancellation.
    ///
    /// Returns an error only for loop-fatal conditions: ledger or results
    /// storage failures, an engine that cannot be launched, or a discovery
    /// failure under `DiscoveryErrorPolicy::Abort`.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::new(self.run_id);
        let mut invalid_seen: HashSet<String> = HashSet::new();
        let mut idle_streak: u32 = 0;

        self.prepare_dirs().await?;
        info!(
            ligand_dir = %self.config.ligand_dir.display(),
            interval_secs = self.config.poll_interval.as_secs_f64(),
            quiescence_polls = self.config.quiescence_polls,
            "Screening run started"
        );

        loop {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            summary.polls += 1;
            let cycle = self.poll_cycle(&cancel, &mut summary, &mut invalid_seen).await;

            // The ranked view is derived data; rebuild it even if the cycle failed.
            if let Err(e) = self.ranker.rebuild(&self.results).await {
                warn!(error = %e, "Could not rebuild ranked summary, will retry next cycle");
            }

            let cycle = match cycle {
                Ok(c) => c,
                Err(e) => {
                    error!(error = %e, "Screening run aborted");
                    return Err(e);
                }
            };

            if cycle.interrupted {
                summary.cancelled = true;
                break;
            }

            if cycle.new_items == 0 {
                idle_streak += 1;
                summary.idle_polls += 1;
                let message = format!("No new ligands ({}/{})", idle_streak, self.config.quiescence_polls);
                self.emit(ProgressStage::Idle, None, None, summary.dispatched, message);
            } else {
                idle_streak = 0;
            }

            if idle_streak >= self.config.quiescence_polls {
                info!(polls = summary.polls, dispatched = summary.dispatched, "No new ligands, screening run complete");
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        if summary.cancelled {
            info!(polls = summary.polls, dispatched = summary.dispatched, "Screening run cancelled");
        }
        summary.duration_ms = started.elapsed().as_millis() as u64;
        let message = format!("{} docked, {} failed", summary.succeeded, summary.failed);
        self.emit(ProgressStage::Finished, None, None, summary.dispatched, message);
        Ok(summary)
    }

    async fn prepare_dirs(&self) -> Result<()> {
        for dir in [&self.config.log_dir, &self.config.output_dir] {
            fs::create_dir_all(dir).await.map_err(|e| {
                ScreeningError::Config(format!("cannot create directory {:?}: {}", dir, e))
            })?;
        }
        Ok(())
    }

    /// Discover, diff against the ledger and dispatch everything new.
    async fn poll_cycle(
        &self,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
        invalid_seen: &mut HashSet<String>,
    ) -> Result<CycleOutcome> {
        self.emit(ProgressStage::Polling, None, None, summary.dispatched, "Scanning ligand directory".to_string());

        let discovered = match discover_ligands(&self.config.ligand_dir, &self.config.ligand_extension).await {
            Ok(names) => names,
            Err(e) => match self.config.discovery_error_policy {
                DiscoveryErrorPolicy::Abort => return Err(e),
                DiscoveryErrorPolicy::Retry => {
                    warn!(error = %e, "Ligand discovery failed, retrying next cycle");
                    return Ok(CycleOutcome { new_items: 0, interrupted: false });
                }
            },
        };

        if let Some(manifest) = &self.config.manifest_path {
            if let Err(e) = write_manifest(manifest, &discovered).await {
                warn!(manifest = %manifest.display(), error = %e, "Could not write ligand manifest");
            }
        }

        let completed = self.ledger.load().await?;
        let pending = self.pending_items(&discovered, &completed, summary, invalid_seen);
        debug!(
            discovered = discovered.len(),
            completed = completed.len(),
            pending = pending.len(),
            "Poll complete"
        );

        let mut outcome = CycleOutcome { new_items: pending.len(), interrupted: false };
        for item in &pending {
            if cancel.is_cancelled() {
                outcome.interrupted = true;
                break;
            }
            self.dispatch(item, summary).await?;
        }
        Ok(outcome)
    }

    /// Ligands that are valid and not yet ledgered, in discovery order.
    fn pending_items(
        &self,
        discovered: &[String],
        completed: &HashSet<String>,
        summary: &mut RunSummary,
        invalid_seen: &mut HashSet<String>,
    ) -> Vec<WorkItem> {
        discovered
            .iter()
            .filter(|name| !completed.contains(name.as_str()))
            .filter_map(|name| match WorkItem::from_file_name(name, &self.config.ligand_extension) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(ligand = %name, error = %e, "Skipping invalid ligand name");
                    if invalid_seen.insert(name.clone()) {
                        summary.skipped_invalid += 1;
                    }
                    None
                }
            })
            .collect()
    }

    /// Dock one ligand and persist its outcome: result row first, then ledger.
    async fn dispatch(&self, item: &WorkItem, summary: &mut RunSummary) -> Result<()> {
        info!(ligand = item.raw_name(), "Processing ligand");
        self.emit(ProgressStage::Docking, Some(item), None, summary.dispatched, "Docking".to_string());

        let outcome = self.engine.run(item).await?;
        summary.dispatched += 1;

        let score = if outcome.ok {
            summary.succeeded += 1;
            let score = extract_score(&outcome.log_path).await;
            match score {
                Score::Value(v) => info!(ligand = item.base_name(), score = v, "Successfully processed"),
                Score::Unavailable => {
                    summary.unavailable_scores += 1;
                    warn!(ligand = item.base_name(), log = %outcome.log_path.display(), "Docking succeeded but no score found in log");
                }
            }
            score
        } else {
            summary.failed += 1;
            warn!(ligand = item.raw_name(), "Docking failed, recording as unavailable");
            Score::Unavailable
        };

        self.results.append(item.base_name(), score).await?;
        self.ledger.record(item.raw_name()).await?;

        let stage = if outcome.ok { ProgressStage::Docked } else { ProgressStage::EngineFailed };
        self.emit(stage, Some(item), Some(score), summary.dispatched, format!("Score: {}", score));
        Ok(())
    }

    fn emit(
        &self,
        stage: ProgressStage,
        item: Option<&WorkItem>,
        score: Option<Score>,
        dispatched: usize,
        message: String,
    ) {
        if let Some(tx) = &self.progress_tx {
            // No subscribers is fine.
            let _ = tx.send(DockingProgress {
                run_id: self.run_id,
                stage,
                ligand: item.map(|i| i.base_name().to_string()),
                score,
                dispatched,
                message,
            });
        }
    }
}
