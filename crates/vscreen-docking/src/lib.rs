//! vscreen Docking - Resumable virtual-screening orchestrator.
//!
//! This crate drives a batch of ligand dockings through an external engine:
//! 1. Discovering candidate ligand files (`.pdbqt`)
//! 2. Skipping ligands already recorded in the ledger
//! 3. Running AutoDock Vina once per new ligand
//! 4. Extracting the best-pose affinity from the engine log
//! 5. Appending results and ledger entries durably
//! 6. Rebuilding the ranked summary every poll cycle

pub mod config;
pub mod ligand;
pub mod ledger;
pub mod docking;
pub mod log_parser;
pub mod results;
pub mod ranking;
pub mod pipeline;

mod fsutil;

pub use config::{DiscoveryErrorPolicy, OrchestratorConfig};
pub use docking::{DockingEngine, EngineOutcome, VinaEngine};
pub use ligand::WorkItem;
pub use pipeline::{DockingOrchestrator, DockingProgress, ProgressStage, RunSummary};
pub use vscreen_common::{Result, Score, ScreeningError};
