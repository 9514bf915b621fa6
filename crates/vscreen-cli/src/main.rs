//! vscreen — Resumable AutoDock Vina virtual screening
//! Entry point for the screening binary.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vscreen_docking::{DockingOrchestrator, DockingProgress, ProgressStage};

/// Command-line arguments for vscreen. Flags override vscreen.toml.
#[derive(Parser, Debug)]
#[command(name = "vscreen")]
#[command(about = "Dock every ligand in a directory with AutoDock Vina and rank the results")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "VSCREEN_CONFIG")]
    config: Option<PathBuf>,

    /// Directory containing .pdbqt ligands
    #[arg(short, long)]
    ligand_dir: Option<PathBuf>,

    /// AutoDock Vina executable
    #[arg(long)]
    vina: Option<PathBuf>,

    /// Vina configuration file (receptor and search box)
    #[arg(long)]
    vina_config: Option<PathBuf>,

    /// Seconds between directory scans
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Consecutive scans without new ligands before exiting
    #[arg(long)]
    quiescence: Option<u32>,

    /// Kill a Vina run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vscreen=debug,info")),
        )
        .init();

    let args = Args::parse();
    info!("vscreen {} starting up", env!("CARGO_PKG_VERSION"));

    let (file_config, from_file) = config::Config::load(args.config.as_deref())?;
    if from_file {
        info!("Configuration loaded.");
    } else {
        warn!("No {} found, using defaults.", config::DEFAULT_CONFIG_FILE);
    }

    let mut orch_config = file_config.to_orchestrator_config();
    if let Some(dir) = args.ligand_dir {
        orch_config = orch_config.with_ligand_dir(dir);
    }
    if let Some(vina) = args.vina {
        orch_config.vina_path = vina;
    }
    if let Some(vina_config) = args.vina_config {
        orch_config.vina_config = vina_config;
    }
    if let Some(secs) = args.interval_secs {
        orch_config = orch_config.with_poll_interval(Duration::from_secs(secs));
    }
    if let Some(polls) = args.quiescence {
        orch_config = orch_config.with_quiescence_polls(polls);
    }
    if let Some(secs) = args.timeout_secs {
        orch_config = orch_config.with_engine_timeout(Some(Duration::from_secs(secs)));
    }

    info!(
        "Ligands: {}  Vina: {}  Ranked summary: {}",
        orch_config.ligand_dir.display(),
        orch_config.vina_path.display(),
        orch_config.ranked_path.display()
    );

    let (progress_tx, progress_rx) = broadcast::channel(256);
    let orchestrator = DockingOrchestrator::new(orch_config)
        .context("Invalid screening configuration")?
        .with_progress(progress_tx);

    tokio::spawn(log_progress(progress_rx));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    info!("Screening started. Press Ctrl+C to stop after the current ligand.");
    let summary = orchestrator
        .run(cancel)
        .await
        .context("Screening run failed")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn log_progress(mut rx: broadcast::Receiver<DockingProgress>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.stage {
                ProgressStage::Docked | ProgressStage::EngineFailed => info!(
                    ligand = event.ligand.as_deref().unwrap_or_default(),
                    dispatched = event.dispatched,
                    "{}",
                    event.message
                ),
                _ => debug!(stage = ?event.stage, "{}", event.message),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!("Progress logger skipped {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Cancel the run on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping after the current ligand");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping after the current ligand");
        },
    }
    cancel.cancel();
}
