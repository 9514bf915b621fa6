//! Resume-after-restart and crash-window behaviour of the screening loop.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use vscreen_docking::ledger::Ledger;
use vscreen_docking::results::ResultStore;
use vscreen_docking::{DockingEngine, DockingOrchestrator, EngineOutcome, OrchestratorConfig, Result, Score, WorkItem};

/// Engine that scores every ligand by its position in the alphabet.
struct AlphabetEngine {
    log_dir: PathBuf,
    calls: Mutex<Vec<String>>,
}

impl AlphabetEngine {
    fn new(log_dir: &Path) -> Arc<Self> {
        Arc::new(Self {
            log_dir: log_dir.to_path_buf(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DockingEngine for AlphabetEngine {
    async fn run(&self, item: &WorkItem) -> Result<EngineOutcome> {
        self.calls.lock().unwrap().push(item.raw_name().to_string());
        let first = item.base_name().bytes().find(u8::is_ascii_lowercase).unwrap_or(b'a');
        let score = -((first - b'a' + 1) as f64);
        let log_path = self.log_dir.join(format!("{}_log.log", item.base_name()));
        tokio::fs::write(&log_path, format!("   1   {:.1}   0.000   0.000\n", score)).await?;
        Ok(EngineOutcome {
            ok: true,
            log_path,
            output_path: self.log_dir.join(format!("{}_out.pdbqt", item.base_name())),
        })
    }
}

async fn setup(root: &Path, ligands: &[&str]) -> OrchestratorConfig {
    let config = OrchestratorConfig::rooted_at(root)
        .with_poll_interval(Duration::ZERO)
        .with_quiescence_polls(1);
    tokio::fs::create_dir_all(&config.ligand_dir).await.unwrap();
    for name in ligands {
        tokio::fs::write(config.ligand_dir.join(name), "ROOT\nENDROOT\n").await.unwrap();
    }
    config
}

async fn run(config: &OrchestratorConfig, engine: Arc<AlphabetEngine>) {
    DockingOrchestrator::with_engine(config.clone(), engine)
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_resume_dispatches_only_the_complement() {
    let all = ["a.pdbqt", "b.pdbqt", "c.pdbqt", "d.pdbqt", "e.pdbqt"];
    let subsets: [&[&str]; 4] = [
        &[],
        &["c.pdbqt"],
        &["e.pdbqt", "a.pdbqt"],
        &["b.pdbqt", "d.pdbqt", "a.pdbqt", "e.pdbqt", "c.pdbqt"],
    ];

    for done in subsets {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), &all).await;
        let ledger = Ledger::new(&config.ledger_path);
        for name in done {
            ledger.record(name).await.unwrap();
        }

        let engine = AlphabetEngine::new(&config.log_dir);
        run(&config, engine.clone()).await;

        let expected: Vec<String> = all
            .iter()
            .filter(|n| !done.contains(*n))
            .map(|n| n.to_string())
            .collect();
        assert_eq!(engine.calls(), expected, "ledgered: {:?}", done);
    }
}

#[tokio::test]
async fn test_second_run_over_same_inputs_is_a_no_op() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &["a.pdbqt", "b.pdbqt"]).await;

    run(&config, AlphabetEngine::new(&config.log_dir)).await;
    let after_first = tokio::fs::read_to_string(&config.results_path).await.unwrap();

    let engine = AlphabetEngine::new(&config.log_dir);
    run(&config, engine.clone()).await;

    assert!(engine.calls().is_empty());
    let after_second = tokio::fs::read_to_string(&config.results_path).await.unwrap();
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_new_ligands_picked_up_after_restart() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &["b.pdbqt"]).await;
    run(&config, AlphabetEngine::new(&config.log_dir)).await;

    tokio::fs::write(config.ligand_dir.join("a.pdbqt"), "ROOT\n").await.unwrap();
    let engine = AlphabetEngine::new(&config.log_dir);
    run(&config, engine.clone()).await;

    assert_eq!(engine.calls(), vec!["a.pdbqt"]);
    let ranked = tokio::fs::read_to_string(&config.ranked_path).await.unwrap();
    assert_eq!(ranked, "Ligand,Binding free energy kcal/mol\nb,-2\na,-1\n");
}

#[tokio::test]
async fn test_crash_between_result_and_ledger_retries_once() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &["a.pdbqt", "b.pdbqt"]).await;

    // State left by a crash after b's result row was synced but before its
    // ledger entry was written.
    let store = ResultStore::new(&config.results_path);
    store.append("a", Score::Value(-1.0)).await.unwrap();
    store.append("b", Score::Value(-2.0)).await.unwrap();
    Ledger::new(&config.ledger_path).record("a.pdbqt").await.unwrap();

    let engine = AlphabetEngine::new(&config.log_dir);
    run(&config, engine.clone()).await;

    assert_eq!(engine.calls(), vec!["b.pdbqt"]);
    let rows = store.read_all().await.unwrap();
    let b_rows = rows.iter().filter(|r| r.base_name == "b").count();
    assert_eq!(rows.len(), 3);
    assert_eq!(b_rows, 2);

    let completed = Ledger::new(&config.ledger_path).load().await.unwrap();
    assert!(completed.contains("b.pdbqt"));
}

#[tokio::test]
async fn test_torn_ledger_line_is_recovered() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &["a.pdbqt", "b.pdbqt"]).await;
    // Crash mid-write left a partial entry with no newline.
    tokio::fs::write(&config.ledger_path, "a.pdbqt\nb.pd").await.unwrap();

    let engine = AlphabetEngine::new(&config.log_dir);
    run(&config, engine.clone()).await;

    assert_eq!(engine.calls(), vec!["b.pdbqt"]);
    let completed = Ledger::new(&config.ledger_path).load().await.unwrap();
    assert!(completed.contains("a.pdbqt"));
    assert!(completed.contains("b.pdbqt"));
}

#[tokio::test]
async fn test_whitespace_in_file_name_is_ledgered_exactly_once() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), &[" lig.pdbqt"]).await.with_quiescence_polls(2);
    let engine = AlphabetEngine::new(&config.log_dir);

    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        DockingOrchestrator::with_engine(config.clone(), engine.clone())
            .unwrap()
            .run(CancellationToken::new()),
    )
    .await
    .expect("run should reach quiescence")
    .unwrap();

    assert_eq!(engine.calls(), vec![" lig.pdbqt"]);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.polls, 3);
    assert!(!summary.cancelled);

    let completed = Ledger::new(&config.ledger_path).load().await.unwrap();
    assert!(completed.contains(" lig.pdbqt"));
    let rows = ResultStore::new(&config.results_path).read_all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].base_name, " lig");

    // A restart finds nothing left to do.
    let rerun = AlphabetEngine::new(&config.log_dir);
    run(&config, rerun.clone()).await;
    assert!(rerun.calls().is_empty());
}
