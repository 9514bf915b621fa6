use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ligand directory {dir:?} could not be listed: {source}")]
    Discovery {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Result store error: {0}")]
    ResultStore(String),

    #[error("Ranked summary error: {0}")]
    Summary(String),

    #[error("Could not launch docking engine {program:?}: {source}")]
    EngineLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid work item: {0}")]
    InvalidItem(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScreeningError {
    /// Whether the orchestrator must stop when this error surfaces.
    ///
    /// Storage failures and an unlaunchable engine stop the loop; everything
    /// else is recovered per item or per cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScreeningError::Ledger(_)
                | ScreeningError::ResultStore(_)
                | ScreeningError::EngineLaunch { .. }
                | ScreeningError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScreeningError>;
