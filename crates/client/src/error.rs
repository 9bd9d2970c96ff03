use std::time::Duration;

use thiserror::Error;

use common::error::Error as CoreError;

/// Every way a solve, or the tooling around it, can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural graph errors and reply interpretation errors.
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Could not connect to solver at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Solver did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Solver closed the connection before sending a full line")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("The graph has no start vertex")]
    NoStartVertex,

    #[error("A solve is already in flight for this graph")]
    SolveInProgress,

    #[error("Graph changed while solving (revision {expected} -> {found})")]
    StaleSnapshot { expected: u64, found: u64 },

    #[error("Solve was cancelled")]
    Cancelled,

    #[error("Solve task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    ConfigLoadError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid graph input: {0}")]
    InvalidInput(String),
}
