use std::sync::Arc;
use tokio::sync::{RwLock, watch};

use super::error::Error;
use funny_graphs_core::{Annotations, Graph};

/// Graph shared between its editor and in-flight solves. Writers take the lock
/// for the length of one mutation.
pub type SharedGraph = Arc<RwLock<Graph>>;

/// Annotations of the last successful solve.
pub type SharedAnnotations = Arc<RwLock<Annotations>>;

/// Where the command line tool takes its graph from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Sim,
    Csv(String),
}

/// Progress of a single solve.
///
/// `Idle -> Sending -> WaitingResponse -> Parsing -> Applied | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveState {
    #[default]
    Idle,
    Sending,
    WaitingResponse,
    Parsing,
    Applied,
    Failed,
}

/// A way of getting one request line to a solver and one reply line back.
///
/// Implementations must use a fresh connection per call and release it on
/// every exit path. `progress` is advanced to `WaitingResponse` once the
/// request has been flushed.
#[async_trait::async_trait]
pub trait SolverTransport: Send + Sync + 'static {
    async fn exchange(
        &self,
        payload: &str,
        progress: &watch::Sender<SolveState>,
    ) -> Result<String, Error>;
}
