use std::sync::Arc;

use tokio::select;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::error::Error;
use super::types::{SharedAnnotations, SharedGraph, SolveState, SolverTransport};
use funny_graphs_core::{Annotations, ResponseInterpreter};

/// Summary of a solve that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOutcome {
    /// Graph revision the annotations belong to.
    pub revision: u64,
    pub annotated: usize,
    pub in_negative_loop: usize,
}

/// Runs solves for one graph and keeps the annotations of the last one that succeeded.
///
/// At most one solve is in flight at a time. The graph lock is held only while
/// the request is serialized and while the result is applied, never across
/// network I/O. A result computed for an older revision of the graph is
/// rejected rather than applied to vertices it no longer describes.
pub struct SolveSession<T: SolverTransport> {
    graph: SharedGraph,
    annotations: SharedAnnotations,
    transport: Arc<T>,
    in_flight: Arc<Mutex<()>>,
    state: Arc<watch::Sender<SolveState>>,
}

impl<T: SolverTransport> Clone for SolveSession<T> {
    fn clone(&self) -> Self {
        SolveSession {
            graph: self.graph.clone(),
            annotations: self.annotations.clone(),
            transport: self.transport.clone(),
            in_flight: self.in_flight.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: SolverTransport> SolveSession<T> {
    pub fn new(graph: SharedGraph, transport: T) -> Self {
        let (state, _) = watch::channel(SolveState::Idle);
        SolveSession {
            graph,
            annotations: Arc::new(RwLock::new(Annotations::default())),
            transport: Arc::new(transport),
            in_flight: Arc::new(Mutex::new(())),
            state: Arc::new(state),
        }
    }

    pub fn graph(&self) -> SharedGraph {
        self.graph.clone()
    }

    pub fn annotations(&self) -> SharedAnnotations {
        self.annotations.clone()
    }

    pub fn state(&self) -> SolveState {
        *self.state.borrow()
    }

    /// Watches the state of the current or most recent solve.
    pub fn subscribe(&self) -> watch::Receiver<SolveState> {
        self.state.subscribe()
    }

    /// Serializes the graph, exchanges it with the solver, and applies the reply.
    ///
    /// On any failure the previous annotations are left exactly as they were.
    pub async fn solve(&self) -> Result<SolveOutcome, Error> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| Error::SolveInProgress)?;

        let result = self.run().await;
        self.finish(&result);
        result
    }

    /// Like [`solve`](Self::solve), but gives up as soon as `cancel` fires.
    ///
    /// A dropped cancel sender is not a cancellation.
    pub async fn solve_with_cancel(
        &self,
        mut cancel: watch::Receiver<()>,
    ) -> Result<SolveOutcome, Error> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| Error::SolveInProgress)?;

        let result = select! {
            result = self.run() => result,
            _ = cancelled(&mut cancel) => Err(Error::Cancelled),
        };
        self.finish(&result);
        result
    }

    /// Runs [`solve_with_cancel`](Self::solve_with_cancel) as a background task.
    pub fn spawn(&self, cancel: watch::Receiver<()>) -> JoinHandle<Result<SolveOutcome, Error>> {
        let session = self.clone();
        tokio::spawn(async move { session.solve_with_cancel(cancel).await })
    }

    async fn run(&self) -> Result<SolveOutcome, Error> {
        self.state.send_replace(SolveState::Sending);

        let snapshot = {
            let graph = self.graph.read().await;
            if graph.start().is_none() {
                return Err(Error::NoStartVertex);
            }
            graph.snapshot()
        };
        let payload = snapshot.to_json()?;

        info!(
            vertices = snapshot.len(),
            revision = snapshot.revision,
            "sending graph to solver"
        );
        let reply = self.transport.exchange(&payload, &self.state).await?;

        self.state.send_replace(SolveState::Parsing);
        let annotations = ResponseInterpreter::annotate(&reply, &snapshot)?;

        let graph = self.graph.read().await;
        if graph.revision() != snapshot.revision {
            return Err(Error::StaleSnapshot {
                expected: snapshot.revision,
                found: graph.revision(),
            });
        }

        let outcome = SolveOutcome {
            revision: snapshot.revision,
            annotated: annotations.len(),
            in_negative_loop: annotations
                .iter()
                .filter(|(_, a)| a.is_in_negative_loop())
                .count(),
        };
        // Swapped while the graph read lock is held so no edit can slip in between.
        *self.annotations.write().await = annotations;

        Ok(outcome)
    }

    fn finish(&self, result: &Result<SolveOutcome, Error>) {
        match result {
            Ok(outcome) => {
                info!(
                    annotated = outcome.annotated,
                    in_negative_loop = outcome.in_negative_loop,
                    "solve applied"
                );
                self.state.send_replace(SolveState::Applied);
            }
            Err(e) => {
                warn!(error = %e, "solve failed");
                self.state.send_replace(SolveState::Failed);
            }
        }
    }
}

async fn cancelled(cancel: &mut watch::Receiver<()>) {
    if cancel.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{SolveRequest, VertexId};
    use funny_graphs_core::{Distance, Graph};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;
    use tokio::time::{Duration, timeout};

    /// Answers every request with distance zero for every vertex id it carried.
    struct ZeroSolver;

    #[async_trait::async_trait]
    impl SolverTransport for ZeroSolver {
        async fn exchange(
            &self,
            payload: &str,
            progress: &watch::Sender<SolveState>,
        ) -> Result<String, Error> {
            progress.send_replace(SolveState::WaitingResponse);
            Ok(zero_reply(payload))
        }
    }

    fn zero_reply(payload: &str) -> String {
        let request: SolveRequest = serde_json::from_str(payload).unwrap();
        let entries: Vec<String> = request
            .vertices
            .iter()
            .map(|v| format!(r#"{{"id":{},"distance":0,"isInNegativeLoop":false}}"#, v.id))
            .collect();
        format!(r#"{{"vertices":[{}]}}"#, entries.join(","))
    }

    /// Hands out pre-scripted replies in order.
    struct ScriptedSolver {
        replies: StdMutex<VecDeque<Result<String, Error>>>,
    }

    impl ScriptedSolver {
        fn new(replies: Vec<Result<String, Error>>) -> Self {
            ScriptedSolver {
                replies: StdMutex::new(replies.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl SolverTransport for ScriptedSolver {
        async fn exchange(
            &self,
            _payload: &str,
            _progress: &watch::Sender<SolveState>,
        ) -> Result<String, Error> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(Error::ConnectionClosed))
        }
    }

    /// Edits the graph while the request is "on the wire".
    struct EditingSolver {
        graph: SharedGraph,
    }

    #[async_trait::async_trait]
    impl SolverTransport for EditingSolver {
        async fn exchange(
            &self,
            payload: &str,
            _progress: &watch::Sender<SolveState>,
        ) -> Result<String, Error> {
            self.graph.write().await.insert_vertex();
            Ok(zero_reply(payload))
        }
    }

    /// Blocks until released.
    struct GatedSolver {
        gate: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl SolverTransport for GatedSolver {
        async fn exchange(
            &self,
            payload: &str,
            progress: &watch::Sender<SolveState>,
        ) -> Result<String, Error> {
            progress.send_replace(SolveState::WaitingResponse);
            self.gate.notified().await;
            Ok(zero_reply(payload))
        }
    }

    fn shared_graph(n: usize) -> (SharedGraph, Vec<VertexId>) {
        let mut graph = Graph::new();
        let vertices: Vec<VertexId> = (0..n).map(|_| graph.insert_vertex()).collect();
        for pair in vertices.windows(2) {
            graph.connect(pair[0], pair[1], 1).unwrap();
        }
        if let Some(&first) = vertices.first() {
            graph.set_start(first).unwrap();
        }
        (Arc::new(RwLock::new(graph)), vertices)
    }

    async fn wait_for(rx: &mut watch::Receiver<SolveState>, wanted: SolveState) {
        timeout(Duration::from_secs(1), rx.wait_for(|s| *s == wanted))
            .await
            .expect("state never reached")
            .expect("state channel closed");
    }

    #[tokio::test]
    async fn every_vertex_is_annotated_once() {
        let (graph, vertices) = shared_graph(4);
        let session = SolveSession::new(graph, ZeroSolver);

        let outcome = session.solve().await.unwrap();

        assert_eq!(outcome.annotated, 4);
        assert_eq!(outcome.in_negative_loop, 0);
        assert_eq!(session.state(), SolveState::Applied);

        let annotations = session.annotations();
        let annotations = annotations.read().await;
        assert_eq!(annotations.len(), 4);
        for v in vertices {
            assert_eq!(annotations.get(v).unwrap().distance, Distance::Finite(0));
        }
    }

    #[tokio::test]
    async fn missing_start_is_refused() {
        let (graph, _) = shared_graph(2);
        graph.write().await.clear_start();
        let session = SolveSession::new(graph, ZeroSolver);

        let result = session.solve().await;

        assert!(matches!(result, Err(Error::NoStartVertex)));
        assert_eq!(session.state(), SolveState::Failed);
    }

    #[tokio::test]
    async fn failures_leave_previous_annotations_untouched() {
        let (graph, vertices) = shared_graph(2);
        let session = SolveSession::new(
            graph,
            ScriptedSolver::new(vec![
                Ok(r#"{"vertices":[{"id":0,"distance":0,"isInNegativeLoop":false},{"id":1,"distance":-1000,"isInNegativeLoop":true}]}"#.to_string()),
                Err(Error::ConnectionFailed {
                    address: "127.0.0.1:1".to_string(),
                    reason: "refused".to_string(),
                }),
                Ok(r#"{"vertices":[{"id":5,"distance":0,"isInNegativeLoop":false}]}"#.to_string()),
                Ok("Invalid JSON (or some other error)".to_string()),
            ]),
        );

        let outcome = session.solve().await.unwrap();
        assert_eq!(outcome.in_negative_loop, 1);
        let before = session.annotations().read().await.clone();
        assert_eq!(
            before.get(vertices[1]).unwrap().distance,
            Distance::NegativeInfinity
        );

        assert!(matches!(
            session.solve().await,
            Err(Error::ConnectionFailed { .. })
        ));
        assert!(matches!(
            session.solve().await,
            Err(Error::Core(common::error::Error::MalformedResponse(_)))
        ));
        assert!(matches!(
            session.solve().await,
            Err(Error::Core(common::error::Error::MalformedResponse(_)))
        ));

        assert_eq!(*session.annotations().read().await, before);
    }

    #[tokio::test]
    async fn edit_during_solve_is_stale() {
        let (graph, _) = shared_graph(3);
        let session = SolveSession::new(
            graph.clone(),
            EditingSolver {
                graph: graph.clone(),
            },
        );

        let result = session.solve().await;

        assert!(matches!(result, Err(Error::StaleSnapshot { .. })));
        assert!(session.annotations().read().await.is_empty());
    }

    #[tokio::test]
    async fn second_solve_while_in_flight_is_rejected() {
        let (graph, _) = shared_graph(2);
        let gate = Arc::new(Notify::new());
        let session = SolveSession::new(graph, GatedSolver { gate: gate.clone() });
        let mut states = session.subscribe();

        let (_cancel_tx, cancel_rx) = watch::channel(());
        let first = session.spawn(cancel_rx);
        wait_for(&mut states, SolveState::WaitingResponse).await;

        assert!(matches!(session.solve().await, Err(Error::SolveInProgress)));

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.annotated, 2);
    }

    #[tokio::test]
    async fn cancel_abandons_the_solve() {
        let (graph, _) = shared_graph(2);
        let session = SolveSession::new(
            graph,
            GatedSolver {
                gate: Arc::new(Notify::new()),
            },
        );
        let mut states = session.subscribe();

        let (cancel_tx, cancel_rx) = watch::channel(());
        let task = session.spawn(cancel_rx);
        wait_for(&mut states, SolveState::WaitingResponse).await;

        cancel_tx.send(()).unwrap();
        let result = task.await.unwrap();

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(session.state(), SolveState::Failed);
        assert!(session.annotations().read().await.is_empty());

        // The in-flight slot is free again.
        assert!(session.in_flight.try_lock().is_ok());
    }
}
