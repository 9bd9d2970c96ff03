use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::Error;
use common::types::SolveRequest;
use funny_graphs_core::traits::ShortestPathSolver;

/// Line-oriented TCP front end for a [`ShortestPathSolver`].
///
/// Each connection carries exactly one request line and gets exactly one
/// reply line, after which the service closes it. Requests that cannot be
/// answered get a single `error: ...` line instead of a response document.
pub struct SolverService<S> {
    listener: TcpListener,
    solver: Arc<S>,
}

impl<S> SolverService<S>
where
    S: ShortestPathSolver + Send + Sync + 'static,
{
    pub async fn bind(host: &str, port: u16, solver: S) -> Result<Self, Error> {
        let listener = TcpListener::bind((host, port)).await?;
        Ok(SolverService {
            listener,
            solver: Arc::new(solver),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` fires or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<()>) -> Result<(), Error> {
        info!(address = %self.local_addr()?, "solver service listening");

        loop {
            select! {
                accepted = self.listener.accept() => {
                    let (socket, peer) = accepted?;
                    let solver = self.solver.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, solver.as_ref()).await {
                            warn!(%peer, error = %e, "connection failed");
                        }
                    });
                }

                _ = shutdown.changed() => {
                    info!("Shutdown signal received, stopping solver service.");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection<S: ShortestPathSolver>(
    mut socket: TcpStream,
    solver: &S,
) -> Result<(), Error> {
    let (reader, mut writer) = socket.split();

    let mut line = String::new();
    if BufReader::new(reader).read_line(&mut line).await? == 0 {
        return Ok(());
    }

    let reply = answer_line(solver, line.trim_end());
    writer.write_all(reply.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Computes the reply line for one request line.
pub fn answer_line<S: ShortestPathSolver>(solver: &S, line: &str) -> String {
    let request: SolveRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "rejecting request that is not a graph document");
            return format!("error: invalid request: {}", e);
        }
    };

    let Some(start) = request.start else {
        return "error: request has no start vertex".to_string();
    };

    let response = match solver.answer(&request, start) {
        Ok(response) => response,
        Err(e) => return format!("error: {}", e),
    };

    serde_json::to_string(&response).unwrap_or_else(|e| format!("error: {}", e))
}
