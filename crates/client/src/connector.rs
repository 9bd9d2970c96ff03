use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::SolverConfig;
use common::error::Error as CoreError;
use super::error::Error;
use super::types::{SolveState, SolverTransport};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REPLY_BYTES: u64 = 16 * 1024 * 1024;

/// Deliberately not a request document; any live solver answers it with some line.
pub const PING_PAYLOAD: &str = r#"{"test":"ping"}"#;

/// One-shot line client for the solver service.
///
/// Each exchange opens its own TCP connection, writes one line, reads one
/// line and drops the stream. Nothing is pooled and nothing is retried.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
    max_reply_bytes: u64,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        TcpConnector {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_reply_bytes: DEFAULT_MAX_REPLY_BYTES,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        TcpConnector::new(config.host.clone(), config.port)
            .with_timeouts(config.connect_timeout(), config.read_timeout())
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    /// Caps the reply line, terminator included.
    pub fn with_max_reply_bytes(mut self, max_reply_bytes: u64) -> Self {
        self.max_reply_bytes = max_reply_bytes;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sends `payload` and returns the reply line with its line terminator removed.
    pub async fn send(&self, payload: &str) -> Result<String, Error> {
        self.round_trip(payload, None).await
    }

    /// Checks that something is listening and answering lines at the configured address.
    pub async fn ping(&self) -> Result<String, Error> {
        self.send(PING_PAYLOAD).await
    }

    async fn open(&self) -> Result<TcpStream, Error> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));

        match timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(Error::ConnectionFailed {
                address: self.address(),
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::ConnectionFailed {
                address: self.address(),
                reason: format!("timed out after {:?}", self.connect_timeout),
            }),
        }
    }

    async fn round_trip(
        &self,
        payload: &str,
        progress: Option<&watch::Sender<SolveState>>,
    ) -> Result<String, Error> {
        if payload.contains('\n') {
            return Err(Error::InvalidInput(
                "payload must fit on a single line".to_string(),
            ));
        }

        let mut stream = self.open().await?;
        debug!(address = %self.address(), bytes = payload.len(), "connected to solver");

        let exchange = async {
            let (reader, mut writer) = stream.split();

            writer.write_all(payload.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;

            if let Some(progress) = progress {
                progress.send_replace(SolveState::WaitingResponse);
            }

            let mut bytes = Vec::new();
            let read = BufReader::new(reader)
                .take(self.max_reply_bytes)
                .read_until(b'\n', &mut bytes)
                .await?;
            if !bytes.ends_with(b"\n") {
                if read as u64 >= self.max_reply_bytes {
                    return Err(CoreError::MalformedResponse(format!(
                        "reply exceeds {} bytes",
                        self.max_reply_bytes
                    ))
                    .into());
                }
                return Err(Error::ConnectionClosed);
            }

            let mut line = String::from_utf8(bytes).map_err(|e| {
                CoreError::MalformedResponse(format!("reply is not valid UTF-8: {}", e))
            })?;
            let trimmed = line.trim_end_matches(['\r', '\n']).len();
            line.truncate(trimmed);
            Ok::<String, Error>(line)
        };

        let result = match timeout(self.read_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.read_timeout)),
        };

        if let Err(e) = &result {
            warn!(address = %self.address(), error = %e, "solver exchange failed");
        }
        result
    }
}

#[async_trait::async_trait]
impl SolverTransport for TcpConnector {
    async fn exchange(
        &self,
        payload: &str,
        progress: &watch::Sender<SolveState>,
    ) -> Result<String, Error> {
        self.round_trip(payload, Some(progress)).await
    }
}

/// Sends one line to `address:port` and returns the one line it answers with.
pub async fn solve(address: &str, port: u16, payload: &str) -> Result<String, Error> {
    TcpConnector::new(address, port).send(payload).await
}
