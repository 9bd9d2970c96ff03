pub mod config;
pub mod connector;
pub mod csv_loader;
pub mod error;
pub mod service;
pub mod session;
pub mod simulator;
pub mod types;

pub use connector::TcpConnector;
pub use error::Error;
pub use session::{SolveOutcome, SolveSession};
pub use types::{SharedGraph, SolveState, SolverTransport};
