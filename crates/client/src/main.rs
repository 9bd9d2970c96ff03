use std::env;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

use funny_graphs_client::TcpConnector;
use funny_graphs_client::config::{self, Config};
use funny_graphs_client::csv_loader::{CsvGraphLoader, LoadedGraph};
use funny_graphs_client::error::Error;
use funny_graphs_client::service::SolverService;
use funny_graphs_client::session::SolveSession;
use funny_graphs_client::simulator::GraphSimulator;
use funny_graphs_client::types::DataSource;
use funny_graphs_core::solver::BellmanFordSolver;

const USAGE: &str = "\
Usage:
  funny-graphs solve sim [START]         solve a random graph
  funny-graphs solve csv PATH [START]    solve a graph read from a from,to,weight CSV
  funny-graphs ping                      check that the configured solver answers
  funny-graphs serve                     run the bundled Bellman-Ford solver";

enum Command {
    Solve { source: DataSource, start: usize },
    Ping,
    Serve,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let command = parse_args();
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(command, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse command-line arguments to determine what to do.
fn parse_args() -> Command {
    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let command = match args.as_slice() {
        ["ping"] => Some(Command::Ping),
        ["serve"] => Some(Command::Serve),
        ["solve", "sim", rest @ ..] => parse_start(rest).map(|start| Command::Solve {
            source: DataSource::Sim,
            start,
        }),
        ["solve", "csv", path, rest @ ..] => parse_start(rest).map(|start| Command::Solve {
            source: DataSource::Csv(path.to_string()),
            start,
        }),
        _ => None,
    };

    command.unwrap_or_else(|| {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    })
}

fn parse_start(rest: &[&str]) -> Option<usize> {
    match rest {
        [] => Some(0),
        [start] => start.parse().ok(),
        _ => None,
    }
}

async fn run(command: Command, config: Config) -> Result<(), Error> {
    match command {
        Command::Serve => serve(&config).await,
        Command::Ping => {
            let connector = TcpConnector::from_config(&config.solver);
            let reply = connector.ping().await?;
            println!("Solver at {} answered: {}", connector.address(), reply);
            Ok(())
        }
        Command::Solve { source, start } => solve(&config, &source, start).await,
    }
}

fn load_graph(source: &DataSource, config: &Config) -> Result<LoadedGraph, Error> {
    match source {
        DataSource::Sim => GraphSimulator::new(config.simulator.clone()).generate(),
        DataSource::Csv(path) => CsvGraphLoader::new(path.clone()).load(),
    }
}

/// Cancels through `sender` on Ctrl-C.
fn cancel_on_ctrl_c(sender: watch::Sender<()>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = sender.send(());
        }
    });
}

async fn serve(config: &Config) -> Result<(), Error> {
    let service =
        SolverService::bind(&config.service.bind, config.service.port, BellmanFordSolver).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    cancel_on_ctrl_c(shutdown_tx);

    service.run(shutdown_rx).await
}

async fn solve(config: &Config, source: &DataSource, start: usize) -> Result<(), Error> {
    let mut loaded = load_graph(source, config)?;
    loaded.set_start(start)?;
    let LoadedGraph { graph, vertices } = loaded;

    let session = SolveSession::new(
        Arc::new(RwLock::new(graph)),
        TcpConnector::from_config(&config.solver),
    );

    let (cancel_tx, cancel_rx) = watch::channel(());
    cancel_on_ctrl_c(cancel_tx);

    let outcome = session.spawn(cancel_rx).await??;
    info!(revision = outcome.revision, "annotations applied");

    let graph = session.graph();
    let graph = graph.read().await;
    let annotations = session.annotations();
    let annotations = annotations.read().await;

    println!("{:>6}  {:>12}  color", "vertex", "distance");
    for (n, &v) in vertices.iter().enumerate() {
        let marker = if graph.start() == Some(v) { " (start)" } else { "" };
        match annotations.get(v) {
            Some(annotation) => {
                let color = annotation.color();
                println!(
                    "{:>6}  {:>12}  #{:02x}{:02x}{:02x}{}",
                    n,
                    annotation.distance.to_string(),
                    color.r,
                    color.g,
                    color.b,
                    marker
                );
            }
            None => println!("{:>6}  {:>12}{}", n, "-", marker),
        }
    }

    for edge in graph.edges() {
        let from = vertices.iter().position(|&v| v == edge.a);
        let to = vertices.iter().position(|&v| v == edge.b);
        if let (Some(from), Some(to)) = (from, to) {
            println!("  {} -> {} ({})", from, to, edge.weight);
        }
    }

    println!(
        "{} vertices annotated, {} in a negative loop.",
        outcome.annotated, outcome.in_negative_loop
    );
    Ok(())
}
