use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::Error;

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_VAR: &str = "FUNNY_GRAPHS_CONFIG";

/// Where and how to reach the solver service.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl SolverConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Listener settings for the bundled reference solver.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    pub total_nodes: usize,
    pub edge_count: usize,
    pub min_weight: i32,
    pub max_weight: i32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub solver: SolverConfig,
    pub service: ServiceConfig,
    pub simulator: SimulatorConfig,
}

/// Loads configuration from `Config.toml` and `FUNNY_GRAPHS_*` environment variables.
///
/// The file is `$FUNNY_GRAPHS_CONFIG` when set, otherwise
/// `crates/client/Config.toml` under the current directory.
pub fn load_config() -> Result<Config, Error> {
    let config_file_path = match env::var_os(CONFIG_PATH_VAR) {
        Some(path) => PathBuf::from(path),
        None => {
            let base_path = env::current_dir().map_err(|e| {
                Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
            })?;
            base_path.join("crates").join("client").join("Config.toml")
        }
    };

    load_config_from(&config_file_path)
}

/// `FUNNY_GRAPHS_` prefix, then a double underscore between section and key,
/// e.g. `FUNNY_GRAPHS_SOLVER__CONNECT_TIMEOUT_MS=500`. Keys themselves contain
/// single underscores, so they cannot serve as the separator.
fn environment() -> Environment {
    Environment::with_prefix("FUNNY_GRAPHS")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Loads configuration from an explicit file, still honouring environment overrides.
pub fn load_config_from(config_file_path: &Path) -> Result<Config, Error> {
    load_config_with(config_file_path, environment())
}

fn load_config_with(config_file_path: &Path, environment: Environment) -> Result<Config, Error> {
    if !config_file_path.exists() {
        return Err(Error::ConfigLoadError(format!(
            "Configuration file not found at calculated path: {}",
            config_file_path.display()
        )));
    }

    let s = ConfigLoader::builder()
        .add_source(File::from(config_file_path).required(true))
        .add_source(environment)
        .build()
        .map_err(|e| Error::ConfigLoadError(e.to_string()))?;

    let app_config: Config = s
        .try_deserialize()
        .map_err(|e| Error::ConfigLoadError(format!("Failed to deserialize config: {}", e)))?;

    if app_config.simulator.min_weight > app_config.simulator.max_weight {
        return Err(Error::ConfigLoadError(
            "simulator.min_weight must not exceed simulator.max_weight".to_string(),
        ));
    }

    Ok(app_config)
}
