// Infrastructure: Server setup and configuration

use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tonic::transport::Server;

use crate::application::mappers::tour_solver::tour_solver_server::TourSolverServer;
use crate::application::GrpcTourSolverService;
use crate::domain::SolverBackend;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:50051";

/// Configuration errors raised while reading the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

pub struct ServerConfig {
    pub address: SocketAddr,
    pub default_backend: SolverBackend,
    pub default_time_limit: Option<Duration>,
}

impl ServerConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            default_backend: SolverBackend::Auto,
            default_time_limit: None,
        }
    }

    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.default_backend = backend;
        self
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.default_time_limit = limit;
        self
    }

    /// Read `LETSROUTE_ADDR`, `LETSROUTE_SOLVER` and
    /// `LETSROUTE_TIME_LIMIT_SECS`, falling back to defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup("LETSROUTE_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "LETSROUTE_ADDR",
                message: e.to_string(),
            })?;

        let backend = match lookup("LETSROUTE_SOLVER") {
            Some(value) => value.parse::<SolverBackend>().map_err(|message| ConfigError::Invalid {
                key: "LETSROUTE_SOLVER",
                message,
            })?,
            None => SolverBackend::Auto,
        };

        let time_limit = match lookup("LETSROUTE_TIME_LIMIT_SECS") {
            Some(value) => {
                let secs: f64 = value.trim().parse().map_err(|e: std::num::ParseFloatError| {
                    ConfigError::Invalid {
                        key: "LETSROUTE_TIME_LIMIT_SECS",
                        message: e.to_string(),
                    }
                })?;
                let limit = Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
                    key: "LETSROUTE_TIME_LIMIT_SECS",
                    message: format!("{} seconds: {}", secs, e),
                })?;
                (!limit.is_zero()).then_some(limit)
            }
            None => None,
        };

        Ok(Self::new(address)
            .with_backend(backend)
            .with_time_limit(time_limit))
    }
}

pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = GrpcTourSolverService::new(config.default_backend, config.default_time_limit);

    log::info!(
        "letsroute listening on {} (default solver: {}, time limit: {:?})",
        config.address,
        config.default_backend,
        config.default_time_limit
    );

    Server::builder()
        .add_service(TourSolverServer::new(service))
        .serve(config.address)
        .await?;

    Ok(())
}
