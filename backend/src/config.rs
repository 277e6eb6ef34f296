//! Configuration management for the Aira irrigation advisory service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with AIRA__ prefix

use std::path::PathBuf;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Raster, cache and upload directories
    pub data: DataConfig,

    /// Soil water balance model service
    pub model_engine: ModelEngineConfig,

    /// Demo account used by the "try it" login
    pub demo: DemoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Directory holding the daily historical rasters (`daily_{var}-YYYY-MM-DD.tif`)
    pub historical_dir: PathBuf,

    /// Directory for sampled point time series
    pub timeseries_cache_dir: PathBuf,

    /// Format version written into cached time series; bump to invalidate
    pub timeseries_cache_version: u32,

    /// Directory for uploaded soil analysis documents
    pub media_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelEngineConfig {
    /// Base URL of the model service
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Shared demo account. The server creates it at startup when missing, so
/// the password must pass the same rules as a registration.
#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    pub username: String,
    pub password: String,
}

pub(crate) const DEFAULT_DEMO_USERNAME: &str = "demo";
pub(crate) const DEFAULT_DEMO_PASSWORD: &str = "demo-irrigation";

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("AIRA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("data.historical_dir", "data/historical")?
            .set_default("data.timeseries_cache_dir", "data/timeseries-cache")?
            .set_default("data.timeseries_cache_version", 2)?
            .set_default("data.media_dir", "data/media")?
            .set_default("model_engine.endpoint", "http://localhost:8100")?
            .set_default("model_engine.timeout_seconds", 60)?
            .set_default("demo.username", DEFAULT_DEMO_USERNAME)?
            .set_default("demo.password", DEFAULT_DEMO_PASSWORD)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (AIRA__ prefix)
            .add_source(
                Environment::with_prefix("AIRA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
