//! Configuration loader for CineGrid services
//!
//! Provides a unified configuration loading system with environment variable
//! parsing, validation, and support for .env files. All configuration uses the
//! `CINEGRID_` prefix for environment variables.
//!
//! # Features
//!
//! - Environment variable parsing with typed values
//! - .env file support via dotenvy
//! - Configuration validation with clear error messages
//! - Default values for optional fields
//!
//! # Example
//!
//! ```no_run
//! use cinegrid_core::config::{load_dotenv, ConfigLoader, CoordinatorConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//!
//! let config = CoordinatorConfig::from_env()?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::CoreError;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    ///
    /// Reads environment variables with the `CINEGRID_` prefix and constructs
    /// a configuration instance with defaults for missing optional values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if required environment variables are
    /// missing or values cannot be parsed.
    fn from_env() -> Result<Self, CoreError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if any validation check fails.
    fn validate(&self) -> Result<(), CoreError>;
}

/// Coordinator configuration
///
/// # Environment Variables
///
/// - `CINEGRID_WORKERS` (required): comma-separated worker host:port list;
///   list order defines the shard index
/// - `CINEGRID_PARTITIONS` (required): comma-separated ratings partition CSVs
///   used to build the coordinator-wide user table
/// - `CINEGRID_MOVIES_PATH` (required): movie catalog CSV
/// - `CINEGRID_API_ADDR` (optional): HTTP bind address (default: "0.0.0.0:8080")
/// - `CINEGRID_K` (optional): neighbors per query (default: 30)
/// - `CINEGRID_SAMPLE_SIZE` (optional): per-shard candidate sample (default: 5000)
/// - `CINEGRID_TOP_N` (optional): default response length (default: 10)
/// - `CINEGRID_CACHE_MAX_AGE_SECS` (optional): cache aging threshold (default: 3600)
/// - `CINEGRID_CACHE_SWEEP_SECS` (optional): sweep interval (default: 1800)
/// - `CINEGRID_DIAL_TIMEOUT_SECS` (optional): worker dial timeout (default: 10)
/// - `CINEGRID_REQUEST_TIMEOUT_SECS` (optional): per-shard request deadline (default: 10)
/// - `CINEGRID_PROBE_TIMEOUT_SECS` (optional): health probe timeout (default: 2)
/// - `CINEGRID_PROBE_INTERVAL_SECS` (optional): health probe interval (default: 15)
/// - `CINEGRID_SNAPSHOT_PATH` (optional): JSON snapshot path; unset disables persistence
/// - `CINEGRID_HTTP_WORKERS` (optional): HTTP worker threads (default: CPU count)
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// HTTP bind address
    pub api_addr: String,
    /// Worker addresses; order defines the shard index
    pub workers: Vec<String>,
    /// Ratings partition files, one per shard
    pub partitions: Vec<PathBuf>,
    /// Movie catalog CSV path
    pub movies_path: PathBuf,
    /// Neighbors retained per query
    pub k: usize,
    /// Candidate users sampled per shard
    pub sample_size: usize,
    /// Default recommendation list length
    pub top_n: usize,
    /// Cache entries older than this since last user access are evicted
    pub cache_max_age: Duration,
    /// Interval between cache sweeps
    pub cache_sweep_interval: Duration,
    /// Worker TCP dial timeout
    pub dial_timeout: Duration,
    /// Per-shard request deadline
    pub request_timeout: Duration,
    /// Health probe connect timeout
    pub probe_timeout: Duration,
    /// Interval between health probe rounds
    pub probe_interval: Duration,
    /// Optional JSON snapshot path
    pub snapshot_path: Option<PathBuf>,
    /// HTTP server worker threads
    pub http_workers: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            api_addr: "0.0.0.0:8080".to_string(),
            workers: Vec::new(),
            partitions: Vec::new(),
            movies_path: PathBuf::from("data/movies.csv"),
            k: 30,
            sample_size: 5000,
            top_n: 10,
            cache_max_age: Duration::from_secs(3600),
            cache_sweep_interval: Duration::from_secs(1800),
            dial_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
            probe_interval: Duration::from_secs(15),
            snapshot_path: None,
            http_workers: num_cpus::get(),
        }
    }
}

impl ConfigLoader for CoordinatorConfig {
    fn from_env() -> Result<Self, CoreError> {
        let workers_raw = std::env::var("CINEGRID_WORKERS").map_err(|_| {
            CoreError::config(
                "CINEGRID_WORKERS must be set (comma-separated host:port list)",
                "CINEGRID_WORKERS",
            )
        })?;
        let workers = split_list(&workers_raw);

        let partitions_raw = std::env::var("CINEGRID_PARTITIONS").map_err(|_| {
            CoreError::config(
                "CINEGRID_PARTITIONS must be set (comma-separated CSV paths)",
                "CINEGRID_PARTITIONS",
            )
        })?;
        let partitions = split_list(&partitions_raw)
            .into_iter()
            .map(PathBuf::from)
            .collect();

        let movies_path = std::env::var("CINEGRID_MOVIES_PATH")
            .map(PathBuf::from)
            .map_err(|_| {
                CoreError::config("CINEGRID_MOVIES_PATH must be set", "CINEGRID_MOVIES_PATH")
            })?;

        let defaults = CoordinatorConfig::default();

        Ok(Self {
            api_addr: std::env::var("CINEGRID_API_ADDR").unwrap_or(defaults.api_addr),
            workers,
            partitions,
            movies_path,
            k: parse_env_var("CINEGRID_K", defaults.k)?,
            sample_size: parse_env_var("CINEGRID_SAMPLE_SIZE", defaults.sample_size)?,
            top_n: parse_env_var("CINEGRID_TOP_N", defaults.top_n)?,
            cache_max_age: Duration::from_secs(parse_env_var(
                "CINEGRID_CACHE_MAX_AGE_SECS",
                3600u64,
            )?),
            cache_sweep_interval: Duration::from_secs(parse_env_var(
                "CINEGRID_CACHE_SWEEP_SECS",
                1800u64,
            )?),
            dial_timeout: Duration::from_secs(parse_env_var("CINEGRID_DIAL_TIMEOUT_SECS", 10u64)?),
            request_timeout: Duration::from_secs(parse_env_var(
                "CINEGRID_REQUEST_TIMEOUT_SECS",
                10u64,
            )?),
            probe_timeout: Duration::from_secs(parse_env_var("CINEGRID_PROBE_TIMEOUT_SECS", 2u64)?),
            probe_interval: Duration::from_secs(parse_env_var(
                "CINEGRID_PROBE_INTERVAL_SECS",
                15u64,
            )?),
            snapshot_path: std::env::var("CINEGRID_SNAPSHOT_PATH").ok().map(PathBuf::from),
            http_workers: parse_env_var("CINEGRID_HTTP_WORKERS", defaults.http_workers)?,
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.workers.is_empty() {
            return Err(CoreError::config(
                "at least one worker address is required",
                "CINEGRID_WORKERS",
            ));
        }

        if self.partitions.is_empty() {
            return Err(CoreError::config(
                "at least one ratings partition is required",
                "CINEGRID_PARTITIONS",
            ));
        }

        if self.k == 0 {
            return Err(CoreError::config("k must be at least 1", "CINEGRID_K"));
        }

        if self.sample_size == 0 {
            return Err(CoreError::config(
                "sample_size must be at least 1",
                "CINEGRID_SAMPLE_SIZE",
            ));
        }

        if self.top_n == 0 {
            return Err(CoreError::config(
                "top_n must be at least 1",
                "CINEGRID_TOP_N",
            ));
        }

        for (name, value) in [
            ("CINEGRID_CACHE_MAX_AGE_SECS", self.cache_max_age),
            ("CINEGRID_CACHE_SWEEP_SECS", self.cache_sweep_interval),
            ("CINEGRID_DIAL_TIMEOUT_SECS", self.dial_timeout),
            ("CINEGRID_REQUEST_TIMEOUT_SECS", self.request_timeout),
            ("CINEGRID_PROBE_TIMEOUT_SECS", self.probe_timeout),
            ("CINEGRID_PROBE_INTERVAL_SECS", self.probe_interval),
        ] {
            if value.as_secs() == 0 {
                return Err(CoreError::config(
                    format!("{} must be greater than 0 seconds", name),
                    name,
                ));
            }
        }

        if self.http_workers == 0 {
            return Err(CoreError::config(
                "http_workers must be greater than 0",
                "CINEGRID_HTTP_WORKERS",
            ));
        }

        Ok(())
    }
}

/// Worker configuration
///
/// # Environment Variables
///
/// - `CINEGRID_PARTITION_PATH` (required): ratings partition CSV for this shard
/// - `CINEGRID_WORKER_ADDR` (optional): TCP bind address (default: "0.0.0.0:9001")
/// - `CINEGRID_WORKER_ID` (optional): identifier echoed in responses
///   (default: the bind address)
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// TCP bind address
    pub listen_addr: String,
    /// Ratings partition owned by this shard
    pub partition_path: PathBuf,
    /// Identifier echoed in similarity responses
    pub worker_id: String,
}

impl ConfigLoader for WorkerConfig {
    fn from_env() -> Result<Self, CoreError> {
        let partition_path = std::env::var("CINEGRID_PARTITION_PATH")
            .map(PathBuf::from)
            .map_err(|_| {
                CoreError::config(
                    "CINEGRID_PARTITION_PATH must be set",
                    "CINEGRID_PARTITION_PATH",
                )
            })?;

        let listen_addr =
            std::env::var("CINEGRID_WORKER_ADDR").unwrap_or_else(|_| "0.0.0.0:9001".to_string());

        let worker_id =
            std::env::var("CINEGRID_WORKER_ID").unwrap_or_else(|_| listen_addr.clone());

        Ok(Self {
            listen_addr,
            partition_path,
            worker_id,
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.listen_addr.is_empty() {
            return Err(CoreError::config(
                "listen address must not be empty",
                "CINEGRID_WORKER_ADDR",
            ));
        }

        if self.worker_id.is_empty() {
            return Err(CoreError::config(
                "worker id must not be empty",
                "CINEGRID_WORKER_ID",
            ));
        }

        Ok(())
    }
}

/// Split a comma-separated list, dropping empty segments.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Helper function to parse an environment variable with a default value
///
/// # Errors
///
/// Returns a `ConfigurationError` if the value is set but cannot be parsed.
fn parse_env_var<T>(key: &str, default: T) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| CoreError::config(format!("Failed to parse {}: {}", key, e), key))
        })
        .unwrap_or(Ok(default))
}

/// Load a .env file if present
///
/// Does not error when the .env file is missing.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
