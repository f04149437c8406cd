//! # CineGrid Core
//!
//! Shared building blocks for the CineGrid distributed recommendation platform:
//! domain types, configuration loading, the coordinator/worker wire protocol,
//! and observability helpers.
//!
//! ## Modules
//!
//! - `types`: Core id and value types shared across crates
//! - `error`: Shared error types
//! - `config`: Configuration loading and validation
//! - `protocol`: Length-framed JSON RPC between coordinator and workers
//! - `observability`: Structured logging initialization
//! - `sysstats`: Best-effort process CPU/memory sampling

pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod sysstats;
pub mod types;

pub use config::{load_dotenv, ConfigLoader, CoordinatorConfig, WorkerConfig};
pub use error::CoreError;
pub use protocol::{
    read_frame, write_frame, RpcError, SimilarityRecord, SimilarityRequest, SimilarityResponse,
    MAX_FRAME_BYTES,
};
pub use types::{MovieId, RecommendationItem, UserId};

/// Result type alias for CineGrid core operations
pub type Result<T> = std::result::Result<T, CoreError>;
