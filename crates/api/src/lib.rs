//! # CineGrid Coordinator
//!
//! Fronts the recommendation platform with an HTTP/JSON API. For every cold
//! query the coordinator fans a similarity request out to the worker fleet,
//! merges the shard-local top-k candidate sets, predicts ratings for movies
//! the target has not seen, and caches the ordered result.
//!
//! All coordinator-wide state (catalog, user table, cache, health, metrics)
//! lives in an explicit [`context::CoordinatorContext`] value threaded through
//! the handlers; there are no process-wide singletons.

pub mod cache;
pub mod catalog;
pub mod context;
pub mod error;
pub mod fanout;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod predict;
pub mod routes;
pub mod snapshot;
pub mod users;

pub use cache::{CacheOutcome, RecommendationCache};
pub use catalog::MovieCatalog;
pub use context::CoordinatorContext;
pub use error::ApiError;
pub use fanout::{FanoutClient, FanoutResult};
pub use health::{HealthMonitor, WorkerHealth, WorkerStatus};
pub use users::UserTable;
