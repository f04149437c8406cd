//! # CineGrid Shard
//!
//! The per-worker half of the recommendation engine: an immutable in-memory
//! shard of the ratings matrix plus the k-nearest-neighbor computation that
//! runs against it.
//!
//! A shard is one disjoint row-partition of the (user, movie, rating) corpus.
//! It is loaded once at worker startup and never mutated afterwards, so the
//! query path needs no locks.

pub mod knn;
pub mod store;

pub use knn::{similar, QueryStats, SimilarityQuery};
pub use store::{IngestError, ShardStore, UserProfile};
