//! # CineGrid Worker
//!
//! TCP service wrapping one ratings shard. Each connection carries exactly one
//! length-framed similarity request and receives one framed response; a
//! connection that closes without sending a frame is a health probe.

pub mod service;

pub use service::WorkerService;
