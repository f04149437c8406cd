//! Worker TCP service
//!
//! Accept loop for the coordinator's similarity fan-out. Protocol per
//! connection: read one framed `SimilarityRequest`, run the shard kNN on a
//! blocking thread, write one framed `SimilarityResponse`, close.
//!
//! Failure semantics: no partial results. Any per-request fault (undecodable
//! frame, compute task failure) closes the connection without a response
//! frame, which the coordinator treats as "shard unavailable for this query".

use cinegrid_core::protocol::{read_frame, write_frame, SimilarityRequest, SimilarityResponse};
use cinegrid_core::sysstats;
use cinegrid_core::types::MovieId;
use cinegrid_shard::{similar, ShardStore, SimilarityQuery};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Shard-backed similarity service.
#[derive(Clone)]
pub struct WorkerService {
    store: Arc<ShardStore>,
    worker_id: String,
}

impl WorkerService {
    pub fn new(store: Arc<ShardStore>, worker_id: impl Into<String>) -> Self {
        Self {
            store,
            worker_id: worker_id.into(),
        }
    }

    /// Serve connections on an already-bound listener until the task is
    /// cancelled or the listener fails.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            worker_id = %self.worker_id,
            addr = %local_addr,
            users = self.store.len(),
            ratings = self.store.ratings_total(),
            "worker listening"
        );

        loop {
            let (stream, peer) = listener.accept().await?;
            let service = self.clone();
            tokio::spawn(async move {
                service.handle_connection(stream, peer.to_string()).await;
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream, peer: String) {
        let request: SimilarityRequest = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(e) if e.is_disconnect() => {
                // Health probes connect and close without sending a frame.
                debug!(peer = %peer, "connection closed without request");
                return;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "failed to read similarity request");
                return;
            }
        };

        debug!(
            peer = %peer,
            target_user_id = request.target_user_id,
            k = request.k,
            sample_size = request.sample_size,
            "similarity request received"
        );

        let store = Arc::clone(&self.store);
        let computed = tokio::task::spawn_blocking(move || {
            let target_ratings: Vec<(MovieId, f64)> = request
                .target_ratings
                .iter()
                .map(|(&movie_id, &score)| (movie_id, score))
                .collect();

            let query = SimilarityQuery {
                target_user_id: request.target_user_id,
                target_ratings: &target_ratings,
                target_mean: request.target_avg,
                k: request.k,
                sample_size: request.sample_size,
            };

            similar(&store, &query)
        })
        .await;

        let (similarities, stats) = match computed {
            Ok(result) => result,
            Err(e) => {
                // Closing without a frame signals failure to the coordinator.
                error!(peer = %peer, error = %e, "similarity computation failed");
                return;
            }
        };

        let process = sysstats::sample_process();
        let response = SimilarityResponse {
            worker_id: self.worker_id.clone(),
            similarities,
            process_time_ms: stats.duration_ms,
            users_checked: stats.users_checked,
            cpu_usage: process.cpu_usage,
            memory_mb: process.memory_mb,
        };

        if let Err(e) = write_frame(&mut stream, &response).await {
            warn!(peer = %peer, error = %e, "failed to write similarity response");
            return;
        }

        debug!(
            peer = %peer,
            neighbors = response.similarities.len(),
            users_checked = response.users_checked,
            process_time_ms = response.process_time_ms,
            "similarity response sent"
        );
    }
}
