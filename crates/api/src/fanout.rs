//! Similarity fan-out
//!
//! Sends one framed similarity request to every configured worker in
//! parallel, bounded by a dial timeout and a per-shard request deadline, and
//! merges the shard-local top-k lists into the global top-k.
//!
//! Every query attempts every worker: exclusion is decided per query by the
//! deadline, never by a cached health flag. A worker that fails one round is
//! simply absent from that round's merge; there are no in-query retries.

use cinegrid_core::protocol::{
    read_frame, write_frame, RpcError, SimilarityRecord, SimilarityRequest, SimilarityResponse,
};
use futures::future::join_all;
use std::cmp::Ordering;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Fan-out client over the configured worker fleet.
#[derive(Debug, Clone)]
pub struct FanoutClient {
    workers: Vec<String>,
    dial_timeout: Duration,
    request_timeout: Duration,
}

/// Outcome of one fan-out round.
#[derive(Debug, Clone)]
pub struct FanoutResult {
    /// Global top-k, descending similarity, ties by ascending user id.
    pub neighbors: Vec<SimilarityRecord>,
    /// Workers that returned a decodable response this round.
    pub nodes_used: usize,
    /// Addresses that failed this round.
    pub failed: Vec<String>,
}

impl FanoutClient {
    pub fn new(workers: Vec<String>, dial_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            workers,
            dial_timeout,
            request_timeout,
        }
    }

    pub fn workers(&self) -> &[String] {
        &self.workers
    }

    /// Query every worker in parallel and merge the responses.
    pub async fn gather(&self, request: &SimilarityRequest, k: usize) -> FanoutResult {
        let calls = self
            .workers
            .iter()
            .map(|addr| self.query_worker(addr, request));
        let responses = join_all(calls).await;

        let mut merged: Vec<SimilarityRecord> = Vec::new();
        let mut nodes_used = 0usize;
        let mut failed = Vec::new();

        for (addr, result) in self.workers.iter().zip(responses) {
            match result {
                Ok(response) => {
                    debug!(
                        worker = %addr,
                        worker_id = %response.worker_id,
                        neighbors = response.similarities.len(),
                        users_checked = response.users_checked,
                        process_time_ms = response.process_time_ms,
                        "shard responded"
                    );
                    nodes_used += 1;
                    merged.extend(response.similarities);
                }
                Err(e) => {
                    warn!(worker = %addr, error = %e, "shard unavailable for this query");
                    failed.push(addr.clone());
                }
            }
        }

        FanoutResult {
            neighbors: merge_top_k(merged, k),
            nodes_used,
            failed,
        }
    }

    /// One request/response exchange with a single worker.
    async fn query_worker(
        &self,
        addr: &str,
        request: &SimilarityRequest,
    ) -> Result<SimilarityResponse, RpcError> {
        let mut stream = timeout(self.dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| RpcError::Deadline)??;

        timeout(self.request_timeout, async {
            write_frame(&mut stream, request).await?;
            read_frame(&mut stream).await
        })
        .await
        .map_err(|_| RpcError::Deadline)?
    }
}

/// Global top-k over the disjoint union of shard-local lists.
///
/// Shards hold disjoint user sets, so the concatenation has no duplicate user
/// ids; a sort-and-truncate is the whole merge.
pub fn merge_top_k(mut records: Vec<SimilarityRecord>, k: usize) -> Vec<SimilarityRecord> {
    records.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    records.truncate(k);
    records
}
