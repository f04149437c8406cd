//! Worker health monitoring
//!
//! A background prober TCP-connects to every worker on an interval with a
//! short timeout and maintains a status map. The map feeds the health
//! endpoint only; the query fan-out always attempts every configured worker
//! and relies on its own per-query deadline, so a stale flag can never
//! exclude a healthy shard.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Healthy,
    Unhealthy,
    /// Not probed yet.
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerHealth {
    pub address: String,
    pub status: WorkerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub last_checked: DateTime<Utc>,
}

pub struct HealthMonitor {
    workers: Vec<String>,
    probe_timeout: Duration,
    statuses: RwLock<HashMap<String, WorkerHealth>>,
}

impl HealthMonitor {
    pub fn new(workers: Vec<String>, probe_timeout: Duration) -> Self {
        Self {
            workers,
            probe_timeout,
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// Probe every worker in parallel and update the status map.
    pub async fn probe_all(&self) {
        let probes = self
            .workers
            .iter()
            .map(|addr| Self::probe(addr.clone(), self.probe_timeout));
        let results = join_all(probes).await;

        let mut statuses = self.statuses.write().await;
        for health in results {
            debug!(worker = %health.address, status = ?health.status, "worker probed");
            statuses.insert(health.address.clone(), health);
        }
    }

    /// A successful TCP connect within the timeout is the entire probe; no
    /// payload is exchanged.
    async fn probe(address: String, probe_timeout: Duration) -> WorkerHealth {
        let started = Instant::now();

        match timeout(probe_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_stream)) => WorkerHealth {
                address,
                status: WorkerStatus::Healthy,
                latency_ms: Some(started.elapsed().as_millis() as u64),
                last_checked: Utc::now(),
            },
            _ => WorkerHealth {
                address,
                status: WorkerStatus::Unhealthy,
                latency_ms: None,
                last_checked: Utc::now(),
            },
        }
    }

    /// Current statuses in configured fleet order.
    pub async fn snapshot(&self) -> Vec<WorkerHealth> {
        let statuses = self.statuses.read().await;
        self.workers
            .iter()
            .map(|addr| {
                statuses.get(addr).cloned().unwrap_or(WorkerHealth {
                    address: addr.clone(),
                    status: WorkerStatus::Unknown,
                    latency_ms: None,
                    last_checked: Utc::now(),
                })
            })
            .collect()
    }

    /// Run the prober loop until the task is aborted.
    pub fn spawn_prober(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.probe_all().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_live_and_dead_workers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live_addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });

        // Reserve a port, then close it so nothing is listening.
        let dead_addr = {
            let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
            reserved.local_addr().unwrap().to_string()
        };

        let monitor = HealthMonitor::new(
            vec![live_addr.clone(), dead_addr.clone()],
            Duration::from_secs(2),
        );
        monitor.probe_all().await;

        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].address, live_addr);
        assert_eq!(snapshot[0].status, WorkerStatus::Healthy);
        assert!(snapshot[0].latency_ms.is_some());
        assert_eq!(snapshot[1].address, dead_addr);
        assert_eq!(snapshot[1].status, WorkerStatus::Unhealthy);
        assert!(snapshot[1].latency_ms.is_none());
    }

    #[tokio::test]
    async fn test_unprobed_workers_report_unknown() {
        let monitor = HealthMonitor::new(vec!["10.0.0.1:9001".to_string()], Duration::from_secs(2));

        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, WorkerStatus::Unknown);
    }
}
