//! Prometheus metrics for the coordinator
//!
//! The registry is an explicit value owned by the `CoordinatorContext` and
//! exposed at `/metrics` in text exposition format; nothing registers into a
//! process-wide global.

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

/// Histogram buckets for request duration in seconds: sub-millisecond cache
/// hits through multi-second degraded fan-outs.
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub struct ApiMetrics {
    registry: Registry,

    /// Recommendation requests by status code
    pub requests_total: CounterVec,

    /// Recommendation request latency in seconds
    pub request_duration_seconds: HistogramVec,

    /// Response cache hits
    pub cache_hits_total: Counter,

    /// Response cache misses
    pub cache_misses_total: Counter,

    /// Per-worker fan-out failures
    pub shard_failures_total: CounterVec,

    /// Workers answering per fan-out round
    pub fanout_nodes_used: Histogram,
}

impl ApiMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new(
                "recommendation_requests_total",
                "Total recommendation requests processed",
            ),
            &["status"],
        )
        .expect("Failed to create recommendation_requests_total metric");

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "recommendation_request_duration_seconds",
                "Recommendation request latency in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["cache"],
        )
        .expect("Failed to create recommendation_request_duration_seconds metric");

        let cache_hits_total = Counter::new(
            "response_cache_hits_total",
            "Total response cache hits",
        )
        .expect("Failed to create response_cache_hits_total metric");

        let cache_misses_total = Counter::new(
            "response_cache_misses_total",
            "Total response cache misses",
        )
        .expect("Failed to create response_cache_misses_total metric");

        let shard_failures_total = CounterVec::new(
            Opts::new(
                "shard_failures_total",
                "Fan-out failures by worker address",
            ),
            &["worker"],
        )
        .expect("Failed to create shard_failures_total metric");

        let fanout_nodes_used = Histogram::with_opts(
            HistogramOpts::new(
                "fanout_nodes_used",
                "Workers that answered each fan-out round",
            )
            .buckets(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0]),
        )
        .expect("Failed to create fanout_nodes_used metric");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("Failed to register recommendation_requests_total");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("Failed to register recommendation_request_duration_seconds");
        registry
            .register(Box::new(cache_hits_total.clone()))
            .expect("Failed to register response_cache_hits_total");
        registry
            .register(Box::new(cache_misses_total.clone()))
            .expect("Failed to register response_cache_misses_total");
        registry
            .register(Box::new(shard_failures_total.clone()))
            .expect("Failed to register shard_failures_total");
        registry
            .register(Box::new(fanout_nodes_used.clone()))
            .expect("Failed to register fanout_nodes_used");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            cache_hits_total,
            cache_misses_total,
            shard_failures_total,
            fanout_nodes_used,
        }
    }

    /// Gather all metrics in Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_gathers_text_format() {
        let metrics = ApiMetrics::new();
        metrics.requests_total.with_label_values(&["200"]).inc();
        metrics.cache_hits_total.inc();
        metrics.cache_misses_total.inc();
        metrics
            .shard_failures_total
            .with_label_values(&["worker-1:9001"])
            .inc();
        metrics.fanout_nodes_used.observe(3.0);

        let text = metrics.gather().unwrap();
        assert!(text.contains("# HELP"));
        assert!(text.contains("recommendation_requests_total"));
        assert!(text.contains("response_cache_hits_total"));
        assert!(text.contains("shard_failures_total"));
    }
}
