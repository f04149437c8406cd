//! Coordinator context
//!
//! All coordinator-wide state as one explicit value: the movie catalog, the
//! full user table, the response cache, the fan-out client, the health
//! monitor, and the metrics registry. Handlers receive it via `web::Data`;
//! nothing lives in ambient globals.

use crate::cache::RecommendationCache;
use crate::catalog::MovieCatalog;
use crate::fanout::FanoutClient;
use crate::health::HealthMonitor;
use crate::metrics::ApiMetrics;
use crate::users::UserTable;
use cinegrid_core::config::CoordinatorConfig;
use std::sync::Arc;

pub struct CoordinatorContext {
    pub config: CoordinatorConfig,
    pub catalog: MovieCatalog,
    pub users: UserTable,
    pub cache: RecommendationCache,
    pub fanout: FanoutClient,
    pub health: Arc<HealthMonitor>,
    pub metrics: ApiMetrics,
}

impl CoordinatorContext {
    pub fn new(config: CoordinatorConfig, catalog: MovieCatalog, users: UserTable) -> Self {
        let cache = RecommendationCache::new(config.cache_max_age);
        let fanout = FanoutClient::new(
            config.workers.clone(),
            config.dial_timeout,
            config.request_timeout,
        );
        let health = Arc::new(HealthMonitor::new(
            config.workers.clone(),
            config.probe_timeout,
        ));
        let metrics = ApiMetrics::new();

        Self {
            config,
            catalog,
            users,
            cache,
            fanout,
            health,
            metrics,
        }
    }
}
