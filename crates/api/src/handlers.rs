//! HTTP handlers for the coordinator API.

use crate::context::CoordinatorContext;
use crate::error::ApiError;
use crate::health::WorkerStatus;
use crate::predict::predict;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use cinegrid_core::protocol::SimilarityRequest;
use cinegrid_core::types::{MovieId, RecommendationItem, UserId};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: i64,
    #[serde(default)]
    pub top_n: i64,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommendations: Vec<RecommendationItem>,
    pub process_time_ms: f64,
    pub nodes_used: usize,
    pub cache_hit: bool,
}

/// POST /api/recommendations
pub async fn recommendations(
    ctx: web::Data<CoordinatorContext>,
    body: web::Json<RecommendationRequest>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();

    if body.user_id <= 0 {
        return Err(ApiError::InvalidRequest(
            "user_id must be a positive integer".to_string(),
        ));
    }
    let user_id =
        UserId::try_from(body.user_id).map_err(|_| ApiError::UserNotFound(body.user_id))?;

    let top_n = if body.top_n <= 0 {
        ctx.config.top_n
    } else {
        body.top_n as usize
    };

    // Unknown users never reach the cache, so a 404 leaves no trace.
    let target = ctx
        .users
        .profile(user_id)
        .ok_or(ApiError::UserNotFound(body.user_id))?;

    let request = SimilarityRequest {
        target_user_id: user_id,
        target_ratings: target.ratings().iter().copied().collect(),
        target_avg: target.mean(),
        k: ctx.config.k,
        sample_size: ctx.config.sample_size,
    };

    let outcome = ctx
        .cache
        .get_or_compute((user_id, top_n), async {
            let fanout = ctx.fanout.gather(&request, ctx.config.k).await;

            for worker in &fanout.failed {
                ctx.metrics
                    .shard_failures_total
                    .with_label_values(&[worker])
                    .inc();
            }
            ctx.metrics.fanout_nodes_used.observe(fanout.nodes_used as f64);

            if fanout.nodes_used == 0 {
                return Err(ApiError::ShardsUnavailable);
            }

            let items = predict(target, &fanout.neighbors, &ctx.users, &ctx.catalog, top_n);
            Ok((items, fanout.nodes_used))
        })
        .await?;

    if outcome.cache_hit {
        ctx.metrics.cache_hits_total.inc();
    } else {
        ctx.metrics.cache_misses_total.inc();
    }

    let elapsed = started.elapsed();
    ctx.metrics.requests_total.with_label_values(&["200"]).inc();
    ctx.metrics
        .request_duration_seconds
        .with_label_values(&[if outcome.cache_hit { "hit" } else { "miss" }])
        .observe(elapsed.as_secs_f64());

    info!(
        user_id,
        top_n,
        recommendations = outcome.items.len(),
        nodes_used = outcome.nodes_used,
        cache_hit = outcome.cache_hit,
        process_time_ms = elapsed.as_secs_f64() * 1000.0,
        "recommendation request served"
    );

    Ok(HttpResponse::Ok().json(RecommendationResponse {
        user_id,
        recommendations: outcome.items,
        process_time_ms: elapsed.as_secs_f64() * 1000.0,
        nodes_used: outcome.nodes_used,
        cache_hit: outcome.cache_hit,
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<Utc>,
    workers: Vec<crate::health::WorkerHealth>,
    table_users: usize,
    catalog_movies: usize,
    cache_entries: usize,
}

/// GET /api/health
pub async fn health(ctx: web::Data<CoordinatorContext>) -> HttpResponse {
    let workers = ctx.health.snapshot().await;

    let healthy = workers
        .iter()
        .filter(|w| w.status == WorkerStatus::Healthy)
        .count();
    let status = if healthy == workers.len() {
        "healthy"
    } else if healthy > 0 {
        "degraded"
    } else {
        "unhealthy"
    };

    HttpResponse::Ok().json(HealthResponse {
        status,
        timestamp: Utc::now(),
        workers,
        table_users: ctx.users.len(),
        catalog_movies: ctx.catalog.len(),
        cache_entries: ctx.cache.len().await,
    })
}

#[derive(Debug, Serialize)]
struct UserSummary {
    user_id: UserId,
    ratings_count: usize,
    average_rating: f64,
}

/// GET /api/users/{id}
pub async fn get_user(
    ctx: web::Data<CoordinatorContext>,
    path: web::Path<UserId>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();

    let profile = ctx
        .users
        .profile(user_id)
        .ok_or(ApiError::UserNotFound(user_id as i64))?;

    Ok(HttpResponse::Ok().json(UserSummary {
        user_id,
        ratings_count: profile.len(),
        average_rating: profile.mean(),
    }))
}

#[derive(Debug, Serialize)]
struct MovieSummary {
    movie_id: MovieId,
    title: String,
}

/// GET /api/movies/{id}
pub async fn get_movie(
    ctx: web::Data<CoordinatorContext>,
    path: web::Path<MovieId>,
) -> Result<HttpResponse, ApiError> {
    let movie_id = path.into_inner();

    let title = ctx
        .catalog
        .title(movie_id)
        .ok_or(ApiError::MovieNotFound(movie_id))?;

    Ok(HttpResponse::Ok().json(MovieSummary {
        movie_id,
        title: title.to_string(),
    }))
}

/// GET /metrics
pub async fn metrics(ctx: web::Data<CoordinatorContext>) -> HttpResponse {
    match ctx.metrics.gather() {
        Ok(text) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(text),
        Err(e) => {
            tracing::error!(error = %e, "failed to gather metrics");
            HttpResponse::InternalServerError().body("failed to gather metrics")
        }
    }
}
