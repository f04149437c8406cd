//! Route configuration for the coordinator HTTP server.

use crate::handlers;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/api/recommendations",
        web::post().to(handlers::recommendations),
    )
    .route("/api/health", web::get().to(handlers::health))
    .route("/api/users/{id}", web::get().to(handlers::get_user))
    .route("/api/movies/{id}", web::get().to(handlers::get_movie))
    .route("/metrics", web::get().to(handlers::metrics));
}
