//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Detection payloads carry one box per detected object.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Scheduling cycles
        .route("/cycles", post(handlers::run_cycle))
        .route("/detections/cycles", post(handlers::run_detection_cycle))
        // Section history
        .route("/sections/{section_id}/samples", post(handlers::record_sample))
        .route("/sections/{section_id}/prediction", get(handlers::get_prediction))
        .route("/sections/{section_id}/anomaly", get(handlers::get_anomaly))
        .route("/sections/{section_id}/trend", get(handlers::get_trend))
        .route("/sections/{section_id}/report", get(handlers::get_report));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
