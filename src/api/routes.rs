//! Router construction

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{handlers, status};
use crate::middleware::rate_limit::RateLimitLayer;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let settings = &state.settings;

    let mut analyze: Router<Arc<AppState>> = Router::new()
        .route("/analyze", post(handlers::analyze))
        .route_layer(DefaultBodyLimit::max(settings.upload.max_body_bytes()));

    if settings.rate_limit.enabled {
        analyze = analyze.route_layer(RateLimitLayer::new(
            settings.rate_limit.requests_per_second,
            settings.rate_limit.burst_size,
        ));
    }

    Router::new()
        .merge(analyze)
        .route("/analyze/health", get(status::health))
        .route("/analyze/config", get(status::config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
