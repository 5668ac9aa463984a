//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cancel_preload_handler, clear_cache_handler, clear_category_handler,
    clear_image_variant_handler, clear_images_handler, health_handler, image_stats_handler,
    policies_handler, preload_handler, preload_stats_handler, query_handler, stats_handler,
    submit_order_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/policies", get(policies_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/cache/:category", delete(clear_category_handler))
        .route("/query/:category/:resource", get(query_handler))
        .route("/images", delete(clear_images_handler))
        .route("/images/stats", get(image_stats_handler))
        .route("/images/:variant", delete(clear_image_variant_handler))
        .route("/preload", post(preload_handler).delete(cancel_preload_handler))
        .route("/preload/stats", get(preload_stats_handler))
        .route("/orders", post(submit_order_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
