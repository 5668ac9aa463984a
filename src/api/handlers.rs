//! API Handlers
//!
//! HTTP request handlers for the cache administration and order endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::batch::BatchProcessor;
use crate::cache::{CacheCategory, CacheStats, PolicyTable};
use crate::config::Config;
use crate::context::CacheContext;
use crate::error::{CacheError, Result};
use crate::images::{HttpImageSource, ImageCacheStats, PreloadStats, SizeVariant};
use crate::models::{
    ClearResponse, HealthResponse, PreloadRequest, PreloadResponse, QueryResponse,
    SubmitOrderRequest,
};
use crate::orders::{OrderSubmitter, SubmissionSummary};
use crate::remote::{MemoryBlobStore, MemoryRemote, RemoteData};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Caches and their background work
    pub context: Arc<CacheContext>,
    /// Remote data store answering cache misses
    pub remote: Arc<dyn RemoteData>,
    pub submitter: OrderSubmitter,
}

impl AppState {
    /// Creates a new AppState around an initialised context.
    pub fn new(context: CacheContext, remote: Arc<dyn RemoteData>, config: &Config) -> Self {
        let processor = BatchProcessor::new(config.batch_config());
        let submitter = OrderSubmitter::new(remote.clone(), processor, config.remote_timeout());
        Self {
            context: Arc::new(context),
            remote,
            submitter,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Images are downloaded over HTTP and kept in memory, and the remote store
    /// is the in-process one.
    pub fn from_config(config: &Config) -> Self {
        let context = CacheContext::init(
            config,
            Arc::new(HttpImageSource::new()),
            Arc::new(MemoryBlobStore::new()),
        );
        Self::new(context, Arc::new(MemoryRemote::new()), config)
    }
}

// == Response Cache ==

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    let responses = state.context.responses().read().await;
    Json(responses.stats())
}

/// Handler for GET /policies
pub async fn policies_handler(State(state): State<AppState>) -> Json<PolicyTable> {
    let responses = state.context.responses().read().await;
    Json(responses.policies().clone())
}

/// Handler for DELETE /cache
///
/// Drops every response and resets the hit counters.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let mut responses = state.context.responses().write().await;
    let removed = responses.len();
    responses.clear();

    Json(ClearResponse::new("Response cache", removed))
}

/// Handler for DELETE /cache/:category
pub async fn clear_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<ClearResponse>> {
    let category: CacheCategory = category.parse()?;
    let removed = state
        .context
        .responses()
        .write()
        .await
        .clear_by_type(category);

    Ok(Json(ClearResponse::new(format!("{} cache", category), removed)))
}

/// Handler for GET /query/:category/:resource
///
/// Query string parameters become an equality filter.
pub async fn query_handler(
    State(state): State<AppState>,
    Path((category, resource)): Path<(String, String)>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<QueryResponse>> {
    let category: CacheCategory = category.parse()?;
    let filter = Value::Object(
        params
            .into_iter()
            .map(|(field, value)| (field, Value::String(value)))
            .collect(),
    );

    let rows = state
        .context
        .cached_query(state.remote.as_ref(), category, &resource, &filter)
        .await?;

    Ok(Json(QueryResponse::new(category.as_str(), resource, rows)))
}

// == Images ==

/// Handler for GET /images/stats
pub async fn image_stats_handler(State(state): State<AppState>) -> Json<ImageCacheStats> {
    Json(state.context.images().stats().await)
}

/// Handler for DELETE /images
pub async fn clear_images_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.context.images().clear_cache().await;
    Json(ClearResponse::new("Image cache", removed))
}

/// Handler for DELETE /images/:variant
pub async fn clear_image_variant_handler(
    State(state): State<AppState>,
    Path(variant): Path<SizeVariant>,
) -> Json<ClearResponse> {
    let removed = state.context.images().clear_variant(variant).await;
    Json(ClearResponse::new(format!("{} images", variant.as_str()), removed))
}

// == Preload ==

/// Handler for GET /preload/stats
pub async fn preload_stats_handler(State(state): State<AppState>) -> Json<PreloadStats> {
    Json(state.context.preload().stats().await)
}

/// Handler for POST /preload
///
/// Enqueues the images and starts the worker if it is idle.
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<Json<PreloadResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let preload = state.context.preload();
    let mut queued = 0;
    for image in &req.images {
        if preload.enqueue(&image.url, image.kind, image.variant).await {
            queued += 1;
        }
    }
    let started = preload.start().await.is_some();

    Ok(Json(PreloadResponse {
        queued,
        skipped: req.images.len() - queued,
        started,
    }))
}

/// Handler for DELETE /preload
pub async fn cancel_preload_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.context.preload().clear().await;
    Json(ClearResponse::new("Preload queue", removed))
}

// == Orders ==

/// Handler for POST /orders
pub async fn submit_order_handler(
    State(state): State<AppState>,
    Json(req): Json<SubmitOrderRequest>,
) -> Result<Json<SubmissionSummary>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let summary = state.submitter.submit(req.lines, &req.context).await?;
    Ok(Json(summary))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
