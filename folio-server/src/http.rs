//! Folio HTTP API
//!
//! Axum server consumed by the page-rendering layer and by publish-event
//! hooks. Each endpoint has a thin axum handler delegating to a pure
//! inner function; the inner functions are directly testable against the
//! in-memory store without axum dispatch machinery.
//!
//! Endpoints:
//! - GET  /health           — health check with DB + pgvector status
//! - GET  /feed/:username   — merged or single-kind feed page
//! - POST /hooks/published  — fire-and-forget embedding pipeline trigger

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use folio_core::models::content::ContentKind;
use folio_core::models::feed::FeedFilter;
use folio_core::store::ContentStore;
use folio_core::{EmbeddingBackend, FolioConfig};

use crate::subsystems::{embedder, feed};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pool: PgPool,
    pub store: Arc<dyn ContentStore>,
    pub backend: Arc<dyn EmbeddingBackend>,
    pub config: FolioConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/feed/:username", get(feed_handler))
        .route("/hooks/published", post(published_hook_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Folio HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub filter: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PublishedHook {
    pub id: Uuid,
    pub kind: ContentKind,
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: &PgPool) -> (StatusCode, serde_json::Value) {
    let pg_ver = match folio_core::db::health_check(pool).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                }),
            );
        }
    };

    let pgvector_ver = match folio_core::db::check_pgvector(pool).await {
        Ok(Some(v)) => v,
        Ok(None) => "not installed".to_string(),
        Err(e) => format!("unavailable: {}", e),
    };

    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "postgresql": pg_ver,
            "pgvector": pgvector_ver,
        }),
    )
}

/// Inner feed fetch — validates parameters and calls the aggregator.
pub async fn feed_inner(
    store: &dyn ContentStore,
    config: &FolioConfig,
    username: &str,
    query: FeedQuery,
) -> (StatusCode, serde_json::Value) {
    let filter = match query.filter.as_deref() {
        None => FeedFilter::All,
        Some(raw) => match FeedFilter::parse(raw) {
            Some(f) => f,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    serde_json::json!({
                        "error": format!("unknown filter '{}'", raw),
                        "status": "error",
                    }),
                );
            }
        },
    };

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(10);

    match feed::get_feed(
        store,
        username,
        filter,
        page,
        limit,
        config.feed.overfetch_buffer,
    )
    .await
    {
        Ok(Some(feed_page)) => match serde_json::to_value(&feed_page) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string(), "status": "error" }),
            ),
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({
                "error": format!("no author '{}'", username),
                "status": "not_found",
            }),
        ),
        Err(e) => {
            tracing::error!(username = %username, error = %e, "Feed query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string(), "status": "error" }),
            )
        }
    }
}

/// Inner publish hook — spawns the embedding pipeline and returns 202.
///
/// The hook always accepts: embedding outcomes are observable in logs,
/// never in the publish response.
pub fn published_hook_inner(
    store: Arc<dyn ContentStore>,
    backend: Arc<dyn EmbeddingBackend>,
    config: &FolioConfig,
    hook: PublishedHook,
) -> (StatusCode, serde_json::Value) {
    embedder::spawn_publish_task(
        store,
        backend,
        config.embedding.clone(),
        config.recommend.clone(),
        hook.kind,
        hook.id,
    );

    (
        StatusCode::ACCEPTED,
        serde_json::json!({
            "status": "accepted",
            "id": hook.id,
            "kind": hook.kind,
        }),
    )
}

// ============================================================================
// Axum handlers (thin wrappers)
// ============================================================================

async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

async fn feed_handler(
    State(state): State<Arc<HttpState>>,
    Path(username): Path<String>,
    Query(query): Query<FeedQuery>,
) -> impl IntoResponse {
    let (status, body) = feed_inner(state.store.as_ref(), &state.config, &username, query).await;
    (status, Json(body))
}

async fn published_hook_handler(
    State(state): State<Arc<HttpState>>,
    Json(hook): Json<PublishedHook>,
) -> impl IntoResponse {
    let (status, body) = published_hook_inner(
        state.store.clone(),
        state.backend.clone(),
        &state.config,
        hook,
    );
    (status, Json(body))
}
