//! HTTP route surface.
//!
//! - `GET /health`
//! - `GET /api/{source}/search?q=<text>[&force_refresh=true]` → `{ offers }`
//! - `POST /api/{source}/cache/clear` → `{ success: true, cleared }`

use std::sync::Arc;

use axum::extract::{Path, Query as QueryParams, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use offerscout_core::{Error, Query, RawOffer, Source};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchBody {
    offers: Vec<RawOffer>,
}

#[derive(Debug, Serialize)]
pub struct ClearBody {
    success: bool,
    cleared: usize,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/{source}/search", get(search))
        .route("/api/{source}/cache/clear", post(clear_cache))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the routes on `addr` until Ctrl+C.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("offerscout listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to capture Ctrl+C signal: {e}");
            }
        })
        .await?;
    Ok(())
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn search(
    State(state): State<Arc<AppState>>, Path(source): Path<String>, QueryParams(params): QueryParams<SearchParams>,
) -> Result<Json<SearchBody>, ApiError> {
    let raw = params
        .q
        .ok_or_else(|| Error::InvalidInput("missing query parameter q".into()))?;
    let query = Query::new(raw)?;
    let source: Source = source.parse()?;

    let offers = state
        .adapter(source)?
        .fetch_offers(&query, params.force_refresh)
        .await?;
    Ok(Json(SearchBody { offers }))
}

async fn clear_cache(State(state): State<Arc<AppState>>, Path(source): Path<String>) -> Result<Json<ClearBody>, ApiError> {
    let source: Source = source.parse()?;
    let cleared = state.clear_cache(source)?;
    tracing::info!(%source, cleared, "cache cleared");
    Ok(Json(ClearBody { success: true, cleared }))
}
