// Copyright 2026 PriceScout Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for PriceScout.
//!
//! Discovery and extraction are open; saving and listing plans are keyed
//! by the `X-User-ID` header, which an upstream auth layer is expected to
//! set. Pipeline failures travel in the response `error` field with a 200.

use crate::model::{ExtractedPlan, PricingDiscoverResponse, PricingExtractResponse};
use crate::pipeline::PricingService;
use crate::store::{save_response, PlanStore, SaveResponse, SavedPlansResponse};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: PricingService,
    pub store: Arc<dyn PlanStore>,
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/pricing/discover", post(handle_discover))
        .route("/api/v1/pricing/extract", post(handle_extract))
        .route("/api/v1/pricing/save", post(handle_save))
        .route("/api/v1/pricing/saved", get(handle_saved))
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server on the given port.
pub async fn start(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Errors ──────────────────────────────────────────────────────

/// A non-200 reply with `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "missing X-User-ID header".to_string(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(ApiError::unauthorized)
}

// ── Handlers ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DiscoverRequest {
    #[serde(default)]
    website_url: String,
}

#[derive(Debug, Deserialize)]
struct ExtractRequest {
    #[serde(default)]
    pricing_url: String,
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    #[serde(default)]
    website_url: String,
    #[serde(default)]
    source_url: String,
    #[serde(default)]
    plans: Vec<ExtractedPlan>,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let config = state.service.config();
    Json(json!({
        "status": "ok",
        "browser_enabled": config.browser.enabled,
        "llm_configured": config.llm.api_key.is_some(),
    }))
}

async fn handle_discover(
    State(state): State<AppState>,
    Json(req): Json<DiscoverRequest>,
) -> Json<PricingDiscoverResponse> {
    Json(state.service.discover_pricing_page(&req.website_url).await)
}

async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Json<PricingExtractResponse> {
    Json(state.service.extract_pricing(&req.pricing_url).await)
}

async fn handle_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let user = user_id(&headers)?;
    let store = Arc::clone(&state.store);
    let resp = tokio::task::spawn_blocking(move || {
        save_response(
            store.as_ref(),
            &user,
            &req.website_url,
            &req.source_url,
            &req.plans,
        )
    })
    .await
    .map_err(|e| ApiError::internal(format!("save task failed: {e}")))?;
    Ok(Json(resp))
}

async fn handle_saved(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SavedPlansResponse>, ApiError> {
    let user = user_id(&headers)?;
    let store = Arc::clone(&state.store);
    let plans = tokio::task::spawn_blocking(move || store.get_saved_plans(&user))
        .await
        .map_err(|e| ApiError::internal(format!("load task failed: {e}")))?
        .map_err(|e| ApiError::internal(format!("failed to get plans: {e}")))?;
    Ok(Json(SavedPlansResponse {
        count: plans.len(),
        plans,
    }))
}
