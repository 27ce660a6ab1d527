// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface
//
// Responsibilities:
// - `/chat` request validation and streamed SSE responses via the relay
// - `/cancel` single and global cancellation through the registry
// - `/models` installed-model listing via the injected ModelLister
// - `/health` upstream liveness via the injected GenerationBackend
// - Permissive CORS for the browser UI

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::message::ChatRequest;
use crate::models::{ModelListError, ModelLister};
use crate::relay::Relay;
use crate::sse::event_stream_headers;

/// Liveness text served at `/`.
pub const BANNER: &str = "thinkrelay is running";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned directly by handlers, before any stream starts.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error(transparent)]
    ModelList(#[from] ModelListError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::EmptyBody | ApiError::MalformedJson(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            ApiError::ModelList(e) => {
                tracing::warn!(error = %e, "model listing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state injected into axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub models: Arc<dyn ModelLister>,
}

impl AppState {
    pub fn new(relay: Relay, models: Arc<dyn ModelLister>) -> Self {
        Self {
            relay: Arc::new(relay),
            models,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelRequest {
    #[serde(default)]
    request_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET / -> plain-text banner
pub async fn banner() -> &'static str {
    BANNER
}

/// POST /chat -> SSE stream of relay frames
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    if body.is_empty() {
        return Err(ApiError::EmptyBody);
    }
    let request: ChatRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedJson(e.to_string()))?;

    let session = state.relay.start(request);
    let stream = session.frames.map(Ok::<Bytes, Infallible>);
    Ok((event_stream_headers(), Body::from_stream(stream)).into_response())
}

/// POST /cancel -> cancel one request (`{"requestId": ...}`) or, without an
/// id, every active request. Always `{"success": true}`.
pub async fn cancel(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request: CancelRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedJson(e.to_string()))?
    };

    let registry = state.relay.registry();
    match request.request_id {
        Some(id) => {
            if !registry.cancel(&id) {
                tracing::debug!(request_id = %id, "cancel for unknown request ignored");
            }
        }
        None => {
            registry.cancel_all();
        }
    }
    Ok(Json(json!({ "success": true })))
}

/// GET /models -> `{"models": [...]}`
pub async fn models(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let models = state.models.list_models().await?;
    Ok(Json(json!({ "models": models })))
}

/// GET /health -> 200 connected / 503 disconnected
pub async fn health(State(state): State<AppState>) -> Response {
    match state.relay.backend().health().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "connected" }))).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "upstream health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "disconnected" })),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router with every relay route.
///
/// Backend, registry and model lister are all injected through `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/chat", post(chat))
        .route("/cancel", post(cancel))
        .route("/models", get(models))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
