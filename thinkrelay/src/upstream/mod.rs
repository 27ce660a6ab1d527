// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Upstream generation backend.
//
// Responsibilities:
// - Wire types for the streaming `generate` call and its NDJSON events
// - Decode arbitrary byte chunking into whole events, skipping malformed lines
// - `GenerationBackend` trait as the injection point for the relay and tests
// - reqwest implementation against an Ollama-compatible server

mod decode;
mod ollama;

pub use decode::{decode_events, DecodeError, NdjsonDecoder, MAX_LINE_BYTES};
pub use ollama::OllamaBackend;

use async_trait::async_trait;
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Sampling options forwarded verbatim to the upstream runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl GenerateOptions {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_predict.is_none() && self.top_p.is_none()
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// One decoded NDJSON line of a streaming generation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerationEvent {
    /// Incremental text. Empty on metadata-only events.
    #[serde(default)]
    pub response: String,
    /// Set on the final event of a generation.
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    /// In-band failure reported by the runtime.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The call could not be initiated (connection refused, DNS, ...).
    #[error("upstream dispatch failed: {0}")]
    Dispatch(String),

    /// The upstream answered the call with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The connection failed after streaming started.
    #[error("upstream stream failed: {0}")]
    Stream(String),

    /// The runtime reported an error inside the stream.
    #[error("upstream generation error: {0}")]
    Generation(String),
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Ordered events of one generation. Dropping the stream releases the
/// upstream connection, which the runtime treats as a stop signal.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<GenerationEvent, UpstreamError>> + Send>>;

/// Token-generating backend consumed by the relay.
///
/// Implementations must be Send + Sync so they can be shared across request
/// handlers via `Arc`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Open a streaming generation.
    async fn generate(&self, request: GenerateRequest) -> Result<EventStream, UpstreamError>;

    /// Liveness probe against the backend.
    async fn health(&self) -> Result<(), UpstreamError>;
}
