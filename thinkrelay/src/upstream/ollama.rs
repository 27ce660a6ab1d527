// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use super::decode::decode_events;
use super::{EventStream, GenerateRequest, GenerationBackend, UpstreamError};

/// Ollama-compatible backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaBackend {
    /// `base_url` is the server root, e.g. `http://localhost:11434`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    #[instrument(name = "ollama.generate", skip_all, fields(model = %request.model))]
    async fn generate(&self, request: GenerateRequest) -> Result<EventStream, UpstreamError> {
        let url = format!("{}/api/generate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::Dispatch(e.to_string()))?;

        let status = resp.status();
        debug!(%status, "generate call accepted");

        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".into());
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_events(resp.bytes_stream()))
    }

    async fn health(&self) -> Result<(), UpstreamError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| UpstreamError::Dispatch(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(UpstreamError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }
}
