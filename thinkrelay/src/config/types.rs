// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::message::PromptTemplate;
use crate::thinking::Markers;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Top-level parsed and validated relay config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub prompt: PromptTemplate,
    pub markers: Markers,
    pub models: ModelsConfig,
}

/// Where and how to reach the generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    /// Server root without trailing slash.
    pub base_url: String,
    /// Model used when a request names none.
    pub default_model: String,
    /// Fail a stream when no upstream event arrives for this long.
    /// `None` disables the check.
    pub idle_timeout: Option<Duration>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            idle_timeout: None,
        }
    }
}

/// Command used to list installed models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelsConfig {
    pub command: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            command: vec!["ollama".to_string(), "list".to_string()],
        }
    }
}
