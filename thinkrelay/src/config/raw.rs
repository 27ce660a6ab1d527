// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal).
// Kept apart from the public config so interpolation and validation happen
// between parsing and building the typed structs.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub thinkrelay: String,
    pub upstream: Option<RawUpstreamConfig>,
    pub prompt: Option<RawPromptConfig>,
    pub markers: Option<RawMarkers>,
    pub models: Option<RawModelsConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstreamConfig {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPromptConfig {
    pub system: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMarkers {
    pub open: Option<String>,
    pub close: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawModelsConfig {
    pub command: Option<Vec<String>>,
}
