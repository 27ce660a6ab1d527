// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Relay configuration.
//
// A small versioned YAML document. Every section is optional and falls back
// to the built-in defaults; string values support `${VAR}` interpolation
// from the environment.
//
//   thinkrelay: v1
//   upstream:
//     base_url: "http://${OLLAMA_HOST}:11434"
//     default_model: llama3.2:latest
//     idle_timeout_ms: 120000
//   prompt:
//     system: "You are a helpful AI assistant."
//   markers:
//     open: "<think>"
//     close: "</think>"
//   models:
//     command: ["ollama", "list"]

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{Config, ModelsConfig, UpstreamConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
