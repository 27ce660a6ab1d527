// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::message::PromptTemplate;
use crate::thinking::Markers;

use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a relay config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Parse YAML into raw deserialization types
/// 3. Validate the version
/// 4. Resolve variable interpolation in string fields
/// 5. Validate values and build the typed Config, filling defaults
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.thinkrelay != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.thinkrelay
        )));
    }

    Ok(Config {
        upstream: build_upstream(raw.upstream)?,
        prompt: build_prompt(raw.prompt)?,
        markers: build_markers(raw.markers)?,
        models: build_models(raw.models)?,
    })
}

fn build_upstream(raw: Option<raw::RawUpstreamConfig>) -> Result<UpstreamConfig, ConfigError> {
    let mut upstream = UpstreamConfig::default();
    let Some(raw) = raw else {
        return Ok(upstream);
    };

    if let Some(base_url) = raw.base_url {
        let base_url = resolve_variables(&base_url)?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "upstream.base_url must be an http(s) URL, got \"{base_url}\""
            )));
        }
        upstream.base_url = base_url.trim_end_matches('/').to_string();
    }

    if let Some(model) = raw.default_model {
        let model = resolve_variables(&model)?;
        if model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "upstream.default_model must not be empty".into(),
            ));
        }
        upstream.default_model = model;
    }

    upstream.idle_timeout = match raw.idle_timeout_ms {
        Some(0) => {
            return Err(ConfigError::Validation(
                "upstream.idle_timeout_ms must be greater than 0".into(),
            ))
        }
        Some(ms) => Some(Duration::from_millis(ms)),
        None => None,
    };

    Ok(upstream)
}

fn build_prompt(raw: Option<raw::RawPromptConfig>) -> Result<PromptTemplate, ConfigError> {
    match raw.and_then(|p| p.system) {
        Some(system) => Ok(PromptTemplate::new(resolve_variables(&system)?)),
        None => Ok(PromptTemplate::default()),
    }
}

fn build_markers(raw: Option<raw::RawMarkers>) -> Result<Markers, ConfigError> {
    let defaults = Markers::default();
    let (open, close) = match raw {
        Some(raw) => (
            raw.open.unwrap_or(defaults.open),
            raw.close.unwrap_or(defaults.close),
        ),
        None => return Ok(defaults),
    };

    if open.is_empty() || close.is_empty() {
        return Err(ConfigError::Validation(
            "markers.open and markers.close must not be empty".into(),
        ));
    }
    if open == close {
        return Err(ConfigError::Validation(format!(
            "markers.open and markers.close must differ, both are \"{open}\""
        )));
    }
    Ok(Markers::new(open, close))
}

fn build_models(raw: Option<raw::RawModelsConfig>) -> Result<ModelsConfig, ConfigError> {
    let Some(command) = raw.and_then(|m| m.command) else {
        return Ok(ModelsConfig::default());
    };

    let command = command
        .iter()
        .map(|part| resolve_variables(part))
        .collect::<Result<Vec<_>, _>>()?;
    if command.first().map_or(true, |program| program.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "models.command must name a program".into(),
        ));
    }
    Ok(ModelsConfig { command })
}
