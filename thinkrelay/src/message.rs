// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Client-facing request types and prompt assembly.
//
// `ChatRequest` is what the UI posts to `/chat`. The relay turns it into a
// single upstream prompt using `PromptTemplate`, and carries the sampling
// parameters over as upstream options.

use serde::{Deserialize, Serialize};

use crate::upstream::{GenerateOptions, GenerateRequest};

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A prior turn supplied by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Reasoning shown for an assistant turn. Never replayed upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            thinking: None,
        }
    }
}

/// Body of `POST /chat`. Immutable once dispatched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub previous_messages: Option<Vec<Message>>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sampling options, or `None` when the client set none of them.
    pub fn options(&self) -> Option<GenerateOptions> {
        let options = GenerateOptions {
            temperature: self.temperature,
            num_predict: self.max_tokens,
            top_p: self.top_p,
        };
        (!options.is_empty()).then_some(options)
    }

    /// Build the upstream request. Empty or missing model names fall back to
    /// `default_model`; other names are passed through uninterpreted.
    pub fn to_generate_request(
        &self,
        template: &PromptTemplate,
        default_model: &str,
    ) -> GenerateRequest {
        let model = self
            .model_name
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default_model)
            .to_string();

        GenerateRequest {
            model,
            prompt: template.render(self),
            stream: true,
            options: self.options(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt template
// ---------------------------------------------------------------------------

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Fixed layout for the upstream prompt: system line, context, optional
/// conversation so far, then the user's prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    pub fn render(&self, request: &ChatRequest) -> String {
        let mut out = String::new();
        out.push_str(&self.system);
        out.push_str("\n\nContext:\n");
        out.push_str(request.context.as_deref().unwrap_or(""));
        out.push_str("\n\n");

        let history = request.previous_messages.as_deref().unwrap_or(&[]);
        if !history.is_empty() {
            out.push_str("Conversation so far:\n");
            for message in history {
                let speaker = match message.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                out.push_str(speaker);
                out.push_str(": ");
                out.push_str(&message.content);
                out.push('\n');
            }
            out.push('\n');
        }

        out.push_str("User's prompt:\n");
        out.push_str(&request.prompt);
        out
    }
}
