// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Delimiters that bracket a reasoning block in upstream output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub open: String,
    pub close: String,
}

impl Markers {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new("<think>", "</think>")
    }
}

// ---------------------------------------------------------------------------
// Per-request classifier state
// ---------------------------------------------------------------------------

/// Mutable classification state owned by a single relayed request.
///
/// Both buffers are cumulative: every output record carries the full buffer,
/// never a diff. Only one of them is being appended to at a time; the other
/// keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    /// Whether the classifier is inside a reasoning block.
    pub is_thinking: bool,
    /// Raw reasoning text of the current block. Reset when a new block opens.
    pub thinking_buffer: String,
    /// Answer text emitted so far.
    pub response_buffer: String,
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Thinking,
    Response,
}

/// One classified update, ready for framing.
///
/// Serializes as `{"type": ..., "content": ..., "buffer": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// The upstream fragment exactly as received, markers included.
    #[serde(rename = "content")]
    pub delta: String,
    /// Reformatted thinking buffer, or the verbatim response buffer, less any
    /// trailing partial marker still waiting on the next fragment.
    pub buffer: String,
}

impl OutputRecord {
    pub fn thinking(delta: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Thinking,
            delta: delta.into(),
            buffer: buffer.into(),
        }
    }

    pub fn response(delta: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Response,
            delta: delta.into(),
            buffer: buffer.into(),
        }
    }
}
