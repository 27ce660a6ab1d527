// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Reasoning extraction for streamed generations
//
// Responsibilities:
// - Split upstream text deltas into reasoning ("thinking") and answer text
//   using open/close markers, including markers split across deltas
// - Keep per-request state explicit so classification is a pure function
// - Reformat the reasoning buffer into stable paragraphs on every update

mod classifier;
mod reformat;
mod types;

pub use classifier::ThinkingClassifier;
pub use reformat::reformat;
pub use types::{Markers, OutputRecord, RecordKind, StreamState};

#[cfg(test)]
mod tests;
