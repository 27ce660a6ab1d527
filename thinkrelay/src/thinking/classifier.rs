// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Thinking-extraction state machine
//
// Each call consumes one text fragment in delivery order and returns the
// updated state plus zero or more output records, each carrying the raw
// fragment. Transitions inside one fragment are handled in the order they
// appear, so a fragment carrying both markers opens and closes a block. A
// close marker seen outside a block is plain answer text.
//
// Buffer snapshots leave out a trailing partial marker until the next
// fragment settles it; `finish` releases whatever is still held at the end.

use super::reformat::reformat;
use super::types::{Markers, OutputRecord, StreamState};

/// Classifies upstream fragments into reasoning and answer text.
#[derive(Debug, Clone, Default)]
pub struct ThinkingClassifier {
    markers: Markers,
}

impl ThinkingClassifier {
    pub fn new(markers: Markers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Classify one fragment.
    ///
    /// An empty fragment (metadata-only upstream event) yields no records and
    /// leaves the state untouched.
    pub fn classify(
        &self,
        mut state: StreamState,
        fragment: &str,
    ) -> (StreamState, Vec<OutputRecord>) {
        let mut records = Vec::new();
        if fragment.is_empty() {
            return (state, records);
        }

        let mut rest = fragment;
        // Set once a block closes within this fragment: the text that follows
        // replaces the response buffer instead of extending it.
        let mut fresh_response = false;

        loop {
            if state.is_thinking {
                let Some(hit) = locate(&state.thinking_buffer, rest, &self.markers.close) else {
                    state.thinking_buffer.push_str(rest);
                    let shown = settled(&state.thinking_buffer, &self.markers.close);
                    records.push(OutputRecord::thinking(fragment, reformat(shown)));
                    break;
                };

                let kept = state.thinking_buffer.len() - hit.carried;
                state.thinking_buffer.truncate(kept);
                state.thinking_buffer.push_str(&rest[..hit.before]);
                state.is_thinking = false;
                records.push(OutputRecord::thinking(
                    fragment,
                    reformat(&state.thinking_buffer),
                ));

                rest = &rest[hit.after..];
                fresh_response = true;
            } else {
                let prior = if fresh_response {
                    ""
                } else {
                    state.response_buffer.as_str()
                };

                let Some(hit) = locate(prior, rest, &self.markers.open) else {
                    if fresh_response {
                        state.response_buffer = rest.trim().to_string();
                        if !state.response_buffer.is_empty() {
                            let shown = settled(&state.response_buffer, &self.markers.open);
                            records.push(OutputRecord::response(fragment, shown));
                        }
                    } else if !rest.is_empty() {
                        state.response_buffer.push_str(rest);
                        let shown = settled(&state.response_buffer, &self.markers.open);
                        records.push(OutputRecord::response(fragment, shown));
                    }
                    break;
                };

                if fresh_response {
                    let between = rest[..hit.before].trim();
                    state.response_buffer = between.to_string();
                    if !between.is_empty() {
                        records.push(OutputRecord::response(fragment, between));
                    }
                } else {
                    // Text preceding the open marker in this fragment is dropped;
                    // only a partial marker already appended needs undoing.
                    let kept = state.response_buffer.len() - hit.carried;
                    state.response_buffer.truncate(kept);
                }

                state.is_thinking = true;
                state.thinking_buffer.clear();
                rest = &rest[hit.after..];
                fresh_response = false;
            }
        }

        (state, records)
    }

    /// Release text held back as a possible partial marker once the upstream
    /// has ended. Returns `None` when the last snapshot was already complete.
    pub fn finish(&self, state: &StreamState) -> Option<OutputRecord> {
        if state.is_thinking {
            let held = pending_marker_len(&state.thinking_buffer, &self.markers.close);
            (held > 0).then(|| OutputRecord::thinking("", reformat(&state.thinking_buffer)))
        } else {
            let held = pending_marker_len(&state.response_buffer, &self.markers.open);
            (held > 0).then(|| OutputRecord::response("", state.response_buffer.clone()))
        }
    }
}

/// `buffer` without a trailing partial `marker`.
fn settled<'a>(buffer: &'a str, marker: &str) -> &'a str {
    &buffer[..buffer.len() - pending_marker_len(buffer, marker)]
}

/// Length of the longest suffix of `buffer` that is a proper prefix of
/// `marker`.
fn pending_marker_len(buffer: &str, marker: &str) -> usize {
    let tail = marker_tail(buffer, marker);
    tail.char_indices()
        .map(|(offset, _)| &tail[offset..])
        .find(|suffix| marker.starts_with(suffix))
        .map_or(0, str::len)
}

/// The last `marker.len() - 1` bytes of `buffer`, widened to a char boundary.
fn marker_tail<'a>(buffer: &'a str, marker: &str) -> &'a str {
    if marker.is_empty() {
        return "";
    }
    let keep = (marker.len() - 1).min(buffer.len());
    let mut start = buffer.len() - keep;
    while !buffer.is_char_boundary(start) {
        start += 1;
    }
    &buffer[start..]
}

// ---------------------------------------------------------------------------
// Marker search
// ---------------------------------------------------------------------------

/// Where a marker was found relative to the previous buffer and the fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerHit {
    /// Bytes of the marker that were already appended to the prior buffer.
    carried: usize,
    /// End (exclusive) of fragment text preceding the marker.
    before: usize,
    /// Start of fragment text following the marker.
    after: usize,
}

/// Find `marker` in `text`, also matching a marker that started at the end
/// of `prior` and finishes at the start of `text`.
fn locate(prior: &str, text: &str, marker: &str) -> Option<MarkerHit> {
    if marker.is_empty() {
        return None;
    }

    let tail = marker_tail(prior, marker);
    for (offset, _) in tail.char_indices() {
        let carried = &tail[offset..];
        if marker.starts_with(carried) && text.starts_with(&marker[carried.len()..]) {
            return Some(MarkerHit {
                carried: carried.len(),
                before: 0,
                after: marker.len() - carried.len(),
            });
        }
    }

    text.find(marker).map(|pos| MarkerHit {
        carried: 0,
        before: pos,
        after: pos + marker.len(),
    })
}
