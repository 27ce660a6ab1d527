// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

use std::sync::LazyLock;

use regex::Regex;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern is valid"));

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.|-|\+|\*)\s").expect("list item pattern is valid"));

/// Normalize reasoning text into paragraphs separated by one blank line.
///
/// Paragraphs that look like list items, fenced code, or block quotes keep
/// their internal line breaks. Everything else is collapsed onto one line.
/// Running the output through `reformat` again returns it unchanged.
pub fn reformat(text: &str) -> String {
    PARAGRAPH_BREAK
        .split(text)
        .filter_map(|para| {
            let formatted = if is_structured(para) {
                para.trim().to_string()
            } else {
                para.replace('\n', " ").trim().to_string()
            };
            (!formatted.is_empty()).then_some(formatted)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_structured(para: &str) -> bool {
    let trimmed = para.trim();
    LIST_ITEM.is_match(para) || trimmed.starts_with("```") || trimmed.starts_with('>')
}
