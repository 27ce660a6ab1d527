// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Tests for reasoning extraction and paragraph reformatting
//
// Covers:
//  1. Marker-free streams concatenate into the response buffer
//  2. Reasoning text between markers survives any chunking
//  3. Markers split across fragments
//  4. Close transition replaces the response buffer with trimmed trailing text
//  5. Open-question policies (both markers in one fragment, orphaned close)
//  6. Empty fragments and marker-only fragments
//  7. Partial markers held out of snapshots until settled
//  8. Reformatter paragraphs, structured blocks, idempotence

use super::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Feed fragments through a default classifier, returning the final state and
/// every record emitted along the way.
fn run(fragments: &[&str]) -> (StreamState, Vec<OutputRecord>) {
    let classifier = ThinkingClassifier::default();
    let mut state = StreamState::default();
    let mut all = Vec::new();
    for fragment in fragments {
        let (next, records) = classifier.classify(state, fragment);
        state = next;
        all.extend(records);
    }
    (state, all)
}

/// Split `text` into pieces of `size` characters.
fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|c| c.iter().collect::<String>())
        .collect()
}

// ---------------------------------------------------------------------------
// Test 1: marker-free streams
// ---------------------------------------------------------------------------

#[test]
fn marker_free_fragments_concatenate_into_response() {
    let fragments = ["Hello", ", ", "world\n\n", "  second   line", "<", "thin", "g>"];
    let (state, records) = run(&fragments);

    assert!(!state.is_thinking);
    assert_eq!(state.response_buffer, fragments.concat());
    assert!(state.thinking_buffer.is_empty());
    assert_eq!(records.len(), fragments.len());
    assert!(records.iter().all(|r| r.kind == RecordKind::Response));

    for (record, fragment) in records.iter().zip(fragments) {
        assert_eq!(record.delta, fragment);
    }
    assert_eq!(records[0].buffer, "Hello");
    assert_eq!(records[3].buffer, "Hello, world\n\n  second   line");
    // "<" and "<thin" could still become an open marker.
    assert_eq!(records[4].buffer, records[3].buffer);
    assert_eq!(records[5].buffer, records[3].buffer);
    assert_eq!(records[6].buffer, fragments.concat());
}

#[test]
fn response_buffer_is_not_reformatted() {
    let (state, _) = run(&["line one\nline two\n\n\n- a\n- b"]);
    assert_eq!(state.response_buffer, "line one\nline two\n\n\n- a\n- b");
}

// ---------------------------------------------------------------------------
// Test 2: reasoning text survives arbitrary chunking
// ---------------------------------------------------------------------------

#[test]
fn reasoning_between_markers_is_independent_of_chunking() {
    let text = "<think>step one\nstep two\n\n- point</think>  The answer.  ";
    for size in 1..=text.len() {
        let pieces = chunk_chars(text, size);
        let refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
        let (state, _) = run(&refs);

        assert!(!state.is_thinking, "chunk size {size}");
        assert_eq!(
            state.thinking_buffer, "step one\nstep two\n\n- point",
            "chunk size {size}"
        );
        // Trimming applies to the text that shares a fragment with the close
        // marker; later fragments are appended verbatim.
        assert_eq!(state.response_buffer.trim(), "The answer.", "chunk size {size}");
    }
}

#[test]
fn reasoning_with_multibyte_text_survives_chunking() {
    let text = "<think>größer als 🦀</think>fertig";
    for size in 1..=8 {
        let pieces = chunk_chars(text, size);
        let refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
        let (state, _) = run(&refs);
        assert_eq!(state.thinking_buffer, "größer als 🦀", "chunk size {size}");
        assert_eq!(state.response_buffer, "fertig", "chunk size {size}");
    }
}

// ---------------------------------------------------------------------------
// Test 3: split markers
// ---------------------------------------------------------------------------

#[test]
fn open_marker_split_across_fragments() {
    let (state, records) = run(&["<thi", "nk>plan"]);

    assert!(state.is_thinking);
    assert_eq!(state.thinking_buffer, "plan");
    // The partial marker was appended to the response buffer, then removed.
    assert!(state.response_buffer.is_empty());

    assert_eq!(
        records,
        vec![
            OutputRecord::response("<thi", ""),
            OutputRecord::thinking("nk>plan", "plan"),
        ]
    );
}

#[test]
fn close_marker_split_across_fragments() {
    let (state, records) = run(&["<think>abc</", "thi", "nk>done"]);

    assert!(!state.is_thinking);
    assert_eq!(state.thinking_buffer, "abc");
    assert_eq!(state.response_buffer, "done");

    let thinking: Vec<_> = records
        .iter()
        .filter(|r| r.kind == RecordKind::Thinking)
        .collect();
    assert_eq!(thinking.last().unwrap().buffer, "abc");
}

// ---------------------------------------------------------------------------
// Test 4: close transition
// ---------------------------------------------------------------------------

#[test]
fn two_fragment_reasoning_emits_thinking_then_response() {
    let (state, records) = run(&["<think>a", "b</think>c"]);

    assert_eq!(
        records,
        vec![
            OutputRecord::thinking("<think>a", "a"),
            OutputRecord::thinking("b</think>c", "ab"),
            OutputRecord::response("b</think>c", "c"),
        ]
    );
    assert_eq!(state.response_buffer, "c");
}

#[test]
fn close_replaces_existing_response_buffer_with_trimmed_tail() {
    let (state, _) = run(&["preamble ", "<think>x", "</think>\n\n  Final  \n"]);
    assert_eq!(state.response_buffer, "Final");
}

#[test]
fn text_after_close_keeps_accumulating() {
    let (state, records) = run(&["<think>x</think>", "\n\nHello", " there"]);
    assert_eq!(state.response_buffer, "\n\nHello there");
    assert_eq!(records.last().unwrap().buffer, "\n\nHello there");
}

#[test]
fn close_with_empty_tail_emits_only_thinking() {
    let (_, records) = run(&["<think>x", "</think>"]);
    assert_eq!(
        records,
        vec![
            OutputRecord::thinking("<think>x", "x"),
            OutputRecord::thinking("</think>", "x"),
        ]
    );
}

#[test]
fn text_before_open_marker_in_same_fragment_is_discarded() {
    let (state, _) = run(&["ignored<think>kept"]);
    assert!(state.is_thinking);
    assert!(state.response_buffer.is_empty());
    assert_eq!(state.thinking_buffer, "kept");
}

#[test]
fn second_block_resets_thinking_buffer() {
    let (state, _) = run(&["<think>first</think>answer ", "<think>second"]);
    assert!(state.is_thinking);
    assert_eq!(state.thinking_buffer, "second");
    assert_eq!(state.response_buffer, "answer");
}

// ---------------------------------------------------------------------------
// Test 5: open-question policies
// ---------------------------------------------------------------------------

#[test]
fn both_markers_in_one_fragment_are_applied_in_order() {
    let (state, records) = run(&["<think>quick thought</think> reply"]);

    assert!(!state.is_thinking);
    assert_eq!(state.thinking_buffer, "quick thought");
    assert_eq!(state.response_buffer, "reply");
    assert_eq!(
        records,
        vec![
            OutputRecord::thinking("<think>quick thought</think> reply", "quick thought"),
            OutputRecord::response("<think>quick thought</think> reply", "reply"),
        ]
    );
}

#[test]
fn orphaned_close_marker_is_plain_text() {
    let (state, records) = run(&["no block here</think> still text"]);
    assert!(!state.is_thinking);
    assert_eq!(state.response_buffer, "no block here</think> still text");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RecordKind::Response);
}

#[test]
fn custom_markers_are_honoured() {
    let classifier = ThinkingClassifier::new(Markers::new("[[r]]", "[[/r]]"));
    let (state, _) = classifier.classify(StreamState::default(), "[[r]]why[[/r]]because");
    assert_eq!(state.thinking_buffer, "why");
    assert_eq!(state.response_buffer, "because");
}

// ---------------------------------------------------------------------------
// Test 6: empty and marker-only fragments
// ---------------------------------------------------------------------------

#[test]
fn empty_fragment_produces_no_record() {
    let classifier = ThinkingClassifier::default();
    let start = StreamState {
        is_thinking: true,
        thinking_buffer: "partial".into(),
        response_buffer: String::new(),
    };
    let (state, records) = classifier.classify(start.clone(), "");
    assert!(records.is_empty());
    assert_eq!(state, start);
}

#[test]
fn marker_only_fragment_opens_empty_block() {
    let (state, records) = run(&["<think>"]);
    assert!(state.is_thinking);
    assert!(state.thinking_buffer.is_empty());
    assert_eq!(records, vec![OutputRecord::thinking("<think>", "")]);
}

#[test]
fn repeated_whitespace_fragments_do_not_disturb_state() {
    let (state, _) = run(&["<think>", "\n", "\n", "idea", "\n\n", "</think>", "ok"]);
    assert_eq!(state.thinking_buffer, "\n\nidea\n\n");
    assert_eq!(state.response_buffer, "ok");
}

#[test]
fn thinking_records_carry_reformatted_buffer() {
    let (_, records) = run(&["<think>first\nline", "\n\n1. keep\n2. lines"]);
    assert_eq!(records.last().unwrap().buffer, "first line\n\n1. keep\n2. lines");
}

// ---------------------------------------------------------------------------
// Test 7: partial markers
// ---------------------------------------------------------------------------

#[test]
fn every_record_carries_the_raw_fragment() {
    let fragments = ["pre", "<think>a", "b</think>c", " d"];
    let classifier = ThinkingClassifier::default();
    let mut state = StreamState::default();
    for fragment in fragments {
        let (next, records) = classifier.classify(state, fragment);
        state = next;
        assert!(!records.is_empty(), "fragment {fragment:?}");
        assert!(records.iter().all(|r| r.delta == fragment), "fragment {fragment:?}");
    }
}

#[test]
fn partial_open_marker_never_shown_as_answer() {
    let (_, records) = run(&["Sure. <", "thi", "nk>plan"]);
    assert!(records.iter().all(|r| !r.buffer.contains("<thi")));
    assert_eq!(records[0], OutputRecord::response("Sure. <", "Sure. "));
    assert_eq!(records[1], OutputRecord::response("thi", "Sure. "));
    assert_eq!(records[2], OutputRecord::thinking("nk>plan", "plan"));
}

#[test]
fn held_text_is_released_when_marker_does_not_complete() {
    let (state, records) = run(&["a <", "b"]);
    assert_eq!(records[0].buffer, "a ");
    assert_eq!(records[1].buffer, "a <b");
    assert_eq!(state.response_buffer, "a <b");
}

#[test]
fn partial_close_marker_never_shown_as_reasoning() {
    let (state, records) = run(&["<think>plan</th", "ink>go"]);
    assert_eq!(records[0], OutputRecord::thinking("<think>plan</th", "plan"));
    assert_eq!(records[1], OutputRecord::thinking("ink>go", "plan"));
    assert_eq!(records[2], OutputRecord::response("ink>go", "go"));
    assert_eq!(state.thinking_buffer, "plan");
}

#[test]
fn finish_releases_held_answer_text() {
    let classifier = ThinkingClassifier::default();
    let (state, records) = classifier.classify(StreamState::default(), "x <");
    assert_eq!(records[0].buffer, "x ");
    assert_eq!(
        classifier.finish(&state),
        Some(OutputRecord::response("", "x <"))
    );
}

#[test]
fn finish_releases_held_reasoning_text() {
    let (state, _) = run(&["<think>a <", "/"]);
    assert!(state.is_thinking);
    assert_eq!(
        ThinkingClassifier::default().finish(&state),
        Some(OutputRecord::thinking("", "a </"))
    );
}

#[test]
fn finish_is_silent_when_nothing_is_held() {
    let classifier = ThinkingClassifier::default();
    let (state, _) = run(&["<think>a</think>done"]);
    assert_eq!(classifier.finish(&state), None);
    assert_eq!(classifier.finish(&StreamState::default()), None);
}

// ---------------------------------------------------------------------------
// Test 8: reformatter
// ---------------------------------------------------------------------------

#[test]
fn reformat_collapses_prose_and_keeps_lists() {
    assert_eq!(reformat("a\nb\n\n- item1\nitem2"), "a b\n\n- item1\nitem2");
}

#[test]
fn reformat_keeps_code_fences_and_quotes() {
    let input = "intro\ntext\n\n```rust\nfn main() {}\n```\n\n> quoted\n> more";
    assert_eq!(
        reformat(input),
        "intro text\n\n```rust\nfn main() {}\n```\n\n> quoted\n> more"
    );
}

#[test]
fn reformat_recognises_all_list_markers() {
    for marker in ["1.", "12.", "-", "+", "*"] {
        let input = format!("{marker} one\ntwo");
        assert_eq!(reformat(&input), input, "marker {marker}");
    }
}

#[test]
fn reformat_drops_empty_paragraphs() {
    assert_eq!(reformat("\n\n  \n\nalpha\n \n\n\t\n\nbeta\n\n"), "alpha\n\nbeta");
    assert_eq!(reformat(""), "");
    assert_eq!(reformat("\n\n\n"), "");
}

#[test]
fn reformat_is_idempotent() {
    let samples = [
        "a\nb\n\n- item1\nitem2",
        "  leading\nspace\n \n\n  - indented list\nnext",
        "```\ncode\n\nmore code\n```",
        "> quote\n\n\n\n3. three\nlines\n\nplain\r\ntext",
        "-\nbare dash\n\n*",
        "one paragraph only",
        "\n\n\n",
    ];
    for sample in samples {
        let once = reformat(sample);
        assert_eq!(reformat(&once), once, "input {sample:?}");
    }
}
