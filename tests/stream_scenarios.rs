//! Scenario tests driving the streaming models through realistic wire
//! traffic: chat token streams, ingest jobs losing their SSE track, and the
//! crawl log completion signal.

use ragai_console::chat::{should_auto_title, AutoTitleGate, ChatStream};
use ragai_console::ingest::IngestProgress;
use ragai_console::jobs::{line_signals_crawl_complete, CrawlSummary};
use ragai_console::models::{
    ChatEvent, Conversation, IngestEvent, IngestJobSnapshot, Message, Role,
};
use ragai_console::sse::SseDecoder;
use serde_json::json;

fn wire(events: &[serde_json::Value]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for event in events {
        bytes.extend_from_slice(format!("data: {event}\n\n").as_bytes());
    }
    bytes
}

#[test]
fn chat_stream_renders_all_tokens_then_qualifies_for_auto_title() {
    let mut events = vec![json!({"type": "status", "stage": "intent", "message": "Analyzing question"})];
    let tokens = ["He", "llo", " fr", "om", " the", " kn", "owl", "edge", " ba", "se"];
    for token in tokens {
        events.push(json!({"type": "token", "text": token}));
    }
    events.push(json!({"type": "done"}));

    let mut decoder = SseDecoder::new();
    let mut stream = ChatStream::new();
    // Deliver in awkward chunk sizes to exercise the framing.
    for chunk in wire(&events).chunks(7) {
        for frame in decoder.feed(chunk) {
            let event: ChatEvent = frame.json().expect("well-formed chat event");
            stream.apply(&event);
        }
    }

    assert!(stream.done);
    assert!(stream.status_message.is_empty());
    assert_eq!(stream.renderer.flush(), "Hello from the knowledge base");

    // The refetched conversation still carries the placeholder title, so
    // the auto-title request fires, and only once.
    let conversation = Conversation {
        id: "c42".to_string(),
        title: "New Conversation".to_string(),
        updated_at: String::new(),
        auto_titled: false,
    };
    let transcript = vec![
        Message {
            role: Role::User,
            content: json!("Hello"),
            timestamp: String::new(),
        },
        Message {
            role: Role::Assistant,
            content: json!({"text": "Hello from the knowledge base"}),
            timestamp: String::new(),
        },
    ];
    assert!(should_auto_title(&conversation, &transcript));

    let mut gate = AutoTitleGate::new();
    assert!(gate.try_claim(&conversation.id));
    assert!(!gate.try_claim(&conversation.id));
}

#[test]
fn malformed_chat_frame_is_skipped_without_killing_the_stream() {
    let mut decoder = SseDecoder::new();
    let mut stream = ChatStream::new();
    let raw = b"data: {broken\n\ndata: {\"type\":\"token\",\"text\":\"ok\"}\n\n";

    let mut skipped = 0;
    for frame in decoder.feed(raw) {
        match frame.json::<ChatEvent>() {
            Ok(event) => stream.apply(&event),
            Err(_) => skipped += 1,
        }
    }

    assert_eq!(skipped, 1);
    assert_eq!(stream.renderer.flush(), "ok");
}

#[test]
fn ingest_job_finishes_by_polling_after_sse_drops() {
    let mut progress = IngestProgress::new("I1");

    // The stream dies right after the connection handshake.
    progress.apply_event(
        &IngestEvent::Connected {
            job_id: "I1".to_string(),
        },
        0.0,
    );

    // Polling every ~2 s carries the job to completion on its own.
    let mut now = 2_000.0;
    for done in [2_i64, 5, 8] {
        progress.apply_snapshot(
            &IngestJobSnapshot {
                status: "running".to_string(),
                done,
                total: 10,
                ..IngestJobSnapshot::default()
            },
            now,
        );
        now += 2_000.0;
    }
    assert!(!progress.is_terminal());

    progress.apply_snapshot(
        &IngestJobSnapshot {
            status: "done".to_string(),
            done: 10,
            total: 10,
            ..IngestJobSnapshot::default()
        },
        now,
    );

    assert!(progress.is_terminal());
    assert_eq!(progress.status_label(), "Ingest complete");
    assert_eq!(progress.eta_label(), "Complete");
    assert_eq!(progress.percent(), 100.0);
}

#[test]
fn crawl_log_completion_line_leads_to_summary_pills() {
    let mut decoder = SseDecoder::new();
    let lines = decoder.feed(
        b"data: Starting crawl job\n\ndata: Fetched https://x.com/\n\ndata: Crawl job complete.\n\n",
    );

    let completed = lines
        .iter()
        .any(|frame| line_signals_crawl_complete(&frame.data));
    assert!(completed);

    // The deferred summary fetch resolves with the structured payload.
    let summary = CrawlSummary::from_value(&json!({
        "captured": 5,
        "errors": 0,
        "skipped": {"already_processed": 2},
    }));
    assert_eq!(
        summary.pills(),
        vec![("Captured", 5), ("Errors", 0), ("Skipped", 2)]
    );
}
