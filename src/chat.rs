//! Chat streaming state: token buffering with coalesced repaints, status
//! stage tracking, and the auto-title gate.

use std::collections::HashSet;

use crate::models::{ChatEvent, ChatStage, Conversation, Message, Role, UNTITLED_CONVERSATION};

/// Streaming repaints are coalesced to roughly this interval; the final
/// repaint always happens on `done` or abort.
pub const REPAINT_INTERVAL_MS: f64 = 120.0;

/// Buffers incoming token text and decides when the view should repaint.
/// Timestamps come from the caller so the policy stays clock-free.
#[derive(Debug, Default)]
pub struct StreamRenderer {
    text: String,
    dirty: bool,
    last_paint_ms: Option<f64>,
}

impl StreamRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: &str) {
        self.text.push_str(token);
        self.dirty = true;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the full accumulated text when a repaint is due, marking the
    /// repaint as taken. Coalesces to one paint per interval.
    pub fn poll_paint(&mut self, now_ms: f64) -> Option<&str> {
        if !self.dirty {
            return None;
        }
        if let Some(last) = self.last_paint_ms {
            if now_ms - last < REPAINT_INTERVAL_MS {
                return None;
            }
        }
        self.dirty = false;
        self.last_paint_ms = Some(now_ms);
        Some(&self.text)
    }

    /// Final repaint: always returns the accumulated text and clears the
    /// dirty flag.
    pub fn flush(&mut self) -> &str {
        self.dirty = false;
        &self.text
    }
}

/// State of one in-flight assistant response.
#[derive(Debug, Default)]
pub struct ChatStream {
    pub renderer: StreamRenderer,
    pub stage: Option<ChatStage>,
    pub status_message: String,
    pub done: bool,
}

impl ChatStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::Status { stage, message } => {
                self.stage = Some(*stage);
                self.status_message = if message.is_empty() {
                    stage.as_str().to_string()
                } else {
                    message.clone()
                };
            }
            ChatEvent::Token { text } => {
                self.renderer.push(text);
            }
            ChatEvent::Done {} => {
                self.done = true;
                self.stage = None;
                self.status_message.clear();
            }
        }
    }
}

/// A conversation qualifies for auto-titling when the backend has not named
/// it, it was never auto-titled, and the transcript has at least one user
/// and one assistant message.
pub fn should_auto_title(conversation: &Conversation, messages: &[Message]) -> bool {
    let untitled = conversation.title.trim().is_empty()
        || conversation.title == UNTITLED_CONVERSATION;
    if !untitled || conversation.auto_titled {
        return false;
    }
    let has_user = messages.iter().any(|m| m.role == Role::User);
    let has_assistant = messages.iter().any(|m| m.role == Role::Assistant);
    has_user && has_assistant
}

/// At-most-once-per-page-session tracking for auto-title requests.
#[derive(Debug, Default)]
pub struct AutoTitleGate {
    requested: HashSet<String>,
}

impl AutoTitleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the conversation for titling. False means a request was
    /// already issued this page session.
    pub fn try_claim(&mut self, conversation_id: &str) -> bool {
        self.requested.insert(conversation_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(role: Role, text: &str) -> Message {
        Message {
            role,
            content: json!(text),
            timestamp: String::new(),
        }
    }

    #[test]
    fn every_token_lands_in_the_final_text() {
        let mut stream = ChatStream::new();
        let tokens = ["Hel", "lo", " ", "world", "!"];
        for token in tokens {
            stream.apply(&ChatEvent::Token {
                text: token.to_string(),
            });
        }
        stream.apply(&ChatEvent::Done {});
        assert_eq!(stream.renderer.flush(), "Hello world!");
        assert!(stream.done);
    }

    #[test]
    fn repaints_are_coalesced_to_the_interval() {
        let mut renderer = StreamRenderer::new();
        renderer.push("a");
        // First paint is immediate.
        assert_eq!(renderer.poll_paint(1000.0), Some("a"));

        renderer.push("b");
        assert_eq!(renderer.poll_paint(1050.0), None);
        assert_eq!(renderer.poll_paint(1119.0), None);
        assert_eq!(renderer.poll_paint(1120.0), Some("ab"));

        // Nothing new buffered: no paint due.
        assert_eq!(renderer.poll_paint(2000.0), None);
    }

    #[test]
    fn flush_always_returns_the_full_text() {
        let mut renderer = StreamRenderer::new();
        renderer.push("tail");
        assert_eq!(renderer.flush(), "tail");
        assert_eq!(renderer.poll_paint(9999.0), None);
    }

    #[test]
    fn status_updates_track_stage_and_clear_on_done() {
        let mut stream = ChatStream::new();
        stream.apply(&ChatEvent::Status {
            stage: ChatStage::Research,
            message: "Searching knowledge base".to_string(),
        });
        assert_eq!(stream.stage, Some(ChatStage::Research));
        assert_eq!(stream.status_message, "Searching knowledge base");

        stream.apply(&ChatEvent::Status {
            stage: ChatStage::Synthesis,
            message: String::new(),
        });
        assert_eq!(stream.status_message, "synthesis");

        stream.apply(&ChatEvent::Done {});
        assert!(stream.status_message.is_empty());
        assert!(stream.stage.is_none());
    }

    #[test]
    fn auto_title_requires_untitled_and_both_roles() {
        let mut conversation = Conversation {
            id: "c1".to_string(),
            title: UNTITLED_CONVERSATION.to_string(),
            updated_at: String::new(),
            auto_titled: false,
        };
        let both = vec![
            message(Role::User, "hi"),
            message(Role::Assistant, "hello"),
        ];

        assert!(should_auto_title(&conversation, &both));
        assert!(should_auto_title(
            &Conversation {
                title: String::new(),
                ..conversation.clone()
            },
            &both
        ));

        assert!(!should_auto_title(
            &conversation,
            &[message(Role::User, "hi")]
        ));

        conversation.auto_titled = true;
        assert!(!should_auto_title(&conversation, &both));

        conversation.auto_titled = false;
        conversation.title = "Named already".to_string();
        assert!(!should_auto_title(&conversation, &both));
    }

    #[test]
    fn title_gate_claims_each_conversation_once_per_session() {
        let mut gate = AutoTitleGate::new();
        assert!(gate.try_claim("c1"));
        assert!(!gate.try_claim("c1"));
        assert!(gate.try_claim("c2"));
    }
}
