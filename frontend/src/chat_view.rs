//! Chat pane: optimistic bubbles, the SSE message stream with coalesced
//! markdown repaints, the authoritative transcript re-fetch, and auto-title.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};
use js_sys::{Date, Reflect};
use ragai_console::chat::{should_auto_title, ChatStream, REPAINT_INTERVAL_MS};
use ragai_console::models::{AssistantContent, ChatEvent, ConversationDetail, Message, Role};
use serde_json::{json, Value};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlElement, HtmlInputElement};

use crate::{api, dom, state};

const STATUS_CLEAR_MS: u32 = 3_000;

pub fn init() {
    dom::on_click("chat-send", |_| {
        submit_from_input();
    });

    if let Some(input) = dom::by_id_as::<HtmlInputElement>("chat-input") {
        dom::on_event(&input, "keydown", |event| {
            let Some(key_event) = event.dyn_ref::<web_sys::KeyboardEvent>() else {
                return;
            };
            if key_event.key() == "Enter" && !key_event.shift_key() {
                event.prevent_default();
                submit_from_input();
            }
        });
    }

    // Deep link: ?conversation=<id> restores the transcript on load.
    if let Some(id) = conversation_id_from_url() {
        load_conversation(&id, false);
    }
}

fn submit_from_input() {
    let text = dom::input_value("chat-input");
    let text = text.trim().to_string();
    if text.is_empty() {
        return;
    }
    dom::set_input_value("chat-input", "");
    send_message(text);
}

fn conversation_id_from_url() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    let query = search.strip_prefix('?').unwrap_or(&search);
    for pair in query.split('&') {
        if let Some(id) = pair.strip_prefix("conversation=") {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

fn set_url_conversation(id: Option<&str>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(history) = window.history() else {
        return;
    };
    let url = match id {
        Some(id) => format!("?conversation={id}"),
        None => window
            .location()
            .pathname()
            .unwrap_or_else(|_| "/".to_string()),
    };
    let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&url));
}

fn announce_conversations_changed() {
    let Some(document) = dom::web_document() else {
        return;
    };
    if let Ok(event) = web_sys::Event::new("conversation:changed") {
        let _ = document.dispatch_event(&event);
    }
}

/// Transient status line under the composer, auto-cleared after ~3 s.
fn flash_chat_status(message: &str) {
    dom::set_text("chat-status", message);
    Timeout::new(STATUS_CLEAR_MS, || {
        dom::set_text("chat-status", "");
    })
    .forget();
}

pub fn start_new_conversation() {
    state::close_chat_stream();
    state::CURRENT_CONVERSATION.with(|current| *current.borrow_mut() = None);
    dom::set_html("chat-messages", "");
    dom::set_text("chat-status", "");
    set_url_conversation(None);
}

/// Loading a conversation cancels any in-flight stream and renders the
/// server-authoritative transcript.
pub fn load_conversation(id: &str, update_url: bool) {
    state::close_chat_stream();
    state::CURRENT_CONVERSATION.with(|current| *current.borrow_mut() = Some(id.to_string()));
    if update_url {
        set_url_conversation(Some(id));
    }

    let id = id.to_string();
    spawn_local(async move {
        match api::get_json::<ConversationDetail>(&format!("/api/chat/{id}")).await {
            Ok(detail) => {
                render_transcript(&detail.messages);
                maybe_auto_title(&detail);
            }
            Err(err) => flash_chat_status(&err.to_string()),
        }
    });
}

pub fn conversation_deleted(id: &str) {
    let was_current = state::CURRENT_CONVERSATION
        .with(|current| current.borrow().as_deref() == Some(id));
    if was_current {
        start_new_conversation();
    }
}

pub fn send_message(text: String) {
    spawn_local(async move {
        let conversation_id = match ensure_conversation().await {
            Ok(id) => id,
            Err(err) => {
                flash_chat_status(&err.to_string());
                return;
            }
        };

        append_user_bubble(&text);
        let Some((status_node, content_node)) = append_assistant_shell() else {
            return;
        };
        status_node.set_text_content(Some("Sending…"));

        stream_message(conversation_id, text, status_node, content_node);
    });
}

async fn ensure_conversation() -> Result<String, api::ApiError> {
    let existing = state::CURRENT_CONVERSATION.with(|current| current.borrow().clone());
    if let Some(id) = existing {
        return Ok(id);
    }

    let started = api::post_empty::<Value>("/api/chat/start").await?;
    let id = started
        .get("conversation_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state::CURRENT_CONVERSATION.with(|current| *current.borrow_mut() = Some(id.clone()));
    set_url_conversation(Some(&id));
    announce_conversations_changed();
    Ok(id)
}

fn stream_message(
    conversation_id: String,
    text: String,
    status_node: Element,
    content_node: Element,
) {
    let stream = Rc::new(RefCell::new(ChatStream::new()));
    let repaint: Rc<RefCell<Option<Interval>>> = Rc::new(RefCell::new(None));

    // Coalesced repaint: one paint per interval while tokens arrive.
    {
        let stream = stream.clone();
        let content_node = content_node.clone();
        let interval = Interval::new(REPAINT_INTERVAL_MS as u32, move || {
            let mut stream = stream.borrow_mut();
            if let Some(markdown) = stream.renderer.poll_paint(Date::now()) {
                content_node.set_inner_html(&render_markdown(markdown));
                drop(stream);
                keep_pinned_to_bottom();
            }
        });
        *repaint.borrow_mut() = Some(interval);
    }

    let on_frame = {
        let stream = stream.clone();
        let status_node = status_node.clone();
        let content_node = content_node.clone();
        let repaint = repaint.clone();
        let conversation_id = conversation_id.clone();
        let warned = Rc::new(std::cell::Cell::new(false));

        move |frame: ragai_console::sse::SseFrame| {
            let event: ChatEvent = match frame.json() {
                Ok(event) => event,
                Err(_) => {
                    if !warned.replace(true) {
                        web_sys::console::warn_1(&JsValue::from_str(
                            "chat stream: skipped malformed event",
                        ));
                    }
                    return;
                }
            };

            let mut stream_ref = stream.borrow_mut();
            stream_ref.apply(&event);

            match event {
                ChatEvent::Status { .. } => {
                    status_node.set_text_content(Some(&stream_ref.status_message));
                }
                ChatEvent::Token { .. } => {}
                ChatEvent::Done {} => {
                    let markdown = stream_ref.renderer.flush().to_string();
                    drop(stream_ref);
                    content_node.set_inner_html(&render_markdown(&markdown));
                    status_node.set_text_content(None);
                    if let Some(interval) = repaint.borrow_mut().take() {
                        interval.cancel();
                    }
                    state::close_chat_stream();
                    keep_pinned_to_bottom();
                    refetch_after_done(conversation_id.clone());
                }
            }
        }
    };

    let on_end = {
        let stream = stream.clone();
        let status_node = status_node.clone();
        let content_node = content_node.clone();
        let repaint = repaint.clone();

        move |error: Option<api::ApiError>| {
            if let Some(interval) = repaint.borrow_mut().take() {
                interval.cancel();
            }
            let mut stream_ref = stream.borrow_mut();
            if stream_ref.done {
                return;
            }
            // Stream ended without `done`: final repaint, then surface the
            // failure on the shell.
            let markdown = stream_ref.renderer.flush().to_string();
            drop(stream_ref);
            if !markdown.is_empty() {
                content_node.set_inner_html(&render_markdown(&markdown));
            }
            let message = match error {
                Some(err) => format!("Response interrupted: {err}"),
                None => "Response ended unexpectedly".to_string(),
            };
            status_node.set_text_content(Some(&message));
        }
    };

    // Close any stream a previous send left open before starting the next.
    state::close_chat_stream();
    let handle = api::sse_open(
        &format!("/api/chat/{conversation_id}/message"),
        api::SseRequest::PostJson(json!({ "text": text })),
        on_frame,
        on_end,
    );
    state::CHAT_STREAM.with(|slot| *slot.borrow_mut() = Some(handle));
}

/// After `done`, the transcript is re-fetched so the optimistic bubble is
/// replaced by the server's copy (citations, pipeline payload) without a
/// scroll jump.
fn refetch_after_done(conversation_id: String) {
    spawn_local(async move {
        let still_current = state::CURRENT_CONVERSATION
            .with(|current| current.borrow().as_deref() == Some(conversation_id.as_str()));
        if !still_current {
            return;
        }
        match api::get_json::<ConversationDetail>(&format!("/api/chat/{conversation_id}")).await {
            Ok(detail) => {
                render_transcript(&detail.messages);
                maybe_auto_title(&detail);
            }
            Err(_) => {
                // The streamed content already renders; the refetch is an
                // enrichment pass and may fail quietly.
            }
        }
    });
}

fn maybe_auto_title(detail: &ConversationDetail) {
    if !should_auto_title(&detail.conversation, &detail.messages) {
        return;
    }
    let claimed = state::TITLE_GATE
        .with(|gate| gate.borrow_mut().try_claim(&detail.conversation.id));
    if !claimed {
        return;
    }

    let id = detail.conversation.id.clone();
    spawn_local(async move {
        // Best-effort: failures stay silent, success refreshes the sidebar.
        if api::post_empty::<Value>(&format!("/api/chat/{id}/title/auto"))
            .await
            .is_ok()
        {
            announce_conversations_changed();
        }
    });
}

fn append_user_bubble(text: &str) {
    let Some(list) = dom::by_id("chat-messages") else {
        return;
    };
    let Some(bubble) = dom::create("div") else {
        return;
    };
    bubble.set_class_name("message user");

    if let Some(role) = dom::create("div") {
        role.set_class_name("role");
        role.set_text_content(Some("You"));
        let _ = bubble.append_child(&role);
    }
    if let Some(content) = dom::create("div") {
        content.set_class_name("content");
        content.set_text_content(Some(text));
        let _ = bubble.append_child(&content);
    }
    let _ = list.append_child(&bubble);
    dom::scroll_to_bottom("chat-messages");
}

/// Assistant shell: a status line that streams stage updates and an empty
/// content node the renderer paints into.
fn append_assistant_shell() -> Option<(Element, Element)> {
    let list = dom::by_id("chat-messages")?;
    let bubble = dom::create("div")?;
    bubble.set_class_name("message assistant");

    if let Some(role) = dom::create("div") {
        role.set_class_name("role");
        role.set_text_content(Some("Assistant"));
        let _ = bubble.append_child(&role);
    }

    let status = dom::create("div")?;
    status.set_class_name("stream-status");
    let _ = bubble.append_child(&status);

    let content = dom::create("div")?;
    content.set_class_name("content");
    let _ = bubble.append_child(&content);

    let _ = list.append_child(&bubble);
    dom::scroll_to_bottom("chat-messages");
    Some((status, content))
}

fn render_transcript(messages: &[Message]) {
    let Some(list) = dom::by_id_as::<HtmlElement>("chat-messages") else {
        return;
    };

    // Preserve the reading position across the authoritative re-render:
    // pinned-to-bottom stays pinned, anywhere else is restored exactly.
    let previous_top = list.scroll_top();
    let pinned = list.scroll_top() + list.client_height() >= list.scroll_height() - 4;

    list.set_inner_html("");
    for message in messages {
        match message.role {
            Role::User => append_user_bubble(&message.text()),
            Role::Assistant => append_assistant_message(message),
        }
    }

    if pinned {
        list.set_scroll_top(list.scroll_height());
    } else {
        list.set_scroll_top(previous_top);
    }
}

fn append_assistant_message(message: &Message) {
    let Some(list) = dom::by_id("chat-messages") else {
        return;
    };
    let Some(bubble) = dom::create("div") else {
        return;
    };
    bubble.set_class_name("message assistant");

    if let Some(role) = dom::create("div") {
        role.set_class_name("role");
        role.set_text_content(Some("Assistant"));
        let _ = bubble.append_child(&role);
    }

    let content_payload = message.assistant_content().unwrap_or(AssistantContent {
        text: message.text(),
        ..AssistantContent::default()
    });

    if let Some(content) = dom::create("div") {
        content.set_class_name("content");
        content.set_inner_html(&render_markdown(&content_payload.text));
        let _ = bubble.append_child(&content);
    }

    if !content_payload.citations.is_empty() {
        if let Some(citations) = dom::create("div") {
            citations.set_class_name("citations");
            let mut html = String::from("<span class=\"citations-label\">Sources</span><ul>");
            for citation in &content_payload.citations {
                let title = if citation.title.trim().is_empty() {
                    citation.url.as_str()
                } else {
                    citation.title.as_str()
                };
                html.push_str(&format!(
                    "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></li>",
                    dom::escape_html(&citation.url),
                    dom::escape_html(title),
                ));
            }
            html.push_str("</ul>");
            citations.set_inner_html(&html);
            let _ = bubble.append_child(&citations);
        }
    }

    if let Value::Object(stages) = &content_payload.pipeline {
        if !stages.is_empty() {
            if let Some(details) = dom::create("details") {
                details.set_class_name("pipeline-trace");
                let mut html = String::from("<summary>Pipeline</summary><dl>");
                for (stage, payload) in stages {
                    html.push_str(&format!(
                        "<dt>{}</dt><dd>{}</dd>",
                        dom::escape_html(stage),
                        dom::escape_html(&compact_json(payload)),
                    ));
                }
                html.push_str("</dl>");
                details.set_inner_html(&html);
                let _ = bubble.append_child(&details);
            }
        }
    }

    let _ = list.append_child(&bubble);
}

fn compact_json(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > 400 {
        let truncated: String = text.chars().take(400).collect();
        format!("{truncated}…")
    } else {
        text
    }
}

fn keep_pinned_to_bottom() {
    dom::scroll_to_bottom("chat-messages");
}

/// Markdown is best-effort: the shell may provide a `marked` global; when
/// it does not, escaped text with line breaks is rendered instead.
fn render_markdown(text: &str) -> String {
    if let Some(window) = web_sys::window() {
        if let Ok(marked) = Reflect::get(&window, &JsValue::from_str("marked")) {
            if !marked.is_undefined() && !marked.is_null() {
                if let Ok(parse) = Reflect::get(&marked, &JsValue::from_str("parse")) {
                    if let Some(function) = parse.dyn_ref::<js_sys::Function>() {
                        if let Ok(result) = function.call1(&marked, &JsValue::from_str(text)) {
                            if let Some(html) = result.as_string() {
                                return html;
                            }
                        }
                    }
                }
            }
        }
    }
    dom::escape_html(text).replace('\n', "<br>")
}
