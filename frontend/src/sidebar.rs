//! Conversation sidebar: list, live-drag resize with persisted width,
//! collapse toggle, and rename/delete/export row actions.

use std::cell::Cell;
use std::rc::Rc;

use ragai_console::models::Conversation;
use ragai_console::prefs;
use serde_json::{json, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlElement, MouseEvent};

use crate::{api, chat_view, dom, storage};

pub fn init() {
    apply_stored_layout();
    init_resize_drag();

    dom::on_click("sidebar-collapse", |_| {
        let collapsed =
            !prefs::flag_from_storage(storage::get(prefs::KEY_SIDEBAR_COLLAPSED).as_deref());
        storage::set_flag(prefs::KEY_SIDEBAR_COLLAPSED, collapsed);
        apply_stored_layout();
    });

    dom::on_click("new-conversation", |_| {
        chat_view::start_new_conversation();
    });

    // Views announce transcript changes through a DOM event so the list
    // refreshes without direct coupling.
    if let Some(document) = dom::web_document() {
        dom::on_event(&document, "conversation:changed", |_| {
            refresh_conversations();
        });
    }

    refresh_conversations();
}

fn apply_stored_layout() {
    let collapsed = prefs::flag_from_storage(storage::get(prefs::KEY_SIDEBAR_COLLAPSED).as_deref());
    let width = if collapsed {
        prefs::SIDEBAR_COLLAPSED_WIDTH
    } else {
        prefs::sidebar_width_from_storage(storage::get(prefs::KEY_SIDEBAR_WIDTH).as_deref())
    };

    let Some(sidebar) = dom::by_id_as::<HtmlElement>("sidebar") else {
        return;
    };
    let _ = sidebar.style().set_property("width", &format!("{width}px"));
    let classes = sidebar.class_list();
    if collapsed {
        let _ = classes.add_1("collapsed");
    } else {
        let _ = classes.remove_1("collapsed");
    }
}

/// Window-level drag listeners are installed once; the handle's mousedown
/// arms them. The body carries a `resizing` class during the drag to
/// suppress text selection.
fn init_resize_drag() {
    let dragging = Rc::new(Cell::new(false));

    let Some(handle) = dom::by_id("sidebar-resize-handle") else {
        return;
    };
    {
        let dragging = dragging.clone();
        dom::on_event(&handle, "mousedown", move |event| {
            event.prevent_default();
            dragging.set(true);
            if let Some(body) = dom::web_document().and_then(|doc| doc.body()) {
                let _ = body.class_list().add_1("resizing");
            }
        });
    }

    let Some(window) = web_sys::window() else {
        return;
    };
    {
        let dragging = dragging.clone();
        dom::on_event(&window, "mousemove", move |event| {
            if !dragging.get() {
                return;
            }
            let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let width = prefs::clamp_drag_width(mouse.client_x());
            if let Some(sidebar) = dom::by_id_as::<HtmlElement>("sidebar") {
                let _ = sidebar.style().set_property("width", &format!("{width}px"));
            }
        });
    }
    {
        let dragging = dragging.clone();
        dom::on_event(&window, "mouseup", move |event| {
            if !dragging.get() {
                return;
            }
            dragging.set(false);
            if let Some(body) = dom::web_document().and_then(|doc| doc.body()) {
                let _ = body.class_list().remove_1("resizing");
            }
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                let width = prefs::clamp_drag_width(mouse.client_x());
                storage::set(prefs::KEY_SIDEBAR_WIDTH, &width.to_string());
            }
        });
    }
}

pub fn refresh_conversations() {
    spawn_local(async move {
        match api::get_json::<Vec<Conversation>>("/api/chat/list").await {
            Ok(conversations) => render_conversations(&conversations),
            Err(err) => {
                dom::set_text("conversation-list-status", &err.to_string());
            }
        }
    });
}

fn render_conversations(conversations: &[Conversation]) {
    let Some(list) = dom::by_id("conversation-list") else {
        return;
    };
    list.set_inner_html("");
    dom::set_text("conversation-list-status", "");

    if conversations.is_empty() {
        if let Some(empty) = dom::create("li") {
            empty.set_class_name("conversation-empty");
            empty.set_text_content(Some("No conversations yet"));
            let _ = list.append_child(&empty);
        }
        return;
    }

    for conversation in conversations {
        let Some(item) = dom::create("li") else {
            continue;
        };
        item.set_class_name("conversation-row");

        let title = if conversation.title.trim().is_empty() {
            "Untitled"
        } else {
            conversation.title.as_str()
        };

        if let Some(label) = dom::create_as::<HtmlElement>("span") {
            label.set_class_name("conversation-title");
            label.set_text_content(Some(title));
            let _ = label.set_attribute("title", &conversation.updated_at);
            let id = conversation.id.clone();
            dom::on_event(&label, "click", move |_| {
                chat_view::load_conversation(&id, true);
            });
            let _ = item.append_child(&label);
        }

        if let Some(rename) = dom::create_as::<HtmlElement>("button") {
            rename.set_class_name("conversation-action");
            rename.set_text_content(Some("✎"));
            let id = conversation.id.clone();
            let current = conversation.title.clone();
            dom::on_event(&rename, "click", move |event| {
                event.stop_propagation();
                rename_conversation(&id, &current);
            });
            let _ = item.append_child(&rename);
        }

        if let Some(export) = dom::create_as::<HtmlElement>("button") {
            export.set_class_name("conversation-action");
            export.set_text_content(Some("⭳"));
            let id = conversation.id.clone();
            dom::on_event(&export, "click", move |event| {
                event.stop_propagation();
                let id = id.clone();
                spawn_local(async move {
                    let path = format!("/api/chat/{id}/export");
                    let fallback = format!("conversation-{id}.json");
                    if let Err(err) = api::download(&path, &fallback).await {
                        dom::set_text("conversation-list-status", &err.to_string());
                    }
                });
            });
            let _ = item.append_child(&export);
        }

        if let Some(delete) = dom::create_as::<HtmlElement>("button") {
            delete.set_class_name("conversation-action");
            delete.set_text_content(Some("🗑"));
            let id = conversation.id.clone();
            dom::on_event(&delete, "click", move |event| {
                event.stop_propagation();
                delete_conversation(&id);
            });
            let _ = item.append_child(&delete);
        }

        let _ = list.append_child(&item);
    }
}

fn rename_conversation(id: &str, current_title: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(Some(title)) =
        window.prompt_with_message_and_default("Rename conversation", current_title)
    else {
        return;
    };
    let title = title.trim().to_string();
    if title.is_empty() {
        return;
    }

    let id = id.to_string();
    spawn_local(async move {
        match api::put_json::<Value>(&format!("/api/chat/{id}"), &json!({ "title": title })).await {
            Ok(_) => refresh_conversations(),
            Err(err) => dom::set_text("conversation-list-status", &err.to_string()),
        }
    });
}

fn delete_conversation(id: &str) {
    let confirmed = web_sys::window()
        .and_then(|window| window.confirm_with_message("Delete this conversation?").ok())
        .unwrap_or(false);
    if !confirmed {
        return;
    }

    let id = id.to_string();
    spawn_local(async move {
        match api::delete(&format!("/api/chat/{id}")).await {
            Ok(()) => {
                chat_view::conversation_deleted(&id);
                refresh_conversations();
            }
            Err(err) => dom::set_text("conversation-list-status", &err.to_string()),
        }
    });
}
