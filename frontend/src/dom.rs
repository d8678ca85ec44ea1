//! Defensive DOM helpers. Every lookup tolerates a missing node: the admin
//! shell renders panes lazily, so a helper called against an absent id is a
//! no-op rather than a panic.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

pub fn web_document() -> Option<Document> {
    web_sys::window().and_then(|window| window.document())
}

pub fn by_id(id: &str) -> Option<Element> {
    web_document().and_then(|doc| doc.get_element_by_id(id))
}

pub fn by_id_as<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|node| node.dyn_into::<T>().ok())
}

pub fn set_text(id: &str, value: impl AsRef<str>) {
    let Some(node) = by_id(id) else {
        return;
    };
    let next = value.as_ref();
    if node.text_content().as_deref() == Some(next) {
        return;
    }
    node.set_text_content(Some(next));
}

pub fn set_class(id: &str, class_name: &str) {
    let Some(node) = by_id(id) else {
        return;
    };
    node.set_class_name(class_name);
}

pub fn set_html(id: &str, html: &str) {
    let Some(node) = by_id(id) else {
        return;
    };
    node.set_inner_html(html);
}

pub fn set_display(id: &str, display: &str) {
    let Some(node) = by_id_as::<HtmlElement>(id) else {
        return;
    };
    let _ = node.style().set_property("display", display);
}

pub fn show(id: &str) {
    set_display(id, "block");
}

pub fn hide(id: &str) {
    set_display(id, "none");
}

pub fn input_value(id: &str) -> String {
    by_id_as::<HtmlInputElement>(id)
        .map(|input| input.value())
        .unwrap_or_default()
}

pub fn set_input_value(id: &str, value: &str) {
    if let Some(input) = by_id_as::<HtmlInputElement>(id) {
        input.set_value(value);
    }
}

pub fn checkbox_checked(id: &str) -> bool {
    by_id_as::<HtmlInputElement>(id)
        .map(|input| input.checked())
        .unwrap_or(false)
}

pub fn select_value(id: &str) -> String {
    by_id_as::<HtmlSelectElement>(id)
        .map(|select| select.value())
        .unwrap_or_default()
}

pub fn create(tag: &str) -> Option<Element> {
    web_document().and_then(|doc| doc.create_element(tag).ok())
}

pub fn create_as<T: JsCast>(tag: &str) -> Option<T> {
    create(tag).and_then(|node| node.dyn_into::<T>().ok())
}

/// Attach a click handler to an element by id. The closure leaks by design
/// (handlers live for the page lifetime, like the rest of the shell).
pub fn on_click(id: &str, handler: impl FnMut(web_sys::Event) + 'static) {
    let Some(node) = by_id(id) else {
        return;
    };
    let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
    let _ = node.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
    callback.forget();
}

pub fn on_event(
    target: &web_sys::EventTarget,
    kind: &str,
    handler: impl FnMut(web_sys::Event) + 'static,
) {
    let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
    let _ = target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref());
    callback.forget();
}

pub fn scroll_to_bottom(id: &str) {
    if let Some(node) = by_id_as::<HtmlElement>(id) {
        node.set_scroll_top(node.scroll_height());
    }
}

pub fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// Destructive operations require the literal word typed back.
pub fn confirm_destructive(prompt: &str) -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    match window.prompt_with_message(prompt) {
        Ok(Some(answer)) => answer.trim() == "DELETE",
        _ => false,
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
