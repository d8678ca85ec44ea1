//! Browser entrypoint for the RAG admin console. The shell ships static
//! HTML; this binary mounts a leptos runtime marker and then drives the
//! rendered DOM directly, pane by pane.

mod admin;
mod api;
mod chat_view;
mod config_view;
mod dom;
mod health_view;
mod ingest_view;
mod jobs_view;
mod sidebar;
mod state;
mod storage;
mod validation_view;

use leptos::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

#[component]
fn App() -> impl IntoView {
    view! {
        <div
            id="console-runtime-marker"
            data-runtime="ragai-console-frontend"
            style="display:none;"
        ></div>
    }
}

fn main() {
    console_error_panic_hook::set_once();

    if let Some(root) = dom::web_document()
        .and_then(|doc| doc.get_element_by_id("console-runtime-root"))
        .and_then(|node| node.dyn_into::<HtmlElement>().ok())
    {
        mount_to(root, || view! { <App /> });
    } else {
        mount_to_body(|| view! { <App /> });
    }

    sidebar::init();
    chat_view::init();
    admin::init();
    config_view::init();
    jobs_view::init();
    ingest_view::init();
    validation_view::init();
    health_view::init();
}
