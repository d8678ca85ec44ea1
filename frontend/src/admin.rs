//! Admin gate: token unlock, the session reset that tears down every live
//! stream, and the destructive reset endpoints (typed-DELETE confirmation).

use ragai_console::jobs::LogChannel;
use ragai_console::prefs;
use serde_json::{json, Value};
use wasm_bindgen_futures::spawn_local;

use crate::{api, config_view, dom, health_view, ingest_view, jobs_view, sidebar, state, storage,
    validation_view};

/// Sticky banner for network-level failures.
pub fn show_banner(message: &str) {
    dom::set_text("global-banner", message);
    dom::show("global-banner");
}

pub fn clear_banner() {
    dom::set_text("global-banner", "");
    dom::hide("global-banner");
}

pub fn is_unlocked() -> bool {
    prefs::flag_from_storage(storage::get(prefs::KEY_ADMIN_UNLOCKED).as_deref())
}

pub fn init() {
    dom::on_click("admin-unlock", |_| {
        let token = dom::input_value("admin-token");
        if token.trim().is_empty() {
            dom::set_text("admin-status", "Enter an admin token");
            return;
        }
        dom::set_text("admin-status", "Checking…");
        spawn_local(async move {
            match api::post_json::<Value>("/api/admin/unlock", &json!({ "token": token.trim() }))
                .await
            {
                Ok(_) => {
                    storage::set_flag(prefs::KEY_ADMIN_UNLOCKED, true);
                    dom::set_text("admin-status", "");
                    dom::set_input_value("admin-token", "");
                    enter_admin_ui();
                }
                Err(api::ApiError::Status { status: 403, .. }) => {
                    dom::set_text("admin-status", "Invalid token");
                }
                Err(err) => {
                    dom::set_text("admin-status", &err.to_string());
                }
            }
        });
    });

    dom::on_click("admin-lock", |_| {
        storage::set_flag(prefs::KEY_ADMIN_UNLOCKED, false);
        reset_admin_session();
        dom::hide("admin-panels");
        dom::show("admin-gate");
    });

    dom::on_click("admin-refresh", |_| {
        reload_admin_data();
    });

    init_reset_buttons();

    if is_unlocked() {
        enter_admin_ui();
    } else {
        dom::show("admin-gate");
        dom::hide("admin-panels");
    }
}

fn enter_admin_ui() {
    dom::hide("admin-gate");
    dom::show("admin-panels");
    clear_banner();
    reload_admin_data();
    ingest_view::start_worker_poll();
}

/// Re-fetch everything the admin workspace renders. Each loader degrades
/// independently; one failing endpoint does not invalidate the rest.
pub fn reload_admin_data() {
    config_view::reload_all();
    jobs_view::refresh_jobs();
    validation_view::load_crawl_summary();
    validation_view::load_ingest_summary();
    health_view::refresh();
    sidebar::refresh_conversations();
}

/// Close all three log channels, zero current-job references, stop the
/// pollers, and clear the panes and status regions.
pub fn reset_admin_session() {
    state::close_all_log_streams();
    ingest_view::stop_tracking();
    state::stop_worker_poll();
    state::CURRENT_CRAWL_JOB.with(|job| *job.borrow_mut() = None);
    state::CURRENT_INGEST_JOB.with(|job| *job.borrow_mut() = None);

    for channel in LogChannel::ALL {
        dom::set_text(&format!("log-pane-{}", channel.as_str()), "");
    }
    dom::set_text("crawl-summary-pills", "");
    dom::set_html("crawl-summary-detail", "");
    dom::set_text("ingest-status-line", "");
    dom::set_text("jobs-status", "");
}

fn init_reset_buttons() {
    let targets: [(&str, &str, &str); 4] = [
        ("reset-artifacts", "/api/admin/reset/artifacts", "crawled artifacts"),
        ("reset-qdrant", "/api/admin/reset/qdrant", "the vector store"),
        ("reset-all", "/api/admin/reset/all", "ALL pipeline data"),
        ("reset-ingest", "/api/admin/reset_ingest", "ingest state"),
    ];

    for (button_id, path, label) in targets {
        dom::on_click(button_id, move |_| {
            let prompt = format!(
                "This permanently deletes {label}. Type DELETE to confirm."
            );
            if !dom::confirm_destructive(&prompt) {
                return;
            }
            let path = path.to_string();
            spawn_local(async move {
                match api::post_empty::<Value>(&path).await {
                    Ok(_) => {
                        dom::set_text("reset-status", "Reset complete");
                        reload_admin_data();
                    }
                    Err(err) => {
                        dom::set_text("reset-status", &err.to_string());
                    }
                }
            });
        });
    }
}
