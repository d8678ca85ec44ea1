//! Ingest pane: job start/cancel, the dual-track progress display (SSE
//! events plus a ~2 s status poll), the ETA cell, the summary card, and the
//! ingestor-worker heartbeat.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Interval;
use js_sys::Date;
use ragai_console::ingest::{IngestProgress, POLL_INTERVAL_MS, WORKER_POLL_INTERVAL_MS};
use ragai_console::models::{IngestEvent, IngestJobSnapshot, WorkerStatus};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlElement;

use crate::{api, dom, state};

thread_local! {
    static PROGRESS: RefCell<Option<Rc<RefCell<IngestProgress>>>> = const { RefCell::new(None) };
    static EVENTS_STREAM: RefCell<Option<api::SseHandle>> = const { RefCell::new(None) };
}

pub fn init() {
    dom::on_click("ingest-start", |_| {
        start_ingest();
    });
    dom::on_click("ingest-cancel", |_| {
        cancel_ingest();
    });
}

/// Tear down the event stream and poller (admin session reset).
pub fn stop_tracking() {
    EVENTS_STREAM.with(|slot| {
        if let Some(handle) = slot.borrow_mut().take() {
            handle.close();
        }
    });
    state::stop_ingest_poll();
    PROGRESS.with(|slot| *slot.borrow_mut() = None);
}

fn start_ingest() {
    dom::set_text("ingest-status-line", "Starting ingest…");
    dom::set_html("ingest-summary-card", "");

    spawn_local(async move {
        match api::post_empty::<Value>("/api/ingest").await {
            Ok(response) => {
                let job_id = response
                    .get("job_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if job_id.is_empty() {
                    dom::set_text("ingest-status-line", "Ingest start returned no job id");
                    return;
                }
                state::CURRENT_INGEST_JOB.with(|job| *job.borrow_mut() = Some(job_id.clone()));
                track_job(&job_id);
            }
            Err(err) => {
                dom::set_text("ingest-status-line", &err.to_string());
            }
        }
    });
}

fn cancel_ingest() {
    let Some(job_id) = state::CURRENT_INGEST_JOB.with(|job| job.borrow().clone()) else {
        return;
    };
    spawn_local(async move {
        match api::post_empty::<Value>(&format!("/api/ingest/{job_id}/cancel")).await {
            Ok(_) => dom::set_text("ingest-status-line", "Cancelling…"),
            Err(err) => dom::set_text("ingest-status-line", &err.to_string()),
        }
    });
}

/// Track one ingest job on both tracks. Either track alone carries the
/// display to completion; the poller is the survivor when the stream dies.
fn track_job(job_id: &str) {
    stop_tracking();

    let progress = Rc::new(RefCell::new(IngestProgress::new(job_id)));
    PROGRESS.with(|slot| *slot.borrow_mut() = Some(progress.clone()));
    render_progress(&progress.borrow());

    open_events_stream(job_id, progress.clone());
    start_status_poll(job_id, progress);
}

fn open_events_stream(job_id: &str, progress: Rc<RefCell<IngestProgress>>) {
    let warned = Rc::new(Cell::new(false));

    let on_frame = {
        let progress = progress.clone();
        move |frame: ragai_console::sse::SseFrame| {
            let event: IngestEvent = match frame.json() {
                Ok(event) => event,
                Err(_) => {
                    if !warned.replace(true) {
                        web_sys::console::warn_1(&JsValue::from_str(
                            "ingest stream: skipped malformed event",
                        ));
                    }
                    return;
                }
            };

            let mut progress_ref = progress.borrow_mut();
            let log_line = progress_ref.apply_event(&event, Date::now());
            let terminal = progress_ref.is_terminal();
            render_progress(&progress_ref);
            drop(progress_ref);

            if let Some(line) = log_line {
                append_ingest_log(&line);
            }
            if terminal {
                finish_tracking(&progress);
            }
        }
    };

    let on_end = {
        move |_error: Option<api::ApiError>| {
            // The poller keeps going; losing the stream only loses live
            // log lines.
            EVENTS_STREAM.with(|slot| *slot.borrow_mut() = None);
        }
    };

    let handle = api::sse_open(
        &format!("/api/ingest/{job_id}/events"),
        api::SseRequest::Get,
        on_frame,
        on_end,
    );
    EVENTS_STREAM.with(|slot| *slot.borrow_mut() = Some(handle));
}

fn start_status_poll(job_id: &str, progress: Rc<RefCell<IngestProgress>>) {
    let job_id = job_id.to_string();
    let inflight = Rc::new(Cell::new(false));

    let tick = move || {
        if inflight.get() {
            return;
        }
        inflight.set(true);

        let job_id = job_id.clone();
        let progress = progress.clone();
        let inflight = inflight.clone();
        spawn_local(async move {
            let snapshot = api::get_json::<IngestJobSnapshot>(&format!("/api/ingest/{job_id}")).await;
            inflight.set(false);

            let Ok(snapshot) = snapshot else {
                // Transient poll failures are retried on the next tick.
                return;
            };

            let still_tracked = state::CURRENT_INGEST_JOB
                .with(|current| current.borrow().as_deref() == Some(job_id.as_str()));
            if !still_tracked {
                return;
            }

            let mut progress_ref = progress.borrow_mut();
            progress_ref.apply_snapshot(&snapshot, Date::now());
            let terminal = progress_ref.is_terminal();
            render_progress(&progress_ref);
            drop(progress_ref);

            if terminal {
                finish_tracking(&progress);
            }
        });
    };

    tick();
    let interval = Interval::new(POLL_INTERVAL_MS, tick);
    state::INGEST_POLL.with(|slot| {
        if let Some(previous) = slot.borrow_mut().replace(interval) {
            previous.cancel();
        }
    });
}

/// Terminal status: stop both tracks and populate the summary card.
fn finish_tracking(progress: &Rc<RefCell<IngestProgress>>) {
    state::stop_ingest_poll();
    EVENTS_STREAM.with(|slot| {
        if let Some(handle) = slot.borrow_mut().take() {
            handle.close();
        }
    });
    render_summary_card(&progress.borrow());
}

fn render_progress(progress: &IngestProgress) {
    if let Some(bar) = dom::by_id_as::<HtmlElement>("ingest-progress-bar") {
        let _ = bar
            .style()
            .set_property("width", &format!("{:.0}%", progress.percent()));
    }
    dom::set_text("ingest-progress-text", progress.ratio_label());
    dom::set_text(
        "ingest-current-artifact",
        progress.current_artifact.as_deref().unwrap_or("—"),
    );
    dom::set_text("ingest-errors", progress.errors.to_string());
    dom::set_text("ingest-eta", progress.eta_label());
    dom::set_text("ingest-status-line", progress.status_label());
}

fn render_summary_card(progress: &IngestProgress) {
    let heading = progress.status_label();
    let mut html = format!("<h4>{}</h4><ul>", dom::escape_html(&heading));
    html.push_str(&format!(
        "<li>Artifacts: {} / {}</li><li>Errors: {}</li>",
        progress.done, progress.total, progress.errors
    ));
    if let Some(message) = progress
        .completion_message
        .as_deref()
        .or(progress.error_message.as_deref())
    {
        html.push_str(&format!("<li>{}</li>", dom::escape_html(message)));
    }
    html.push_str("</ul>");
    dom::set_html("ingest-summary-card", &html);
}

fn append_ingest_log(line: &str) {
    let Some(document) = dom::web_document() else {
        return;
    };
    let Some(pane) = dom::by_id("log-pane-ingest") else {
        return;
    };
    let text = document.create_text_node(&format!("{line}\n"));
    let _ = pane.append_child(&text);
    if let Ok(element) = pane.dyn_into::<HtmlElement>() {
        element.set_scroll_top(element.scroll_height());
    }
}

/// ~5 s ingestor-worker heartbeat poll; cleared on admin session reset.
pub fn start_worker_poll() {
    let tick = || {
        spawn_local(async move {
            match api::get_json::<WorkerStatus>("/api/ingest/worker/status").await {
                Ok(status) => render_worker_status(&status),
                Err(_) => {
                    dom::set_text("worker-status", "Worker status unavailable");
                    dom::set_class("worker-status", "worker-status stale");
                }
            }
        });
    };

    tick();
    let interval = Interval::new(WORKER_POLL_INTERVAL_MS, tick);
    state::WORKER_POLL.with(|slot| {
        if let Some(previous) = slot.borrow_mut().replace(interval) {
            previous.cancel();
        }
    });
}

fn render_worker_status(status: &WorkerStatus) {
    let age = status
        .age_seconds
        .map(|age| format!("{age:.0}s ago"))
        .unwrap_or_else(|| "never".to_string());
    let pid = status.pid().unwrap_or_else(|| "—".to_string());
    dom::set_text(
        "worker-status",
        format!(
            "Worker pid {pid} · heartbeat {age} · queue depth {}",
            status.queue_depth
        ),
    );

    let stale = status.age_seconds.map(|age| age > 15.0).unwrap_or(true);
    dom::set_class(
        "worker-status",
        if stale {
            "worker-status stale"
        } else {
            "worker-status live"
        },
    );
}
