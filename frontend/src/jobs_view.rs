//! Job table and the three named log channels, plus the crawl summary panel
//! that follows a completed crawl.

use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use ragai_console::jobs::{
    job_status_class, line_signals_crawl_complete, CrawlSummary, LogChannel,
    SUMMARY_FETCH_DELAY_MS, VIEW_LOG_SUMMARY_DELAY_MS,
};
use ragai_console::models::{Job, JobType};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlElement;

use crate::{api, dom, state};

thread_local! {
    /// Job currently streamed on the `jobs` channel (the "view log" slot).
    static VIEWED_JOB: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub fn init() {
    dom::on_click("trigger-crawl", |_| {
        trigger_job(JobType::Crawl);
    });
    dom::on_click("trigger-ingest", |_| {
        trigger_job(JobType::Ingest);
    });
    dom::on_click("jobs-refresh", |_| {
        refresh_jobs();
    });
}

fn trigger_job(job_type: JobType) {
    dom::set_text("jobs-status", "Starting job…");
    spawn_local(async move {
        let path = match job_type {
            JobType::Crawl => "/api/admin/crawl",
            JobType::Ingest => "/api/admin/ingest",
        };
        match api::post_empty::<Value>(path).await {
            Ok(response) => {
                let job_id = response
                    .get("job_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                dom::set_text("jobs-status", &format!("Started {} {job_id}", job_type.as_str()));

                match job_type {
                    JobType::Crawl => {
                        state::CURRENT_CRAWL_JOB
                            .with(|job| *job.borrow_mut() = Some(job_id.clone()));
                        open_log_channel(LogChannel::Crawl, &job_id);
                    }
                    JobType::Ingest => {
                        state::CURRENT_INGEST_JOB
                            .with(|job| *job.borrow_mut() = Some(job_id.clone()));
                        open_log_channel(LogChannel::Ingest, &job_id);
                    }
                }
                refresh_jobs();
            }
            Err(err) => {
                dom::set_text("jobs-status", &err.to_string());
            }
        }
    });
}

/// Open one job's log on a named channel. The channel slot closes whatever
/// stream held it before; once this stream's handle is closed, every queued
/// resumption becomes a no-op.
pub fn open_log_channel(channel: LogChannel, job_id: &str) {
    let pane_id = format!("log-pane-{}", channel.as_str());
    dom::set_text(&pane_id, "");

    let path = format!("/api/admin/jobs/{job_id}/log");
    let job_id_owned = job_id.to_string();

    let on_frame = {
        let pane_id = pane_id.clone();
        let job_id = job_id_owned.clone();
        move |frame: ragai_console::sse::SseFrame| {
            append_log_line(&pane_id, &frame.data);
            if channel == LogChannel::Crawl && line_signals_crawl_complete(&frame.data) {
                let job_id = job_id.clone();
                Timeout::new(SUMMARY_FETCH_DELAY_MS, move || {
                    fetch_crawl_summary(&job_id);
                    refresh_jobs();
                })
                .forget();
            }
        }
    };

    let on_end = {
        let pane_id = pane_id.clone();
        move |error: Option<api::ApiError>| {
            if let Some(err) = error {
                append_log_line(&pane_id, &format!("[stream closed: {err}]"));
            }
            state::close_log_stream(channel);
        }
    };

    let handle = api::sse_open(&path, api::SseRequest::Get, on_frame, on_end);
    state::assign_log_stream(channel, handle);
}

fn append_log_line(pane_id: &str, line: &str) {
    let Some(document) = dom::web_document() else {
        return;
    };
    let Some(pane) = dom::by_id(pane_id) else {
        return;
    };
    let text = document.create_text_node(&format!("{line}\n"));
    let _ = pane.append_child(&text);
    if let Ok(element) = pane.dyn_into::<HtmlElement>() {
        element.set_scroll_top(element.scroll_height());
    }
}

pub fn refresh_jobs() {
    spawn_local(async move {
        match api::get_json::<Vec<Job>>("/api/admin/jobs").await {
            Ok(jobs) => {
                crate::admin::clear_banner();
                render_jobs(&jobs);
            }
            Err(err) => {
                if matches!(err, api::ApiError::Network(_)) {
                    crate::admin::show_banner(&err.to_string());
                }
                dom::set_text("jobs-status", &err.to_string());
            }
        }
    });
}

fn render_jobs(jobs: &[Job]) {
    let Some(body) = dom::by_id("jobs-table-body") else {
        return;
    };
    body.set_inner_html("");

    if jobs.is_empty() {
        if let Some(row) = dom::create("tr") {
            row.set_inner_html("<td colspan=\"5\" class=\"empty\">No jobs yet</td>");
            let _ = body.append_child(&row);
        }
        return;
    }

    let mut ordered: Vec<&Job> = jobs.iter().collect();
    ordered.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    for job in ordered {
        let Some(row) = dom::create("tr") else {
            continue;
        };

        let short_id: String = job.job_id.chars().take(8).collect();
        row.set_inner_html(&format!(
            "<td title=\"{}\"><code>{}</code></td><td>{}</td>\
             <td><span class=\"tag {}\">{}</span></td><td>{}</td>",
            dom::escape_html(&job.job_id),
            dom::escape_html(&short_id),
            job.job_type.as_str(),
            job_status_class(&job.status),
            dom::escape_html(&job.status),
            dom::escape_html(&job.started_at),
        ));

        if let Some(actions) = dom::create("td") {
            actions.set_class_name("job-actions");

            if let Some(view) = dom::create_as::<HtmlElement>("button") {
                view.set_text_content(Some("View log"));
                let job_id = job.job_id.clone();
                let job_type = job.job_type;
                dom::on_event(&view, "click", move |_| {
                    view_job_log(&job_id, job_type);
                });
                let _ = actions.append_child(&view);
            }

            if let Some(export) = dom::create_as::<HtmlElement>("button") {
                export.set_text_content(Some("Export"));
                let job_id = job.job_id.clone();
                dom::on_event(&export, "click", move |_| {
                    let job_id = job_id.clone();
                    spawn_local(async move {
                        let path = format!("/api/admin/jobs/{job_id}/log/export");
                        let fallback = format!("job-{job_id}.log");
                        if let Err(err) = api::download(&path, &fallback).await {
                            dom::set_text("jobs-status", &err.to_string());
                        }
                    });
                });
                let _ = actions.append_child(&export);
            }

            if let Some(delete) = dom::create_as::<HtmlElement>("button") {
                delete.set_text_content(Some("Delete"));
                delete.set_class_name("danger");
                let job_id = job.job_id.clone();
                dom::on_event(&delete, "click", move |_| {
                    delete_job(&job_id);
                });
                let _ = actions.append_child(&delete);
            }

            let _ = row.append_child(&actions);
        }

        let _ = body.append_child(&row);
    }
}

fn view_job_log(job_id: &str, job_type: JobType) {
    VIEWED_JOB.with(|viewed| *viewed.borrow_mut() = Some(job_id.to_string()));
    open_log_channel(LogChannel::Jobs, job_id);

    // Crawl jobs surface their summary shortly after the log opens.
    if job_type == JobType::Crawl {
        let job_id = job_id.to_string();
        Timeout::new(VIEW_LOG_SUMMARY_DELAY_MS, move || {
            fetch_crawl_summary(&job_id);
        })
        .forget();
    }
}

fn delete_job(job_id: &str) {
    let confirmed = web_sys::window()
        .and_then(|window| {
            window
                .confirm_with_message("Delete this job and its logs?")
                .ok()
        })
        .unwrap_or(false);
    if !confirmed {
        return;
    }

    let job_id = job_id.to_string();
    spawn_local(async move {
        match api::delete(&format!("/api/admin/jobs/{job_id}")).await {
            Ok(()) => {
                release_job_references(&job_id);
                refresh_jobs();
            }
            Err(err) => dom::set_text("jobs-status", &err.to_string()),
        }
    });
}

/// Deleting a job drops every live reference to it: channel streams keyed
/// to the job close and the current-job slots clear.
fn release_job_references(job_id: &str) {
    let was_crawl = state::CURRENT_CRAWL_JOB.with(|job| {
        let matches = job.borrow().as_deref() == Some(job_id);
        if matches {
            *job.borrow_mut() = None;
        }
        matches
    });
    if was_crawl {
        state::close_log_stream(LogChannel::Crawl);
    }

    let was_ingest = state::CURRENT_INGEST_JOB.with(|job| {
        let matches = job.borrow().as_deref() == Some(job_id);
        if matches {
            *job.borrow_mut() = None;
        }
        matches
    });
    if was_ingest {
        state::close_log_stream(LogChannel::Ingest);
    }

    let was_viewed = VIEWED_JOB.with(|viewed| {
        let matches = viewed.borrow().as_deref() == Some(job_id);
        if matches {
            *viewed.borrow_mut() = None;
        }
        matches
    });
    if was_viewed {
        state::close_log_stream(LogChannel::Jobs);
    }
}

pub fn fetch_crawl_summary(job_id: &str) {
    let job_id = job_id.to_string();
    spawn_local(async move {
        match api::get_json::<Value>(&format!("/api/admin/jobs/{job_id}/summary")).await {
            Ok(payload) => {
                render_crawl_summary(&CrawlSummary::from_value(&payload));
                // A finished crawl can change which rules hit auth walls.
                crate::config_view::refresh_auth_overlay();
            }
            Err(err) => {
                dom::set_text("crawl-summary-pills", &format!("Summary unavailable: {err}"));
            }
        }
    });
}

fn render_crawl_summary(summary: &CrawlSummary) {
    let pills = summary
        .pills()
        .into_iter()
        .map(|(label, value)| {
            format!("<span class=\"pill\">{label}: <strong>{value}</strong></span>")
        })
        .collect::<Vec<_>>()
        .join(" ");
    dom::set_html("crawl-summary-pills", &pills);

    let mut html = String::new();
    html.push_str("<h4>Skipped</h4><ul>");
    for (label, value) in [
        ("Already processed", summary.skipped.already_processed),
        ("Depth exceeded", summary.skipped.depth_exceeded),
        ("Not allowed", summary.skipped.not_allowed),
        ("Auth required", summary.skipped.auth_required),
        ("Non-HTML", summary.skipped.non_html),
    ] {
        html.push_str(&format!("<li>{label}: {value}</li>"));
    }
    html.push_str("</ul><h4>Errors</h4><ul>");
    for (label, value) in [
        ("4xx", summary.errors_by_class.http_4xx),
        ("5xx", summary.errors_by_class.http_5xx),
        ("Network timeout", summary.errors_by_class.network_timeout),
        ("Other", summary.errors_by_class.other),
    ] {
        html.push_str(&format!("<li>{label}: {value}</li>"));
    }
    html.push_str("</ul>");

    if !summary.error_details.is_empty() {
        html.push_str("<h4>Error details</h4><ul class=\"error-details\">");
        for detail in &summary.error_details {
            html.push_str(&format!(
                "<li><code>{}</code> {} {}</li>",
                dom::escape_html(&detail.url),
                dom::escape_html(&detail.error_class),
                dom::escape_html(&detail.detail),
            ));
        }
        html.push_str("</ul>");
    }

    dom::set_html("crawl-summary-detail", &html);
}
