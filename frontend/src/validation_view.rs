//! Validation workspace: crawl and ingest findings with priority
//! partitioning, the persisted collapsible lower-priority section, severity
//! filtering, head-truncated paging, and batch quarantine.

use std::cell::RefCell;
use std::collections::HashSet;

use ragai_console::models::{Finding, ValidationSummary};
use ragai_console::prefs;
use ragai_console::validate::{filter_by_severity, paginate, partition, SeverityFilter};
use serde_json::{json, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlInputElement, HtmlSelectElement};

use crate::{api, dom, storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Crawl,
    Ingest,
}

impl Scope {
    fn as_str(self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Ingest => "ingest",
        }
    }

    fn element(self, suffix: &str) -> String {
        format!("val-{}-{suffix}", self.as_str())
    }

    fn summary_path(self) -> String {
        format!("/api/admin/validate/{}/summary", self.as_str())
    }

    fn run_path(self) -> String {
        format!("/api/admin/validate/{}", self.as_str())
    }
}

#[derive(Default)]
struct ScopeState {
    findings: Vec<Finding>,
    filter: SeverityFilter,
    selected: HashSet<String>,
    quarantined: HashSet<String>,
}

thread_local! {
    static CRAWL: RefCell<ScopeState> = RefCell::new(ScopeState::default());
    static INGEST: RefCell<ScopeState> = RefCell::new(ScopeState::default());
}

fn with_state<R>(scope: Scope, f: impl FnOnce(&mut ScopeState) -> R) -> R {
    match scope {
        Scope::Crawl => CRAWL.with(|state| f(&mut state.borrow_mut())),
        Scope::Ingest => INGEST.with(|state| f(&mut state.borrow_mut())),
    }
}

pub fn init() {
    for scope in [Scope::Crawl, Scope::Ingest] {
        dom::on_click(&scope.element("run"), move |_| run_validation(scope));
        dom::on_click(&scope.element("lower-toggle"), move |_| {
            let expanded = !prefs::flag_from_storage(
                storage::get(prefs::KEY_LOWER_PRIORITY_EXPANDED).as_deref(),
            );
            storage::set_flag(prefs::KEY_LOWER_PRIORITY_EXPANDED, expanded);
            render(scope);
        });
        dom::on_click(&scope.element("quarantine"), move |_| {
            quarantine_selected(scope);
        });

        if let Some(filter) = dom::by_id_as::<HtmlSelectElement>(&scope.element("filter")) {
            dom::on_event(&filter, "change", move |_| {
                let value = dom::select_value(&scope.element("filter"));
                with_state(scope, |state| {
                    state.filter = value.parse().unwrap_or(SeverityFilter::All);
                });
                render(scope);
            });
        }

        if let Some(size) = dom::by_id_as::<HtmlSelectElement>(&scope.element("page-size")) {
            dom::on_event(&size, "change", move |_| {
                let value = dom::select_value(&scope.element("page-size"));
                if prefs::PAGE_SIZES
                    .iter()
                    .any(|allowed| allowed.to_string() == value)
                {
                    storage::set(prefs::KEY_LOWER_PRIORITY_PAGE_SIZE, &value);
                }
                render(scope);
            });
        }

        if let Some(select_all) = dom::by_id_as::<HtmlInputElement>(&scope.element("select-all")) {
            dom::on_event(&select_all, "change", move |_| {
                toggle_select_all(scope);
            });
        }
    }
}

pub fn load_crawl_summary() {
    load_summary(Scope::Crawl);
}

pub fn load_ingest_summary() {
    load_summary(Scope::Ingest);
}

fn load_summary(scope: Scope) {
    spawn_local(async move {
        match api::get_json::<ValidationSummary>(&scope.summary_path()).await {
            Ok(summary) => {
                render_counts(scope, &summary);
                with_state(scope, |state| {
                    state.findings = summary.findings;
                    state.selected.clear();
                });
                render(scope);
            }
            Err(err) => {
                dom::set_text(&scope.element("status"), &err.to_string());
            }
        }
    });
}

fn run_validation(scope: Scope) {
    dom::set_text(&scope.element("status"), "Running validation…");
    spawn_local(async move {
        match api::post_empty::<Value>(&scope.run_path()).await {
            Ok(_) => {
                dom::set_text(&scope.element("status"), "");
                load_summary(scope);
            }
            Err(err) => dom::set_text(&scope.element("status"), &err.to_string()),
        }
    });
}

fn render_counts(scope: Scope, summary: &ValidationSummary) {
    let mut parts = Vec::new();
    if let Some(total) = summary.total_artifacts {
        parts.push(format!("{total} artifacts"));
    }
    for severity in ["high", "medium", "low"] {
        if let Some(count) = summary.counts_by_severity.get(severity) {
            parts.push(format!("{count} {severity}"));
        }
    }
    dom::set_text(&scope.element("counts"), parts.join(" · "));
}

fn render(scope: Scope) {
    with_state(scope, |state| {
        let (high, lower) = partition(&state.findings);

        render_rows(scope, &scope.element("high"), &high, state);

        let expanded =
            prefs::flag_from_storage(storage::get(prefs::KEY_LOWER_PRIORITY_EXPANDED).as_deref());
        dom::set_text(
            &scope.element("lower-toggle"),
            format!(
                "{} Lower priority ({})",
                if expanded { "▾" } else { "▸" },
                lower.len()
            ),
        );

        if !expanded {
            dom::hide(&scope.element("lower"));
            return;
        }
        dom::show(&scope.element("lower"));

        // Reflect the persisted selector values before filtering.
        let page_size = prefs::page_size_from_storage(
            storage::get(prefs::KEY_LOWER_PRIORITY_PAGE_SIZE).as_deref(),
        );
        if let Some(select) = dom::by_id_as::<HtmlSelectElement>(&scope.element("page-size")) {
            select.set_value(&page_size.to_string());
        }
        if let Some(select) = dom::by_id_as::<HtmlSelectElement>(&scope.element("filter")) {
            select.set_value(state.filter.as_str());
        }

        let filtered = filter_by_severity(&lower, state.filter);
        let page = paginate(&filtered, page_size);
        dom::set_text(
            &scope.element("truncation"),
            page.truncation_label().unwrap_or_default(),
        );
        let rows = page.rows.clone();
        render_rows(scope, &scope.element("lower-list"), &rows, state);
    });
}

fn render_rows(scope: Scope, container_id: &str, findings: &[&Finding], state: &ScopeState) {
    let Some(container) = dom::by_id(container_id) else {
        return;
    };
    container.set_inner_html("");

    if findings.is_empty() {
        if let Some(empty) = dom::create("li") {
            empty.set_class_name("finding-empty");
            empty.set_text_content(Some("No findings"));
            let _ = container.append_child(&empty);
        }
        return;
    }

    for finding in findings {
        let Some(row) = dom::create("li") else {
            continue;
        };
        let quarantined = state.quarantined.contains(&finding.id);
        row.set_class_name(if quarantined {
            "finding-row quarantined"
        } else {
            "finding-row"
        });
        let _ = row.set_attribute("data-finding-id", &finding.id);

        if let Some(checkbox) = dom::create_as::<HtmlInputElement>("input") {
            checkbox.set_type("checkbox");
            checkbox.set_class_name("finding-select");
            checkbox.set_checked(state.selected.contains(&finding.id));
            let _ = checkbox.set_attribute("data-finding-id", &finding.id);
            let id = finding.id.clone();
            dom::on_event(&checkbox, "change", move |event| {
                let checked = event
                    .target()
                    .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
                    .map(|input| input.checked())
                    .unwrap_or(false);
                with_state(scope, |state| {
                    if checked {
                        state.selected.insert(id.clone());
                    } else {
                        state.selected.remove(&id);
                    }
                });
            });
            let _ = row.append_child(&checkbox);
        }

        if let Some(tag) = dom::create("span") {
            tag.set_class_name(&format!("tag severity-{}", finding.severity.as_str()));
            tag.set_text_content(Some(finding.severity.as_str()));
            let _ = row.append_child(&tag);
        }

        if let Some(body) = dom::create("span") {
            body.set_class_name("finding-body");
            let label = finding
                .title
                .as_deref()
                .filter(|title| !title.trim().is_empty())
                .or(finding.url.as_deref())
                .unwrap_or(&finding.id);
            body.set_inner_html(&format!(
                "<strong>{}</strong> — {}",
                dom::escape_html(label),
                dom::escape_html(&finding.reason),
            ));
            let _ = row.append_child(&body);
        }

        if quarantined {
            append_quarantine_pill(&row);
        }

        let _ = container.append_child(&row);
    }
}

fn append_quarantine_pill(row: &Element) {
    if let Some(pill) = dom::create("span") {
        pill.set_class_name("pill quarantined-pill");
        pill.set_text_content(Some("Quarantined"));
        let _ = row.append_child(&pill);
    }
}

/// Select-all operates on the rows currently rendered, nothing more.
fn toggle_select_all(scope: Scope) {
    let checked = dom::checkbox_checked(&scope.element("select-all"));
    let Some(document) = dom::web_document() else {
        return;
    };
    let Ok(boxes) = document.query_selector_all(&format!(
        "#{} .finding-select, #{} .finding-select",
        scope.element("high"),
        scope.element("lower-list"),
    )) else {
        return;
    };

    with_state(scope, |state| {
        for index in 0..boxes.length() {
            let Some(input) = boxes
                .item(index)
                .and_then(|node| node.dyn_into::<HtmlInputElement>().ok())
            else {
                continue;
            };
            input.set_checked(checked);
            let Some(id) = input.get_attribute("data-finding-id") else {
                continue;
            };
            if checked {
                state.selected.insert(id);
            } else {
                state.selected.remove(&id);
            }
        }
    });
}

/// Batch quarantine: POST the selected ids, mark the rows visually, then
/// reload the summary.
fn quarantine_selected(scope: Scope) {
    let ids: Vec<String> =
        with_state(scope, |state| state.selected.iter().cloned().collect());
    if ids.is_empty() {
        dom::set_text(&scope.element("status"), "Select findings first");
        return;
    }

    dom::set_text(&scope.element("status"), "Quarantining…");
    spawn_local(async move {
        match api::post_json::<Value>("/api/admin/quarantine", &json!({ "ids": ids })).await {
            Ok(_) => {
                dom::set_text(&scope.element("status"), "");
                with_state(scope, |state| {
                    let selected: Vec<String> = state.selected.drain().collect();
                    state.quarantined.extend(selected);
                });
                render(scope);
                load_summary(scope);
            }
            Err(err) => dom::set_text(&scope.element("status"), &err.to_string()),
        }
    });
}
