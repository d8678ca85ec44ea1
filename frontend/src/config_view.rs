//! Crawl configuration workspace: seeds, blocked domains, allow-rules with
//! per-row persistence, discovery recommendations, auth profiles, the
//! legacy-migration banner, and the agents/ingest config editors.

use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use ragai_console::config_store::{CrawlConfigStore, EditKind, RowStatus};
use ragai_console::models::{
    AgentsConfig, AllowBlockConfig, AllowRule, AuthCheckResponse, AuthProfile, AuthStatusOverlay,
    CrawlerConfig, IngestConfig, MatchMode, Recommendation, RecommendationsResponse, Seed,
    TypeFlags, AGENT_NAMES,
};
use ragai_console::normalize::{normalize_domain_input, normalize_url_row};
use serde_json::{json, Value};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

use crate::state::CRAWL_STORE;
use crate::{api, dom};

const SAVED_PILL_CLEAR_MS: u32 = 2_000;

thread_local! {
    static AGENTS_DOC: RefCell<Option<AgentsConfig>> = const { RefCell::new(None) };
    static INGEST_DOC: RefCell<Option<IngestConfig>> = const { RefCell::new(None) };
}

pub fn init() {
    dom::on_click("seed-add", |_| add_seed_from_input());
    dom::on_click("blocked-add", |_| add_blocked_from_input());
    dom::on_click("rule-add", |_| add_blank_rule());
    dom::on_click("recommendations-toggle", |_| {
        CRAWL_STORE.with(|store| {
            let mut store = store.borrow_mut();
            store.recommendations_expanded = !store.recommendations_expanded;
            render_recommendations(&store);
        });
    });
    dom::on_click("candidates-purge", |_| purge_candidates());
    dom::on_click("profile-save", |_| save_profile_from_form());
    dom::on_click("profile-clear", |_| clear_profile_form());
    dom::on_click("legacy-migrate", |_| run_legacy_migration());
    dom::on_click("agents-save", |_| save_agents());
    dom::on_click("ingest-config-save", |_| save_ingest_config());
}

/// Fetch every config surface. Loaders are independent: a failing endpoint
/// leaves its own pane on the last known state and the rest intact.
pub fn reload_all() {
    spawn_local(async {
        match api::get_json::<AllowBlockConfig>("/api/admin/config/allow_block").await {
            Ok(doc) => CRAWL_STORE.with(|store| {
                let mut store = store.borrow_mut();
                store.load_allow_block(doc);
                render_seeds(&store);
                render_blocked(&store);
                render_rules(&store);
                render_recommendations(&store);
            }),
            Err(err) => dom::set_text("config-save-status", &err.to_string()),
        }
    });

    spawn_local(async {
        match api::get_json::<CrawlerConfig>("/api/admin/config/crawler").await {
            Ok(doc) => CRAWL_STORE.with(|store| {
                let mut store = store.borrow_mut();
                store.load_crawler(doc);
                render_profiles(&store);
                render_migration_banner(&store);
            }),
            Err(err) => dom::set_text("profile-status", &err.to_string()),
        }
    });

    spawn_local(async {
        match api::get_json::<RecommendationsResponse>("/api/admin/candidates/recommendations")
            .await
        {
            Ok(response) => CRAWL_STORE.with(|store| {
                let mut store = store.borrow_mut();
                store.set_recommendations(response.items);
                render_recommendations(&store);
            }),
            Err(_) => {
                // Discovery may simply not have run yet.
                dom::set_text("recommendation-status", "No recommendations available");
            }
        }
    });

    refresh_auth_overlay();

    spawn_local(async {
        match api::get_json::<AuthCheckResponse>("/api/crawl/auth-status").await {
            Ok(response) => CRAWL_STORE.with(|store| {
                let mut store = store.borrow_mut();
                store.set_auth_results(response.results);
                render_profiles(&store);
            }),
            Err(_) => {}
        }
    });

    spawn_local(async {
        match api::get_json::<AgentsConfig>("/api/admin/config/agents").await {
            Ok(doc) => {
                render_agents(&doc);
                AGENTS_DOC.with(|slot| *slot.borrow_mut() = Some(doc));
            }
            Err(err) => dom::set_text("agents-status", &err.to_string()),
        }
    });

    spawn_local(async {
        match api::get_json::<IngestConfig>("/api/admin/config/ingest").await {
            Ok(doc) => {
                render_ingest_config(&doc);
                INGEST_DOC.with(|slot| *slot.borrow_mut() = Some(doc));
            }
            Err(err) => dom::set_text("ingest-config-status", &err.to_string()),
        }
    });
}

/// The auth-status overlay degrades to empty on failure without touching
/// the rest of the store.
pub fn refresh_auth_overlay() {
    spawn_local(async {
        let overlay = api::get_json::<AuthStatusOverlay>("/api/admin/allowed-urls/auth-status")
            .await
            .unwrap_or_default();
        CRAWL_STORE.with(|store| {
            let mut store = store.borrow_mut();
            store.set_overlay(overlay);
            render_rules(&store);
        });
    });
}

// ---------------------------------------------------------------------------
// Seeds

fn add_seed_from_input() {
    let raw = dom::input_value("seed-input");
    if raw.trim().is_empty() {
        return;
    }
    let allow_http = dom::checkbox_checked("seed-allow-http");

    let url = match normalize_url_row(&raw, allow_http) {
        Ok(url) => url,
        Err(err) => {
            // Input is retained so the user can correct it.
            dom::alert(&err.to_string());
            return;
        }
    };

    dom::set_input_value("seed-input", "");
    CRAWL_STORE.with(|store| {
        let mut store = store.borrow_mut();
        if !store.seeds.iter().any(|seed| seed.url == url) {
            store.seeds.push(Seed { url, allow_http });
        }
        render_seeds(&store);
    });
    save_allow_block_document();
}

fn render_seeds(store: &CrawlConfigStore) {
    let Some(list) = dom::by_id("seed-list") else {
        return;
    };
    list.set_inner_html("");

    for index in store.sorted_seed_indices() {
        let Some(seed) = store.seeds.get(index) else {
            continue;
        };
        let Some(row) = dom::create("li") else {
            continue;
        };
        row.set_class_name("config-row seed-row");

        let editing = store.edit.editing(EditKind::Seed) == Some(index);
        if editing {
            render_seed_editor(&row, index, seed);
        } else {
            render_seed_display(&row, index, seed);
        }
        let _ = list.append_child(&row);
    }
}

fn render_seed_display(row: &Element, index: usize, seed: &Seed) {
    if let Some(label) = dom::create_as::<HtmlElement>("code") {
        label.set_text_content(Some(&seed.url));
        let _ = row.append_child(&label);
    }
    if seed.allow_http {
        if let Some(tag) = dom::create("span") {
            tag.set_class_name("tag warning");
            tag.set_text_content(Some("http allowed"));
            let _ = row.append_child(&tag);
        }
    }
    append_button(row, "Edit", "secondary", move |_| {
        CRAWL_STORE.with(|store| {
            let mut store = store.borrow_mut();
            store.edit.begin(EditKind::Seed, index);
            render_seeds(&store);
        });
    });
    append_button(row, "Delete", "danger", move |_| {
        CRAWL_STORE.with(|store| {
            let mut store = store.borrow_mut();
            if index < store.seeds.len() {
                store.seeds.remove(index);
            }
            store.edit.cancel(EditKind::Seed);
            render_seeds(&store);
        });
        save_allow_block_document();
    });
}

fn render_seed_editor(row: &Element, index: usize, seed: &Seed) {
    let Some(input) = dom::create_as::<HtmlInputElement>("input") else {
        return;
    };
    input.set_type("text");
    input.set_value(&seed.url);
    input.set_id("seed-edit-input");
    let _ = row.append_child(&input);

    let Some(http_toggle) = dom::create_as::<HtmlInputElement>("input") else {
        return;
    };
    http_toggle.set_type("checkbox");
    http_toggle.set_checked(seed.allow_http);
    http_toggle.set_id("seed-edit-http");
    let _ = row.append_child(&http_toggle);

    append_button(row, "Save", "", move |_| {
        let raw = dom::input_value("seed-edit-input");
        let allow_http = dom::checkbox_checked("seed-edit-http");
        let url = match normalize_url_row(&raw, allow_http) {
            Ok(url) if !url.is_empty() => url,
            Ok(_) => return,
            Err(err) => {
                dom::alert(&err.to_string());
                return;
            }
        };
        CRAWL_STORE.with(|store| {
            let mut store = store.borrow_mut();
            if let Some(seed) = store.seeds.get_mut(index) {
                seed.url = url;
                seed.allow_http = allow_http;
            }
            store.edit.cancel(EditKind::Seed);
            render_seeds(&store);
        });
        save_allow_block_document();
    });
    append_button(row, "Cancel", "secondary", move |_| {
        CRAWL_STORE.with(|store| {
            let mut store = store.borrow_mut();
            store.edit.cancel(EditKind::Seed);
            render_seeds(&store);
        });
    });
}

// ---------------------------------------------------------------------------
// Blocked domains

fn add_blocked_from_input() {
    let raw = dom::input_value("blocked-input");
    let domain = normalize_domain_input(&raw);
    if domain.is_empty() {
        return;
    }

    dom::set_input_value("blocked-input", "");
    CRAWL_STORE.with(|store| {
        let mut store = store.borrow_mut();
        if !store.blocked.iter().any(|existing| existing == &domain) {
            store.blocked.push(domain);
        }
        render_blocked(&store);
    });
    save_allow_block_document();
}

fn render_blocked(store: &CrawlConfigStore) {
    let Some(list) = dom::by_id("blocked-list") else {
        return;
    };
    list.set_inner_html("");

    for index in store.sorted_blocked_indices() {
        let Some(domain) = store.blocked.get(index) else {
            continue;
        };
        let Some(row) = dom::create("li") else {
            continue;
        };
        row.set_class_name("config-row blocked-row");

        let editing = store.edit.editing(EditKind::Blocked) == Some(index);
        if editing {
            if let Some(input) = dom::create_as::<HtmlInputElement>("input") {
                input.set_type("text");
                input.set_value(domain);
                input.set_id("blocked-edit-input");
                let _ = row.append_child(&input);
            }
            append_button(&row, "Save", "", move |_| {
                let domain = normalize_domain_input(&dom::input_value("blocked-edit-input"));
                CRAWL_STORE.with(|store| {
                    let mut store = store.borrow_mut();
                    if !domain.is_empty() {
                        if let Some(entry) = store.blocked.get_mut(index) {
                            *entry = domain;
                        }
                    }
                    store.edit.cancel(EditKind::Blocked);
                    render_blocked(&store);
                });
                save_allow_block_document();
            });
            append_button(&row, "Cancel", "secondary", move |_| {
                CRAWL_STORE.with(|store| {
                    let mut store = store.borrow_mut();
                    store.edit.cancel(EditKind::Blocked);
                    render_blocked(&store);
                });
            });
        } else {
            if let Some(label) = dom::create("code") {
                label.set_text_content(Some(domain));
                let _ = row.append_child(&label);
            }
            append_button(&row, "Edit", "secondary", move |_| {
                CRAWL_STORE.with(|store| {
                    let mut store = store.borrow_mut();
                    store.edit.begin(EditKind::Blocked, index);
                    render_blocked(&store);
                });
            });
            append_button(&row, "Delete", "danger", move |_| {
                CRAWL_STORE.with(|store| {
                    let mut store = store.borrow_mut();
                    if index < store.blocked.len() {
                        store.blocked.remove(index);
                    }
                    store.edit.cancel(EditKind::Blocked);
                    render_blocked(&store);
                });
                save_allow_block_document();
            });
        }
        let _ = list.append_child(&row);
    }
}

/// Seeds and blocked domains persist through the batch document; the rule
/// list rides along as a mirror for legacy consumers.
fn save_allow_block_document() {
    let document = CRAWL_STORE.with(|store| store.borrow().allow_block_document());
    dom::set_text("config-save-status", "Saving…");
    spawn_local(async move {
        match api::put_json::<Value>("/api/admin/config/allow_block", &document).await {
            Ok(_) => {
                dom::set_text("config-save-status", "Saved");
                Timeout::new(SAVED_PILL_CLEAR_MS, || {
                    dom::set_text("config-save-status", "");
                })
                .forget();
            }
            Err(err) => dom::set_text("config-save-status", &err.to_string()),
        }
    });
}

// ---------------------------------------------------------------------------
// Allow rules

fn add_blank_rule() {
    CRAWL_STORE.with(|store| {
        let mut store = store.borrow_mut();
        store.allow_rules.push(AllowRule {
            id: None,
            pattern: String::new(),
            match_mode: MatchMode::Prefix,
            types: TypeFlags::default(),
            allow_http: false,
            auth_profile: None,
        });
        let index = store.allow_rules.len() - 1;
        store.edit.begin(EditKind::Allow, index);
        render_rules(&store);
    });
}

fn rule_status_cell_id(rule: &AllowRule, index: usize) -> String {
    match rule.id.as_deref() {
        Some(id) => format!("rule-status-{id}"),
        None => format!("rule-status-new-{index}"),
    }
}

fn set_rule_status(cell_id: &str, status: &RowStatus) {
    dom::set_text(cell_id, status.symbol());
    match status {
        RowStatus::Error(detail) => {
            if let Some(cell) = dom::by_id(cell_id) {
                let _ = cell.set_attribute("title", detail);
                cell.set_class_name("row-status error");
            }
        }
        _ => {
            if let Some(cell) = dom::by_id(cell_id) {
                let _ = cell.remove_attribute("title");
                cell.set_class_name("row-status");
            }
        }
    }
}

fn render_rules(store: &CrawlConfigStore) {
    let Some(body) = dom::by_id("allow-rules-body") else {
        return;
    };
    body.set_inner_html("");

    for index in store.sorted_rule_indices() {
        let Some(rule) = store.allow_rules.get(index) else {
            continue;
        };
        let Some(row) = dom::create("tr") else {
            continue;
        };

        let editing = store.edit.editing(EditKind::Allow) == Some(index);
        if editing {
            render_rule_editor(store, &row, index, rule);
        } else {
            render_rule_display(store, &row, index, rule);
        }
        let _ = body.append_child(&row);
    }
}

fn render_rule_display(store: &CrawlConfigStore, row: &Element, index: usize, rule: &AllowRule) {
    let icon = store.rule_auth_icon(rule);
    let types = &rule.types;
    let type_tags = [
        ("web", types.web),
        ("pdf", types.pdf),
        ("docx", types.docx),
        ("xlsx", types.xlsx),
        ("pptx", types.pptx),
    ]
    .iter()
    .filter(|(_, enabled)| *enabled)
    .map(|(name, _)| *name)
    .collect::<Vec<_>>()
    .join(", ");

    row.set_inner_html(&format!(
        "<td><code>{}</code></td><td>{}</td>\
         <td><span class=\"auth-icon\" title=\"{}\">{}</span></td>\
         <td>{}</td><td>{}</td><td>{}</td>\
         <td id=\"{}\" class=\"row-status\"></td>",
        dom::escape_html(&rule.pattern),
        rule.match_mode.as_str(),
        icon.title(),
        icon.symbol(),
        dom::escape_html(rule.auth_profile.as_deref().unwrap_or("—")),
        dom::escape_html(&type_tags),
        if rule.allow_http { "http ok" } else { "https" },
        rule_status_cell_id(rule, index),
    ));

    if let Some(actions) = dom::create("td") {
        actions.set_class_name("job-actions");
        append_button(&actions, "Edit", "secondary", move |_| {
            CRAWL_STORE.with(|store| {
                let mut store = store.borrow_mut();
                store.edit.begin(EditKind::Allow, index);
                render_rules(&store);
            });
        });

        let rule_id = rule.id.clone();
        append_button(&actions, "Delete", "danger", move |_| {
            delete_rule(index, rule_id.clone());
        });
        let _ = row.append_child(&actions);
    }
}

fn render_rule_editor(store: &CrawlConfigStore, row: &Element, index: usize, rule: &AllowRule) {
    // Pattern input.
    if let Some(cell) = dom::create("td") {
        if let Some(input) = dom::create_as::<HtmlInputElement>("input") {
            input.set_type("text");
            input.set_value(&rule.pattern);
            input.set_id("rule-edit-pattern");
            let _ = cell.append_child(&input);
        }
        let _ = row.append_child(&cell);
    }

    // Match mode select.
    if let Some(cell) = dom::create("td") {
        if let Some(select) = dom::create_as::<HtmlSelectElement>("select") {
            select.set_id("rule-edit-match");
            for mode in [MatchMode::Prefix, MatchMode::Exact] {
                if let Some(option) = dom::create("option") {
                    let _ = option.set_attribute("value", mode.as_str());
                    option.set_text_content(Some(mode.as_str()));
                    let _ = select.append_child(&option);
                }
            }
            select.set_value(rule.match_mode.as_str());
            let _ = cell.append_child(&select);
        }
        let _ = row.append_child(&cell);
    }

    // Auth status stays visible while editing.
    if let Some(cell) = dom::create("td") {
        let icon = store.rule_auth_icon(rule);
        cell.set_text_content(Some(icon.symbol()));
        let _ = cell.set_attribute("title", icon.title());
        let _ = row.append_child(&cell);
    }

    // Auth profile picker.
    if let Some(cell) = dom::create("td") {
        if let Some(select) = dom::create_as::<HtmlSelectElement>("select") {
            select.set_id("rule-edit-profile");
            if let Some(option) = dom::create("option") {
                let _ = option.set_attribute("value", "");
                option.set_text_content(Some("(none)"));
                let _ = select.append_child(&option);
            }
            for name in store.auth_profiles.keys() {
                if let Some(option) = dom::create("option") {
                    let _ = option.set_attribute("value", name);
                    option.set_text_content(Some(name));
                    let _ = select.append_child(&option);
                }
            }
            select.set_value(rule.auth_profile.as_deref().unwrap_or(""));
            let _ = cell.append_child(&select);
        }
        let _ = row.append_child(&cell);
    }

    // Type checkboxes.
    if let Some(cell) = dom::create("td") {
        cell.set_class_name("type-flags");
        for (name, checked) in [
            ("web", rule.types.web),
            ("pdf", rule.types.pdf),
            ("docx", rule.types.docx),
            ("xlsx", rule.types.xlsx),
            ("pptx", rule.types.pptx),
        ] {
            if let Some(label) = dom::create("label") {
                if let Some(checkbox) = dom::create_as::<HtmlInputElement>("input") {
                    checkbox.set_type("checkbox");
                    checkbox.set_checked(checked);
                    checkbox.set_id(&format!("rule-edit-type-{name}"));
                    let _ = label.append_child(&checkbox);
                }
                if let Some(text) = dom::web_document().map(|doc| doc.create_text_node(name)) {
                    let _ = label.append_child(&text);
                }
                let _ = cell.append_child(&label);
            }
        }
        let _ = row.append_child(&cell);
    }

    // Allow-http toggle; flipping it re-normalizes the pattern input live.
    if let Some(cell) = dom::create("td") {
        if let Some(toggle) = dom::create_as::<HtmlInputElement>("input") {
            toggle.set_type("checkbox");
            toggle.set_checked(rule.allow_http);
            toggle.set_id("rule-edit-http");
            dom::on_event(&toggle, "change", |_| {
                let allow_http = dom::checkbox_checked("rule-edit-http");
                let pattern = dom::input_value("rule-edit-pattern");
                if let Ok(normalized) = normalize_url_row(&pattern, allow_http) {
                    dom::set_input_value("rule-edit-pattern", &normalized);
                }
            });
            let _ = cell.append_child(&toggle);
        }
        let _ = row.append_child(&cell);
    }

    // Status cell.
    if let Some(cell) = dom::create("td") {
        cell.set_id(&rule_status_cell_id(rule, index));
        cell.set_class_name("row-status");
        let _ = row.append_child(&cell);
    }

    // Save / cancel.
    if let Some(actions) = dom::create("td") {
        actions.set_class_name("job-actions");
        let status_cell = rule_status_cell_id(rule, index);
        append_button(&actions, "Save", "", move |_| {
            save_rule_row(index, status_cell.clone());
        });
        append_button(&actions, "Cancel", "secondary", move |_| {
            CRAWL_STORE.with(|store| {
                let mut store = store.borrow_mut();
                // A never-saved blank row disappears on cancel.
                if store.allow_rules.get(index).map(|r| r.id.is_none() && r.pattern.is_empty())
                    == Some(true)
                {
                    store.allow_rules.remove(index);
                }
                store.edit.cancel(EditKind::Allow);
                render_rules(&store);
            });
        });
        let _ = row.append_child(&actions);
    }
}

fn rule_from_editor_inputs(existing: &AllowRule) -> AllowRule {
    let profile = dom::select_value("rule-edit-profile");
    AllowRule {
        id: existing.id.clone(),
        pattern: dom::input_value("rule-edit-pattern"),
        match_mode: dom::select_value("rule-edit-match")
            .parse()
            .unwrap_or(MatchMode::Prefix),
        types: TypeFlags {
            web: dom::checkbox_checked("rule-edit-type-web"),
            pdf: dom::checkbox_checked("rule-edit-type-pdf"),
            docx: dom::checkbox_checked("rule-edit-type-docx"),
            xlsx: dom::checkbox_checked("rule-edit-type-xlsx"),
            pptx: dom::checkbox_checked("rule-edit-type-pptx"),
        },
        allow_http: dom::checkbox_checked("rule-edit-http"),
        auth_profile: if profile.is_empty() {
            None
        } else {
            Some(profile)
        },
    }
}

/// Single-row persistence: PUT for rows that carry a server id, POST for
/// new rows. The row indicator walks saving → saved (cleared ~2 s later) or
/// sticks on error with the server text in its tooltip.
fn save_rule_row(index: usize, status_cell: String) {
    let draft = CRAWL_STORE.with(|store| {
        store
            .borrow()
            .allow_rules
            .get(index)
            .map(|rule| rule_from_editor_inputs(rule))
    });
    let Some(draft) = draft else {
        return;
    };

    let prepared = match CrawlConfigStore::prepare_rule_for_save(&draft) {
        Ok(rule) => rule,
        Err(err) => {
            dom::alert(&err.to_string());
            return;
        }
    };

    set_rule_status(&status_cell, &RowStatus::Saving);

    spawn_local(async move {
        let result = match prepared.id.as_deref() {
            Some(id) => {
                api::put_json::<Value>(&format!("/api/admin/allowed-urls/{id}"), &prepared).await
            }
            None => api::post_json::<Value>("/api/admin/allowed-urls", &prepared).await,
        };

        match result {
            Ok(response) => {
                set_rule_status(&status_cell, &RowStatus::Saved);
                {
                    let status_cell = status_cell.clone();
                    Timeout::new(SAVED_PILL_CLEAR_MS, move || {
                        set_rule_status(&status_cell, &RowStatus::Idle);
                    })
                    .forget();
                }

                let assigned_id = response
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or(prepared.id.clone());

                CRAWL_STORE.with(|store| {
                    let mut store = store.borrow_mut();
                    if let Some(rule) = store.allow_rules.get_mut(index) {
                        *rule = prepared.clone();
                    }
                    store.adopt_rule_id(index, assigned_id);
                    store.edit.cancel(EditKind::Allow);
                    render_rules(&store);
                });

                // The store reloads so the row reflects the server's copy.
                reload_all();
            }
            Err(err) => {
                set_rule_status(&status_cell, &RowStatus::Error(err.to_string()));
            }
        }
    });
}

fn delete_rule(index: usize, rule_id: Option<String>) {
    let remove_local = move || {
        CRAWL_STORE.with(|store| {
            let mut store = store.borrow_mut();
            if index < store.allow_rules.len() {
                store.allow_rules.remove(index);
            }
            store.edit.cancel(EditKind::Allow);
            render_rules(&store);
            render_recommendations(&store);
        });
    };

    match rule_id {
        Some(id) => {
            spawn_local(async move {
                match api::delete(&format!("/api/admin/allowed-urls/{id}")).await {
                    Ok(()) => {
                        remove_local();
                        save_allow_block_document();
                    }
                    Err(err) => dom::set_text("config-save-status", &err.to_string()),
                }
            });
        }
        None => {
            remove_local();
            save_allow_block_document();
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendations

fn render_recommendations(store: &CrawlConfigStore) {
    let Some(list) = dom::by_id("recommendation-list") else {
        return;
    };
    list.set_inner_html("");

    let (visible, hidden) = store.recommendation_view();
    dom::set_text("recommendation-status", "");

    if visible.is_empty() {
        dom::set_text("recommendation-status", "Nothing new discovered");
        dom::hide("recommendations-toggle");
        return;
    }

    for recommendation in &visible {
        let Some(row) = dom::create("li") else {
            continue;
        };
        row.set_class_name("config-row recommendation-row");

        if let Some(label) = dom::create("code") {
            label.set_text_content(Some(&recommendation.suggested_url));
            let _ = row.append_child(&label);
        }
        if let Some(count) = dom::create("span") {
            count.set_class_name("tag");
            count.set_text_content(Some(&format!("seen {}", recommendation.count)));
            let _ = row.append_child(&count);
        }

        let candidate = (*recommendation).clone();
        append_button(&row, "Allow", "", move |_| {
            accept_recommendation(candidate.clone());
        });
        let _ = list.append_child(&row);
    }

    if hidden > 0 {
        dom::show("recommendations-toggle");
        dom::set_text("recommendations-toggle", &format!("Show {hidden} more"));
    } else if store.recommendations_expanded {
        dom::show("recommendations-toggle");
        dom::set_text("recommendations-toggle", "Show fewer");
    } else {
        dom::hide("recommendations-toggle");
    }
}

fn accept_recommendation(recommendation: Recommendation) {
    let rule = CrawlConfigStore::rule_from_recommendation(&recommendation);
    spawn_local(async move {
        match api::post_json::<Value>("/api/admin/allowed-urls", &rule).await {
            Ok(_) => reload_all(),
            Err(err) => dom::set_text("recommendation-status", &err.to_string()),
        }
    });
}

fn purge_candidates() {
    if !dom::confirm_destructive(
        "This clears the discovery cache and its counts. Type DELETE to confirm.",
    ) {
        return;
    }
    spawn_local(async {
        match api::post_empty::<Value>("/api/admin/candidates/purge").await {
            Ok(_) => {
                CRAWL_STORE.with(|store| {
                    let mut store = store.borrow_mut();
                    store.set_recommendations(Vec::new());
                    render_recommendations(&store);
                });
            }
            Err(err) => dom::set_text("recommendation-status", &err.to_string()),
        }
    });
}

// ---------------------------------------------------------------------------
// Auth profiles

fn render_profiles(store: &CrawlConfigStore) {
    let Some(list) = dom::by_id("auth-profile-list") else {
        return;
    };
    list.set_inner_html("");

    if store.auth_profiles.is_empty() {
        if let Some(empty) = dom::create("li") {
            empty.set_class_name("profile-empty");
            empty.set_text_content(Some("No auth profiles configured"));
            let _ = list.append_child(&empty);
        }
        return;
    }

    for (name, profile) in &store.auth_profiles {
        let Some(row) = dom::create("li") else {
            continue;
        };
        row.set_class_name("config-row profile-row");

        let check = store.auth_results.get(name);
        let status = match check {
            Some(result) if result.ok => "✅",
            Some(_) => "❌",
            None => "⏳",
        };
        let detail = check
            .map(|result| {
                if result.ok {
                    format!("Validated {}", result.checked_at.as_deref().unwrap_or(""))
                } else if result.error_reason.is_empty() {
                    "Not validated".to_string()
                } else {
                    result.error_reason.clone()
                }
            })
            .unwrap_or_else(|| "Not tested yet".to_string());

        let mut label = format!(
            "<span class=\"auth-icon\" title=\"{}\">{}</span> <strong>{}</strong> \
             <code>{}</code>",
            dom::escape_html(&detail),
            status,
            dom::escape_html(name),
            dom::escape_html(&profile.storage_state_path),
        );
        if CrawlConfigStore::is_legacy_profile_name(name) {
            label.push_str(" <span class=\"tag\">migrated</span>");
        }

        if let Some(span) = dom::create("span") {
            span.set_class_name("profile-label");
            span.set_inner_html(&label);
            let _ = row.append_child(&span);
        }

        let test_name = name.clone();
        append_button(&row, "Test", "", move |_| {
            test_auth_profile(test_name.clone());
        });

        let edit_name = name.clone();
        let edit_profile = profile.clone();
        append_button(&row, "Edit", "secondary", move |_| {
            fill_profile_form(&edit_name, &edit_profile);
        });

        let delete_name = name.clone();
        append_button(&row, "Delete", "danger", move |_| {
            delete_profile(delete_name.clone());
        });

        let _ = list.append_child(&row);
    }
}

fn fill_profile_form(name: &str, profile: &AuthProfile) {
    dom::set_input_value("profile-name", name);
    dom::set_input_value("profile-storage-path", &profile.storage_state_path);
    dom::set_input_value("profile-test-url", profile.test_url.as_deref().unwrap_or(""));
    dom::set_input_value(
        "profile-start-url",
        profile.start_url.as_deref().unwrap_or(""),
    );
    dom::set_input_value("profile-domains", &profile.use_for_domains.join(", "));
    CRAWL_STORE.with(|store| {
        store.borrow_mut().edit.auth_profile = Some(name.to_string());
    });
}

fn clear_profile_form() {
    for field in [
        "profile-name",
        "profile-storage-path",
        "profile-test-url",
        "profile-start-url",
        "profile-domains",
    ] {
        dom::set_input_value(field, "");
    }
    dom::set_text("profile-status", "");
    CRAWL_STORE.with(|store| {
        store.borrow_mut().edit.auth_profile = None;
    });
}

fn profile_from_form() -> Option<(String, AuthProfile)> {
    let name = dom::input_value("profile-name").trim().to_string();
    if name.is_empty() {
        dom::set_text("profile-status", "Profile name is required");
        return None;
    }

    let storage_state_path = dom::input_value("profile-storage-path").trim().to_string();
    if storage_state_path.is_empty() {
        dom::set_text("profile-status", "storage_state_path is required");
        return None;
    }

    let mut optional_url = |id: &str| -> Result<Option<String>, ()> {
        let value = dom::input_value(id).trim().to_string();
        if value.is_empty() {
            return Ok(None);
        }
        match normalize_url_row(&value, false) {
            Ok(url) => Ok(Some(url)),
            Err(err) => {
                // Blocking alert; the form keeps the bad value for editing.
                dom::alert(&err.to_string());
                Err(())
            }
        }
    };

    let Ok(test_url) = optional_url("profile-test-url") else {
        return None;
    };
    let Ok(start_url) = optional_url("profile-start-url") else {
        return None;
    };

    let use_for_domains = dom::input_value("profile-domains")
        .split(',')
        .map(normalize_domain_input)
        .filter(|domain| !domain.is_empty())
        .collect();

    Some((
        name,
        AuthProfile {
            storage_state_path,
            test_url,
            start_url,
            use_for_domains,
        },
    ))
}

/// Profiles persist immediately through the partial playwright-settings
/// update.
fn save_profile_from_form() {
    let Some((name, profile)) = profile_from_form() else {
        return;
    };

    let profiles = CRAWL_STORE.with(|store| {
        let mut store = store.borrow_mut();
        store.auth_profiles.insert(name.clone(), profile);
        store.crawler.playwright.auth_profiles = store.auth_profiles.clone();
        store.auth_profiles.clone()
    });

    push_playwright_profiles(profiles, "profile-status");
    clear_profile_form();
}

fn delete_profile(name: String) {
    let confirmed = web_sys::window()
        .and_then(|window| {
            window
                .confirm_with_message(&format!("Delete auth profile \"{name}\"?"))
                .ok()
        })
        .unwrap_or(false);
    if !confirmed {
        return;
    }

    let profiles = CRAWL_STORE.with(|store| {
        let mut store = store.borrow_mut();
        store.auth_profiles.remove(&name);
        store.crawler.playwright.auth_profiles = store.auth_profiles.clone();
        store.auth_profiles.clone()
    });

    push_playwright_profiles(profiles, "profile-status");
}

fn push_playwright_profiles(
    profiles: std::collections::BTreeMap<String, AuthProfile>,
    status_id: &'static str,
) {
    spawn_local(async move {
        let payload = json!({ "auth_profiles": profiles });
        match api::put_json::<Value>("/api/admin/playwright-settings", &payload).await {
            Ok(_) => {
                dom::set_text(status_id, "Saved");
                Timeout::new(SAVED_PILL_CLEAR_MS, move || {
                    dom::set_text(status_id, "");
                })
                .forget();
                CRAWL_STORE.with(|store| render_profiles(&store.borrow()));
            }
            Err(err) => dom::set_text(status_id, &err.to_string()),
        }
    });
}

fn test_auth_profile(name: String) {
    dom::set_text("profile-status", &format!("Testing {name}…"));
    spawn_local(async move {
        match api::post_json::<AuthCheckResponse>(
            "/api/crawl/test-auth",
            &json!({ "profile_name": name }),
        )
        .await
        {
            Ok(response) => {
                dom::set_text("profile-status", "");
                CRAWL_STORE.with(|store| {
                    let mut store = store.borrow_mut();
                    for (profile, result) in response.results {
                        store.auth_results.insert(profile, result);
                    }
                    render_profiles(&store);
                });
                // The per-rule overlay is derived from test results.
                refresh_auth_overlay();
            }
            Err(err) => dom::set_text("profile-status", &err.to_string()),
        }
    });
}

// ---------------------------------------------------------------------------
// Legacy migration

fn render_migration_banner(store: &CrawlConfigStore) {
    if store.needs_legacy_migration() {
        dom::show("legacy-migration-banner");
    } else {
        dom::hide("legacy-migration-banner");
    }
}

fn run_legacy_migration() {
    let migrated = CRAWL_STORE.with(|store| {
        let mut store = store.borrow_mut();
        let migrated = store.migrate_legacy_profile();
        render_profiles(&store);
        render_migration_banner(&store);
        migrated.map(|_| store.crawler.playwright.auth_profiles.clone())
    });
    let Some(profiles) = migrated else {
        return;
    };

    // Persist the profile and delete the flat fields in one partial update.
    spawn_local(async move {
        let payload = json!({
            "auth_profiles": profiles,
            "storage_state_path": Value::Null,
            "use_for_domains": Value::Null,
        });
        match api::put_json::<Value>("/api/admin/playwright-settings", &payload).await {
            Ok(_) => {
                dom::set_text("profile-status", "Legacy profile migrated");
                Timeout::new(SAVED_PILL_CLEAR_MS, || {
                    dom::set_text("profile-status", "");
                })
                .forget();
            }
            Err(err) => dom::set_text("profile-status", &err.to_string()),
        }
    });
}

// ---------------------------------------------------------------------------
// Agents + ingest tuning documents

fn render_agents(doc: &AgentsConfig) {
    for name in AGENT_NAMES {
        let prompt = doc
            .agents
            .get(name)
            .map(|agent| agent.system_prompt.clone())
            .unwrap_or_default();
        if let Some(area) = dom::by_id_as::<web_sys::HtmlTextAreaElement>(&format!(
            "agent-prompt-{name}"
        )) {
            area.set_value(&prompt);
        }
    }
    dom::set_text("agents-status", "");
}

fn save_agents() {
    let mut doc = AGENTS_DOC
        .with(|slot| slot.borrow().clone())
        .unwrap_or_default();

    for name in AGENT_NAMES {
        let Some(area) =
            dom::by_id_as::<web_sys::HtmlTextAreaElement>(&format!("agent-prompt-{name}"))
        else {
            continue;
        };
        doc.agents.entry(name.to_string()).or_default().system_prompt = area.value();
    }

    dom::set_text("agents-status", "Saving…");
    spawn_local(async move {
        match api::put_json::<Value>("/api/admin/config/agents", &doc).await {
            Ok(_) => {
                AGENTS_DOC.with(|slot| *slot.borrow_mut() = Some(doc));
                dom::set_text("agents-status", "Saved");
                Timeout::new(SAVED_PILL_CLEAR_MS, || {
                    dom::set_text("agents-status", "");
                })
                .forget();
            }
            Err(err) => dom::set_text("agents-status", &err.to_string()),
        }
    });
}

fn render_ingest_config(doc: &IngestConfig) {
    let set_number = |id: &str, value: Option<i64>| {
        dom::set_input_value(id, &value.map(|v| v.to_string()).unwrap_or_default());
    };
    set_number("ingest-chunk-size", doc.chunk_size);
    set_number("ingest-chunk-overlap", doc.chunk_overlap);
    set_number("ingest-batch-size", doc.batch_size);
    dom::set_text("ingest-config-status", "");
}

fn save_ingest_config() {
    let mut doc = INGEST_DOC
        .with(|slot| slot.borrow().clone())
        .unwrap_or_default();

    let number = |id: &str| dom::input_value(id).trim().parse::<i64>().ok();
    doc.chunk_size = number("ingest-chunk-size");
    doc.chunk_overlap = number("ingest-chunk-overlap");
    doc.batch_size = number("ingest-batch-size");

    dom::set_text("ingest-config-status", "Saving…");
    spawn_local(async move {
        match api::put_json::<Value>("/api/admin/config/ingest", &doc).await {
            Ok(_) => {
                INGEST_DOC.with(|slot| *slot.borrow_mut() = Some(doc));
                dom::set_text("ingest-config-status", "Saved");
                Timeout::new(SAVED_PILL_CLEAR_MS, || {
                    dom::set_text("ingest-config-status", "");
                })
                .forget();
            }
            Err(err) => dom::set_text("ingest-config-status", &err.to_string()),
        }
    });
}

// ---------------------------------------------------------------------------

fn append_button(
    parent: &Element,
    label: &str,
    class_name: &str,
    handler: impl FnMut(web_sys::Event) + 'static,
) {
    let Some(button) = dom::create_as::<HtmlElement>("button") else {
        return;
    };
    button.set_text_content(Some(label));
    if !class_name.is_empty() {
        button.set_class_name(class_name);
    }
    dom::on_event(&button, "click", handler);
    let _ = parent.append_child(&button);
}
