//! Pipeline health cards plus the check-URL and text-search data tools.
//! Rendering is total: absent or misshapen subtrees come out as "unknown"
//! rather than breaking the pane.

use ragai_console::models::{ApiHealth, HealthReport, SearchResults, UrlCheckReport};
use serde_json::{json, Value};
use wasm_bindgen_futures::spawn_local;

use crate::{api, dom};

pub fn init() {
    dom::on_click("health-refresh", |_| refresh());
    dom::on_click("check-url-run", |_| run_check_url());
    dom::on_click("data-search-run", |_| run_search());
}

pub fn refresh() {
    spawn_local(async {
        match api::get_json::<HealthReport>("/api/admin/data/health").await {
            Ok(report) => render_health_cards(&report),
            Err(err) => {
                if matches!(err, api::ApiError::Network(_)) {
                    crate::admin::show_banner(&err.to_string());
                }
                dom::set_text("health-status", &err.to_string());
            }
        }
    });

    spawn_local(async {
        match api::get_json::<ApiHealth>("/api/health").await {
            Ok(health) => render_api_strip(&health),
            Err(_) => {
                dom::set_text("api-health-strip", "API unreachable");
                dom::set_class("api-health-strip", "api-strip error");
            }
        }
    });
}

/// Scalar lookup down a path of keys; anything non-scalar renders as "—".
fn value_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Null) | None => "—".to_string(),
        Some(_) => "—".to_string(),
    }
}

/// Card state color: each card keys off its own status field.
fn card_state(name: &str, subtree: &Value) -> &'static str {
    let status = match name {
        "crawl" => scalar_text(value_at(subtree, &["last_job_status"])),
        "ingest" => scalar_text(value_at(subtree, &["worker_status"])),
        "qdrant" => scalar_text(value_at(subtree, &["status"])),
        "system" => scalar_text(value_at(subtree, &["api"])),
        _ => scalar_text(value_at(subtree, &["status"])),
    };

    match status.to_lowercase().as_str() {
        "ok" | "green" | "healthy" | "completed" | "running" | "alive" | "up" => "success",
        "failed" | "error" | "red" | "down" => "error",
        "—" => "unknown",
        _ => "warning",
    }
}

fn render_health_cards(report: &HealthReport) {
    let Some(container) = dom::by_id("health-cards") else {
        return;
    };
    container.set_inner_html("");
    dom::set_text("health-status", "");

    let cards = [
        ("artifacts", "Artifacts", &report.artifacts),
        ("crawl", "Crawler", &report.crawl),
        ("ingest", "Ingest", &report.ingest),
        ("qdrant", "Qdrant", &report.qdrant),
        ("system", "System", &report.system),
    ];

    for (name, title, subtree) in cards {
        let Some(card) = dom::create("div") else {
            continue;
        };
        card.set_class_name(&format!("health-card {}", card_state(name, subtree)));

        let mut html = format!("<h4>{title}</h4><dl>");
        match subtree {
            Value::Object(map) => {
                for (key, value) in map {
                    html.push_str(&format!(
                        "<dt>{}</dt><dd>{}</dd>",
                        dom::escape_html(key),
                        dom::escape_html(&scalar_text(Some(value))),
                    ));
                }
                if map.is_empty() {
                    html.push_str("<dt>status</dt><dd>unknown</dd>");
                }
            }
            _ => {
                html.push_str("<dt>status</dt><dd>unknown</dd>");
            }
        }
        html.push_str("</dl>");
        card.set_inner_html(&html);
        let _ = container.append_child(&card);
    }
}

fn render_api_strip(health: &ApiHealth) {
    let text = format!(
        "API {} · Ollama {} · Qdrant {} · model {}",
        scalar_text(Some(&health.api)),
        scalar_text(Some(&health.ollama)),
        scalar_text(Some(&health.qdrant)),
        scalar_text(Some(&health.model)),
    );
    dom::set_text("api-health-strip", &text);
    dom::set_class("api-health-strip", "api-strip");
}

fn run_check_url() {
    let url = dom::input_value("check-url-input");
    let url = url.trim().to_string();
    if url.is_empty() {
        return;
    }

    dom::set_text("check-url-status", "Looking up…");
    spawn_local(async move {
        match api::post_json::<UrlCheckReport>("/api/admin/data/check_url", &json!({ "url": url }))
            .await
        {
            Ok(report) => {
                dom::set_text("check-url-status", "");
                render_check_tiles(&report);
            }
            Err(err) => dom::set_text("check-url-status", &err.to_string()),
        }
    });
}

/// Four tiles, each rendering present/absent the same way.
fn render_check_tiles(report: &UrlCheckReport) {
    let Some(container) = dom::by_id("check-url-tiles") else {
        return;
    };
    container.set_inner_html("");

    let tiles = [
        ("Artifact", &report.artifact),
        ("Validation", &report.validation),
        ("Ingest", &report.ingest),
        ("Qdrant", &report.qdrant),
    ];

    for (title, subtree) in tiles {
        let Some(tile) = dom::create("div") else {
            continue;
        };
        let present = !subtree.is_null() && *subtree != json!(false) && *subtree != json!({});
        tile.set_class_name(if present {
            "check-tile present"
        } else {
            "check-tile absent"
        });

        let mut html = format!("<h5>{title}</h5>");
        match subtree {
            Value::Object(map) if !map.is_empty() => {
                html.push_str("<dl>");
                for (key, value) in map {
                    html.push_str(&format!(
                        "<dt>{}</dt><dd>{}</dd>",
                        dom::escape_html(key),
                        dom::escape_html(&scalar_text(Some(value))),
                    ));
                }
                html.push_str("</dl>");
            }
            Value::Bool(true) => html.push_str("<p>Present</p>"),
            _ => html.push_str("<p class=\"dim\">Not found</p>"),
        }
        tile.set_inner_html(&html);
        let _ = container.append_child(&tile);
    }
}

fn run_search() {
    let query = dom::input_value("data-search-input");
    let query = query.trim().to_string();
    if query.is_empty() {
        return;
    }

    dom::set_text("data-search-status", "Searching…");
    spawn_local(async move {
        match api::post_json::<SearchResults>(
            "/api/admin/data/search",
            &json!({ "query": query, "limit": 10 }),
        )
        .await
        {
            Ok(results) => {
                dom::set_text("data-search-status", "");
                render_hits("search-artifacts", &results.artifacts);
                render_hits("search-qdrant", &results.qdrant);
            }
            Err(err) => dom::set_text("data-search-status", &err.to_string()),
        }
    });
}

fn render_hits(container_id: &str, hits: &[ragai_console::models::SearchHit]) {
    let Some(container) = dom::by_id(container_id) else {
        return;
    };
    container.set_inner_html("");

    if hits.is_empty() {
        if let Some(empty) = dom::create("li") {
            empty.set_class_name("dim");
            empty.set_text_content(Some("No matches"));
            let _ = container.append_child(&empty);
        }
        return;
    }

    for hit in hits {
        let Some(item) = dom::create("li") else {
            continue;
        };
        let title = if hit.title.trim().is_empty() {
            hit.url.as_str()
        } else {
            hit.title.as_str()
        };
        let score = hit
            .score
            .map(|score| format!(" <span class=\"tag\">{score:.3}</span>"))
            .unwrap_or_default();
        let snippet: String = hit.text.chars().take(240).collect();
        item.set_inner_html(&format!(
            "<strong>{}</strong>{} <br><code>{}</code><p>{}</p>",
            dom::escape_html(title),
            score,
            dom::escape_html(&hit.url),
            dom::escape_html(&snippet),
        ));
        let _ = container.append_child(&item);
    }
}
