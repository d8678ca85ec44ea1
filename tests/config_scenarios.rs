//! Scenario tests for the crawl configuration store: per-row save payloads,
//! scheme rejection, and the save/reload identity.

use ragai_console::config_store::{CrawlConfigStore, EditKind, RowStatus, RuleSaveError};
use ragai_console::models::{AllowRule, MatchMode, TypeFlags};
use ragai_console::normalize::normalize_url_row;
use serde_json::json;

#[test]
fn editing_an_existing_rule_produces_the_row_put_payload() {
    let mut store = CrawlConfigStore::new();
    store.load_allow_block(
        serde_json::from_value(json!({
            "allow_rules": [{"id": "r7", "pattern": "https://x.com/"}],
        }))
        .unwrap(),
    );

    store.edit.begin(EditKind::Allow, 0);
    let mut draft = store.allow_rules[0].clone();
    draft.pattern = "https://x.com/docs".to_string();

    let prepared = CrawlConfigStore::prepare_rule_for_save(&draft).unwrap();
    assert_eq!(prepared.id.as_deref(), Some("r7"));
    assert_eq!(prepared.pattern, "https://x.com/docs/");
    assert_eq!(prepared.match_mode, MatchMode::Prefix);
    assert!(prepared.types.web);
    assert!(!prepared.allow_http);
    assert!(prepared.auth_profile.is_none());

    let payload = serde_json::to_value(&prepared).unwrap();
    assert_eq!(payload["pattern"], "https://x.com/docs/");
    assert_eq!(payload["match"], "prefix");
    assert_eq!(payload["allow_http"], false);

    // The indicator walks idle → saving → saved.
    let mut status = RowStatus::Idle;
    assert_eq!(status.symbol(), "");
    status = RowStatus::Saving;
    assert_eq!(status.symbol(), "⏳");
    status = RowStatus::Saved;
    assert_eq!(status.symbol(), "✓");

    store.adopt_rule_id(0, Some("r7".to_string()));
    store.edit.cancel(EditKind::Allow);
    assert_eq!(store.edit.editing(EditKind::Allow), None);
}

#[test]
fn foreign_scheme_is_rejected_with_the_exact_alert_text() {
    let err = normalize_url_row("ftp://x.com", false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid scheme \"ftp\". Only http:// and https:// are allowed."
    );

    // The store is untouched by a rejected add.
    let rule = AllowRule {
        id: None,
        pattern: "ftp://x.com".to_string(),
        match_mode: MatchMode::Prefix,
        types: TypeFlags::default(),
        allow_http: false,
        auth_profile: None,
    };
    assert!(matches!(
        CrawlConfigStore::prepare_rule_for_save(&rule),
        Err(RuleSaveError::Scheme(_))
    ));
}

#[test]
fn saving_and_reloading_the_document_is_an_identity_for_rendering() {
    let mut store = CrawlConfigStore::new();
    store.load_allow_block(
        serde_json::from_value(json!({
            "seeds": ["b.example.com", {"url": "a.example.com"}],
            "blocked": ["https://ads.example.com/pixel"],
            "allow_rules": [
                {"pattern": "x.com/docs", "match": "prefix", "types": {"pdf": true}},
                "y.com",
            ],
        }))
        .unwrap(),
    );

    let document = serde_json::to_value(store.allow_block_document()).unwrap();
    let mut reloaded = CrawlConfigStore::new();
    reloaded.load_allow_block(serde_json::from_value(document).unwrap());

    assert_eq!(reloaded.blocked, store.blocked);
    assert_eq!(reloaded.allow_rules, store.allow_rules);
    // Seeds are sorted on save; the rendered set is unchanged.
    let mut expected = store.seeds.clone();
    expected.sort_by(|a, b| a.url.cmp(&b.url));
    assert_eq!(reloaded.seeds, expected);
}

#[test]
fn covered_recommendation_disappears_after_rule_save() {
    let mut store = CrawlConfigStore::new();
    store.set_recommendations(vec![ragai_console::models::Recommendation {
        suggested_url: "https://new.example.com/wiki/".to_string(),
        count: 9,
        seen_types: TypeFlags::default(),
    }]);
    assert_eq!(store.filtered_recommendations().len(), 1);

    let rule =
        CrawlConfigStore::rule_from_recommendation(&store.recommendations[0].clone());
    store.allow_rules.push(rule);

    assert!(store.is_url_already_allowed("https://new.example.com/wiki/"));
    assert!(store.filtered_recommendations().is_empty());
}
