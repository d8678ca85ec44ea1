//! In-memory editable model for the crawl configuration workspace: seeds,
//! blocked domains, allow-rules, auth profiles, recommendations, and the
//! auth-status overlay. Views render pure projections of this store and
//! mutate it only from event handlers.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{
    AllowBlockConfig, AllowRule, AuthCheckResult, AuthProfile, AuthStatusOverlay, CrawlerConfig,
    MatchMode, Recommendation, Seed, UiAuthStatus, LEGACY_PROFILE_NAME,
};
use crate::normalize::{
    normalize_allow_rule, normalize_domain_input, normalize_seed, normalize_url_row, SchemeError,
};

/// How many recommendations render before the expand toggle.
pub const RECOMMENDATION_PREVIEW: usize = 3;

/// Row kinds that participate in single-row edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Seed,
    Blocked,
    Allow,
}

/// At most one row per kind is in edit mode; entering edit mode on another
/// row of the same kind cancels the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditState {
    pub seed: Option<usize>,
    pub blocked: Option<usize>,
    pub allow: Option<usize>,
    pub auth_profile: Option<String>,
}

impl EditState {
    pub fn begin(&mut self, kind: EditKind, index: usize) {
        match kind {
            EditKind::Seed => self.seed = Some(index),
            EditKind::Blocked => self.blocked = Some(index),
            EditKind::Allow => self.allow = Some(index),
        }
    }

    pub fn cancel(&mut self, kind: EditKind) {
        match kind {
            EditKind::Seed => self.seed = None,
            EditKind::Blocked => self.blocked = None,
            EditKind::Allow => self.allow = None,
        }
    }

    pub fn editing(&self, kind: EditKind) -> Option<usize> {
        match kind {
            EditKind::Seed => self.seed,
            EditKind::Blocked => self.blocked,
            EditKind::Allow => self.allow,
        }
    }
}

/// Per-row persistence indicator: `idle → saving → saved` (auto-cleared) or
/// sticky `error` with the server's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RowStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error(String),
}

impl RowStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Saving => "⏳",
            Self::Saved => "✓",
            Self::Error(_) => "✗",
        }
    }
}

/// Auth-status icon derived from the overlay, the rule's profile, and
/// playwright availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthIcon {
    CannotTest,
    Valid,
    Invalid,
    NeedsProfile,
    Pending,
    None,
}

impl AuthIcon {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::CannotTest => "⚠️",
            Self::Valid => "✅",
            Self::Invalid => "❌",
            Self::NeedsProfile => "🔒",
            Self::Pending => "⏳",
            Self::None => "—",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::CannotTest => "Auth profile set but Playwright is unavailable",
            Self::Valid => "Auth profile validated",
            Self::Invalid => "Auth test failed",
            Self::NeedsProfile => "Auth required but no profile assigned",
            Self::Pending => "Auth profile not tested yet",
            Self::None => "No auth profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSaveError {
    #[error("Pattern must not be empty.")]
    EmptyPattern,
    #[error(transparent)]
    Scheme(#[from] SchemeError),
}

#[derive(Debug, Default)]
pub struct CrawlConfigStore {
    pub seeds: Vec<Seed>,
    pub blocked: Vec<String>,
    pub allow_rules: Vec<AllowRule>,
    pub auth_profiles: BTreeMap<String, AuthProfile>,
    pub crawler: CrawlerConfig,
    pub allow_block_extra: BTreeMap<String, Value>,
    pub recommendations: Vec<Recommendation>,
    pub overlay: AuthStatusOverlay,
    pub auth_results: BTreeMap<String, AuthCheckResult>,
    pub edit: EditState,
    pub recommendations_expanded: bool,
}

impl CrawlConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the seeds/blocked/allow-rules slice of the store from a
    /// freshly fetched document. Rows are canonicalized on the way in; rows
    /// that normalize to nothing are dropped.
    pub fn load_allow_block(&mut self, doc: AllowBlockConfig) {
        self.seeds = doc
            .seeds
            .iter()
            .map(normalize_seed)
            .filter(|seed| !seed.url.is_empty())
            .collect();
        self.blocked = doc
            .blocked_domains
            .iter()
            .map(|raw| normalize_domain_input(raw))
            .filter(|domain| !domain.is_empty())
            .collect();
        self.allow_rules = doc
            .allow_rules
            .iter()
            .map(normalize_allow_rule)
            .filter(|rule| !rule.pattern.is_empty())
            .collect();
        self.allow_block_extra = doc.extra;
        self.edit = EditState::default();
    }

    /// Replace the crawler document (auth profiles live inside its
    /// `playwright` block).
    pub fn load_crawler(&mut self, doc: CrawlerConfig) {
        self.auth_profiles = doc.playwright.auth_profiles.clone();
        self.crawler = doc;
    }

    pub fn set_recommendations(&mut self, items: Vec<Recommendation>) {
        self.recommendations = items;
    }

    pub fn set_overlay(&mut self, overlay: AuthStatusOverlay) {
        self.overlay = overlay;
    }

    pub fn set_auth_results(&mut self, results: BTreeMap<String, AuthCheckResult>) {
        self.auth_results = results;
    }

    /// The persistable seeds/blocked document. Seeds sort lexicographically
    /// on save; the allow-rule list is mirrored for legacy consumers of the
    /// batch document (per-row CRUD remains the primary path).
    pub fn allow_block_document(&self) -> AllowBlockConfig {
        let mut seeds = self.seeds.clone();
        seeds.sort_by(|a, b| a.url.cmp(&b.url));

        let mut blocked = self.blocked.clone();
        blocked.sort();

        AllowBlockConfig {
            seeds: seeds
                .iter()
                .map(|seed| serde_json::to_value(seed).unwrap_or(Value::Null))
                .collect(),
            blocked_domains: blocked,
            allow_rules: self
                .allow_rules
                .iter()
                .map(|rule| serde_json::to_value(rule).unwrap_or(Value::Null))
                .collect(),
            extra: self.allow_block_extra.clone(),
        }
    }

    /// Display ordering: case-insensitive lexicographic, store order
    /// untouched.
    pub fn sorted_seed_indices(&self) -> Vec<usize> {
        sorted_indices(&self.seeds, |seed| &seed.url)
    }

    pub fn sorted_blocked_indices(&self) -> Vec<usize> {
        sorted_indices(&self.blocked, |domain| domain)
    }

    pub fn sorted_rule_indices(&self) -> Vec<usize> {
        sorted_indices(&self.allow_rules, |rule| &rule.pattern)
    }

    /// Coverage predicate shared by the recommendation filter and
    /// `is_url_already_allowed`: exact rules compare for equality, prefix
    /// rules by prefix, both against the pattern as typed.
    pub fn is_url_already_allowed(&self, url: &str) -> bool {
        self.allow_rules.iter().any(|rule| match rule.match_mode {
            MatchMode::Exact => url == rule.pattern,
            MatchMode::Prefix => url.starts_with(&rule.pattern),
        })
    }

    /// Recommendations not yet covered by any rule, highest count first.
    pub fn filtered_recommendations(&self) -> Vec<&Recommendation> {
        let mut items: Vec<&Recommendation> = self
            .recommendations
            .iter()
            .filter(|rec| !self.is_url_already_allowed(&rec.suggested_url))
            .collect();
        items.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.suggested_url.cmp(&b.suggested_url))
        });
        items
    }

    /// The preview slice and the count hidden behind the expand toggle.
    pub fn recommendation_view(&self) -> (Vec<&Recommendation>, usize) {
        let filtered = self.filtered_recommendations();
        if self.recommendations_expanded || filtered.len() <= RECOMMENDATION_PREVIEW {
            let hidden = 0;
            (filtered, hidden)
        } else {
            let hidden = filtered.len() - RECOMMENDATION_PREVIEW;
            (
                filtered.into_iter().take(RECOMMENDATION_PREVIEW).collect(),
                hidden,
            )
        }
    }

    /// Build the rule a recommendation turns into: normalized without http,
    /// web forced on when the discovery saw no types.
    pub fn rule_from_recommendation(rec: &Recommendation) -> AllowRule {
        let pattern =
            normalize_url_row(&rec.suggested_url, false).unwrap_or_else(|_| rec.suggested_url.clone());
        AllowRule {
            id: None,
            pattern,
            match_mode: MatchMode::Prefix,
            types: rec.seen_types.or_web(),
            allow_http: false,
            auth_profile: None,
        }
    }

    /// Flip a rule's `allow_http` and re-normalize its pattern under the new
    /// flag.
    pub fn toggle_allow_http(&mut self, index: usize) {
        let Some(rule) = self.allow_rules.get_mut(index) else {
            return;
        };
        rule.allow_http = !rule.allow_http;
        if let Ok(pattern) = normalize_url_row(&rule.pattern, rule.allow_http) {
            rule.pattern = pattern;
        }
    }

    /// Validate and canonicalize a rule for a single-row PUT/POST: pattern
    /// normalized under `allow_http`, prefix patterns slash-terminated
    /// (unless the last segment looks like a file), at least one type flag.
    pub fn prepare_rule_for_save(rule: &AllowRule) -> Result<AllowRule, RuleSaveError> {
        let pattern = normalize_url_row(&rule.pattern, rule.allow_http)?;
        if pattern.is_empty() {
            return Err(RuleSaveError::EmptyPattern);
        }

        let pattern = if rule.match_mode == MatchMode::Prefix {
            complete_prefix_pattern(pattern)
        } else {
            pattern
        };

        Ok(AllowRule {
            id: rule.id.clone(),
            pattern,
            match_mode: rule.match_mode,
            types: rule.types.or_web(),
            allow_http: rule.allow_http,
            auth_profile: rule
                .auth_profile
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        })
    }

    /// Adopt the server-assigned id after a successful row save.
    pub fn adopt_rule_id(&mut self, index: usize, id: Option<String>) {
        if let Some(rule) = self.allow_rules.get_mut(index) {
            if id.is_some() {
                rule.id = id;
            }
        }
    }

    /// Icon for one allow-rule row, per the derivation table.
    pub fn rule_auth_icon(&self, rule: &AllowRule) -> AuthIcon {
        let has_profile = rule.auth_profile.is_some();
        if has_profile && !self.overlay.playwright_available {
            return AuthIcon::CannotTest;
        }
        match self.overlay.lookup(rule).map(|status| status.ui_status) {
            Some(UiAuthStatus::Valid) => AuthIcon::Valid,
            Some(UiAuthStatus::Invalid) => AuthIcon::Invalid,
            Some(UiAuthStatus::NeedsProfile) => AuthIcon::NeedsProfile,
            Some(UiAuthStatus::CannotTest) => AuthIcon::CannotTest,
            Some(UiAuthStatus::Unknown) | None => {
                if has_profile {
                    AuthIcon::Pending
                } else {
                    AuthIcon::None
                }
            }
        }
    }

    /// `default` is accepted as a read-side synonym for the migrated
    /// profile; writes always use `legacy_migrated`.
    pub fn is_legacy_profile_name(name: &str) -> bool {
        name == LEGACY_PROFILE_NAME || name == "default"
    }

    pub fn needs_legacy_migration(&self) -> bool {
        self.crawler.playwright.needs_legacy_migration()
    }

    /// Synthesize the `legacy_migrated` profile from the flat playwright
    /// fields and delete them. Returns the profile to persist, or `None`
    /// when the migration condition does not hold.
    pub fn migrate_legacy_profile(&mut self) -> Option<AuthProfile> {
        if !self.needs_legacy_migration() {
            return None;
        }

        let playwright = &mut self.crawler.playwright;
        let profile = AuthProfile {
            storage_state_path: playwright.storage_state_path.take().unwrap_or_default(),
            test_url: None,
            start_url: None,
            use_for_domains: std::mem::take(&mut playwright.use_for_domains),
        };
        playwright
            .auth_profiles
            .insert(LEGACY_PROFILE_NAME.to_string(), profile.clone());
        self.auth_profiles
            .insert(LEGACY_PROFILE_NAME.to_string(), profile.clone());
        Some(profile)
    }
}

/// Prefix patterns get a terminating slash so `…/docs` cannot match
/// `…/docsearch`; path tails that look like files keep their shape.
fn complete_prefix_pattern(mut pattern: String) -> String {
    if pattern.ends_with('/') {
        return pattern;
    }
    let tail = pattern
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if !tail.contains('.') {
        pattern.push('/');
    }
    pattern
}

fn sorted_indices<T, F, K>(items: &[T], key: F) -> Vec<usize>
where
    F: Fn(&T) -> &K,
    K: AsRef<str> + ?Sized,
{
    let mut indices: Vec<usize> = (0..items.len()).collect();
    indices.sort_by_key(|&index| key(&items[index]).as_ref().to_lowercase());
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TypeFlags;
    use serde_json::json;

    fn rule(pattern: &str, match_mode: MatchMode) -> AllowRule {
        AllowRule {
            id: None,
            pattern: pattern.to_string(),
            match_mode,
            types: TypeFlags::default(),
            allow_http: false,
            auth_profile: None,
        }
    }

    fn store_with_rules(rules: Vec<AllowRule>) -> CrawlConfigStore {
        let mut store = CrawlConfigStore::new();
        store.allow_rules = rules;
        store
    }

    #[test]
    fn load_allow_block_normalizes_mixed_shapes() {
        let mut store = CrawlConfigStore::new();
        let doc: AllowBlockConfig = serde_json::from_value(json!({
            "seeds": ["x.com", {"url": "http://y.com", "allow_http": true}],
            "blocked": ["https://ads.example.com/track"],
            "allow_rules": [
                "docs.example.com",
                {"pattern": "https://x.com/", "authProfile": "campus"},
            ],
        }))
        .unwrap();
        store.load_allow_block(doc);

        assert_eq!(store.seeds[0].url, "https://x.com/");
        assert_eq!(store.seeds[1].url, "http://y.com/");
        assert_eq!(store.blocked, vec!["ads.example.com".to_string()]);
        assert_eq!(store.allow_rules[0].pattern, "https://docs.example.com/");
        assert_eq!(store.allow_rules[1].auth_profile.as_deref(), Some("campus"));
    }

    #[test]
    fn allow_block_document_sorts_seeds_on_save() {
        let mut store = CrawlConfigStore::new();
        store.seeds = vec![
            Seed {
                url: "https://zeta.com/".to_string(),
                allow_http: false,
            },
            Seed {
                url: "https://alpha.com/".to_string(),
                allow_http: false,
            },
        ];

        let doc = store.allow_block_document();
        let first = doc.seeds[0].get("url").and_then(Value::as_str).unwrap();
        assert_eq!(first, "https://alpha.com/");
    }

    #[test]
    fn edit_state_allows_one_row_per_kind() {
        let mut edit = EditState::default();
        edit.begin(EditKind::Allow, 1);
        edit.begin(EditKind::Allow, 4);
        assert_eq!(edit.editing(EditKind::Allow), Some(4));

        edit.begin(EditKind::Seed, 0);
        assert_eq!(edit.editing(EditKind::Allow), Some(4));
        edit.cancel(EditKind::Allow);
        assert_eq!(edit.editing(EditKind::Allow), None);
    }

    #[test]
    fn coverage_matches_prefix_and_exact_rules() {
        let store = store_with_rules(vec![
            rule("https://x.com/docs/", MatchMode::Prefix),
            rule("https://y.com/page", MatchMode::Exact),
        ]);

        assert!(store.is_url_already_allowed("https://x.com/docs/guide"));
        assert!(!store.is_url_already_allowed("https://x.com/other"));
        assert!(store.is_url_already_allowed("https://y.com/page"));
        assert!(!store.is_url_already_allowed("https://y.com/page/sub"));
    }

    #[test]
    fn covered_urls_never_appear_in_filtered_recommendations() {
        let mut store = store_with_rules(vec![rule("https://x.com/", MatchMode::Prefix)]);
        store.set_recommendations(vec![
            Recommendation {
                suggested_url: "https://x.com/docs/".to_string(),
                count: 10,
                seen_types: TypeFlags::default(),
            },
            Recommendation {
                suggested_url: "https://new.com/".to_string(),
                count: 4,
                seen_types: TypeFlags::default(),
            },
        ]);

        let filtered = store.filtered_recommendations();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].suggested_url, "https://new.com/");
    }

    #[test]
    fn recommendation_view_hides_everything_past_the_preview() {
        let mut store = CrawlConfigStore::new();
        store.set_recommendations(
            (0..5)
                .map(|i| Recommendation {
                    suggested_url: format!("https://site{i}.com/"),
                    count: i,
                    seen_types: TypeFlags::default(),
                })
                .collect(),
        );

        let (visible, hidden) = store.recommendation_view();
        assert_eq!(visible.len(), RECOMMENDATION_PREVIEW);
        assert_eq!(hidden, 2);

        store.recommendations_expanded = true;
        let (visible, hidden) = store.recommendation_view();
        assert_eq!(visible.len(), 5);
        assert_eq!(hidden, 0);
    }

    #[test]
    fn toggle_allow_http_renormalizes_pattern() {
        let mut store = store_with_rules(vec![rule("https://x.com/", MatchMode::Prefix)]);
        store.toggle_allow_http(0);
        assert!(store.allow_rules[0].allow_http);
        assert_eq!(store.allow_rules[0].pattern, "https://x.com/");

        // Downgrade happens when the flag is turned back off on an http row.
        store.allow_rules[0].pattern = "http://x.com/".to_string();
        store.allow_rules[0].allow_http = true;
        store.toggle_allow_http(0);
        assert!(!store.allow_rules[0].allow_http);
        assert_eq!(store.allow_rules[0].pattern, "https://x.com/");
    }

    #[test]
    fn prepare_rule_for_save_enforces_web_and_prefix_slash() {
        let mut raw = rule("https://x.com/docs", MatchMode::Prefix);
        raw.types = TypeFlags {
            web: false,
            pdf: false,
            docx: false,
            xlsx: false,
            pptx: false,
        };

        let prepared = CrawlConfigStore::prepare_rule_for_save(&raw).unwrap();
        assert_eq!(prepared.pattern, "https://x.com/docs/");
        assert!(prepared.types.web);

        let file = rule("https://x.com/report.pdf", MatchMode::Prefix);
        let prepared = CrawlConfigStore::prepare_rule_for_save(&file).unwrap();
        assert_eq!(prepared.pattern, "https://x.com/report.pdf");

        let exact = rule("https://x.com/docs", MatchMode::Exact);
        let prepared = CrawlConfigStore::prepare_rule_for_save(&exact).unwrap();
        assert_eq!(prepared.pattern, "https://x.com/docs");
    }

    #[test]
    fn prepare_rule_for_save_rejects_empty_and_foreign_schemes() {
        let empty = rule("   ", MatchMode::Prefix);
        assert_eq!(
            CrawlConfigStore::prepare_rule_for_save(&empty),
            Err(RuleSaveError::EmptyPattern)
        );

        let ftp = rule("ftp://x.com", MatchMode::Prefix);
        assert!(matches!(
            CrawlConfigStore::prepare_rule_for_save(&ftp),
            Err(RuleSaveError::Scheme(_))
        ));
    }

    #[test]
    fn rule_auth_icon_follows_derivation_table() {
        let mut store = CrawlConfigStore::new();
        store.overlay.playwright_available = true;

        let mut with_profile = rule("https://x.com/", MatchMode::Prefix);
        with_profile.auth_profile = Some("campus".to_string());
        with_profile.id = Some("r1".to_string());

        // Profile set, no overlay entry yet.
        assert_eq!(store.rule_auth_icon(&with_profile), AuthIcon::Pending);

        store.overlay.by_rule_id.insert(
            "r1".to_string(),
            crate::models::RuleAuthStatus {
                ui_status: UiAuthStatus::Valid,
                detail: None,
            },
        );
        assert_eq!(store.rule_auth_icon(&with_profile), AuthIcon::Valid);

        // Playwright down trumps overlay state.
        store.overlay.playwright_available = false;
        assert_eq!(store.rule_auth_icon(&with_profile), AuthIcon::CannotTest);

        let bare = rule("https://y.com/", MatchMode::Prefix);
        store.overlay.playwright_available = true;
        assert_eq!(store.rule_auth_icon(&bare), AuthIcon::None);

        store.overlay.by_pattern.insert(
            "https://y.com/".to_string(),
            crate::models::RuleAuthStatus {
                ui_status: UiAuthStatus::NeedsProfile,
                detail: None,
            },
        );
        assert_eq!(store.rule_auth_icon(&bare), AuthIcon::NeedsProfile);
    }

    #[test]
    fn legacy_migration_moves_flat_fields_into_named_profile() {
        let mut store = CrawlConfigStore::new();
        store.load_crawler(
            serde_json::from_value(json!({
                "playwright": {
                    "storage_state_path": "auth/state.json",
                    "use_for_domains": ["intranet.example.com"],
                }
            }))
            .unwrap(),
        );

        assert!(store.needs_legacy_migration());
        let profile = store.migrate_legacy_profile().unwrap();
        assert_eq!(profile.storage_state_path, "auth/state.json");
        assert_eq!(profile.use_for_domains, vec!["intranet.example.com"]);

        assert!(!store.needs_legacy_migration());
        assert!(store.auth_profiles.contains_key(LEGACY_PROFILE_NAME));
        assert!(store.crawler.playwright.storage_state_path.is_none());
        assert!(store.migrate_legacy_profile().is_none());

        assert!(CrawlConfigStore::is_legacy_profile_name("default"));
        assert!(CrawlConfigStore::is_legacy_profile_name(LEGACY_PROFILE_NAME));
        assert!(!CrawlConfigStore::is_legacy_profile_name("campus"));
    }

    #[test]
    fn display_sorting_is_case_insensitive_and_leaves_store_order() {
        let mut store = CrawlConfigStore::new();
        store.blocked = vec![
            "Zeta.com".to_string(),
            "alpha.com".to_string(),
            "Beta.com".to_string(),
        ];

        assert_eq!(store.sorted_blocked_indices(), vec![1, 2, 0]);
        assert_eq!(store.blocked[0], "Zeta.com");
    }

    #[test]
    fn saved_then_reloaded_document_renders_identically() {
        let mut store = CrawlConfigStore::new();
        store.load_allow_block(
            serde_json::from_value(json!({
                "seeds": ["b.com", "a.com"],
                "blocked": ["ads.example.com"],
                "allow_rules": [{"pattern": "x.com/docs", "types": {"pdf": true}}],
            }))
            .unwrap(),
        );

        let saved = store.allow_block_document();
        let mut reloaded = CrawlConfigStore::new();
        reloaded.load_allow_block(
            serde_json::from_value(serde_json::to_value(&saved).unwrap()).unwrap(),
        );

        let mut expected = store.seeds.clone();
        expected.sort_by(|a, b| a.url.cmp(&b.url));
        assert_eq!(reloaded.seeds, expected);
        assert_eq!(reloaded.blocked, store.blocked);
        assert_eq!(reloaded.allow_rules, store.allow_rules);
    }
}
