use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title the backend assigns to conversations it has not named yet.
pub const UNTITLED_CONVERSATION: &str = "New Conversation";

/// Canonical name for the auth profile synthesized from legacy flat
/// playwright fields. `default` is accepted as a read-side synonym.
pub const LEGACY_PROFILE_NAME: &str = "legacy_migrated";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Crawl,
    Ingest,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Ingest => "ingest",
        }
    }
}

impl FromStr for JobType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "crawl" => Self::Crawl,
            "ingest" => Self::Ingest,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "running" => Self::Running,
            "completed" | "complete" | "done" => Self::Completed,
            "failed" | "error" => Self::Failed,
            _ => return Err(()),
        })
    }
}

/// One row in the admin job table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub job_type: JobType,
    #[serde(default = "default_job_status")]
    pub status: String,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub ended_at: Option<String>,
}

fn default_job_status() -> String {
    "running".to_string()
}

impl Job {
    pub fn status(&self) -> Option<JobStatus> {
        self.status.parse().ok()
    }

    pub fn is_active(&self) -> bool {
        self.status().map(|s| !s.is_terminal()).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Prefix,
    Exact,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::Exact => "exact",
        }
    }
}

impl FromStr for MatchMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "prefix" => Self::Prefix,
            "exact" => Self::Exact,
            _ => return Err(()),
        })
    }
}

/// Per-rule content-type flags. A saved rule always has at least one flag
/// set; `web` is the enforced fallback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeFlags {
    #[serde(default)]
    pub web: bool,
    #[serde(default)]
    pub pdf: bool,
    #[serde(default)]
    pub docx: bool,
    #[serde(default)]
    pub xlsx: bool,
    #[serde(default)]
    pub pptx: bool,
}

impl Default for TypeFlags {
    fn default() -> Self {
        Self {
            web: true,
            pdf: false,
            docx: false,
            xlsx: false,
            pptx: false,
        }
    }
}

impl TypeFlags {
    pub fn any(self) -> bool {
        self.web || self.pdf || self.docx || self.xlsx || self.pptx
    }

    /// The default-to-web enforcement applied on save.
    pub fn or_web(self) -> Self {
        if self.any() {
            self
        } else {
            Self { web: true, ..self }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seed {
    pub url: String,
    #[serde(default)]
    pub allow_http: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllowRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub pattern: String,
    #[serde(rename = "match", default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub types: TypeFlags,
    #[serde(default)]
    pub allow_http: bool,
    #[serde(default, alias = "authProfile")]
    pub auth_profile: Option<String>,
}

/// The full seeds/blocked/allow-rules document behind
/// `/api/admin/config/allow_block`. Seeds and rules arrive in both string
/// shorthand and object form; the normalization layer canonicalizes them
/// after deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowBlockConfig {
    #[serde(default)]
    pub seeds: Vec<Value>,
    #[serde(default, alias = "blocked")]
    pub blocked_domains: Vec<String>,
    #[serde(default)]
    pub allow_rules: Vec<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthProfile {
    #[serde(default)]
    pub storage_state_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_for_domains: Vec<String>,
}

/// The nested `playwright` block of the crawler document. The flat
/// `storage_state_path`/`use_for_domains` pair is the legacy shape that the
/// migration path converts into a named profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaywrightConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_state_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_for_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub auth_profiles: BTreeMap<String, AuthProfile>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PlaywrightConfig {
    /// True when the document still carries flat legacy auth fields and no
    /// named profiles. This is exactly the condition under which the
    /// migration banner renders.
    pub fn needs_legacy_migration(&self) -> bool {
        let has_flat = self
            .storage_state_path
            .as_deref()
            .map(|path| !path.trim().is_empty())
            .unwrap_or(false)
            || !self.use_for_domains.is_empty();
        has_flat && self.auth_profiles.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default)]
    pub playwright: PlaywrightConfig,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

pub const AGENT_NAMES: [&str; 4] = ["intent", "research", "synthesis", "validation"];

/// The four agent system prompts behind `/api/admin/config/agents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(flatten)]
    pub agents: BTreeMap<String, AgentPrompt>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPrompt {
    #[serde(default)]
    pub system_prompt: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Ingest tuning knobs behind `/api/admin/config/ingest`. The document is
/// round-tripped whole; only the fields the editor exposes are typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(default, alias = "url")]
    pub suggested_url: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub seen_types: TypeFlags,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub items: Vec<Recommendation>,
}

/// One profile's most recent auth check, as reported by
/// `/api/crawl/auth-status` and `/api/crawl/test-auth`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthCheckResult {
    #[serde(default)]
    pub profile_name: String,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub final_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub error_reason: String,
    #[serde(default)]
    pub checked_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthCheckResponse {
    #[serde(default)]
    pub results: BTreeMap<String, AuthCheckResult>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UiAuthStatus {
    Valid,
    Invalid,
    NeedsProfile,
    CannotTest,
    #[default]
    Unknown,
}

impl UiAuthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::NeedsProfile => "needs_profile",
            Self::CannotTest => "cannot_test",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleAuthStatus {
    #[serde(default)]
    pub ui_status: UiAuthStatus,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Overlay from `/api/admin/allowed-urls/auth-status`, keyed by rule id with
/// a pattern fallback for rows that have not been persisted yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthStatusOverlay {
    #[serde(default)]
    pub by_rule_id: BTreeMap<String, RuleAuthStatus>,
    #[serde(default)]
    pub by_pattern: BTreeMap<String, RuleAuthStatus>,
    #[serde(default)]
    pub playwright_available: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl AuthStatusOverlay {
    pub fn lookup(&self, rule: &AllowRule) -> Option<&RuleAuthStatus> {
        if let Some(id) = rule.id.as_deref() {
            if let Some(status) = self.by_rule_id.get(id) {
                return Some(status);
            }
        }
        self.by_pattern.get(&rule.pattern)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub auto_titled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub timestamp: String,
}

impl Message {
    /// Plain text of a message: assistant content is an object with a
    /// `text` field, user content is a string (historically sometimes a
    /// JSON-encoded object).
    pub fn text(&self) -> String {
        match &self.content {
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                _ => raw.trim().to_string(),
            },
            Value::Object(map) => map
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            _ => String::new(),
        }
    }

    /// Structured assistant payload, when the content carries one.
    pub fn assistant_content(&self) -> Option<AssistantContent> {
        let value = match &self.content {
            Value::Object(_) => self.content.clone(),
            Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?,
            _ => return None,
        };
        serde_json::from_value(value).ok()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub sources: Vec<Value>,
    #[serde(default)]
    pub pipeline: Value,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationDetail {
    #[serde(default)]
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Pipeline stages surfaced on the chat status line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatStage {
    Intent,
    Research,
    Synthesis,
    Validation,
    Error,
}

impl ChatStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Research => "research",
            Self::Synthesis => "synthesis",
            Self::Validation => "validation",
            Self::Error => "error",
        }
    }
}

/// Events on the `/api/chat/{id}/message` stream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Status {
        stage: ChatStage,
        #[serde(default)]
        message: String,
    },
    Token {
        #[serde(default)]
        text: String,
    },
    Done {},
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Queued,
    Running,
    Done,
    Error,
    Cancelling,
    Cancelled,
}

impl IngestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

impl FromStr for IngestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "done" => Self::Done,
            "error" => Self::Error,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            _ => return Err(()),
        })
    }
}

/// Snapshot from `GET /api/ingest/{id}` (the polling track).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestJobSnapshot {
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "done_artifacts")]
    pub done: i64,
    #[serde(default, alias = "total_artifacts")]
    pub total: i64,
    #[serde(default)]
    pub errors: i64,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub current_artifact: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

impl IngestJobSnapshot {
    pub fn status(&self) -> Option<IngestStatus> {
        self.status.parse().ok()
    }
}

/// Events on the `/api/ingest/{id}/events` stream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    Connected {
        #[serde(default)]
        job_id: String,
    },
    Start {
        #[serde(default)]
        total_artifacts: i64,
        #[serde(default)]
        started_at: Option<String>,
    },
    ArtifactProgress {
        #[serde(default)]
        done_artifacts: i64,
        #[serde(default)]
        total_artifacts: i64,
        #[serde(default)]
        current_artifact: Option<String>,
        #[serde(default)]
        errors: Option<i64>,
    },
    Log {
        #[serde(default)]
        level: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        ts: Option<String>,
    },
    Complete {
        #[serde(default)]
        msg: String,
        #[serde(default)]
        ts: Option<String>,
    },
    Error {
        #[serde(default)]
        msg: String,
        #[serde(default)]
        ts: Option<String>,
    },
    Control {
        #[serde(default)]
        action: String,
        #[serde(default)]
        ts: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerStatus {
    #[serde(default)]
    pub heartbeat: Option<String>,
    #[serde(default)]
    pub age_seconds: Option<f64>,
    #[serde(default)]
    pub queue_depth: i64,
    #[serde(default)]
    pub worker: BTreeMap<String, Value>,
}

impl WorkerStatus {
    pub fn pid(&self) -> Option<String> {
        self.worker.get("pid").map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationSummary {
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub counts_by_severity: BTreeMap<String, i64>,
    #[serde(default)]
    pub counts_by_code: BTreeMap<String, i64>,
    #[serde(default)]
    pub total_artifacts: Option<i64>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// Tagged health tree from `/api/admin/data/health`. Subtrees are kept as
/// raw values; rendering is total over whatever shape arrives.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub artifacts: Value,
    #[serde(default)]
    pub crawl: Value,
    #[serde(default)]
    pub ingest: Value,
    #[serde(default)]
    pub qdrant: Value,
    #[serde(default)]
    pub system: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiHealth {
    #[serde(default)]
    pub api: Value,
    #[serde(default)]
    pub ollama: Value,
    #[serde(default)]
    pub qdrant: Value,
    #[serde(default)]
    pub model: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlCheckReport {
    #[serde(default)]
    pub artifact: Value,
    #[serde(default)]
    pub validation: Value,
    #[serde(default)]
    pub ingest: Value,
    #[serde(default)]
    pub qdrant: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub artifacts: Vec<SearchHit>,
    #[serde(default)]
    pub qdrant: Vec<SearchHit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allow_rule_accepts_legacy_auth_profile_alias() {
        let rule: AllowRule = serde_json::from_value(json!({
            "pattern": "https://example.com/",
            "authProfile": "campus",
        }))
        .unwrap();

        assert_eq!(rule.auth_profile.as_deref(), Some("campus"));
        assert_eq!(rule.match_mode, MatchMode::Prefix);
        assert!(rule.types.web);
    }

    #[test]
    fn type_flags_or_web_forces_web_when_all_false() {
        let none = TypeFlags {
            web: false,
            pdf: false,
            docx: false,
            xlsx: false,
            pptx: false,
        };
        assert!(none.or_web().web);

        let pdf_only = TypeFlags {
            web: false,
            pdf: true,
            ..none
        };
        assert!(!pdf_only.or_web().web);
        assert!(pdf_only.or_web().pdf);
    }

    #[test]
    fn playwright_migration_condition_requires_flat_fields_and_no_profiles() {
        let mut config = PlaywrightConfig::default();
        assert!(!config.needs_legacy_migration());

        config.storage_state_path = Some("auth/state.json".to_string());
        assert!(config.needs_legacy_migration());

        config
            .auth_profiles
            .insert("campus".to_string(), AuthProfile::default());
        assert!(!config.needs_legacy_migration());
    }

    #[test]
    fn message_text_handles_string_object_and_encoded_content() {
        let plain = Message {
            role: Role::User,
            content: json!("  hello "),
            timestamp: String::new(),
        };
        assert_eq!(plain.text(), "hello");

        let object = Message {
            role: Role::Assistant,
            content: json!({"text": "answer", "citations": []}),
            timestamp: String::new(),
        };
        assert_eq!(object.text(), "answer");

        let encoded = Message {
            role: Role::Assistant,
            content: json!("{\"text\": \"decoded\"}"),
            timestamp: String::new(),
        };
        assert_eq!(encoded.text(), "decoded");
    }

    #[test]
    fn chat_event_parses_tagged_payloads() {
        let status: ChatEvent =
            serde_json::from_value(json!({"type": "status", "stage": "intent", "message": "x"}))
                .unwrap();
        assert_eq!(
            status,
            ChatEvent::Status {
                stage: ChatStage::Intent,
                message: "x".to_string()
            }
        );

        let done: ChatEvent = serde_json::from_value(json!({"type": "done"})).unwrap();
        assert_eq!(done, ChatEvent::Done {});
    }

    #[test]
    fn ingest_snapshot_accepts_artifact_field_aliases() {
        let snapshot: IngestJobSnapshot = serde_json::from_value(json!({
            "status": "running",
            "done_artifacts": 3,
            "total_artifacts": 10,
        }))
        .unwrap();

        assert_eq!(snapshot.done, 3);
        assert_eq!(snapshot.total, 10);
        assert_eq!(snapshot.status(), Some(IngestStatus::Running));
    }

    #[test]
    fn overlay_lookup_prefers_rule_id_over_pattern() {
        let mut overlay = AuthStatusOverlay::default();
        overlay.by_rule_id.insert(
            "r7".to_string(),
            RuleAuthStatus {
                ui_status: UiAuthStatus::Valid,
                detail: None,
            },
        );
        overlay.by_pattern.insert(
            "https://x.com/".to_string(),
            RuleAuthStatus {
                ui_status: UiAuthStatus::Invalid,
                detail: None,
            },
        );

        let saved = AllowRule {
            id: Some("r7".to_string()),
            pattern: "https://x.com/".to_string(),
            match_mode: MatchMode::Prefix,
            types: TypeFlags::default(),
            allow_http: false,
            auth_profile: None,
        };
        assert_eq!(
            overlay.lookup(&saved).unwrap().ui_status,
            UiAuthStatus::Valid
        );

        let unsaved = AllowRule { id: None, ..saved };
        assert_eq!(
            overlay.lookup(&unsaved).unwrap().ui_status,
            UiAuthStatus::Invalid
        );
    }
}
