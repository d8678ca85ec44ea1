//! Job/log bookkeeping: named SSE log channels with the at-most-one-handle
//! invariant, the crawl-completion signal, and the crawl summary model with
//! its legacy flat-field tolerance.

use std::str::FromStr;

use serde_json::Value;

/// The crawl worker ends its log with a line containing this marker; the
/// structured `complete` event is preferred where a channel carries one.
pub const CRAWL_COMPLETE_MARKER: &str = "Crawl job complete";

/// Delay before fetching the summary after the completion line shows up.
pub const SUMMARY_FETCH_DELAY_MS: u32 = 1_000;
/// Delay before fetching the summary after "view log" on a crawl job.
pub const VIEW_LOG_SUMMARY_DELAY_MS: u32 = 500;

pub fn line_signals_crawl_complete(line: &str) -> bool {
    line.contains(CRAWL_COMPLETE_MARKER)
}

/// Status color class for a job-table row.
pub fn job_status_class(status: &str) -> &'static str {
    match status {
        "completed" | "complete" | "done" => "success",
        "failed" | "error" | "cancelled" => "error",
        "running" | "pending" | "queued" => "warning",
        _ => "",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    Crawl,
    Ingest,
    Jobs,
}

impl LogChannel {
    pub const ALL: [LogChannel; 3] = [Self::Crawl, Self::Ingest, Self::Jobs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Ingest => "ingest",
            Self::Jobs => "jobs",
        }
    }
}

impl FromStr for LogChannel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "crawl" => Self::Crawl,
            "ingest" => Self::Ingest,
            "jobs" => Self::Jobs,
            _ => return Err(()),
        })
    }
}

/// One slot per log channel. Assigning to an occupied channel hands the
/// prior occupant back so the caller can close it; taking is idempotent.
#[derive(Debug, Default)]
pub struct ChannelSlots<T> {
    crawl: Option<T>,
    ingest: Option<T>,
    jobs: Option<T>,
}

impl<T> ChannelSlots<T> {
    pub fn new() -> Self {
        Self {
            crawl: None,
            ingest: None,
            jobs: None,
        }
    }

    fn slot_mut(&mut self, channel: LogChannel) -> &mut Option<T> {
        match channel {
            LogChannel::Crawl => &mut self.crawl,
            LogChannel::Ingest => &mut self.ingest,
            LogChannel::Jobs => &mut self.jobs,
        }
    }

    pub fn get(&self, channel: LogChannel) -> Option<&T> {
        match channel {
            LogChannel::Crawl => self.crawl.as_ref(),
            LogChannel::Ingest => self.ingest.as_ref(),
            LogChannel::Jobs => self.jobs.as_ref(),
        }
    }

    /// Install a handle, returning whatever previously occupied the slot.
    pub fn assign(&mut self, channel: LogChannel, handle: T) -> Option<T> {
        self.slot_mut(channel).replace(handle)
    }

    /// Clear a slot. Safe to call on an empty slot.
    pub fn take(&mut self, channel: LogChannel) -> Option<T> {
        self.slot_mut(channel).take()
    }

    /// Drain every channel (admin session reset).
    pub fn take_all(&mut self) -> Vec<T> {
        LogChannel::ALL
            .into_iter()
            .filter_map(|channel| self.take(channel))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkippedCounts {
    pub already_processed: i64,
    pub depth_exceeded: i64,
    pub not_allowed: i64,
    pub auth_required: i64,
    pub non_html: i64,
}

impl SkippedCounts {
    pub fn total(self) -> i64 {
        self.already_processed + self.depth_exceeded + self.not_allowed + self.auth_required
            + self.non_html
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorClassCounts {
    pub http_4xx: i64,
    pub http_5xx: i64,
    pub network_timeout: i64,
    pub other: i64,
}

impl ErrorClassCounts {
    pub fn total(self) -> i64 {
        self.http_4xx + self.http_5xx + self.network_timeout + self.other
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub url: String,
    pub error_class: String,
    pub detail: String,
}

/// Crawl job summary as consumed by the client. Current payloads carry
/// structured `skipped`/`errors_by_class` trees; older jobs persisted flat
/// integer totals, which remain accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    pub captured: i64,
    pub skipped: SkippedCounts,
    pub errors_by_class: ErrorClassCounts,
    pub error_details: Vec<ErrorDetail>,
    legacy_skipped: Option<i64>,
    legacy_errors: Option<i64>,
}

impl CrawlSummary {
    /// Tolerant extraction from whatever the summary endpoint returned.
    pub fn from_value(value: &Value) -> Self {
        let int = |v: Option<&Value>| v.and_then(Value::as_i64).unwrap_or(0);

        let captured = int(value.get("captured"));

        let (skipped, legacy_skipped) = match value.get("skipped") {
            Some(Value::Object(map)) => (
                SkippedCounts {
                    already_processed: int(map.get("already_processed")),
                    depth_exceeded: int(map.get("depth_exceeded")),
                    not_allowed: int(map.get("not_allowed")),
                    auth_required: int(map.get("auth_required")),
                    non_html: int(map.get("non_html")),
                },
                None,
            ),
            Some(Value::Number(n)) => (SkippedCounts::default(), n.as_i64()),
            _ => (SkippedCounts::default(), None),
        };

        let (errors_by_class, legacy_errors) = match value.get("errors_by_class") {
            Some(Value::Object(map)) => (
                ErrorClassCounts {
                    http_4xx: int(map.get("4xx")),
                    http_5xx: int(map.get("5xx")),
                    network_timeout: int(map.get("network_timeout")),
                    other: int(map.get("other")),
                },
                value.get("errors").and_then(Value::as_i64),
            ),
            _ => (
                ErrorClassCounts::default(),
                value.get("errors").and_then(Value::as_i64),
            ),
        };

        let error_details = value
            .get("error_details")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| ErrorDetail {
                        url: entry
                            .get("url")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        error_class: entry
                            .get("error_class")
                            .or_else(|| entry.get("class"))
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        detail: entry
                            .get("detail")
                            .or_else(|| entry.get("message"))
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            captured,
            skipped,
            errors_by_class,
            error_details,
            legacy_skipped,
            legacy_errors,
        }
    }

    /// Skip total: structured counts win; flat legacy totals fill in when
    /// the tree is absent.
    pub fn total_skipped(&self) -> i64 {
        let structured = self.skipped.total();
        if structured > 0 {
            structured
        } else {
            self.legacy_skipped.unwrap_or(structured)
        }
    }

    pub fn total_errors(&self) -> i64 {
        let structured = self.errors_by_class.total();
        if structured > 0 {
            structured
        } else {
            self.legacy_errors.unwrap_or(structured)
        }
    }

    /// The pill bar rendered above the crawl log.
    pub fn pills(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("Captured", self.captured),
            ("Errors", self.total_errors()),
            ("Skipped", self.total_skipped()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_slots_hold_at_most_one_handle() {
        let mut slots: ChannelSlots<u32> = ChannelSlots::new();
        assert!(slots.assign(LogChannel::Crawl, 1).is_none());
        // Reassignment hands back the displaced handle.
        assert_eq!(slots.assign(LogChannel::Crawl, 2), Some(1));
        assert_eq!(slots.get(LogChannel::Crawl), Some(&2));

        assert_eq!(slots.take(LogChannel::Crawl), Some(2));
        assert_eq!(slots.take(LogChannel::Crawl), None);
    }

    #[test]
    fn take_all_drains_every_channel() {
        let mut slots: ChannelSlots<&str> = ChannelSlots::new();
        slots.assign(LogChannel::Crawl, "a");
        slots.assign(LogChannel::Jobs, "b");

        let mut drained = slots.take_all();
        drained.sort();
        assert_eq!(drained, vec!["a", "b"]);
        assert!(slots.get(LogChannel::Ingest).is_none());
        assert!(slots.take_all().is_empty());
    }

    #[test]
    fn completion_marker_matches_as_substring() {
        assert!(line_signals_crawl_complete("Crawl job complete."));
        assert!(line_signals_crawl_complete(
            "2024-05-01 12:00:00 INFO Crawl job complete (42 pages)"
        ));
        assert!(!line_signals_crawl_complete("crawl running"));
    }

    #[test]
    fn summary_reads_structured_payload() {
        let summary = CrawlSummary::from_value(&json!({
            "captured": 5,
            "errors": 0,
            "skipped": {"already_processed": 2},
        }));

        assert_eq!(summary.captured, 5);
        assert_eq!(summary.total_errors(), 0);
        assert_eq!(summary.total_skipped(), 2);
        assert_eq!(
            summary.pills(),
            vec![("Captured", 5), ("Errors", 0), ("Skipped", 2)]
        );
    }

    #[test]
    fn summary_accepts_legacy_flat_fields() {
        let summary = CrawlSummary::from_value(&json!({
            "captured": 12,
            "errors": 3,
            "skipped": 7,
        }));

        assert_eq!(summary.total_skipped(), 7);
        assert_eq!(summary.total_errors(), 3);
    }

    #[test]
    fn summary_prefers_structured_error_classes() {
        let summary = CrawlSummary::from_value(&json!({
            "captured": 1,
            "errors": 99,
            "errors_by_class": {"4xx": 2, "network_timeout": 1},
            "error_details": [
                {"url": "https://x.com/a", "class": "4xx", "message": "404"},
            ],
        }));

        assert_eq!(summary.total_errors(), 3);
        assert_eq!(summary.error_details.len(), 1);
        assert_eq!(summary.error_details[0].error_class, "4xx");
        assert_eq!(summary.error_details[0].detail, "404");
    }

    #[test]
    fn summary_tolerates_junk() {
        let summary = CrawlSummary::from_value(&json!("not an object"));
        assert_eq!(summary.captured, 0);
        assert_eq!(summary.total_skipped(), 0);
    }

    #[test]
    fn job_status_classes_cover_terminal_and_active_states() {
        assert_eq!(job_status_class("completed"), "success");
        assert_eq!(job_status_class("failed"), "error");
        assert_eq!(job_status_class("running"), "warning");
        assert_eq!(job_status_class("mystery"), "");
    }
}
