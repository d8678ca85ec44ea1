//! Validation-findings projection: priority partitioning, severity
//! filtering, and head-truncation paging for the lower-priority section.

use std::str::FromStr;

use crate::models::{Finding, Severity};

/// Reason substrings that promote a finding to the high-priority section
/// regardless of severity. Matching is case-insensitive.
pub const HIGH_PRIORITY_TRIGGERS: &[&str] = &[
    "login",
    "cas redirect",
    "malformed_url",
    "401",
    "403",
    "5",
    "parser failed",
    "no content",
    "empty text",
];

pub fn is_high_priority(finding: &Finding) -> bool {
    if finding.severity == Severity::High {
        return true;
    }
    let reason = finding.reason.to_lowercase();
    HIGH_PRIORITY_TRIGGERS
        .iter()
        .any(|trigger| reason.contains(trigger))
}

/// Split findings into the always-rendered high section and the collapsible
/// lower section, preserving order.
pub fn partition(findings: &[Finding]) -> (Vec<&Finding>, Vec<&Finding>) {
    findings.iter().partition(|f| is_high_priority(f))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeverityFilter {
    #[default]
    All,
    Medium,
    Low,
}

impl SeverityFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn accepts(self, severity: Severity) -> bool {
        match self {
            Self::All => true,
            Self::Medium => severity == Severity::Medium,
            Self::Low => severity == Severity::Low,
        }
    }
}

impl FromStr for SeverityFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => Self::All,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => return Err(()),
        })
    }
}

pub fn filter_by_severity<'a>(
    findings: &[&'a Finding],
    filter: SeverityFilter,
) -> Vec<&'a Finding> {
    findings
        .iter()
        .copied()
        .filter(|f| filter.accepts(f.severity))
        .collect()
}

/// Head-truncated page over an already-filtered list.
#[derive(Debug)]
pub struct PageView<'a> {
    pub rows: Vec<&'a Finding>,
    pub total: usize,
}

impl<'a> PageView<'a> {
    /// `Showing X of Y` when the page truncates the list; nothing otherwise.
    pub fn truncation_label(&self) -> Option<String> {
        if self.rows.len() < self.total {
            Some(format!("Showing {} of {}", self.rows.len(), self.total))
        } else {
            None
        }
    }
}

pub fn paginate<'a>(findings: &[&'a Finding], page_size: usize) -> PageView<'a> {
    PageView {
        rows: findings.iter().copied().take(page_size).collect(),
        total: findings.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, severity: Severity, reason: &str) -> Finding {
        Finding {
            id: id.to_string(),
            url: None,
            title: None,
            severity,
            reason: reason.to_string(),
            code: None,
        }
    }

    #[test]
    fn severity_high_is_always_high_priority() {
        assert!(is_high_priority(&finding("a", Severity::High, "anything")));
    }

    #[test]
    fn trigger_substrings_promote_lower_severities() {
        assert!(is_high_priority(&finding(
            "a",
            Severity::Medium,
            "403 forbidden"
        )));
        assert!(is_high_priority(&finding(
            "b",
            Severity::Low,
            "CAS Redirect detected"
        )));
        assert!(is_high_priority(&finding(
            "c",
            Severity::Low,
            "Parser FAILED on table"
        )));
        assert!(!is_high_priority(&finding("d", Severity::Low, "duplicate")));
        assert!(!is_high_priority(&finding(
            "e",
            Severity::Medium,
            "thin content"
        )));
    }

    #[test]
    fn partition_matches_the_validation_scenario() {
        let findings = vec![
            finding("a", Severity::High, "404 not found"),
            finding("b", Severity::Medium, "403 forbidden"),
            finding("c", Severity::Low, "duplicate"),
        ];

        let (high, lower) = partition(&findings);
        assert_eq!(high.len(), 2);
        assert_eq!(lower.len(), 1);
        assert_eq!(lower[0].id, "c");

        let low_only = filter_by_severity(&lower, SeverityFilter::Low);
        assert_eq!(low_only.len(), 1);
        assert_eq!(low_only[0].id, "c");
    }

    #[test]
    fn severity_filter_round_trips_and_filters() {
        assert_eq!("medium".parse(), Ok(SeverityFilter::Medium));
        assert_eq!(SeverityFilter::Low.as_str(), "low");
        assert!("weird".parse::<SeverityFilter>().is_err());

        let findings = vec![
            finding("a", Severity::Medium, "thin content"),
            finding("b", Severity::Low, "duplicate"),
        ];
        let refs: Vec<&Finding> = findings.iter().collect();
        assert_eq!(filter_by_severity(&refs, SeverityFilter::All).len(), 2);
        assert_eq!(filter_by_severity(&refs, SeverityFilter::Medium).len(), 1);
    }

    #[test]
    fn pagination_truncates_from_the_head() {
        let findings: Vec<Finding> = (0..7)
            .map(|i| finding(&format!("f{i}"), Severity::Low, "duplicate"))
            .collect();
        let refs: Vec<&Finding> = findings.iter().collect();

        let page = paginate(&refs, 5);
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0].id, "f0");
        assert_eq!(page.truncation_label().as_deref(), Some("Showing 5 of 7"));

        let all = paginate(&refs, 10);
        assert_eq!(all.rows.len(), 7);
        assert!(all.truncation_label().is_none());
    }
}
