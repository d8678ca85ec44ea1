//! Ingest job progress: the SSE event track and the polling track converge
//! on this model, which also carries the ETA estimator.

use std::collections::VecDeque;

use crate::models::{IngestEvent, IngestJobSnapshot, IngestStatus};

/// Polling cadence while the job is not terminal.
pub const POLL_INTERVAL_MS: u32 = 2_000;
/// Ingestor-worker heartbeat poll cadence.
pub const WORKER_POLL_INTERVAL_MS: u32 = 5_000;

const ETA_WINDOW: usize = 10;
const ETA_MIN_SAMPLES: usize = 5;

/// Moving average over the last ten inter-progress deltas, normalized to
/// per-artifact seconds.
#[derive(Debug, Default)]
pub struct EtaEstimator {
    deltas: VecDeque<f64>,
    last: Option<(i64, f64)>,
}

impl EtaEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a progress observation: `done` artifacts at `now_ms`.
    pub fn record(&mut self, done: i64, now_ms: f64) {
        let Some((prev_done, prev_ms)) = self.last else {
            self.last = Some((done, now_ms));
            return;
        };
        if done <= prev_done {
            return;
        }

        let per_artifact_ms = (now_ms - prev_ms) / (done - prev_done) as f64;
        if per_artifact_ms.is_finite() && per_artifact_ms >= 0.0 {
            if self.deltas.len() == ETA_WINDOW {
                self.deltas.pop_front();
            }
            self.deltas.push_back(per_artifact_ms);
        }
        self.last = Some((done, now_ms));
    }

    pub fn sample_count(&self) -> usize {
        self.deltas.len()
    }

    /// Estimated seconds remaining, when enough samples exist.
    pub fn remaining_seconds(&self, remaining: i64) -> Option<f64> {
        if self.deltas.len() < ETA_MIN_SAMPLES || remaining < 0 {
            return None;
        }
        let avg_ms: f64 = self.deltas.iter().sum::<f64>() / self.deltas.len() as f64;
        Some(avg_ms * remaining as f64 / 1000.0)
    }
}

#[derive(Debug, Default)]
pub struct IngestProgress {
    pub job_id: String,
    pub status: Option<IngestStatus>,
    pub done: i64,
    pub total: i64,
    pub errors: i64,
    pub current_artifact: Option<String>,
    pub completion_message: Option<String>,
    pub error_message: Option<String>,
    pub cancelling: bool,
    eta: EtaEstimator,
}

impl IngestProgress {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Self::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.map(IngestStatus::is_terminal).unwrap_or(false)
    }

    pub fn percent(&self) -> f64 {
        if self.total <= 0 {
            0.0
        } else {
            (self.done as f64 * 100.0 / self.total as f64).clamp(0.0, 100.0)
        }
    }

    pub fn ratio_label(&self) -> String {
        format!("{} / {}", self.done, self.total)
    }

    /// Fold one SSE event into the progress state. Returns the log line to
    /// append, if the event carried one.
    pub fn apply_event(&mut self, event: &IngestEvent, now_ms: f64) -> Option<String> {
        match event {
            IngestEvent::Connected { .. } => None,
            IngestEvent::Start {
                total_artifacts, ..
            } => {
                self.status = Some(IngestStatus::Running);
                if *total_artifacts > 0 {
                    self.total = *total_artifacts;
                }
                None
            }
            IngestEvent::ArtifactProgress {
                done_artifacts,
                total_artifacts,
                current_artifact,
                errors,
            } => {
                self.status.get_or_insert(IngestStatus::Running);
                self.done = self.done.max(*done_artifacts);
                if *total_artifacts > 0 {
                    self.total = *total_artifacts;
                }
                if let Some(artifact) = current_artifact {
                    if !artifact.is_empty() {
                        self.current_artifact = Some(artifact.clone());
                    }
                }
                // The server count is authoritative but the display never
                // moves backwards.
                if let Some(server_errors) = errors {
                    self.errors = self.errors.max(*server_errors);
                }
                self.eta.record(self.done, now_ms);
                None
            }
            IngestEvent::Log { level, message, .. } => {
                if level == "error" {
                    self.errors += 1;
                }
                Some(message.clone())
            }
            IngestEvent::Complete { msg, .. } => {
                self.status = Some(IngestStatus::Done);
                self.done = self.done.max(self.total);
                self.completion_message = Some(if msg.is_empty() {
                    "Ingest complete".to_string()
                } else {
                    msg.clone()
                });
                None
            }
            IngestEvent::Error { msg, .. } => {
                self.status = Some(IngestStatus::Error);
                self.errors += 1;
                self.error_message = Some(msg.clone());
                None
            }
            IngestEvent::Control { action, .. } => {
                if action == "cancelling" {
                    self.cancelling = true;
                }
                None
            }
        }
    }

    /// Fold one polled snapshot into the progress state. Works standalone
    /// when the SSE track never connects.
    pub fn apply_snapshot(&mut self, snapshot: &IngestJobSnapshot, now_ms: f64) {
        if let Some(status) = snapshot.status() {
            self.status = Some(status);
            if status == IngestStatus::Cancelling {
                self.cancelling = true;
            }
        }
        self.done = self.done.max(snapshot.done);
        if snapshot.total > 0 {
            self.total = snapshot.total;
        }
        self.errors = self.errors.max(snapshot.errors);
        if let Some(artifact) = snapshot.current_artifact.as_deref() {
            if !artifact.is_empty() {
                self.current_artifact = Some(artifact.to_string());
            }
        }
        self.eta.record(self.done, now_ms);

        if self.status == Some(IngestStatus::Done) && self.completion_message.is_none() {
            self.completion_message = Some("Ingest complete".to_string());
        }
    }

    /// ETA cell text: `Complete` once everything is done, `Calculating…`
    /// until five samples exist, then the formatted remainder.
    pub fn eta_label(&self) -> String {
        if self.done == self.total && self.total > 0 {
            return "Complete".to_string();
        }
        let remaining = (self.total - self.done).max(0);
        match self.eta.remaining_seconds(remaining) {
            Some(seconds) => format!("~{}", format_eta(seconds)),
            None => "Calculating…".to_string(),
        }
    }

    pub fn status_label(&self) -> String {
        match self.status {
            Some(IngestStatus::Done) => "Ingest complete".to_string(),
            Some(IngestStatus::Error) => "Ingest failed".to_string(),
            Some(IngestStatus::Cancelled) => "Ingest cancelled".to_string(),
            Some(IngestStatus::Cancelling) => "Cancelling…".to_string(),
            Some(IngestStatus::Running) => "Ingesting…".to_string(),
            Some(IngestStatus::Queued) => "Queued".to_string(),
            None => "Starting…".to_string(),
        }
    }
}

fn format_eta(seconds: f64) -> String {
    let total = seconds.round().max(0.0) as i64;
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_event(done: i64, total: i64) -> IngestEvent {
        IngestEvent::ArtifactProgress {
            done_artifacts: done,
            total_artifacts: total,
            current_artifact: Some(format!("artifact-{done}.md")),
            errors: None,
        }
    }

    #[test]
    fn eta_needs_five_samples() {
        let mut progress = IngestProgress::new("I1");
        let mut now = 0.0;
        for done in 1..=5 {
            progress.apply_event(&progress_event(done, 100), now);
            now += 1_000.0;
        }
        // Five observations yield four deltas.
        assert_eq!(progress.eta_label(), "Calculating…");

        progress.apply_event(&progress_event(6, 100), now);
        assert_ne!(progress.eta_label(), "Calculating…");
        assert!(progress.eta_label().starts_with('~'));
    }

    #[test]
    fn eta_shows_complete_only_when_done_equals_total() {
        let mut progress = IngestProgress::new("I1");
        assert_eq!(progress.eta_label(), "Calculating…");

        progress.apply_event(&progress_event(10, 10), 0.0);
        assert_eq!(progress.eta_label(), "Complete");

        let empty = IngestProgress::new("I2");
        assert_eq!(empty.done, empty.total);
        assert_ne!(empty.eta_label(), "Complete");
    }

    #[test]
    fn eta_averages_recent_deltas() {
        let mut eta = EtaEstimator::new();
        let mut now = 0.0;
        for done in 1..=11 {
            eta.record(done, now);
            now += 2_000.0;
        }
        assert_eq!(eta.sample_count(), 10);
        // 2 s per artifact, 5 remaining.
        let remaining = eta.remaining_seconds(5).unwrap();
        assert!((remaining - 10.0).abs() < 0.001);
    }

    #[test]
    fn error_counter_never_decreases() {
        let mut progress = IngestProgress::new("I1");
        progress.apply_event(
            &IngestEvent::Log {
                level: "error".to_string(),
                message: "boom".to_string(),
                ts: None,
            },
            0.0,
        );
        progress.apply_event(
            &IngestEvent::Log {
                level: "error".to_string(),
                message: "boom".to_string(),
                ts: None,
            },
            0.0,
        );
        assert_eq!(progress.errors, 2);

        // A stale server count cannot roll the display back.
        progress.apply_event(
            &IngestEvent::ArtifactProgress {
                done_artifacts: 1,
                total_artifacts: 10,
                current_artifact: None,
                errors: Some(1),
            },
            0.0,
        );
        assert_eq!(progress.errors, 2);

        progress.apply_event(
            &IngestEvent::ArtifactProgress {
                done_artifacts: 2,
                total_artifacts: 10,
                current_artifact: None,
                errors: Some(5),
            },
            0.0,
        );
        assert_eq!(progress.errors, 5);
    }

    #[test]
    fn polling_alone_reaches_completion() {
        let mut progress = IngestProgress::new("I1");
        let snapshot = IngestJobSnapshot {
            status: "running".to_string(),
            done: 4,
            total: 8,
            ..IngestJobSnapshot::default()
        };
        progress.apply_snapshot(&snapshot, 0.0);
        assert_eq!(progress.done, 4);
        assert!(!progress.is_terminal());

        let finished = IngestJobSnapshot {
            status: "done".to_string(),
            done: 8,
            total: 8,
            ..IngestJobSnapshot::default()
        };
        progress.apply_snapshot(&finished, 2_000.0);
        assert!(progress.is_terminal());
        assert_eq!(
            progress.completion_message.as_deref(),
            Some("Ingest complete")
        );
        assert_eq!(progress.status_label(), "Ingest complete");
    }

    #[test]
    fn complete_event_fills_done_and_message() {
        let mut progress = IngestProgress::new("I1");
        progress.apply_event(&progress_event(3, 10), 0.0);
        progress.apply_event(
            &IngestEvent::Complete {
                msg: String::new(),
                ts: None,
            },
            1_000.0,
        );
        assert_eq!(progress.done, 10);
        assert_eq!(progress.percent(), 100.0);
        assert!(progress.is_terminal());
    }

    #[test]
    fn control_event_marks_cancelling() {
        let mut progress = IngestProgress::new("I1");
        progress.apply_event(
            &IngestEvent::Control {
                action: "cancelling".to_string(),
                ts: None,
            },
            0.0,
        );
        assert!(progress.cancelling);
        assert!(!progress.is_terminal());

        progress.apply_snapshot(
            &IngestJobSnapshot {
                status: "cancelled".to_string(),
                ..IngestJobSnapshot::default()
            },
            0.0,
        );
        assert!(progress.is_terminal());
    }

    #[test]
    fn percent_is_total_and_clamped() {
        let mut progress = IngestProgress::new("I1");
        assert_eq!(progress.percent(), 0.0);
        progress.done = 5;
        progress.total = 10;
        assert_eq!(progress.percent(), 50.0);
        progress.done = 20;
        assert_eq!(progress.percent(), 100.0);
    }
}
