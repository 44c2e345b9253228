use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Identifier the remote agent assigns to a test run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity of a finding; the only field used for novelty detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingId(String);

impl FindingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Running,
    Paused,
    Completed,
    Stopped,
    Error,
}

impl RunStatus {
    /// Terminal statuses end polling for the agent.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Stopped | RunStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Completed => "completed",
            RunStatus::Stopped => "stopped",
            RunStatus::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        };
        f.write_str(label)
    }
}

/// Agents report confidence either as a score or as a label like "firm".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Score(f64),
    Label(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub verification: VerificationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerTelemetry {
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub cpu_percent: Option<f64>,
    #[serde(default)]
    pub memory_mb: Option<f64>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub tool: Option<String>,
}

/// One fetched status payload. Passed through to presentation unchanged apart
/// from the fields projected by [`StatusSnapshot::summary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: RunStatus,
    #[serde(default)]
    pub phase: String,
    /// Percentage as reported; may be fractional or out of range.
    #[serde(default)]
    pub progress: f64,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub rejected_findings: Vec<Finding>,
    #[serde(default)]
    pub tool_executions: Vec<ToolExecution>,
    #[serde(default)]
    pub container: Option<ContainerTelemetry>,
    #[serde(default)]
    pub scan_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            phase: self.phase.clone(),
            status: self.status,
            finding_ids: self.findings.iter().map(|f| f.id.clone()).collect(),
        }
    }

    pub fn finding(&self, id: &FindingId) -> Option<&Finding> {
        self.findings.iter().find(|f| &f.id == id)
    }

    /// Progress rounded and clamped to 0..=100.
    pub fn progress_percent(&self) -> u8 {
        if self.progress.is_nan() {
            return 0;
        }
        self.progress.clamp(0.0, 100.0).round() as u8
    }
}

/// Reduced projection of a snapshot used for transition detection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotSummary {
    pub phase: String,
    pub status: RunStatus,
    pub finding_ids: BTreeSet<FindingId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_stopped_and_error_are_terminal() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Paused.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
        assert!(RunStatus::Error.is_terminal());
    }

    #[test]
    fn progress_is_clamped() {
        let snapshot = StatusSnapshot {
            status: RunStatus::Running,
            phase: String::new(),
            progress: 140.0,
            started_at: None,
            completed_at: None,
            findings: Vec::new(),
            rejected_findings: Vec::new(),
            tool_executions: Vec::new(),
            container: None,
            scan_id: None,
            error: None,
        };
        assert_eq!(snapshot.progress_percent(), 100);
        let fractional = StatusSnapshot {
            progress: 37.5,
            ..snapshot.clone()
        };
        assert_eq!(fractional.progress_percent(), 38);
        let negative = StatusSnapshot {
            progress: -3.0,
            ..snapshot
        };
        assert_eq!(negative.progress_percent(), 0);
    }

    #[test]
    fn fractional_progress_decodes() {
        let snapshot: StatusSnapshot =
            serde_json::from_str(r#"{"status":"running","phase":"recon","progress":37.5}"#)
                .unwrap();
        assert_eq!(snapshot.progress, 37.5);
        assert_eq!(snapshot.progress_percent(), 38);
    }

    #[test]
    fn naive_run_timestamps_are_read_as_utc() {
        let snapshot: StatusSnapshot = serde_json::from_str(
            r#"{"status":"completed","started_at":"2026-05-01T09:00:00.123456","completed_at":"2026-05-01 09:05:00"}"#,
        )
        .unwrap();
        assert_eq!(
            snapshot.started_at.map(|at| at.to_rfc3339()),
            Some("2026-05-01T09:00:00.123456+00:00".to_string())
        );
        assert_eq!(
            snapshot.completed_at.map(|at| at.to_rfc3339()),
            Some("2026-05-01T09:05:00+00:00".to_string())
        );
    }

    #[test]
    fn unreadable_run_timestamps_do_not_fail_the_snapshot() {
        let snapshot: StatusSnapshot = serde_json::from_str(
            r#"{"status":"running","started_at":"soon","completed_at":12345}"#,
        )
        .unwrap();
        assert_eq!(snapshot.started_at, None);
        assert_eq!(snapshot.completed_at, None);

        let explicit_null: StatusSnapshot =
            serde_json::from_str(r#"{"status":"running","started_at":null}"#).unwrap();
        assert_eq!(explicit_null.started_at, None);
    }

    #[test]
    fn log_entries_accept_naive_timestamps() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"timestamp":"2026-05-01T09:00:00.5","level":"info","message":"scan"}"#,
        )
        .unwrap();
        assert_eq!(entry.timestamp.to_rfc3339(), "2026-05-01T09:00:00.500+00:00");
        assert!(serde_json::from_str::<LogEntry>(r#"{"timestamp":"nope","message":"x"}"#).is_err());
    }
}
