use chrono::{DateTime, Utc};

use crate::{AgentId, FindingId, LogEntry, PollPhase, RunStatus, StatusSnapshot, ToastId, ToastSeverity};

/// Read-only projection handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitorViewModel {
    pub phase: PollPhase,
    pub agent_id: Option<AgentId>,
    pub target: Option<String>,
    pub run_status: Option<RunStatus>,
    pub snapshot: Option<StatusSnapshot>,
    pub logs: Vec<LogEntry>,
    pub toasts: Vec<ToastView>,
    /// Findings first seen within the highlight window.
    pub highlighted: Vec<FindingId>,
    pub elapsed_seconds: u64,
    pub elapsed_display: String,
    pub connection_degraded: bool,
    pub consecutive_failures: u32,
    pub report_pending: bool,
    pub last_report_id: Option<String>,
    /// Why the most recent report request failed; cleared by the next request.
    pub last_report_error: Option<String>,
    pub dirty: bool,
}

impl MonitorViewModel {
    pub fn has_session(&self) -> bool {
        self.agent_id.is_some()
    }

    /// True once the latest report request has produced an id or an error.
    pub fn report_settled(&self) -> bool {
        !self.report_pending && (self.last_report_id.is_some() || self.last_report_error.is_some())
    }

    pub fn is_highlighted(&self, id: &FindingId) -> bool {
        self.highlighted.contains(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastView {
    pub id: ToastId,
    pub message: String,
    pub severity: ToastSeverity,
    pub created_at: DateTime<Utc>,
}
