use chrono::{DateTime, Utc};

use crate::diff::{SnapshotDiffer, Transition, TransitionSet};
use crate::elapsed::{format_hms, ElapsedTracker};
use crate::notify::{Highlights, NotificationQueue, ToastSeverity};
use crate::poll::{to_chrono, MonitorConfig, PollHealth, PollPhase};
use crate::view_model::{MonitorViewModel, ToastView};
use crate::{
    AgentId, LogEntry, ReportRequest, RunStatus, SessionError, SessionRecord, StatusSnapshot,
};

/// Everything the monitor holds for one session. Owned by a single instance;
/// only [`crate::update`] mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    config: MonitorConfig,
    phase: PollPhase,
    session: Option<SessionRecord>,
    snapshot: Option<StatusSnapshot>,
    logs: Vec<LogEntry>,
    differ: SnapshotDiffer,
    health: PollHealth,
    toasts: NotificationQueue,
    highlights: Highlights,
    elapsed: ElapsedTracker,
    report_pending: bool,
    last_report_id: Option<String>,
    last_report_error: Option<String>,
    dirty: bool,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl MonitorState {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            toasts: NotificationQueue::new(config.toast_capacity, to_chrono(config.toast_lifetime)),
            highlights: Highlights::new(to_chrono(config.highlight_window)),
            elapsed: ElapsedTracker::new(to_chrono(config.elapsed_tick)),
            config,
            phase: PollPhase::Idle,
            session: None,
            snapshot: None,
            logs: Vec::new(),
            differ: SnapshotDiffer::new(),
            health: PollHealth::default(),
            report_pending: false,
            last_report_id: None,
            last_report_error: None,
            dirty: false,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn phase(&self) -> &PollPhase {
        &self.phase
    }

    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    pub fn differ(&self) -> &SnapshotDiffer {
        &self.differ
    }

    pub fn health(&self) -> PollHealth {
        self.health
    }

    pub fn is_degraded(&self) -> bool {
        self.health.is_degraded(&self.config.poll)
    }

    /// Start is only legal when no session record exists.
    pub fn ensure_can_start(&self) -> Result<(), SessionError> {
        match &self.session {
            Some(record) => Err(SessionError::AlreadyActive(record.agent_id.clone())),
            None => Ok(()),
        }
    }

    pub fn view(&self) -> MonitorViewModel {
        MonitorViewModel {
            phase: self.phase.clone(),
            agent_id: self.session.as_ref().map(|s| s.agent_id.clone()),
            target: self.session.as_ref().map(|s| s.target.clone()),
            run_status: self.session.as_ref().map(|s| s.status),
            snapshot: self.snapshot.clone(),
            logs: self.logs.clone(),
            toasts: self
                .toasts
                .iter()
                .map(|toast| ToastView {
                    id: toast.id,
                    message: toast.message.clone(),
                    severity: toast.severity,
                    created_at: toast.created_at,
                })
                .collect(),
            highlighted: self.highlights.ids(),
            elapsed_seconds: self.elapsed.seconds(),
            elapsed_display: format_hms(self.elapsed.seconds()),
            connection_degraded: self.is_degraded(),
            consecutive_failures: self.health.consecutive_failures(),
            report_pending: self.report_pending,
            last_report_id: self.last_report_id.clone(),
            last_report_error: self.last_report_error.clone(),
            dirty: self.dirty,
        }
    }

    /// Earliest moment a [`crate::Msg::Tick`] would change anything.
    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        [
            self.toasts.next_expiry(),
            self.highlights.next_expiry(),
            self.elapsed.next_tick(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Enters `Polling` for a fresh or restored session, discarding anything
    /// held for a previous agent.
    pub(crate) fn begin_session(&mut self, record: SessionRecord, now: DateTime<Utc>) {
        self.reset_tracking();
        self.elapsed.sync(
            Some(record.started_at),
            None,
            record.status == RunStatus::Running,
            now,
        );
        self.phase = PollPhase::Polling(record.agent_id.clone());
        self.session = Some(record);
        self.mark_dirty();
    }

    /// Drops the session and every per-session tracker. Toasts survive.
    pub(crate) fn clear_session(&mut self) {
        self.reset_tracking();
        self.session = None;
        self.phase = PollPhase::Idle;
        self.mark_dirty();
    }

    fn reset_tracking(&mut self) {
        self.snapshot = None;
        self.logs.clear();
        self.differ.reset();
        self.health = PollHealth::default();
        self.highlights.clear();
        self.elapsed.reset();
        self.report_pending = false;
        self.last_report_id = None;
        self.last_report_error = None;
    }

    pub(crate) fn stop_locally(&mut self, now: DateTime<Utc>) -> Option<AgentId> {
        let agent_id = self.phase.polling_agent()?.clone();
        self.phase = PollPhase::Stopped(agent_id.clone());
        if let Some(session) = self.session.as_mut() {
            session.status = RunStatus::Stopped;
        }
        let (started_at, completed_at) = self.run_window();
        self.elapsed.sync(started_at, completed_at, false, now);
        self.mark_dirty();
        Some(agent_id)
    }

    fn run_window(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let started_at = self
            .snapshot
            .as_ref()
            .and_then(|s| s.started_at)
            .or_else(|| self.session.as_ref().map(|s| s.started_at));
        let completed_at = self.snapshot.as_ref().and_then(|s| s.completed_at);
        (started_at, completed_at)
    }

    pub(crate) fn record_poll_failure(&mut self) {
        self.health.record_failure();
        self.mark_dirty();
    }

    /// Applies a successfully fetched snapshot and returns the transitions it
    /// produced.
    pub(crate) fn apply_snapshot(
        &mut self,
        snapshot: StatusSnapshot,
        now: DateTime<Utc>,
    ) -> TransitionSet {
        self.health.record_success();
        let set = self.differ.observe(snapshot.summary());
        self.highlights.mark(&set.new_findings, now);

        if let Some(session) = self.session.as_mut() {
            session.status = snapshot.status;
        }
        self.snapshot = Some(snapshot);
        self.notify_transitions(&set, now);

        let (started_at, completed_at) = self.run_window();
        let running = self
            .snapshot
            .as_ref()
            .is_some_and(|s| s.status == RunStatus::Running);
        self.elapsed.sync(started_at, completed_at, running, now);
        self.mark_dirty();
        set
    }

    fn notify_transitions(&mut self, set: &TransitionSet, now: DateTime<Utc>) {
        for transition in &set.transitions {
            let (message, severity) = match transition {
                Transition::PhaseChanged { from, to } => (
                    format!("Phase changed: {from} \u{2192} {to}"),
                    ToastSeverity::Info,
                ),
                Transition::StatusChanged { to, .. } => self.status_message(*to),
                Transition::NewFinding(id) => match self.snapshot.as_ref().and_then(|s| s.finding(id)) {
                    Some(finding) => (
                        format!("New {} finding: {}", finding.severity, finding.title),
                        ToastSeverity::for_finding(finding.severity),
                    ),
                    None => (format!("New finding: {id}"), ToastSeverity::Info),
                },
            };
            self.toasts.push(message, severity, now);
        }
    }

    fn status_message(&self, status: RunStatus) -> (String, ToastSeverity) {
        match status {
            RunStatus::Completed => ("Pentest completed".to_string(), ToastSeverity::Success),
            RunStatus::Error => {
                let detail = self
                    .snapshot
                    .as_ref()
                    .and_then(|s| s.error.as_deref())
                    .unwrap_or("agent reported an error");
                (format!("Pentest failed: {detail}"), ToastSeverity::Error)
            }
            other => (format!("Pentest {other}"), ToastSeverity::Warning),
        }
    }

    pub(crate) fn replace_logs(&mut self, logs: Vec<LogEntry>) {
        self.logs = logs;
        self.mark_dirty();
    }

    pub(crate) fn push_toast(
        &mut self,
        message: impl Into<String>,
        severity: ToastSeverity,
        now: DateTime<Utc>,
    ) {
        self.toasts.push(message, severity, now);
        self.mark_dirty();
    }

    pub(crate) fn dismiss_toast(&mut self, id: crate::ToastId) {
        if self.toasts.dismiss(id) {
            self.mark_dirty();
        }
    }

    pub(crate) fn tick(&mut self, now: DateTime<Utc>) {
        let expired = self.toasts.expire(now) + self.highlights.expire(now);
        let ticked = self.elapsed.tick(now);
        if expired > 0 || ticked {
            self.mark_dirty();
        }
    }

    pub(crate) fn begin_report(&mut self) -> Option<ReportRequest> {
        let PollPhase::Stopped(agent_id) = &self.phase else {
            return None;
        };
        if self.report_pending {
            return None;
        }
        let session = self.session.as_ref()?;
        let request = ReportRequest {
            agent_id: agent_id.clone(),
            target: session.target.clone(),
            scan_id: self.snapshot.as_ref().and_then(|s| s.scan_id.clone()),
            finding_count: self.snapshot.as_ref().map_or(0, |s| s.findings.len()),
        };
        self.report_pending = true;
        self.last_report_id = None;
        self.last_report_error = None;
        self.mark_dirty();
        Some(request)
    }

    pub(crate) fn finish_report(
        &mut self,
        agent_id: &AgentId,
        result: Result<String, String>,
        now: DateTime<Utc>,
    ) {
        if self.session.as_ref().map(|s| &s.agent_id) != Some(agent_id) || !self.report_pending {
            return;
        }
        self.report_pending = false;
        match result {
            Ok(report_id) => {
                self.push_toast(
                    format!("Report ready: {report_id}"),
                    ToastSeverity::Success,
                    now,
                );
                self.last_report_id = Some(report_id);
            }
            Err(err) => {
                self.push_toast(
                    format!("Report generation failed: {err}"),
                    ToastSeverity::Error,
                    now,
                );
                self.last_report_error = Some(err);
            }
        }
    }

    pub(crate) fn enter_stopped(&mut self, agent_id: AgentId) {
        self.phase = PollPhase::Stopped(agent_id);
        self.mark_dirty();
    }
}
