//! Terminal rendering of view-model changes.

use std::collections::BTreeSet;

use monitor_core::{MonitorViewModel, PollPhase, ToastId, ToastSeverity};

/// Prints only what changed since the previous view: new toasts, and a
/// status line when phase, status, progress or connection health moved.
#[derive(Debug, Default)]
pub struct Presenter {
    shown_toasts: BTreeSet<ToastId>,
    last_status_line: Option<String>,
}

impl Presenter {
    pub fn render(&mut self, view: &MonitorViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        for toast in &view.toasts {
            if self.shown_toasts.insert(toast.id) {
                lines.push(format!(
                    "{} {} {}",
                    toast.created_at.format("%H:%M:%S"),
                    severity_marker(toast.severity),
                    toast.message
                ));
            }
        }

        let status_line = status_line(view);
        if self.last_status_line.as_ref() != Some(&status_line) {
            lines.push(status_line.clone());
            self.last_status_line = Some(status_line);
        }
        lines
    }
}

fn severity_marker(severity: ToastSeverity) -> &'static str {
    match severity {
        ToastSeverity::Info => "[info]",
        ToastSeverity::Success => "[ok]",
        ToastSeverity::Warning => "[warn]",
        ToastSeverity::Error => "[error]",
    }
}

fn status_line(view: &MonitorViewModel) -> String {
    let Some(agent_id) = &view.agent_id else {
        return "no active session".to_string();
    };
    let mut line = match &view.snapshot {
        Some(snapshot) => format!(
            "[{}] {} {} phase={} progress={}% findings={} rejected={}",
            view.elapsed_display,
            agent_id,
            snapshot.status,
            if snapshot.phase.is_empty() { "-" } else { &snapshot.phase },
            snapshot.progress_percent(),
            snapshot.findings.len(),
            snapshot.rejected_findings.len(),
        ),
        None => format!("[{}] {} waiting for first status", view.elapsed_display, agent_id),
    };
    if !view.highlighted.is_empty() {
        let ids: Vec<_> = view.highlighted.iter().map(|id| id.as_str()).collect();
        line.push_str(&format!(" new=[{}]", ids.join(",")));
    }
    if view.connection_degraded {
        line.push_str(" (connection degraded)");
    }
    if matches!(view.phase, PollPhase::Stopped(_)) {
        line.push_str(" [stopped]");
    }
    if let Some(report_id) = &view.last_report_id {
        line.push_str(&format!(" report={report_id}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::{AgentId, RunStatus, StatusSnapshot, ToastView};

    fn view_with_snapshot() -> MonitorViewModel {
        MonitorViewModel {
            agent_id: Some(AgentId::new("agent-1")),
            snapshot: Some(StatusSnapshot {
                status: RunStatus::Running,
                phase: "recon".to_string(),
                progress: 42.0,
                started_at: None,
                completed_at: None,
                findings: Vec::new(),
                rejected_findings: Vec::new(),
                tool_executions: Vec::new(),
                container: None,
                scan_id: None,
                error: None,
            }),
            elapsed_display: "00:02:05".to_string(),
            ..MonitorViewModel::default()
        }
    }

    #[test]
    fn status_line_is_printed_once_per_change() {
        let mut presenter = Presenter::default();
        let view = view_with_snapshot();
        assert_eq!(
            presenter.render(&view),
            vec!["[00:02:05] agent-1 running phase=recon progress=42% findings=0 rejected=0"]
        );
        assert!(presenter.render(&view).is_empty());

        let degraded = MonitorViewModel {
            connection_degraded: true,
            ..view
        };
        let lines = presenter.render(&degraded);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("(connection degraded)"));
    }

    #[test]
    fn toasts_are_printed_once() {
        use chrono::TimeZone;
        let created_at = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 8, 30, 0).unwrap();
        let mut presenter = Presenter::default();
        let mut view = view_with_snapshot();
        presenter.render(&view);

        let id = {
            let mut queue = monitor_core::NotificationQueue::default();
            queue.push("Pentest completed", ToastSeverity::Success, created_at)
        };
        view.toasts.push(ToastView {
            id,
            message: "Pentest completed".to_string(),
            severity: ToastSeverity::Success,
            created_at,
        });
        assert_eq!(
            presenter.render(&view),
            vec!["08:30:00 [ok] Pentest completed"]
        );
        assert!(presenter.render(&view).is_empty());
    }
}
