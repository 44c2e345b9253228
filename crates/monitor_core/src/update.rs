use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{CycleReport, Effect, MonitorState, Msg, PollPhase, SessionRecord, ToastSeverity};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: MonitorState, msg: Msg, now: DateTime<Utc>) -> (MonitorState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionRestored(record) => {
            if state.session().is_some() {
                return (state, Vec::new());
            }
            if record.agent_id.is_empty() {
                // A record without an agent cannot be polled; treat it as absent.
                return (state, vec![Effect::ClearSession]);
            }
            let agent_id = record.agent_id.clone();
            state.begin_session(record, now);
            vec![immediate_poll(agent_id)]
        }
        Msg::RunStarted(record) => start_run(&mut state, record, now),
        Msg::StopClicked => match state.stop_locally(now) {
            Some(agent_id) => {
                state.push_toast("Pentest stopped", ToastSeverity::Warning, now);
                vec![
                    Effect::CancelPoll,
                    Effect::StopRun { agent_id },
                    Effect::UpdateSessionStatus(crate::RunStatus::Stopped),
                ]
            }
            None => Vec::new(),
        },
        Msg::ClearClicked => {
            let mut effects = Vec::with_capacity(2);
            if state.phase().is_polling() {
                effects.push(Effect::CancelPoll);
            }
            state.clear_session();
            effects.push(Effect::ClearSession);
            effects
        }
        Msg::CycleCompleted(report) => apply_cycle(&mut state, report, now),
        Msg::ToastDismissed(id) => {
            state.dismiss_toast(id);
            Vec::new()
        }
        Msg::ReportRequested => match state.begin_report() {
            Some(request) => vec![Effect::GenerateReport(request)],
            None => Vec::new(),
        },
        Msg::ReportFinished { agent_id, result } => {
            state.finish_report(&agent_id, result, now);
            Vec::new()
        }
        Msg::Tick => {
            state.tick(now);
            Vec::new()
        }
    };

    (state, effects)
}

fn start_run(state: &mut MonitorState, record: SessionRecord, now: DateTime<Utc>) -> Vec<Effect> {
    if state.ensure_can_start().is_err() || record.agent_id.is_empty() {
        return Vec::new();
    }
    let agent_id = record.agent_id.clone();
    let message = format!("Pentest started against {}", record.target);
    state.begin_session(record.clone(), now);
    state.push_toast(message, ToastSeverity::Info, now);
    vec![Effect::PersistSession(record), immediate_poll(agent_id)]
}

fn immediate_poll(agent_id: crate::AgentId) -> Effect {
    Effect::SchedulePoll {
        agent_id,
        delay: Duration::ZERO,
    }
}

fn apply_cycle(state: &mut MonitorState, report: CycleReport, now: DateTime<Utc>) -> Vec<Effect> {
    // Results issued for any agent other than the one being polled are stale.
    if state.phase().polling_agent() != Some(&report.agent_id) {
        return Vec::new();
    }

    let mut effects = Vec::new();
    let mut terminal = false;
    match report.status {
        Ok(snapshot) => {
            let status = snapshot.status;
            terminal = status.is_terminal();
            state.apply_snapshot(snapshot, now);
            effects.push(Effect::UpdateSessionStatus(status));
        }
        Err(_) => state.record_poll_failure(),
    }
    if let Ok(logs) = report.logs {
        state.replace_logs(logs);
    }

    if terminal {
        state.enter_stopped(report.agent_id);
        effects.push(Effect::CancelPoll);
    } else {
        let delay = state.health().next_interval(&state.config().poll);
        effects.push(Effect::SchedulePoll {
            agent_id: report.agent_id,
            delay,
        });
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgentId, RunStatus};
    use chrono::TimeZone;

    #[test]
    fn restored_record_without_agent_is_cleared() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let record = SessionRecord::new(AgentId::new("  "), "t", now);
        let (state, effects) = update(MonitorState::default(), Msg::SessionRestored(record), now);
        assert_eq!(effects, vec![Effect::ClearSession]);
        assert_eq!(state.phase(), &PollPhase::Idle);
    }

    #[test]
    fn stop_outside_polling_is_noop() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (state, effects) = update(MonitorState::default(), Msg::StopClicked, now);
        assert!(effects.is_empty());
        assert_eq!(state.session().map(|s| s.status), None::<RunStatus>);
    }
}
