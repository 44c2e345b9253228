use crate::{AgentId, LogEntry, SessionRecord, StatusSnapshot, ToastId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A persisted session was found at startup.
    SessionRestored(SessionRecord),
    /// The remote agent accepted a start-run request.
    RunStarted(SessionRecord),
    /// User asked to stop the active run.
    StopClicked,
    /// User cleared the session (start over).
    ClearClicked,
    /// Both fetches of one poll cycle settled.
    CycleCompleted(CycleReport),
    /// User dismissed a toast before it expired.
    ToastDismissed(ToastId),
    /// User asked for a report of the finished run.
    ReportRequested,
    /// Report generation settled.
    ReportFinished {
        agent_id: AgentId,
        result: Result<String, String>,
    },
    /// Clock wakeup for toast expiry, highlight decay and the elapsed tick.
    Tick,
}

/// Results of one fetch cycle, tagged with the agent they were issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub agent_id: AgentId,
    pub status: Result<StatusSnapshot, String>,
    pub logs: Result<Vec<LogEntry>, String>,
}
