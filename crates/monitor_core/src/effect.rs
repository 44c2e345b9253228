use std::time::Duration;

use crate::{AgentId, RunStatus, SessionRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write a new session record through the session store.
    PersistSession(SessionRecord),
    /// Merge the run status into the stored record.
    UpdateSessionStatus(RunStatus),
    ClearSession,
    /// Run one fetch cycle for `agent_id` after `delay`.
    SchedulePoll { agent_id: AgentId, delay: Duration },
    /// Cancel any scheduled or in-flight fetch cycle.
    CancelPoll,
    /// Best-effort stop request to the remote agent.
    StopRun { agent_id: AgentId },
    GenerateReport(ReportRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub agent_id: AgentId,
    pub target: String,
    pub scan_id: Option<String>,
    pub finding_count: usize,
}
