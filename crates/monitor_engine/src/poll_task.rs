use std::sync::Arc;
use std::time::Duration;

use engine_logging::engine_debug;
use monitor_core::{AgentId, CycleReport};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::AgentApi;

/// One scheduled fetch cycle for a single agent.
///
/// The next cycle is only spawned after the report of this one has been
/// applied, so at most one cycle is outstanding. Cancelling is synchronous:
/// once [`PollTask::cancel`] returns, the task can no longer deliver a report.
pub(crate) struct PollTask {
    agent_id: AgentId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollTask {
    pub(crate) fn spawn(
        api: Arc<dyn AgentApi>,
        agent_id: AgentId,
        delay: Duration,
        log_limit: usize,
        report_tx: UnboundedSender<CycleReport>,
    ) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();
        let task_agent = agent_id.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                report = run_cycle(api.as_ref(), task_agent, delay, log_limit) => {
                    if !child.is_cancelled() {
                        let _ = report_tx.send(report);
                    }
                }
            }
        });
        Self {
            agent_id,
            token,
            handle,
        }
    }

    pub(crate) fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub(crate) fn cancel(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

async fn run_cycle(
    api: &dyn AgentApi,
    agent_id: AgentId,
    delay: Duration,
    log_limit: usize,
) -> CycleReport {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    // Independent reads; the cycle ends when both have settled.
    let (status, logs) = tokio::join!(
        api.fetch_status(&agent_id),
        api.fetch_logs(&agent_id, log_limit)
    );
    if let Err(err) = &status {
        engine_debug!("Status fetch failed agent_id={} error={}", agent_id, err);
    }
    if let Err(err) = &logs {
        engine_debug!("Log fetch failed agent_id={} error={}", agent_id, err);
    }

    CycleReport {
        agent_id,
        status: status.map_err(|err| err.to_string()),
        logs: logs.map_err(|err| err.to_string()),
    }
}
