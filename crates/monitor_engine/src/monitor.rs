use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_info, engine_warn};
use monitor_core::{
    update, AgentId, CycleReport, Effect, MonitorConfig, MonitorState, MonitorViewModel, Msg,
    RunOptions, SessionRecord, StatusSnapshot, ToastId, ToastView,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::poll_task::PollTask;
use crate::{AgentApi, ApiError, ReportParams, SessionStore, StartError};

enum MonitorCommand {
    Start {
        target: String,
        options: RunOptions,
        reply: StartReply,
    },
    Stop,
    Clear,
    DismissToast(ToastId),
    GenerateReport,
    Shutdown,
}

/// Presentation-facing handle to a running monitor.
///
/// All state lives in one task spawned on the current tokio runtime; the
/// handle only sends commands and reads the published view model.
pub struct MonitorHandle {
    cmd_tx: mpsc::UnboundedSender<MonitorCommand>,
    view_rx: watch::Receiver<MonitorViewModel>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Spawns the monitor. A persisted session is restored, and polling for
    /// it begins, before any command is processed.
    pub fn spawn(api: Arc<dyn AgentApi>, store: SessionStore, config: MonitorConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (cycle_tx, cycle_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (start_tx, start_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(MonitorViewModel::default());

        let actor = MonitorActor {
            state: MonitorState::new(config),
            api,
            store,
            poll: None,
            cycle_tx,
            report_tx,
            start_tx,
            start_in_flight: false,
            view_tx,
            clock: MonitorClock::new(),
        };
        let task = tokio::spawn(actor.run(cmd_rx, cycle_rx, report_rx, start_rx));

        Self {
            cmd_tx,
            view_rx,
            task,
        }
    }

    /// Asks the agent service to start a run and, on success, begins polling.
    /// Rejections are returned verbatim and never retried.
    pub async fn start_session(
        &self,
        target: impl Into<String>,
        options: RunOptions,
    ) -> Result<AgentId, StartError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(MonitorCommand::Start {
                target: target.into(),
                options,
                reply,
            })
            .map_err(|_| StartError::MonitorClosed)?;
        rx.await.map_err(|_| StartError::MonitorClosed)?
    }

    pub fn stop_session(&self) {
        let _ = self.cmd_tx.send(MonitorCommand::Stop);
    }

    pub fn clear_session(&self) {
        let _ = self.cmd_tx.send(MonitorCommand::Clear);
    }

    pub fn dismiss_toast(&self, id: ToastId) {
        let _ = self.cmd_tx.send(MonitorCommand::DismissToast(id));
    }

    /// Requests a report for a finished run; ignored while the run is active.
    pub fn generate_report(&self) {
        let _ = self.cmd_tx.send(MonitorCommand::GenerateReport);
    }

    pub fn view(&self) -> MonitorViewModel {
        self.view_rx.borrow().clone()
    }

    /// Receiver that wakes whenever the view model changes.
    pub fn subscribe(&self) -> watch::Receiver<MonitorViewModel> {
        self.view_rx.clone()
    }

    pub fn latest_snapshot(&self) -> Option<StatusSnapshot> {
        self.view_rx.borrow().snapshot.clone()
    }

    pub fn notifications(&self) -> Vec<ToastView> {
        self.view_rx.borrow().toasts.clone()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.view_rx.borrow().elapsed_seconds
    }

    pub fn is_connection_degraded(&self) -> bool {
        self.view_rx.borrow().connection_degraded
    }

    /// Stops the monitor task. The persisted session is left in place so a
    /// later process can resume it.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(MonitorCommand::Shutdown);
        let _ = self.task.await;
    }
}

/// Wall clock anchored to the tokio clock, so paused test time drives
/// timestamps and timers consistently.
struct MonitorClock {
    wall: DateTime<Utc>,
    instant: Instant,
}

impl MonitorClock {
    fn new() -> Self {
        Self {
            wall: Utc::now(),
            instant: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let since = Instant::now().saturating_duration_since(self.instant);
        self.wall + chrono::Duration::from_std(since).unwrap_or(chrono::Duration::zero())
    }

    fn instant_at(&self, at: DateTime<Utc>) -> Instant {
        let offset = (at - self.wall).to_std().unwrap_or(Duration::ZERO);
        self.instant + offset
    }
}

type StartReply = oneshot::Sender<Result<AgentId, StartError>>;

/// Outcome of a start-run call made off the actor loop.
struct StartOutcome {
    target: String,
    result: Result<AgentId, ApiError>,
    reply: StartReply,
}

struct MonitorActor {
    state: MonitorState,
    api: Arc<dyn AgentApi>,
    store: SessionStore,
    poll: Option<PollTask>,
    cycle_tx: mpsc::UnboundedSender<CycleReport>,
    report_tx: mpsc::UnboundedSender<(AgentId, Result<String, String>)>,
    start_tx: mpsc::UnboundedSender<StartOutcome>,
    start_in_flight: bool,
    view_tx: watch::Sender<MonitorViewModel>,
    clock: MonitorClock,
}

impl MonitorActor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<MonitorCommand>,
        mut cycle_rx: mpsc::UnboundedReceiver<CycleReport>,
        mut report_rx: mpsc::UnboundedReceiver<(AgentId, Result<String, String>)>,
        mut start_rx: mpsc::UnboundedReceiver<StartOutcome>,
    ) {
        if let Some(record) = self.store.restore() {
            self.dispatch(Msg::SessionRestored(record));
        }
        self.view_tx.send_replace(self.state.view());

        loop {
            let wakeup = self.state.next_wakeup();
            let deadline = wakeup.map(|at| self.clock.instant_at(at));
            tokio::select! {
                command = cmd_rx.recv() => match command {
                    Some(MonitorCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(outcome) = start_rx.recv() => self.finish_start(outcome),
                Some(report) = cycle_rx.recv() => {
                    self.dispatch(Msg::CycleCompleted(report));
                }
                Some((agent_id, result)) = report_rx.recv() => {
                    self.dispatch(Msg::ReportFinished { agent_id, result });
                }
                _ = sleep_until(deadline), if deadline.is_some() => {
                    self.dispatch(Msg::Tick);
                }
            }
        }

        if let Some(task) = self.poll.take() {
            task.cancel();
        }
        engine_debug!("Monitor task stopped");
    }

    fn handle_command(&mut self, command: MonitorCommand) {
        match command {
            MonitorCommand::Start {
                target,
                options,
                reply,
            } => self.start(target, options, reply),
            MonitorCommand::Stop => self.dispatch(Msg::StopClicked),
            MonitorCommand::Clear => self.dispatch(Msg::ClearClicked),
            MonitorCommand::DismissToast(id) => self.dispatch(Msg::ToastDismissed(id)),
            MonitorCommand::GenerateReport => self.dispatch(Msg::ReportRequested),
            MonitorCommand::Shutdown => {}
        }
    }

    /// Issues the start-run call on its own task so toasts, ticks and other
    /// commands keep flowing while the agent service answers.
    fn start(&mut self, target: String, options: RunOptions, reply: StartReply) {
        if let Err(err) = self.state.ensure_can_start() {
            let _ = reply.send(Err(err.into()));
            return;
        }
        if self.start_in_flight {
            let _ = reply.send(Err(StartError::InProgress));
            return;
        }
        self.start_in_flight = true;

        let api = self.api.clone();
        let start_tx = self.start_tx.clone();
        tokio::spawn(async move {
            let result = api.start_run(&target, &options).await;
            let _ = start_tx.send(StartOutcome {
                target,
                result,
                reply,
            });
        });
    }

    fn finish_start(&mut self, outcome: StartOutcome) {
        self.start_in_flight = false;
        let StartOutcome {
            target,
            result,
            reply,
        } = outcome;
        let result = match result {
            Ok(agent_id) => match self.state.ensure_can_start() {
                Ok(()) => {
                    let record = SessionRecord::new(agent_id.clone(), target, self.clock.now());
                    self.dispatch(Msg::RunStarted(record));
                    Ok(agent_id)
                }
                Err(err) => Err(StartError::from(err)),
            },
            Err(err) => {
                engine_warn!("Start run rejected target={} error={}", target, err);
                Err(StartError::from(err))
            }
        };
        let _ = reply.send(result);
    }

    fn dispatch(&mut self, msg: Msg) {
        let now = self.clock.now();
        let was_degraded = self.state.is_degraded();

        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg, now);
        self.state = state;

        match (was_degraded, self.state.is_degraded()) {
            (false, true) => engine_warn!(
                "Connection degraded after {} failed status fetches",
                self.state.health().consecutive_failures()
            ),
            (true, false) => engine_info!("Connection recovered"),
            _ => {}
        }

        for effect in effects {
            self.run_effect(effect);
        }

        if self.state.consume_dirty() {
            self.view_tx.send_replace(self.state.view());
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PersistSession(record) => {
                if let Err(err) = self.store.start(record) {
                    engine_warn!("Session store refused new record: {}", err);
                }
            }
            Effect::UpdateSessionStatus(status) => self.store.update_status(status),
            Effect::ClearSession => self.store.clear(),
            Effect::SchedulePoll { agent_id, delay } => {
                self.cancel_poll();
                let task = PollTask::spawn(
                    self.api.clone(),
                    agent_id,
                    delay,
                    self.state.config().poll.log_limit,
                    self.cycle_tx.clone(),
                );
                self.poll = Some(task);
            }
            Effect::CancelPoll => self.cancel_poll(),
            Effect::StopRun { agent_id } => {
                let api = self.api.clone();
                tokio::spawn(async move {
                    if let Err(err) = api.stop_run(&agent_id).await {
                        engine_warn!("Stop request failed agent_id={} error={}", agent_id, err);
                    }
                });
            }
            Effect::GenerateReport(request) => {
                let api = self.api.clone();
                let report_tx = self.report_tx.clone();
                let params = ReportParams::from(request);
                tokio::spawn(async move {
                    let result = api
                        .generate_report(&params)
                        .await
                        .map_err(|err| err.to_string());
                    let _ = report_tx.send((params.agent_id, result));
                });
            }
        }
    }

    fn cancel_poll(&mut self) {
        if let Some(task) = self.poll.take() {
            engine_debug!("Cancelling poll agent_id={}", task.agent_id());
            task.cancel();
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
