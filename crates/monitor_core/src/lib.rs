//! Monitor core: pure state machine for live pentest monitoring.
//!
//! Holds the snapshot differ, notification queue, elapsed-time tracker and
//! poll health. Nothing here performs IO or reads the clock; callers pass
//! `now` into [`update`] and execute the returned [`Effect`]s.
mod diff;
mod effect;
mod elapsed;
mod msg;
mod notify;
mod poll;
mod session;
mod snapshot;
mod state;
mod timestamp;
mod update;
mod view_model;

pub use diff::{diff, SeenFindings, SnapshotDiffer, Transition, TransitionSet};
pub use effect::{Effect, ReportRequest};
pub use elapsed::{format_hms, ElapsedTracker};
pub use msg::{CycleReport, Msg};
pub use notify::{Highlights, NotificationQueue, Toast, ToastId, ToastSeverity};
pub use poll::{MonitorConfig, PollConfig, PollHealth, PollPhase};
pub use session::{AuthDescriptor, RunMode, RunOptions, SessionError, SessionRecord};
pub use snapshot::{
    AgentId, Confidence, ContainerTelemetry, Finding, FindingId, LogEntry, RunStatus, Severity,
    SnapshotSummary, StatusSnapshot, ToolExecution, VerificationStatus,
};
pub use state::MonitorState;
pub use update::update;
pub use view_model::{MonitorViewModel, ToastView};
