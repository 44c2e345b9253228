//! Monitor engine: remote API client, session persistence and the polling
//! runtime that executes core effects.
mod api;
mod monitor;
mod persist;
mod poll_task;
mod session_store;
mod types;

pub use api::{AgentApi, ApiSettings, ReqwestAgentApi};
pub use monitor::MonitorHandle;
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use session_store::{SessionStore, SESSION_FILENAME};
pub use types::{ApiError, FailureKind, ReportParams, StartError};
