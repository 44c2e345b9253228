use std::fmt;

use monitor_core::{AgentId, SessionError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, FailureKind::RateLimited { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    RateLimited { retry_after_secs: Option<u64> },
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::RateLimited {
                retry_after_secs: Some(secs),
            } => write!(f, "rate limited (retry after {secs}s)"),
            FailureKind::RateLimited {
                retry_after_secs: None,
            } => write!(f, "rate limited"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
        }
    }
}

/// Why a start-run request did not produce a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("a session is already active for agent {0}")]
    AlreadyActive(AgentId),
    #[error("start rejected: {0}")]
    RateLimited(ApiError),
    #[error("start rejected: {0}")]
    Rejected(ApiError),
    #[error("another start request is still waiting for the agent service")]
    InProgress,
    #[error("monitor is no longer running")]
    MonitorClosed,
}

impl From<SessionError> for StartError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyActive(agent_id) => StartError::AlreadyActive(agent_id),
        }
    }
}

impl From<ApiError> for StartError {
    fn from(err: ApiError) -> Self {
        if err.is_rate_limited() {
            StartError::RateLimited(err)
        } else {
            StartError::Rejected(err)
        }
    }
}

/// Parameters for the report service, built from a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportParams {
    pub agent_id: AgentId,
    pub target: String,
    pub scan_id: Option<String>,
    pub finding_count: usize,
}

impl From<monitor_core::ReportRequest> for ReportParams {
    fn from(request: monitor_core::ReportRequest) -> Self {
        Self {
            agent_id: request.agent_id,
            target: request.target,
            scan_id: request.scan_id,
            finding_count: request.finding_count,
        }
    }
}
