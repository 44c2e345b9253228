use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AgentId, RunStatus};

/// The one persisted record describing the active run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub agent_id: AgentId,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
}

impl SessionRecord {
    pub fn new(agent_id: AgentId, target: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            target: target.into(),
            started_at,
            status: RunStatus::Running,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a session is already active for agent {0}")]
    AlreadyActive(AgentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Blackbox,
    Whitebox,
    Quick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthDescriptor {
    Bearer { token: String },
    Basic { username: String, password: String },
    Cookie { value: String },
    Header { name: String, value: String },
}

/// Options sent along with a start-run request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthDescriptor>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}
