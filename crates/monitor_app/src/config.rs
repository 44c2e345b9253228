//! `monitor.ron` loading and mapping onto engine/core settings.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use engine_logging::LogDestination;
use log::LevelFilter;
use monitor_core::{AuthDescriptor, MonitorConfig, PollConfig, RunMode, RunOptions};
use monitor_engine::ApiSettings;
use serde::Deserialize;

pub const CONFIG_ENV: &str = "PENTEST_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./monitor.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum LogTarget {
    File,
    #[default]
    Terminal,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ModeConfig {
    #[default]
    Blackbox,
    Whitebox,
    Quick,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum AuthConfig {
    Bearer(String),
    Basic { username: String, password: String },
    Cookie(String),
    Header { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    pub target: String,
    #[serde(default)]
    pub mode: ModeConfig,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub report_base_url: String,
    pub request_timeout_secs: u64,
    pub state_dir: PathBuf,
    pub log_target: LogTarget,
    pub log_level: String,
    pub log_file: PathBuf,
    pub poll_interval_ms: u64,
    pub degraded_interval_ms: u64,
    pub failure_threshold: u32,
    pub log_limit: usize,
    pub generate_report: bool,
    pub run: Option<RunConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        let poll = PollConfig::default();
        Self {
            api_base_url: api.base_url,
            report_base_url: api.report_base_url,
            request_timeout_secs: api.request_timeout.as_secs(),
            state_dir: PathBuf::from("./.pentest_monitor"),
            log_target: LogTarget::Terminal,
            log_level: "info".to_string(),
            log_file: PathBuf::from("./monitor.log"),
            poll_interval_ms: poll.normal_interval.as_millis() as u64,
            degraded_interval_ms: poll.degraded_interval.as_millis() as u64,
            failure_threshold: poll.failure_threshold,
            log_limit: poll.log_limit,
            generate_report: true,
            run: None,
        }
    }
}

impl AppConfig {
    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            report_base_url: self.report_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ApiSettings::default()
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll: PollConfig {
                normal_interval: Duration::from_millis(self.poll_interval_ms),
                degraded_interval: Duration::from_millis(self.degraded_interval_ms),
                failure_threshold: self.failure_threshold,
                log_limit: self.log_limit,
            },
            ..MonitorConfig::default()
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log_target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }

    /// Unknown level names fall back to `Info`.
    pub fn level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

impl RunConfig {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            mode: match self.mode {
                ModeConfig::Blackbox => RunMode::Blackbox,
                ModeConfig::Whitebox => RunMode::Whitebox,
                ModeConfig::Quick => RunMode::Quick,
            },
            prompt: self.prompt.clone(),
            auth: self.auth.clone().map(map_auth),
            provider: self.provider.clone(),
            model: self.model.clone(),
        }
    }
}

fn map_auth(auth: AuthConfig) -> AuthDescriptor {
    match auth {
        AuthConfig::Bearer(token) => AuthDescriptor::Bearer { token },
        AuthConfig::Basic { username, password } => AuthDescriptor::Basic { username, password },
        AuthConfig::Cookie(value) => AuthDescriptor::Cookie { value },
        AuthConfig::Header { name, value } => AuthDescriptor::Header { name, value },
    }
}

/// Reads the config file. `Ok(None)` means there is no file; a file that
/// exists but does not parse is an error.
pub fn load(path: &Path) -> anyhow::Result<Option<AppConfig>> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("reading config {}", path.display()));
        }
    };
    let config = ron::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(Some(config))
}
