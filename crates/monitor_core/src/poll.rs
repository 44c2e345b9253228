use std::time::Duration;

use chrono::Duration as ChronoDuration;

use crate::notify::{DEFAULT_HIGHLIGHT_WINDOW_MS, DEFAULT_TOAST_CAPACITY, DEFAULT_TOAST_LIFETIME_MS};
use crate::AgentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub normal_interval: Duration,
    pub degraded_interval: Duration,
    pub failure_threshold: u32,
    pub log_limit: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_millis(1_500),
            degraded_interval: Duration::from_millis(5_000),
            failure_threshold: 3,
            log_limit: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll: PollConfig,
    pub toast_capacity: usize,
    pub toast_lifetime: Duration,
    pub highlight_window: Duration,
    pub elapsed_tick: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            toast_capacity: DEFAULT_TOAST_CAPACITY,
            toast_lifetime: Duration::from_millis(DEFAULT_TOAST_LIFETIME_MS as u64),
            highlight_window: Duration::from_millis(DEFAULT_HIGHLIGHT_WINDOW_MS as u64),
            elapsed_tick: Duration::from_secs(1),
        }
    }
}

pub(crate) fn to_chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX)
}

/// Consecutive status-fetch failures; log fetches never count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollHealth {
    consecutive_failures: u32,
}

impl PollHealth {
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_degraded(&self, config: &PollConfig) -> bool {
        self.consecutive_failures >= config.failure_threshold
    }

    /// Interval before the next cycle; re-evaluated on every schedule decision.
    pub fn next_interval(&self, config: &PollConfig) -> Duration {
        if self.is_degraded(config) {
            config.degraded_interval
        } else {
            config.normal_interval
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Polling(AgentId),
    Stopped(AgentId),
}

impl PollPhase {
    pub fn polling_agent(&self) -> Option<&AgentId> {
        match self {
            PollPhase::Polling(agent_id) => Some(agent_id),
            PollPhase::Idle | PollPhase::Stopped(_) => None,
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self, PollPhase::Polling(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_degrades_at_threshold_and_recovers() {
        let config = PollConfig::default();
        let mut health = PollHealth::default();
        for _ in 0..2 {
            health.record_failure();
        }
        assert_eq!(health.next_interval(&config), config.normal_interval);

        health.record_failure();
        assert_eq!(health.next_interval(&config), config.degraded_interval);

        health.record_success();
        assert_eq!(health.next_interval(&config), config.normal_interval);
    }
}
