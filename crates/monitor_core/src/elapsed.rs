use chrono::{DateTime, Duration, Utc};

/// Running or frozen duration of a test run.
///
/// While running, [`ElapsedTracker::tick`] recomputes at most once per tick
/// period. Once stopped the value is computed a single time from the
/// completion timestamp (or the moment of stopping) and held until the inputs
/// change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElapsedTracker {
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    running: bool,
    seconds: u64,
    next_tick: Option<DateTime<Utc>>,
    period: Duration,
}

impl Default for ElapsedTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(1))
    }
}

impl ElapsedTracker {
    pub fn new(period: Duration) -> Self {
        Self {
            started_at: None,
            completed_at: None,
            running: false,
            seconds: 0,
            next_tick: None,
            period,
        }
    }

    /// Feeds the latest inputs. Recomputes only when they differ from the
    /// held ones, so repeated identical snapshots never restart the cadence.
    pub fn sync(
        &mut self,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        running: bool,
        now: DateTime<Utc>,
    ) {
        let changed = self.started_at != started_at
            || self.completed_at != completed_at
            || self.running != running;
        if !changed {
            return;
        }
        if self.started_at != started_at {
            self.seconds = 0;
        }
        self.started_at = started_at;
        self.completed_at = completed_at;
        self.running = running;

        if running {
            self.recompute(now);
            self.next_tick = Some(now + self.period);
        } else {
            self.next_tick = None;
            let end = completed_at.unwrap_or(now);
            self.seconds = seconds_between(started_at, end);
        }
    }

    /// Advances the running clock if a tick is due.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.next_tick {
            Some(due) if self.running && now >= due => {
                self.recompute(now);
                self.next_tick = Some(now + self.period);
                true
            }
            _ => false,
        }
    }

    fn recompute(&mut self, now: DateTime<Utc>) {
        let secs = seconds_between(self.started_at, now);
        self.seconds = self.seconds.max(secs);
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_tick(&self) -> Option<DateTime<Utc>> {
        self.next_tick
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.period);
    }
}

fn seconds_between(start: Option<DateTime<Utc>>, end: DateTime<Utc>) -> u64 {
    start
        .map(|start| (end - start).num_seconds().max(0) as u64)
        .unwrap_or(0)
}

/// Formats seconds as `HH:MM:SS`; hours grow past two digits if needed.
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
