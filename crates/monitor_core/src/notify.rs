use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::{FindingId, Severity};

pub const DEFAULT_TOAST_CAPACITY: usize = 5;
pub const DEFAULT_TOAST_LIFETIME_MS: i64 = 5_000;
pub const DEFAULT_HIGHLIGHT_WINDOW_MS: i64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl ToastId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastSeverity {
    pub fn for_finding(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => ToastSeverity::Error,
            Severity::Medium => ToastSeverity::Warning,
            Severity::Low | Severity::Info => ToastSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: ToastSeverity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Bounded queue of transient notifications in insertion order.
///
/// Capacity is enforced on push by dropping from the front; lifetime is
/// enforced by [`NotificationQueue::expire`], driven by the caller's clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationQueue {
    toasts: VecDeque<Toast>,
    capacity: usize,
    lifetime: Duration,
    next_id: u64,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(
            DEFAULT_TOAST_CAPACITY,
            Duration::milliseconds(DEFAULT_TOAST_LIFETIME_MS),
        )
    }
}

impl NotificationQueue {
    pub fn new(capacity: usize, lifetime: Duration) -> Self {
        Self {
            toasts: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            lifetime,
            next_id: 1,
        }
    }

    pub fn push(
        &mut self,
        message: impl Into<String>,
        severity: ToastSeverity,
        now: DateTime<Utc>,
    ) -> ToastId {
        let id = ToastId(self.next_id);
        self.next_id += 1;
        self.toasts.push_back(Toast {
            id,
            message: message.into(),
            severity,
            created_at: now,
            expires_at: now + self.lifetime,
        });
        while self.toasts.len() > self.capacity {
            self.toasts.pop_front();
        }
        id
    }

    /// Removes a toast ahead of its expiry. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.id != id);
        self.toasts.len() != before
    }

    /// Drops every toast whose lifetime has elapsed; returns how many went.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.expires_at > now);
        before - self.toasts.len()
    }

    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        self.toasts.iter().map(|toast| toast.expires_at).min()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// Findings flagged for presentation emphasis, each decaying after a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlights {
    entries: Vec<(FindingId, DateTime<Utc>)>,
    window: Duration,
}

impl Default for Highlights {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_HIGHLIGHT_WINDOW_MS))
    }
}

impl Highlights {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: Vec::new(),
            window,
        }
    }

    pub fn mark(&mut self, ids: &[FindingId], now: DateTime<Utc>) {
        let until = now + self.window;
        for id in ids {
            match self.entries.iter_mut().find(|(existing, _)| existing == id) {
                Some(entry) => entry.1 = until,
                None => self.entries.push((id.clone(), until)),
            }
        }
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, until)| *until > now);
        before - self.entries.len()
    }

    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|(_, until)| *until).min()
    }

    pub fn ids(&self) -> Vec<FindingId> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
