use std::collections::BTreeSet;

use crate::{FindingId, RunStatus, SnapshotSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    PhaseChanged { from: String, to: String },
    StatusChanged { from: RunStatus, to: RunStatus },
    NewFinding(FindingId),
}

/// Output of [`diff`]. `new_findings` doubles as the highlight set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionSet {
    pub transitions: Vec<Transition>,
    pub new_findings: Vec<FindingId>,
}

impl TransitionSet {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.new_findings.is_empty()
    }
}

/// Finding identifiers already reported for the current session. Only grows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeenFindings {
    ids: BTreeSet<FindingId>,
}

impl SeenFindings {
    pub fn contains(&self, id: &FindingId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn extend<'a>(&mut self, ids: impl IntoIterator<Item = &'a FindingId>) {
        self.ids.extend(ids.into_iter().cloned());
    }
}

/// Classifies the change between two summaries.
///
/// `previous` is `None` for the first observation of a session: no phase or
/// status transition is reported and any findings already present are backlog,
/// not news. The caller folds the returned identifiers into `seen`.
pub fn diff(
    previous: Option<&SnapshotSummary>,
    current: &SnapshotSummary,
    seen: &SeenFindings,
) -> TransitionSet {
    let mut set = TransitionSet::default();

    let Some(previous) = previous else {
        return set;
    };

    if !previous.phase.is_empty() && previous.phase != current.phase {
        set.transitions.push(Transition::PhaseChanged {
            from: previous.phase.clone(),
            to: current.phase.clone(),
        });
    }

    if is_reportable_status_change(previous.status, current.status) {
        set.transitions.push(Transition::StatusChanged {
            from: previous.status,
            to: current.status,
        });
    }

    for id in current.finding_ids.iter().filter(|id| !seen.contains(id)) {
        set.transitions.push(Transition::NewFinding(id.clone()));
        set.new_findings.push(id.clone());
    }

    set
}

fn is_reportable_status_change(from: RunStatus, to: RunStatus) -> bool {
    from == RunStatus::Running
        && matches!(
            to,
            RunStatus::Completed | RunStatus::Error | RunStatus::Stopped
        )
}

/// Holds the previous summary and the seen accumulator between polls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotDiffer {
    previous: Option<SnapshotSummary>,
    seen: SeenFindings,
}

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs `current` against the held state and advances it.
    pub fn observe(&mut self, current: SnapshotSummary) -> TransitionSet {
        let set = diff(self.previous.as_ref(), &current, &self.seen);
        if self.previous.is_none() {
            // Backlog present at first observation is recorded silently.
            self.seen.extend(&current.finding_ids);
        } else {
            self.seen.extend(&set.new_findings);
        }
        self.previous = Some(current);
        set
    }

    pub fn previous(&self) -> Option<&SnapshotSummary> {
        self.previous.as_ref()
    }

    pub fn seen(&self) -> &SeenFindings {
        &self.seen
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
