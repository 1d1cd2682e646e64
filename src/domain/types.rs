use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Evaluated,
    Completed,
}

impl AttemptStatus {
    /// The only legal edges: InProgress -> Submitted -> {Evaluated | Completed}.
    pub fn can_transition_to(self, next: AttemptStatus) -> bool {
        matches!(
            (self, next),
            (AttemptStatus::InProgress, AttemptStatus::Submitted)
                | (AttemptStatus::Submitted, AttemptStatus::Evaluated)
                | (AttemptStatus::Submitted, AttemptStatus::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Evaluated | AttemptStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Evaluated => "evaluated",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entitlement basis under which a user may start an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Individual,
    TestSeries,
    Course,
}

/// Transient autosave indicator surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    Idle,
    Saving,
    Saved,
    Failed,
}
