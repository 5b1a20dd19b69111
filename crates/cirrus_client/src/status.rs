//! Unit-of-work lifecycle status.

/// Lifecycle status of a batch or transaction.
///
/// Units of work move `NotStarted` → `InProgress` → `Committed` or
/// `Aborted`. The two final states are terminal: a finished unit of work
/// can never be begun again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Created but not yet begun.
    NotStarted,
    /// Begun and accepting staged mutations.
    InProgress,
    /// Rolled back. Terminal.
    Aborted,
    /// Committed. Terminal.
    Committed,
}

impl Status {
    /// Returns true if the unit of work is accepting operations.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Status::InProgress
    }

    /// Returns true if the unit of work has finished and cannot be reused.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Aborted | Status::Committed)
    }
}
