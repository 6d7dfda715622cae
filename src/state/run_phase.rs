/// Run phase definitions for the collection lifecycle
///
/// A run moves `Idle -> Running -> Draining -> Idle`. A shutdown request
/// while running skips the remaining frontier and goes straight to draining.
use std::fmt;

/// Represents the current phase of a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunPhase {
    /// No run in progress
    #[default]
    Idle,

    /// Frontier traversal in progress; the buffer grows and the cursor trails
    Running,

    /// Traversal finished or was cancelled; the final flush is in progress
    Draining,
}

impl RunPhase {
    /// Returns true if records may still be appended to the buffer
    pub fn is_collecting(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if a run owns the pipeline state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Draining)
    }

    /// Checks whether moving from this phase to `next` is allowed
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Idle)
        )
    }

    /// Lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(RunPhase::default(), RunPhase::Idle);
        assert!(!RunPhase::Idle.is_active());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(RunPhase::Idle.can_transition_to(RunPhase::Running));
        assert!(RunPhase::Running.can_transition_to(RunPhase::Draining));
        assert!(RunPhase::Draining.can_transition_to(RunPhase::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!RunPhase::Idle.can_transition_to(RunPhase::Draining));
        assert!(!RunPhase::Running.can_transition_to(RunPhase::Idle));
        assert!(!RunPhase::Draining.can_transition_to(RunPhase::Running));
        assert!(!RunPhase::Running.can_transition_to(RunPhase::Running));
    }

    #[test]
    fn test_only_running_collects() {
        assert!(RunPhase::Running.is_collecting());
        assert!(!RunPhase::Draining.is_collecting());
        assert!(RunPhase::Draining.is_active());
    }

    #[test]
    fn test_display() {
        assert_eq!(RunPhase::Draining.to_string(), "draining");
    }
}
