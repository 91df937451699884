use std::fmt;

use serde::{Deserialize, Serialize};

/// The six stages of a renewal flow.
///
/// A run walks: IDLE → FIRST_REMINDER → FIRST_WAIT → SECOND_REMINDER → SECOND_WAIT → COMPLETED,
/// jumping from FIRST_WAIT straight to COMPLETED when the subscriber renews early.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Idle,
    FirstReminder,
    FirstWait,
    SecondReminder,
    SecondWait,
    Completed,
}

impl Stage {
    /// Every stage in workflow order.
    pub const ALL: [Stage; 6] = [
        Stage::Idle,
        Stage::FirstReminder,
        Stage::FirstWait,
        Stage::SecondReminder,
        Stage::SecondWait,
        Stage::Completed,
    ];

    /// Position of the stage in workflow order. Ordering between stages is
    /// defined by this rank only.
    pub fn rank(self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::FirstReminder => 1,
            Stage::FirstWait => 2,
            Stage::SecondReminder => 3,
            Stage::SecondWait => 4,
            Stage::Completed => 5,
        }
    }

    /// True when `self` lies strictly after `other` in workflow order.
    ///
    /// `stage.has_passed(Stage::FirstReminder)` is how a renderer tells that
    /// the first reminder went out.
    pub fn has_passed(self, other: Stage) -> bool {
        self.rank() > other.rank()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Completed
    }

    /// Stages during which a run is in flight.
    pub fn is_active(self) -> bool {
        !matches!(self, Stage::Idle | Stage::Completed)
    }

    pub fn is_reminder(self) -> bool {
        matches!(self, Stage::FirstReminder | Stage::SecondReminder)
    }

    pub fn is_wait(self) -> bool {
        matches!(self, Stage::FirstWait | Stage::SecondWait)
    }

    /// The renewal check that resolves this stage, if it is a wait stage.
    pub fn attempt(self) -> Option<Attempt> {
        match self {
            Stage::FirstWait => Some(Attempt::First),
            Stage::SecondWait => Some(Attempt::Second),
            _ => None,
        }
    }

    /// Human-readable label, as shown on a flow diagram.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::FirstReminder => "First Reminder",
            Stage::FirstWait => "First Wait",
            Stage::SecondReminder => "Second Reminder",
            Stage::SecondWait => "Second Wait",
            Stage::Completed => "Completed",
        }
    }
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "IDLE"),
            Stage::FirstReminder => write!(f, "FIRST_REMINDER"),
            Stage::FirstWait => write!(f, "FIRST_WAIT"),
            Stage::SecondReminder => write!(f, "SECOND_REMINDER"),
            Stage::SecondWait => write!(f, "SECOND_WAIT"),
            Stage::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Which of the two renewal checks is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attempt {
    First,
    Second,
}

impl Attempt {
    pub fn number(self) -> u8 {
        match self {
            Attempt::First => 1,
            Attempt::Second => 2,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attempt::First => write!(f, "first"),
            Attempt::Second => write!(f, "second"),
        }
    }
}

/// Final result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_workflow_order() {
        let ranks: Vec<u8> = Stage::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5]);
        assert!(Stage::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn has_passed_uses_rank() {
        assert!(!Stage::Idle.has_passed(Stage::FirstReminder));
        assert!(!Stage::FirstReminder.has_passed(Stage::FirstReminder));
        assert!(Stage::FirstWait.has_passed(Stage::FirstReminder));
        assert!(Stage::Completed.has_passed(Stage::FirstReminder));
    }

    #[test]
    fn active_stages() {
        let active: Vec<Stage> = Stage::ALL.into_iter().filter(|s| s.is_active()).collect();
        assert_eq!(
            active,
            vec![
                Stage::FirstReminder,
                Stage::FirstWait,
                Stage::SecondReminder,
                Stage::SecondWait
            ]
        );
    }

    #[test]
    fn only_wait_stages_have_attempts() {
        assert_eq!(Stage::FirstWait.attempt(), Some(Attempt::First));
        assert_eq!(Stage::SecondWait.attempt(), Some(Attempt::Second));
        assert!(Stage::FirstReminder.attempt().is_none());
        assert!(Stage::Completed.attempt().is_none());
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Idle.to_string(), "IDLE");
        assert_eq!(Stage::SecondReminder.to_string(), "SECOND_REMINDER");
        assert_eq!(Stage::SecondWait.label(), "Second Wait");
    }

    #[test]
    fn outcome_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Outcome::Failed).unwrap(),
            "\"failed\""
        );
    }
}
