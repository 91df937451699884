use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::log::{EventLog, LogCategory};
use super::stage::{Outcome, Stage};
use crate::error::{RenewalError, Result};

/// Events that move a flow between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// A caller asked to begin a run.
    Start,
    /// The reminder delay elapsed and the reminder went out.
    ReminderSent,
    /// The wait delay elapsed and the renewal check came back.
    WaitElapsed { renewed: bool },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Start => write!(f, "START"),
            Trigger::ReminderSent => write!(f, "REMINDER_SENT"),
            Trigger::WaitElapsed { .. } => write!(f, "WAIT_ELAPSED"),
        }
    }
}

/// The result of applying a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The flow moved on to another non-terminal stage.
    Next(Stage),
    /// The flow reached `Completed` with the given outcome.
    Complete(Outcome),
}

/// Everything an observer can know about one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub stage: Stage,
    pub running: bool,
    pub outcome: Option<Outcome>,
    pub log: EventLog,
    /// Stages entered during the current run, in order.
    pub history: Vec<Stage>,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self) -> bool {
        self.stage == Stage::Completed
    }

    /// Number of reminders that have gone out so far.
    pub fn reminders_sent(&self) -> usize {
        self.history
            .iter()
            .filter(|s| s.is_wait())
            .count()
    }

    /// Checks the relationships between stage, running flag, outcome and
    /// history that every reachable state satisfies.
    pub fn is_consistent(&self) -> bool {
        let running_ok = self.running == self.stage.is_active();
        let outcome_ok = self.outcome.is_some() == self.is_completed();
        let history_ok = self.history.windows(2).all(|w| w[0] < w[1])
            && self.history.last().copied().unwrap_or(Stage::Idle) == self.stage;
        running_ok && outcome_ok && history_ok
    }
}

/// Applies triggers to an [`EngineState`].
///
/// This is the only code that writes to the state or its log. It performs no
/// timing and no I/O; the engine decides when a trigger fires.
pub struct StateMachine;

impl StateMachine {
    /// Apply `trigger` to `state`, appending the matching log entry.
    ///
    /// Returns `InvalidTransition` and leaves `state` untouched when the
    /// trigger does not apply to the current stage.
    pub fn next(state: &mut EngineState, trigger: Trigger) -> Result<Transition> {
        let transition = match (state.stage, trigger) {
            (Stage::Idle, Trigger::Start) => {
                state.running = true;
                state.run_id = Some(Uuid::new_v4());
                state.started_at = Some(Utc::now());
                state
                    .log
                    .append("Initiating newsletter renewal flow", LogCategory::Start);
                Self::enter(state, Stage::FirstReminder)
            }
            (Stage::FirstReminder, Trigger::ReminderSent) => {
                state
                    .log
                    .append("Sending first renewal reminder email", LogCategory::Info);
                Self::enter(state, Stage::FirstWait)
            }
            (Stage::FirstWait, Trigger::WaitElapsed { renewed: true }) => {
                state
                    .log
                    .append("User renewed after first reminder!", LogCategory::Success);
                Self::complete(state, Outcome::Success)
            }
            (Stage::FirstWait, Trigger::WaitElapsed { renewed: false }) => {
                state
                    .log
                    .append("No renewal after first reminder", LogCategory::Warning);
                Self::enter(state, Stage::SecondReminder)
            }
            (Stage::SecondReminder, Trigger::ReminderSent) => {
                state
                    .log
                    .append("Sending second renewal reminder email", LogCategory::Info);
                Self::enter(state, Stage::SecondWait)
            }
            (Stage::SecondWait, Trigger::WaitElapsed { renewed: true }) => {
                state
                    .log
                    .append("User renewed after second reminder!", LogCategory::Success);
                Self::complete(state, Outcome::Success)
            }
            (Stage::SecondWait, Trigger::WaitElapsed { renewed: false }) => {
                state.log.append(
                    "No renewal after second reminder. Flow ended.",
                    LogCategory::Error,
                );
                Self::complete(state, Outcome::Failed)
            }
            (from, trigger) => return Err(RenewalError::InvalidTransition { from, trigger }),
        };

        Ok(transition)
    }

    /// Discard the run and return to `Idle` with an empty log.
    pub fn reset(state: &mut EngineState) {
        state.log.clear();
        state.history.clear();
        state.stage = Stage::Idle;
        state.running = false;
        state.outcome = None;
        state.run_id = None;
        state.started_at = None;
        state.finished_at = None;
    }

    fn enter(state: &mut EngineState, stage: Stage) -> Transition {
        state.stage = stage;
        state.history.push(stage);
        Transition::Next(stage)
    }

    fn complete(state: &mut EngineState, outcome: Outcome) -> Transition {
        state.stage = Stage::Completed;
        state.history.push(Stage::Completed);
        state.outcome = Some(outcome);
        state.running = false;
        state.finished_at = Some(Utc::now());
        Transition::Complete(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> EngineState {
        let mut state = EngineState::new();
        StateMachine::next(&mut state, Trigger::Start).unwrap();
        state
    }

    fn drive(state: &mut EngineState, checks: &[bool]) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let mut checks = checks.iter();
        while state.running {
            let trigger = if state.stage.is_wait() {
                Trigger::WaitElapsed {
                    renewed: *checks.next().unwrap(),
                }
            } else {
                Trigger::ReminderSent
            };
            transitions.push(StateMachine::next(state, trigger).unwrap());
        }
        transitions
    }

    #[test]
    fn start_enters_first_reminder() {
        let state = started();
        assert_eq!(state.stage, Stage::FirstReminder);
        assert!(state.running);
        assert!(state.outcome.is_none());
        assert!(state.run_id.is_some());
        assert_eq!(state.log.categories(), vec![LogCategory::Start]);
        assert!(state.is_consistent());
    }

    #[test]
    fn early_renewal_short_circuits() {
        let mut state = started();
        let transitions = drive(&mut state, &[true]);

        assert_eq!(
            transitions,
            vec![
                Transition::Next(Stage::FirstWait),
                Transition::Complete(Outcome::Success)
            ]
        );
        assert_eq!(
            state.history,
            vec![Stage::FirstReminder, Stage::FirstWait, Stage::Completed]
        );
        assert_eq!(
            state.log.categories(),
            vec![LogCategory::Start, LogCategory::Info, LogCategory::Success]
        );
        assert_eq!(state.outcome, Some(Outcome::Success));
        assert!(!state.running);
        assert_eq!(state.reminders_sent(), 1);
        assert!(state.is_consistent());
    }

    #[test]
    fn late_renewal_walks_all_stages() {
        let mut state = started();
        drive(&mut state, &[false, true]);

        assert_eq!(
            state.history,
            vec![
                Stage::FirstReminder,
                Stage::FirstWait,
                Stage::SecondReminder,
                Stage::SecondWait,
                Stage::Completed
            ]
        );
        assert_eq!(
            state.log.categories(),
            vec![
                LogCategory::Start,
                LogCategory::Info,
                LogCategory::Warning,
                LogCategory::Info,
                LogCategory::Success
            ]
        );
        assert_eq!(state.outcome, Some(Outcome::Success));
        assert_eq!(state.reminders_sent(), 2);
    }

    #[test]
    fn no_renewal_fails() {
        let mut state = started();
        let transitions = drive(&mut state, &[false, false]);

        assert_eq!(
            transitions.last(),
            Some(&Transition::Complete(Outcome::Failed))
        );
        assert_eq!(state.log.len(), 5);
        assert_eq!(
            state.log.last().map(|e| e.category()),
            Some(LogCategory::Error)
        );
        assert_eq!(state.outcome, Some(Outcome::Failed));
        assert!(state.finished_at.is_some());
        assert!(state.is_consistent());
    }

    #[test]
    fn completed_rejects_further_triggers() {
        let mut state = started();
        drive(&mut state, &[true]);
        let before = state.clone();

        for trigger in [
            Trigger::Start,
            Trigger::ReminderSent,
            Trigger::WaitElapsed { renewed: true },
        ] {
            let err = StateMachine::next(&mut state, trigger).unwrap_err();
            assert!(matches!(
                err,
                RenewalError::InvalidTransition {
                    from: Stage::Completed,
                    ..
                }
            ));
        }
        assert_eq!(state, before);
    }

    #[test]
    fn out_of_order_trigger_is_rejected_without_side_effects() {
        let mut state = started();
        let before = state.clone();

        let err = StateMachine::next(&mut state, Trigger::WaitElapsed { renewed: true });
        assert!(err.is_err());
        let err = StateMachine::next(&mut state, Trigger::Start);
        assert!(err.is_err());
        assert_eq!(state, before);

        let mut idle = EngineState::new();
        assert!(StateMachine::next(&mut idle, Trigger::ReminderSent).is_err());
        assert_eq!(idle, EngineState::new());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut state = started();
        drive(&mut state, &[false, false]);
        StateMachine::reset(&mut state);

        assert_eq!(state.stage, Stage::Idle);
        assert!(!state.running);
        assert!(state.outcome.is_none());
        assert!(state.log.is_empty());
        assert!(state.history.is_empty());
        assert!(state.run_id.is_none());
        assert!(state.finished_at.is_none());
        assert_eq!(state, EngineState::new());
        assert!(state.is_consistent());
    }

    #[test]
    fn trigger_display() {
        assert_eq!(Trigger::Start.to_string(), "START");
        assert_eq!(
            Trigger::WaitElapsed { renewed: false }.to_string(),
            "WAIT_ELAPSED"
        );
    }
}
