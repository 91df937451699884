use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::{Outcome, Stage};
use super::state::EngineState;

/// Structured record produced once a run reaches `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcome: Outcome,
    pub stages: Vec<Stage>,
    pub reminders_sent: usize,
    pub log_entries: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunSummary {
    /// Build a summary from a completed state. Returns `None` while the run
    /// is idle or still in flight.
    pub fn from_state(state: &EngineState) -> Option<Self> {
        let outcome = state.outcome?;
        let run_id = state.run_id?;
        let started_at = state.started_at?;
        let completed_at = state.finished_at?;

        let mut stages = Vec::with_capacity(state.history.len() + 1);
        stages.push(Stage::Idle);
        stages.extend(state.history.iter().copied());

        Some(Self {
            run_id,
            outcome,
            stages,
            reminders_sent: state.reminders_sent(),
            log_entries: state.log.len(),
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{StateMachine, Trigger};

    #[test]
    fn no_summary_before_completion() {
        let mut state = EngineState::new();
        assert!(RunSummary::from_state(&state).is_none());

        StateMachine::next(&mut state, Trigger::Start).unwrap();
        StateMachine::next(&mut state, Trigger::ReminderSent).unwrap();
        assert!(RunSummary::from_state(&state).is_none());
    }

    #[test]
    fn summary_of_short_circuited_run() {
        let mut state = EngineState::new();
        StateMachine::next(&mut state, Trigger::Start).unwrap();
        StateMachine::next(&mut state, Trigger::ReminderSent).unwrap();
        StateMachine::next(&mut state, Trigger::WaitElapsed { renewed: true }).unwrap();

        let summary = RunSummary::from_state(&state).unwrap();
        assert_eq!(summary.outcome, Outcome::Success);
        assert_eq!(
            summary.stages,
            vec![
                Stage::Idle,
                Stage::FirstReminder,
                Stage::FirstWait,
                Stage::Completed
            ]
        );
        assert_eq!(summary.reminders_sent, 1);
        assert_eq!(summary.log_entries, 3);
        assert!(summary.duration_ms >= 0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["stages"][3], "Completed");
    }
}
