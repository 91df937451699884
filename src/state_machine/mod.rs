mod log;
mod stage;
mod state;
mod summary;

pub use log::{EventLog, LogCategory, LogEntry};
pub use stage::{Attempt, Outcome, Stage};
pub use state::{EngineState, StateMachine, Transition, Trigger};
pub use summary::RunSummary;
