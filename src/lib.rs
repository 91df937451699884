//! Timed subscription renewal-reminder workflow.
//!
//! A [`RenewalEngine`] walks one subscriber through two reminder/wait cycles,
//! asking a [`RenewalPolicy`] after each wait whether they renewed. Every
//! milestone is recorded in an append-only [`EventLog`].

pub mod config;
pub mod engine;
pub mod error;
pub mod policy;
pub mod state_machine;

pub use config::RenewalConfig;
pub use engine::{EngineConfig, RenewalEngine};
pub use error::{RenewalError, Result};
pub use policy::{FixedPolicy, RandomPolicy, RenewalPolicy, ScriptedPolicy};
pub use state_machine::{EngineState, EventLog, LogCategory, LogEntry, Outcome, Stage};
