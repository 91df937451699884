use thiserror::Error;

use crate::state_machine::{Stage, Trigger};

#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("A renewal flow is already running. Call `reset` first.")]
    AlreadyRunning,

    #[error("Invalid transition: {trigger} is not allowed from {from}")]
    InvalidTransition { from: Stage, trigger: Trigger },

    #[error("No tokio runtime available to drive the flow")]
    NoRuntime,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RenewalError>;
