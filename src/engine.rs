use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RenewalConfig;
use crate::error::{RenewalError, Result};
use crate::policy::RenewalPolicy;
use crate::state_machine::{EngineState, Stage, StateMachine, Transition, Trigger};

/// Delays between stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Time spent in a reminder stage before the reminder goes out (D1).
    pub reminder_delay: Duration,
    /// Time spent in a wait stage before renewal is checked (D2).
    pub wait_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reminder_delay: Duration::from_millis(2000),
            wait_delay: Duration::from_millis(4000),
        }
    }
}

impl EngineConfig {
    /// How long the flow stays in `stage` before its next transition fires.
    /// `None` for stages the engine never leaves on its own.
    pub fn delay_for(&self, stage: Stage) -> Option<Duration> {
        if stage.is_reminder() {
            Some(self.reminder_delay)
        } else if stage.is_wait() {
            Some(self.wait_delay)
        } else {
            None
        }
    }
}

/// State owned by one engine, guarded by a single mutex.
struct Shared {
    state: EngineState,
    policy: Box<dyn RenewalPolicy>,
    /// Token of the run in flight, if any.
    cancel: Option<CancellationToken>,
    snapshots: watch::Sender<EngineState>,
}

impl Shared {
    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives a single renewal flow.
///
/// `start` and `reset` are the only mutating entry points. Once started, the
/// flow advances on its own timer until it completes. Observers read
/// snapshots through [`state`](Self::state) or [`subscribe`](Self::subscribe).
///
/// Calling `start` while a run is in flight fails with
/// [`RenewalError::AlreadyRunning`]. Calling it after a run has completed
/// discards the finished run and starts a fresh one.
pub struct RenewalEngine {
    config: EngineConfig,
    shared: Arc<Mutex<Shared>>,
    snapshots: watch::Receiver<EngineState>,
}

impl RenewalEngine {
    pub fn new(config: EngineConfig, policy: impl RenewalPolicy + 'static) -> Self {
        let (tx, rx) = watch::channel(EngineState::new());
        let shared = Shared {
            state: EngineState::new(),
            policy: Box::new(policy),
            cancel: None,
            snapshots: tx,
        };
        Self {
            config,
            shared: Arc::new(Mutex::new(shared)),
            snapshots: rx,
        }
    }

    /// Engine with the delays and random policy described by `config`.
    pub fn from_config(config: &RenewalConfig) -> Result<Self> {
        let policy = config.random_policy()?;
        Ok(Self::new(config.engine_config(), policy))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Begin a run. The remaining stages are scheduled on the current tokio
    /// runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| RenewalError::NoRuntime)?;

        let token = {
            let mut shared = lock(&self.shared);
            if shared.state.running {
                warn!(stage = %shared.state.stage, "start rejected, flow already running");
                return Err(RenewalError::AlreadyRunning);
            }
            if shared.state.is_completed() {
                StateMachine::reset(&mut shared.state);
            }

            StateMachine::next(&mut shared.state, Trigger::Start)?;
            let token = CancellationToken::new();
            shared.cancel = Some(token.clone());
            shared.publish();

            if let Some(run_id) = shared.state.run_id {
                info!(%run_id, stage = %shared.state.stage, "renewal flow started");
            }
            token
        };

        runtime.spawn(drive(self.config, Arc::clone(&self.shared), token));
        Ok(())
    }

    /// Cancel any run in flight and return to `Idle` with an empty log.
    ///
    /// Once this returns, no continuation of the cancelled run can change the
    /// state.
    pub fn reset(&self) {
        let mut shared = lock(&self.shared);
        if let Some(token) = shared.cancel.take() {
            token.cancel();
            debug!(stage = %shared.state.stage, "cancelled in-flight run");
        }
        StateMachine::reset(&mut shared.state);
        shared.publish();
        info!("renewal flow reset");
    }

    /// Latest snapshot of the engine state.
    pub fn state(&self) -> EngineState {
        self.snapshots.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.snapshots.borrow().running
    }

    /// Receiver that is notified after every transition and every reset.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        lock(&self.shared).snapshots.subscribe()
    }

    /// Wait until no run is in flight and return the settled state.
    pub async fn wait_until_settled(&self) -> EngineState {
        let mut rx = self.snapshots.clone();
        match rx.wait_for(|state| !state.running).await {
            Ok(state) => EngineState::clone(&state),
            Err(_) => self.state(),
        }
    }
}

impl Drop for RenewalEngine {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.shared).cancel.take() {
            token.cancel();
        }
    }
}

/// Timer loop of one run. Exits when the run completes or `token` fires.
async fn drive(config: EngineConfig, shared: Arc<Mutex<Shared>>, token: CancellationToken) {
    let mut stage = Stage::FirstReminder;
    while let Some(delay) = config.delay_for(stage) {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(%stage, "pending transition cancelled");
                return;
            }
            _ = sleep(delay) => {}
        }

        match step(&shared, &token) {
            Some(next) => stage = next,
            None => return,
        }
    }
}

/// Fire the transition that follows the current stage. Returns the stage the
/// flow is now in, or `None` when the run is over or was cancelled.
fn step(shared: &Mutex<Shared>, token: &CancellationToken) -> Option<Stage> {
    let mut guard = lock(shared);
    // reset() cancels under this same lock, so this check cannot race it.
    if token.is_cancelled() {
        debug!("run cancelled before transition");
        return None;
    }

    let inner = &mut *guard;
    let from = inner.state.stage;
    let trigger = match from.attempt() {
        Some(attempt) => {
            // A panicking policy counts as no renewal so the run still completes.
            let renewed = match catch_unwind(AssertUnwindSafe(|| inner.policy.decide(attempt))) {
                Ok(renewed) => renewed,
                Err(_) => {
                    error!(%attempt, "renewal policy panicked, treating as not renewed");
                    false
                }
            };
            debug!(%attempt, renewed, "renewal check");
            Trigger::WaitElapsed { renewed }
        }
        None => Trigger::ReminderSent,
    };

    let result = StateMachine::next(&mut inner.state, trigger);
    debug_assert!(inner.state.is_consistent());
    match result {
        Ok(Transition::Next(stage)) => {
            info!(from = %from, to = %stage, "stage transition");
            inner.publish();
            Some(stage)
        }
        Ok(Transition::Complete(outcome)) => {
            info!(from = %from, %outcome, "renewal flow completed");
            inner.cancel = None;
            inner.publish();
            None
        }
        Err(e) => {
            error!(error = %e, "renewal flow stopped");
            None
        }
    }
}
