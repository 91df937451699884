//! Renewal decision policies.
//!
//! At the end of each wait stage the engine asks a [`RenewalPolicy`] whether
//! the subscriber renewed. [`RandomPolicy`] is the production policy; the
//! others exist so a flow can be made fully deterministic.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{RenewalError, Result};
use crate::state_machine::Attempt;

/// Decides whether renewal happened at a given check.
///
/// Called at most twice per run, once per wait stage, from the task that
/// drives the flow.
pub trait RenewalPolicy: Send {
    fn decide(&mut self, attempt: Attempt) -> bool;
}

impl<F> RenewalPolicy for F
where
    F: FnMut(Attempt) -> bool + Send,
{
    fn decide(&mut self, attempt: Attempt) -> bool {
        self(attempt)
    }
}

/// Independent coin flip per check.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
    probability: f64,
}

impl RandomPolicy {
    /// Policy renewing with `probability`, seeded from the OS when no seed is
    /// given.
    pub fn new(probability: f64, seed: Option<u64>) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(RenewalError::Config(format!(
                "success probability must be within [0, 1], got {probability}"
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { rng, probability })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl RenewalPolicy for RandomPolicy {
    fn decide(&mut self, _attempt: Attempt) -> bool {
        self.rng.random_bool(self.probability)
    }
}

/// Always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub bool);

impl RenewalPolicy for FixedPolicy {
    fn decide(&mut self, _attempt: Attempt) -> bool {
        self.0
    }
}

/// Replays a fixed list of answers, then keeps returning `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    answers: VecDeque<bool>,
    fallback: bool,
}

impl ScriptedPolicy {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            fallback: false,
        }
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }
}

impl RenewalPolicy for ScriptedPolicy {
    fn decide(&mut self, _attempt: Attempt) -> bool {
        self.answers.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_random_policy_is_reproducible() {
        let mut a = RandomPolicy::new(0.5, Some(42)).unwrap();
        let mut b = RandomPolicy::new(0.5, Some(42)).unwrap();
        let left: Vec<bool> = (0..32).map(|_| a.decide(Attempt::First)).collect();
        let right: Vec<bool> = (0..32).map(|_| b.decide(Attempt::First)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn random_policy_extremes() {
        let mut never = RandomPolicy::new(0.0, None).unwrap();
        let mut always = RandomPolicy::new(1.0, None).unwrap();
        for _ in 0..20 {
            assert!(!never.decide(Attempt::First));
            assert!(always.decide(Attempt::Second));
        }
    }

    #[test]
    fn random_policy_rejects_bad_probability() {
        assert!(matches!(
            RandomPolicy::new(1.5, None),
            Err(RenewalError::Config(_))
        ));
        assert!(RandomPolicy::new(-0.1, Some(1)).is_err());
        assert!(RandomPolicy::new(f64::NAN, Some(1)).is_err());
    }

    #[test]
    fn scripted_policy_replays_then_falls_back() {
        let mut policy = ScriptedPolicy::new([false, true]).with_fallback(true);
        assert!(!policy.decide(Attempt::First));
        assert!(policy.decide(Attempt::Second));
        assert!(policy.decide(Attempt::Second));
    }

    #[test]
    fn closures_are_policies() {
        let mut policy = |attempt: Attempt| attempt == Attempt::Second;
        assert!(!policy.decide(Attempt::First));
        assert!(policy.decide(Attempt::Second));
    }
}
