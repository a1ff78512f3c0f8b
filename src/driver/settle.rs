//! Bounded polling for host state that converges asynchronously (driver registration,
//! registry entries appearing after an install).

use std::time::{Duration, Instant};

/// How long to keep re-checking an eventually-consistent condition, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Worst-case total wait.
    pub timeout: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl SettlePolicy {
    pub const fn new(
        timeout: Duration,
        initial_interval: Duration,
        max_interval: Duration,
    ) -> Self {
        Self {
            timeout,
            initial_interval,
            max_interval,
        }
    }

    /// Check exactly once, never sleep.
    pub const fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }
}

/// Run `check` until it yields `Some` or the policy's timeout is spent.
///
/// The interval doubles after every miss, capped at `max_interval`, and a sleep never
/// extends past the deadline. `check` always runs at least once.
pub fn poll_until<T>(policy: &SettlePolicy, mut check: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + policy.timeout;
    let mut interval = policy.initial_interval;

    loop {
        if let Some(value) = check() {
            return Some(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return None;
        }

        let remaining = deadline - now;
        std::thread::sleep(interval.min(remaining));
        interval = (interval * 2).min(policy.max_interval).max(Duration::from_millis(1));
    }
}
