//! Per-symbol decision gates
//!
//! Three independent stages stand between a book update and an outgoing
//! notification:
//!
//! - [`ChangeGate`] bounds how often a top-of-book view is forwarded.
//! - [`AlertGate`] decides whether a forwarded imbalance is worth an alert.
//! - [`NotificationThrottle`] is the last cooldown before the notifier call.
//!
//! Each keeps its own [`ThrottleState`] per symbol. The change gate commits
//! when it forwards; the other two only commit after a successful delivery.

mod alert;
mod change;
mod throttle;

pub use alert::{AlertDecision, AlertGate};
pub use change::{ChangeGate, COMPARE_DEPTH};
pub use throttle::NotificationThrottle;

use std::time::{Duration, Instant};

/// Last committed value and when it was committed
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleState<T> {
    pub last_value: Option<T>,
    pub last_action_time: Option<Instant>,
}

impl<T> Default for ThrottleState<T> {
    fn default() -> Self {
        Self {
            last_value: None,
            last_action_time: None,
        }
    }
}

impl<T> ThrottleState<T> {
    /// Time since the last action, `None` if there never was one
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_action_time
            .map(|at| now.saturating_duration_since(at))
    }

    pub fn record(&mut self, value: T, now: Instant) {
        self.last_value = Some(value);
        self.last_action_time = Some(now);
    }
}
