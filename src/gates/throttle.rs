//! Final cooldown before the notifier call

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::ThrottleState;

/// Final spam guard in front of the notifier
///
/// Enforces a cooldown between deliveries and a minimum distance from the
/// last delivered value. State only moves on [`NotificationThrottle::record_delivery`].
#[derive(Debug)]
pub struct NotificationThrottle {
    cooldown: Duration,
    min_delta: f64,
    states: HashMap<String, ThrottleState<f64>>,
}

impl NotificationThrottle {
    pub fn new(cooldown: Duration, min_delta: f64) -> Self {
        Self {
            cooldown,
            min_delta,
            states: HashMap::new(),
        }
    }

    /// Whether a notification for `value` may be sent now
    pub fn try_emit(&self, symbol: &str, value: f64, now: Instant) -> bool {
        let Some(state) = self.states.get(symbol) else {
            return true;
        };

        if let Some(elapsed) = state.elapsed(now) {
            if elapsed < self.cooldown {
                return false;
            }
        }

        match state.last_value {
            Some(last) => (value - last).abs() >= self.min_delta,
            None => true,
        }
    }

    /// Commit a successful delivery
    pub fn record_delivery(&mut self, symbol: &str, value: f64, now: Instant) {
        self.states
            .entry(symbol.to_string())
            .or_default()
            .record(value, now);
    }

    pub fn last_delivered(&self, symbol: &str) -> Option<f64> {
        self.states.get(symbol).and_then(|s| s.last_value)
    }
}
