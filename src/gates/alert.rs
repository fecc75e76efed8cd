//! Threshold crossing gate

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::ThrottleState;

/// Outcome of evaluating an imbalance value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    Alert,
    Suppress,
}

/// Threshold crossing detector with change detection and periodic re-alerts
///
/// While a value is under the threshold the tracked value follows it, so the
/// next crossing is measured against the latest quiet reading. While over the
/// threshold the tracked value only moves when an alert is delivered, so
/// jitter just above the threshold does not count as a change.
#[derive(Debug)]
pub struct AlertGate {
    change_epsilon: f64,
    periodic_interval: Duration,
    states: HashMap<String, AlertState>,
}

#[derive(Debug, Default)]
struct AlertState {
    throttle: ThrottleState<f64>,
    /// When the tracked value last followed an under-threshold reading
    rebaselined_at: Option<Instant>,
}

impl AlertGate {
    pub fn new(change_epsilon: f64, periodic_interval: Duration) -> Self {
        Self {
            change_epsilon,
            periodic_interval,
            states: HashMap::new(),
        }
    }

    /// Evaluate a forwarded imbalance value
    ///
    /// An `Alert` decision does not commit anything; the caller reports a
    /// successful delivery through [`AlertGate::record_alert`].
    pub fn evaluate(
        &mut self,
        symbol: &str,
        value: f64,
        threshold: f64,
        now: Instant,
    ) -> AlertDecision {
        let state = self.states.entry(symbol.to_string()).or_default();

        let changed = state
            .throttle
            .last_value
            .map(|last| (value - last).abs() > self.change_epsilon)
            .unwrap_or(true);
        let exceeds = value.abs() > threshold.abs();

        if !exceeds {
            state.throttle.last_value = Some(value);
            state.rebaselined_at = Some(now);
            return AlertDecision::Suppress;
        }

        let periodic_due = state
            .throttle
            .elapsed(now)
            .map(|elapsed| elapsed >= self.periodic_interval)
            .unwrap_or(true);

        if changed || periodic_due {
            AlertDecision::Alert
        } else {
            AlertDecision::Suppress
        }
    }

    /// Commit a delivered alert that was evaluated at `at`
    ///
    /// The alert time always moves. The tracked value is left alone when an
    /// under-threshold reading re-baselined it after `at`, since a
    /// confirmation can arrive after newer observations were evaluated.
    pub fn record_alert(&mut self, symbol: &str, value: f64, at: Instant) {
        let state = self.states.entry(symbol.to_string()).or_default();

        let superseded = state.rebaselined_at.is_some_and(|rebased| rebased > at);
        if superseded {
            state.throttle.last_action_time = Some(at);
        } else {
            state.throttle.record(value, at);
        }
    }

    /// Value change detection currently compares against
    pub fn last_tracked(&self, symbol: &str) -> Option<f64> {
        self.states.get(symbol).and_then(|s| s.throttle.last_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.5;

    fn gate() -> AlertGate {
        AlertGate::new(0.0001, Duration::from_secs(30))
    }

    /// Evaluate and commit immediately on `Alert`, as a caller with an
    /// always-successful notifier would
    fn run(gate: &mut AlertGate, values: &[f64], now: Instant) -> Vec<AlertDecision> {
        values
            .iter()
            .map(|&v| {
                let decision = gate.evaluate("BTCUSDT", v, THRESHOLD, now);
                if decision == AlertDecision::Alert {
                    gate.record_alert("BTCUSDT", v, now);
                }
                decision
            })
            .collect()
    }

    #[test]
    fn test_crossing_sequence() {
        use AlertDecision::*;

        let mut gate = gate();
        let decisions = run(&mut gate, &[0.3, 0.6, 0.6, 0.6, 0.2, 0.55], Instant::now());
        assert_eq!(
            decisions,
            vec![Suppress, Alert, Suppress, Suppress, Suppress, Alert]
        );
    }

    #[test]
    fn test_negative_values_use_absolute_threshold() {
        let mut gate = gate();
        let now = Instant::now();
        assert_eq!(gate.evaluate("BTCUSDT", -0.7, THRESHOLD, now), AlertDecision::Alert);
        assert_eq!(gate.evaluate("BTCUSDT", -0.7, -THRESHOLD, now), AlertDecision::Alert);
        assert_eq!(gate.evaluate("BTCUSDT", -0.4, -THRESHOLD, now), AlertDecision::Suppress);
        // Exactly at threshold does not exceed it
        assert_eq!(gate.evaluate("BTCUSDT", 0.5, THRESHOLD, now), AlertDecision::Suppress);
    }

    #[test]
    fn test_under_threshold_rebaselines() {
        let mut gate = gate();
        let now = Instant::now();
        gate.evaluate("BTCUSDT", 0.1, THRESHOLD, now);
        gate.evaluate("BTCUSDT", 0.3, THRESHOLD, now);
        assert_eq!(gate.last_tracked("BTCUSDT"), Some(0.3));
    }

    #[test]
    fn test_suppressed_over_threshold_does_not_move_baseline() {
        let mut gate = gate();
        let t0 = Instant::now();
        run(&mut gate, &[0.6], t0);

        // Jitter within epsilon is suppressed and must not move the baseline
        assert_eq!(
            gate.evaluate("BTCUSDT", 0.60005, THRESHOLD, t0),
            AlertDecision::Suppress
        );
        assert_eq!(gate.last_tracked("BTCUSDT"), Some(0.6));

        // A second small step is measured against 0.6, not 0.60005
        assert_eq!(
            gate.evaluate("BTCUSDT", 0.60011, THRESHOLD, t0),
            AlertDecision::Alert
        );
    }

    #[test]
    fn test_periodic_realert() {
        let mut gate = gate();
        let t0 = Instant::now();
        run(&mut gate, &[0.6], t0);

        let t1 = t0 + Duration::from_secs(29);
        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, t1), AlertDecision::Suppress);

        let t2 = t0 + Duration::from_secs(30);
        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, t2), AlertDecision::Alert);
    }

    #[test]
    fn test_undelivered_alert_is_retried() {
        let mut gate = gate();
        let now = Instant::now();

        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, now), AlertDecision::Alert);
        // No record_alert: delivery failed
        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, now), AlertDecision::Alert);
        assert_eq!(gate.last_tracked("BTCUSDT"), None);
    }

    #[test]
    fn test_symbols_are_independent() {
        let mut gate = gate();
        let now = Instant::now();
        gate.evaluate("BTCUSDT", 0.6, THRESHOLD, now);
        gate.record_alert("BTCUSDT", 0.6, now);

        assert_eq!(gate.evaluate("SOLUSDT", 0.6, THRESHOLD, now), AlertDecision::Alert);
        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, now), AlertDecision::Suppress);
    }

    #[test]
    fn test_late_delivery_keeps_newer_baseline() {
        let mut gate = gate();
        let t0 = Instant::now();

        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, t0), AlertDecision::Alert);
        let t1 = t0 + Duration::from_secs(1);
        gate.evaluate("BTCUSDT", 0.2, THRESHOLD, t1);

        // Confirmation for the 0.6 alert lands after the 0.2 reading
        gate.record_alert("BTCUSDT", 0.6, t0);
        assert_eq!(gate.last_tracked("BTCUSDT"), Some(0.2));

        // Alert time still moved, but 0.6 is a change from 0.2
        let t2 = t0 + Duration::from_secs(12);
        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, t2), AlertDecision::Alert);
    }

    #[test]
    fn test_late_delivery_still_starts_periodic_window() {
        let mut gate = gate();
        let t0 = Instant::now();

        gate.evaluate("BTCUSDT", 0.6, THRESHOLD, t0);
        gate.evaluate("BTCUSDT", 0.2, THRESHOLD, t0 + Duration::from_secs(1));
        gate.record_alert("BTCUSDT", 0.6, t0);

        let t2 = t0 + Duration::from_secs(2);
        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, t2), AlertDecision::Alert);
        gate.record_alert("BTCUSDT", 0.6, t2);

        // Committed normally now; repeats are quiet until the interval passes
        let t3 = t0 + Duration::from_secs(10);
        assert_eq!(gate.evaluate("BTCUSDT", 0.6, THRESHOLD, t3), AlertDecision::Suppress);
    }
}
