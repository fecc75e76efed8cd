//! Top-of-book change detection

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::ThrottleState;
use crate::orderbook::TopOfBook;

/// Levels per side compared between forwarded views
pub const COMPARE_DEPTH: usize = 10;

/// Forwards a top-of-book view when its top levels changed or the last
/// forward is older than the freshness floor
#[derive(Debug)]
pub struct ChangeGate {
    freshness_floor: Duration,
    states: HashMap<String, ThrottleState<TopOfBook>>,
}

impl ChangeGate {
    pub fn new(freshness_floor: Duration) -> Self {
        Self {
            freshness_floor,
            states: HashMap::new(),
        }
    }

    /// Decide whether `snapshot` should be forwarded, recording it if so
    ///
    /// Only the first [`COMPARE_DEPTH`] levels per side take part in the
    /// comparison, whatever depth the caller extracted.
    pub fn should_forward(&mut self, snapshot: &TopOfBook, now: Instant) -> bool {
        let current = snapshot.truncated(COMPARE_DEPTH);
        let state = self.states.entry(snapshot.symbol.clone()).or_default();

        let forward = match (&state.last_value, state.elapsed(now)) {
            (Some(last), Some(elapsed)) => {
                last.bids != current.bids
                    || last.asks != current.asks
                    || elapsed >= self.freshness_floor
            }
            _ => true,
        };

        if forward {
            state.record(current, now);
        }
        forward
    }
}
