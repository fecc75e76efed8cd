//! Per-symbol alert dispatch
//!
//! Notifier calls can be slow, so they run in their own task. The worker
//! publishes candidates into a single-slot `watch` channel: a fresher
//! candidate overwrites one that has not been picked up yet, and nothing
//! queues behind a slow send. Successful deliveries flow back to the worker
//! so the alert gate can commit them.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::gates::NotificationThrottle;
use crate::metrics;
use crate::notifier::Notifier;

/// Alert decision waiting to be delivered
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub symbol: String,
    pub value: f64,
    pub threshold: f64,
    /// When the alert gate produced the decision
    pub evaluated_at: Instant,
}

/// Confirmation of a delivered alert
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub symbol: String,
    pub value: f64,
    pub evaluated_at: Instant,
}

/// Owns the notification throttle for one symbol and calls the notifier
pub struct AlertDispatcher {
    symbol: String,
    throttle: NotificationThrottle,
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(symbol: &str, throttle: NotificationThrottle, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            symbol: symbol.to_string(),
            throttle,
            notifier,
        }
    }

    /// Throttle and send a single candidate
    ///
    /// Returns the delivery when the notifier confirmed it. The throttle is
    /// only advanced in that case.
    pub async fn dispatch(&mut self, candidate: &AlertCandidate, now: Instant) -> Option<Delivery> {
        if !self.throttle.try_emit(&self.symbol, candidate.value, now) {
            debug!(
                symbol = %self.symbol,
                imbalance = candidate.value,
                "Notification throttled"
            );
            return None;
        }

        let delivered = self
            .notifier
            .send(&self.symbol, candidate.value, candidate.threshold)
            .await;

        if !delivered {
            metrics::ALERTS_FAILED
                .with_label_values(&[self.symbol.as_str()])
                .inc();
            warn!(symbol = %self.symbol, imbalance = candidate.value, "Alert not delivered");
            return None;
        }

        self.throttle
            .record_delivery(&self.symbol, candidate.value, now);
        metrics::ALERTS_DELIVERED
            .with_label_values(&[self.symbol.as_str()])
            .inc();

        Some(Delivery {
            symbol: self.symbol.clone(),
            value: candidate.value,
            evaluated_at: candidate.evaluated_at,
        })
    }

    /// Consume candidates until shutdown or until the worker goes away
    ///
    /// A send already in progress when shutdown is signalled is allowed to
    /// finish; the caller bounds that with its grace period.
    pub async fn run(
        mut self,
        mut candidates: watch::Receiver<Option<AlertCandidate>>,
        deliveries: mpsc::Sender<Delivery>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(symbol = %self.symbol, "Alert dispatcher started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = candidates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let candidate = candidates.borrow_and_update().clone();
                    let Some(candidate) = candidate else {
                        continue;
                    };

                    if let Some(delivery) = self.dispatch(&candidate, Instant::now()).await {
                        if deliveries.send(delivery).await.is_err() {
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(symbol = %self.symbol, "Alert dispatcher stopped");
    }
}
