//! Synchronous per-symbol signal pipeline
//!
//! book update -> top of book -> change gate -> imbalance -> alert gate

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{AlertCandidate, Delivery};
use crate::error::{MonitorError, Result};
use crate::gates::{AlertDecision, AlertGate, ChangeGate, COMPARE_DEPTH};
use crate::imbalance::ImbalanceEngine;
use crate::metrics;
use crate::orderbook::{OrderBook, OrderBookStore};
use crate::parser::DepthMessage;

/// What a single book update led to
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// One side of the book is empty
    NotReady,
    /// Top of book unchanged and still fresh
    Unchanged,
    /// Forwarded, but there was no volume to compute a ratio from
    NoSignal,
    /// Imbalance computed, no alert warranted
    Suppressed(f64),
    /// Imbalance warrants an alert
    Alert(AlertCandidate),
}

/// Book and gate state for one symbol, owned by that symbol's worker
pub struct SymbolMonitor {
    symbol: String,
    top_n: usize,
    threshold: f64,
    store: OrderBookStore,
    change_gate: ChangeGate,
    alert_gate: AlertGate,
}

impl SymbolMonitor {
    pub fn new(symbol: &str, config: &Config) -> Self {
        Self {
            symbol: symbol.to_string(),
            top_n: config.top_n,
            threshold: config.threshold,
            store: OrderBookStore::new([symbol]),
            change_gate: ChangeGate::new(config.forward_freshness_floor),
            alert_gate: AlertGate::new(config.change_epsilon, config.periodic_realert_interval),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Replace the book with a freshly fetched snapshot and evaluate it
    pub fn load_snapshot(
        &mut self,
        snapshot: &DepthMessage,
        now: Instant,
    ) -> Result<PipelineOutcome> {
        let (bids, asks) = snapshot.parsed_levels();
        let dropped = snapshot.bids.len() + snapshot.asks.len() - bids.len() - asks.len();
        if dropped > 0 {
            warn!(symbol = %self.symbol, dropped, "Snapshot contained malformed levels");
        }

        self.store.initialize(&self.symbol, &bids, &asks)?;
        info!(
            symbol = %self.symbol,
            bids = bids.len(),
            asks = asks.len(),
            "Order book initialized"
        );

        self.evaluate(now)
    }

    /// Apply a depth message and evaluate the resulting book
    pub fn on_depth(&mut self, update: &DepthMessage, now: Instant) -> Result<PipelineOutcome> {
        self.store
            .apply_delta(&self.symbol, &update.bids, &update.asks)?;
        self.evaluate(now)
    }

    /// Commit a delivered alert to the alert gate
    pub fn record_delivery(&mut self, delivery: &Delivery) {
        let previous = self.alert_gate.last_tracked(&self.symbol);
        self.alert_gate
            .record_alert(&self.symbol, delivery.value, delivery.evaluated_at);

        let change = match previous {
            Some(prev) => format!("{:.4} -> {:.4}", prev, delivery.value),
            None => format!("N/A -> {:.4}", delivery.value),
        };
        info!(
            symbol = %self.symbol,
            imbalance = delivery.value,
            threshold = self.threshold.abs(),
            change = %change,
            "Notification sent"
        );
    }

    fn evaluate(&mut self, now: Instant) -> Result<PipelineOutcome> {
        let depth = self.top_n.max(COMPARE_DEPTH);
        let top = match self.store.top_n(&self.symbol, depth) {
            Ok(top) => top,
            Err(MonitorError::InsufficientDepth { .. }) => return Ok(PipelineOutcome::NotReady),
            Err(e) => return Err(e),
        };

        if !self.change_gate.should_forward(&top, now) {
            return Ok(PipelineOutcome::Unchanged);
        }
        metrics::FORWARDED
            .with_label_values(&[self.symbol.as_str()])
            .inc();

        let Some(value) = ImbalanceEngine::compute(&top, self.top_n) else {
            debug!(symbol = %self.symbol, "Total volume is zero, no imbalance");
            return Ok(PipelineOutcome::NoSignal);
        };

        match self
            .alert_gate
            .evaluate(&self.symbol, value, self.threshold, now)
        {
            AlertDecision::Alert => Ok(PipelineOutcome::Alert(AlertCandidate {
                symbol: self.symbol.clone(),
                value,
                threshold: self.threshold,
                evaluated_at: now,
            })),
            AlertDecision::Suppress => Ok(PipelineOutcome::Suppressed(value)),
        }
    }

    pub fn book(&self) -> Result<&OrderBook> {
        self.store.book(&self.symbol)
    }

    pub fn soft_errors(&self) -> u64 {
        self.store.soft_errors(&self.symbol)
    }

    pub fn last_tracked(&self) -> Option<f64> {
        self.alert_gate.last_tracked(&self.symbol)
    }
}
