//! Per-symbol feed worker
//!
//! Owns one symbol's stream connection and pipeline state, reconnecting with
//! backoff until shutdown.

use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, Instant as TokioInstant};
use tracing::{error, info, trace, warn};

use super::{FeedClient, SnapshotClient};
use crate::config::Config;
use crate::dispatch::{AlertCandidate, Delivery};
use crate::error::{MonitorError, Result};
use crate::metrics;
use crate::monitor::{PipelineOutcome, SymbolMonitor};
use crate::parser::ParsedMessage;

/// Maximum backoff delay in milliseconds (60 seconds)
const MAX_BACKOFF_MS: u64 = 60_000;
/// Cooldown period after which reconnect attempts are reset (5 minutes)
const RECONNECT_COOLDOWN_SECS: u64 = 300;
const RECV_TIMEOUT: Duration = Duration::from_secs(45);
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Drives one symbol: snapshot, stream, pipeline, alert hand-off
pub struct SymbolWorker {
    symbol: String,
    reconnect_delay_ms: u64,
    monitor: SymbolMonitor,
    client: FeedClient,
    snapshots: SnapshotClient,
    candidates: watch::Sender<Option<AlertCandidate>>,
    deliveries: mpsc::Receiver<Delivery>,
    reconnect_attempts: u32,
    last_successful_connection: Option<Instant>,
}

impl SymbolWorker {
    pub fn new(
        symbol: &str,
        config: &Config,
        candidates: watch::Sender<Option<AlertCandidate>>,
        deliveries: mpsc::Receiver<Delivery>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            reconnect_delay_ms: config.reconnect_delay_ms,
            monitor: SymbolMonitor::new(symbol, config),
            client: FeedClient::new(&config.ws_endpoint, symbol, config.stream_depth),
            snapshots: SnapshotClient::new(
                &config.rest_endpoint,
                config.snapshot_limit,
                config.snapshot_timeout,
            ),
            candidates,
            deliveries,
            reconnect_attempts: 0,
            last_successful_connection: None,
        }
    }

    /// Run until shutdown, reconnecting on errors
    ///
    /// The book is never cleared on disconnect; every reconnect re-fetches a
    /// snapshot before deltas resume.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(symbol = %self.symbol, "Starting feed worker");

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Reset reconnect attempts if we've been stable for a while
            if let Some(last_success) = self.last_successful_connection {
                if last_success.elapsed() > Duration::from_secs(RECONNECT_COOLDOWN_SECS)
                    && self.reconnect_attempts > 0
                {
                    info!(
                        symbol = %self.symbol,
                        previous_attempts = self.reconnect_attempts,
                        "Resetting reconnect counter after cooldown period"
                    );
                    self.reconnect_attempts = 0;
                }
            }

            let delay = match self.connect_and_process(&mut shutdown).await {
                Ok(()) => {
                    if *shutdown.borrow() {
                        break;
                    }
                    info!(symbol = %self.symbol, "Feed processing completed, reconnecting");
                    Duration::from_secs(1)
                }
                Err(e) => {
                    error!(symbol = %self.symbol, error = %e, "Feed error");
                    self.reconnect_attempts += 1;
                    metrics::RECONNECTS
                        .with_label_values(&[self.symbol.as_str()])
                        .inc();

                    let delay = backoff_delay(self.reconnect_delay_ms, self.reconnect_attempts);
                    warn!(
                        symbol = %self.symbol,
                        attempt = self.reconnect_attempts,
                        delay_secs = delay.as_secs(),
                        "Reconnecting after error"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
        }

        self.client.close().await;
        info!(symbol = %self.symbol, "Feed worker stopped");
    }

    /// Connect, load a snapshot and process messages until an error or
    /// shutdown
    async fn connect_and_process(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        self.client.connect().await?;

        self.last_successful_connection = Some(Instant::now());
        self.reconnect_attempts = 0;

        let snapshot = self.snapshots.fetch(&self.symbol).await?;
        self.drain_deliveries();
        let outcome = self.monitor.load_snapshot(&snapshot, Instant::now())?;
        self.handle_outcome(outcome);

        self.stream_updates(shutdown).await
    }

    /// Process stream messages until an error, a stale connection or shutdown
    ///
    /// The stale deadline only moves when a frame arrives. The first expiry
    /// sends a keepalive ping; a second one with nothing received in between
    /// ends the connection.
    async fn stream_updates(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        let mut first_message = true;
        let mut last_message = TokioInstant::now();
        let mut ping_outstanding = false;
        let mut status = interval_at(TokioInstant::now() + STATUS_INTERVAL, STATUS_INTERVAL);

        let stale = sleep(RECV_TIMEOUT);
        tokio::pin!(stale);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
                _ = status.tick() => self.log_status(),
                _ = &mut stale => {
                    if ping_outstanding {
                        warn!(
                            symbol = %self.symbol,
                            last_message_secs = last_message.elapsed().as_secs(),
                            "Keepalive went unanswered, reconnecting"
                        );
                        return Err(MonitorError::ConnectionTimeout);
                    }
                    warn!(
                        symbol = %self.symbol,
                        last_message_secs = last_message.elapsed().as_secs(),
                        "No message received within timeout, sending keepalive"
                    );
                    if let Err(e) = self.client.ping().await {
                        warn!(symbol = %self.symbol, error = %e, "Failed to send keepalive ping, reconnecting");
                        return Err(MonitorError::ConnectionTimeout);
                    }
                    ping_outstanding = true;
                    stale.as_mut().reset(TokioInstant::now() + RECV_TIMEOUT);
                }
                received = self.client.recv() => {
                    let frame = received?;
                    last_message = TokioInstant::now();
                    ping_outstanding = false;
                    stale.as_mut().reset(last_message + RECV_TIMEOUT);

                    match frame {
                        Some(text) => {
                            if first_message {
                                info!(symbol = %self.symbol, "Receiving depth updates");
                                first_message = false;
                            }
                            if let Err(e) = self.process_message(&text) {
                                warn!(symbol = %self.symbol, error = %e, "Failed to process message");
                            }
                        }
                        None => trace!(symbol = %self.symbol, "Control frame"),
                    }
                }
            }
        }
    }

    /// Process a single WebSocket message
    fn process_message(&mut self, raw: &str) -> Result<()> {
        self.drain_deliveries();

        match ParsedMessage::parse(raw)? {
            ParsedMessage::Depth(update) => {
                let outcome = self.monitor.on_depth(&update, Instant::now())?;
                self.handle_outcome(outcome);
            }
            ParsedMessage::Unknown(msg) => {
                trace!(symbol = %self.symbol, msg = %msg, "Unknown message type");
            }
        }

        Ok(())
    }

    fn handle_outcome(&mut self, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Alert(candidate) => {
                // Replaces any candidate the dispatcher has not picked up yet
                self.candidates.send_replace(Some(candidate));
            }
            PipelineOutcome::Suppressed(value) => {
                trace!(symbol = %self.symbol, imbalance = value, "Imbalance below alert criteria");
            }
            PipelineOutcome::NotReady => {
                trace!(symbol = %self.symbol, "Insufficient book depth");
            }
            PipelineOutcome::Unchanged | PipelineOutcome::NoSignal => {}
        }
    }

    /// Apply delivery confirmations from the dispatcher
    fn drain_deliveries(&mut self) {
        while let Ok(delivery) = self.deliveries.try_recv() {
            self.monitor.record_delivery(&delivery);
        }
    }

    fn log_status(&self) {
        if let Ok(book) = self.monitor.book() {
            info!(
                symbol = %self.symbol,
                best_bid = ?book.best_bid(),
                best_ask = ?book.best_ask(),
                mid_price = ?book.mid_price(),
                bid_levels = book.bid_levels(),
                ask_levels = book.ask_levels(),
                soft_errors = self.monitor.soft_errors(),
                last_imbalance = ?self.monitor.last_tracked(),
                "Order book status"
            );
        }
    }
}

/// Exponential backoff capped at [`MAX_BACKOFF_MS`]
fn backoff_delay(base_ms: u64, attempts: u32) -> Duration {
    let delay = base_ms.saturating_mul(2u64.pow(attempts.min(6)));
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}
