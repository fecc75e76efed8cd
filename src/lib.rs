//! Order Book Imbalance Monitor
//!
//! Reconstructs Binance order books from depth streams, derives a notional
//! volume imbalance from the top of book and turns it into a sparse stream
//! of alerts through several layers of change detection and throttling.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod gates;
pub mod imbalance;
pub mod metrics;
pub mod monitor;
pub mod notifier;
pub mod orderbook;
pub mod parser;

pub use config::Config;
pub use dispatch::{AlertCandidate, AlertDispatcher, Delivery};
pub use error::{MonitorError, Result};
pub use feed::SymbolWorker;
pub use gates::{AlertDecision, AlertGate, ChangeGate, NotificationThrottle, ThrottleState};
pub use imbalance::ImbalanceEngine;
pub use monitor::{PipelineOutcome, SymbolMonitor};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier};
pub use orderbook::{OrderBook, OrderBookStore, TopOfBook};
pub use parser::{DepthMessage, ParsedMessage, PriceLevel};
