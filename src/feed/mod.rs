//! Binance depth feed: REST snapshot plus one stream per symbol

mod client;
mod snapshot;
mod worker;

pub use client::FeedClient;
pub use snapshot::SnapshotClient;
pub use worker::SymbolWorker;
