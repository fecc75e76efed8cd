//! Order book module
//!
//! Reconstructs per-symbol books from a snapshot plus depth deltas and
//! exposes ordered top-of-book views.

mod book;
mod manager;

pub use book::{DeltaReport, OrderBook};
pub use manager::OrderBookStore;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

/// A single level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Best levels per side, ordered toward the mid price
///
/// Bids are sorted by price descending, asks ascending. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOfBook {
    pub symbol: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl TopOfBook {
    /// Copy of this view limited to `depth` levels per side
    pub fn truncated(&self, depth: usize) -> TopOfBook {
        TopOfBook {
            symbol: self.symbol.clone(),
            bids: self.bids.iter().take(depth).copied().collect(),
            asks: self.asks.iter().take(depth).copied().collect(),
        }
    }
}
