//! Order book store
//!
//! Owns the order books for a fixed set of symbols.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use super::{DeltaReport, OrderBook, TopOfBook};
use crate::error::{MonitorError, Result};
use crate::metrics;
use crate::parser::PriceLevel;

/// Manages order books for a static set of symbols
#[derive(Debug, Default)]
pub struct OrderBookStore {
    books: HashMap<String, OrderBook>,
    /// Symbols for which an empty delta has already been reported
    empty_delta_warned: HashSet<String>,
    /// Malformed entries skipped per symbol
    soft_errors: HashMap<String, u64>,
}

impl OrderBookStore {
    /// Create a store with an empty book per symbol
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let books = symbols
            .into_iter()
            .map(|s| (s.as_ref().to_string(), OrderBook::new(s.as_ref())))
            .collect();

        Self {
            books,
            empty_delta_warned: HashSet::new(),
            soft_errors: HashMap::new(),
        }
    }

    /// Replace a book wholesale with an initial snapshot
    pub fn initialize(
        &mut self,
        symbol: &str,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> Result<()> {
        self.book_mut(symbol)?.init_snapshot(bids, asks)
    }

    /// Apply delta entries to a book
    ///
    /// A zero quantity removes the price (no-op if absent), anything else
    /// upserts. Malformed entries are skipped and counted as soft errors.
    pub fn apply_delta(
        &mut self,
        symbol: &str,
        bids: &[Value],
        asks: &[Value],
    ) -> Result<DeltaReport> {
        if bids.is_empty() && asks.is_empty() {
            metrics::EMPTY_DELTAS.with_label_values(&[symbol]).inc();
            if self.books.contains_key(symbol) && self.empty_delta_warned.insert(symbol.to_string())
            {
                warn!(symbol = %symbol, "Empty delta update, upstream may be misbehaving");
            }
        }

        let book = self
            .books
            .get_mut(symbol)
            .ok_or_else(|| MonitorError::UnknownSymbol(symbol.to_string()))?;
        let report = book.apply_delta(bids, asks);

        if report.skipped() > 0 {
            *self.soft_errors.entry(symbol.to_string()).or_insert(0) += report.skipped() as u64;
            for (side, skipped) in [("bid", report.skipped_bids), ("ask", report.skipped_asks)] {
                if skipped > 0 {
                    metrics::SOFT_ERRORS
                        .with_label_values(&[symbol, side])
                        .inc_by(skipped as u64);
                }
            }
        }

        Ok(report)
    }

    /// Best `n` levels per side for a symbol
    ///
    /// Fails with `InsufficientDepth` when either side is empty; callers
    /// must not read that as a zero imbalance.
    pub fn top_n(&self, symbol: &str, n: usize) -> Result<TopOfBook> {
        self.book(symbol)?
            .top_n(n)
            .ok_or_else(|| MonitorError::InsufficientDepth {
                symbol: symbol.to_string(),
            })
    }

    /// Get the book for a symbol
    pub fn book(&self, symbol: &str) -> Result<&OrderBook> {
        self.books
            .get(symbol)
            .ok_or_else(|| MonitorError::UnknownSymbol(symbol.to_string()))
    }

    fn book_mut(&mut self, symbol: &str) -> Result<&mut OrderBook> {
        self.books
            .get_mut(symbol)
            .ok_or_else(|| MonitorError::UnknownSymbol(symbol.to_string()))
    }

    /// Malformed entries skipped so far for a symbol
    pub fn soft_errors(&self, symbol: &str) -> u64 {
        self.soft_errors.get(symbol).copied().unwrap_or(0)
    }

    /// Check if a book is initialized
    pub fn is_initialized(&self, symbol: &str) -> bool {
        self.books
            .get(symbol)
            .map(|book| book.is_initialized())
            .unwrap_or(false)
    }
}
