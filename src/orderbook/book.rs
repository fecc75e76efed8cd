//! Core order book implementation
//!
//! Uses BTreeMap for efficient sorted price level management.

use rust_decimal::Decimal;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::warn;

use super::{Level, Side, TopOfBook};
use crate::error::{MonitorError, Result};
use crate::parser::PriceLevel;

/// Outcome of applying one delta message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaReport {
    /// Levels inserted or updated
    pub upserted: usize,
    /// Levels removed by a zero quantity (including no-op removals)
    pub removed: usize,
    /// Malformed bid entries skipped
    pub skipped_bids: usize,
    /// Malformed ask entries skipped
    pub skipped_asks: usize,
}

impl DeltaReport {
    /// Malformed entries skipped on both sides
    pub fn skipped(&self) -> usize {
        self.skipped_bids + self.skipped_asks
    }
}

/// Order book for a single symbol
///
/// Every stored quantity is strictly positive; a zero quantity is
/// represented by the absence of the price key.
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    /// Bids sorted by price descending (highest first)
    bids: BTreeMap<Reverse<Decimal>, Decimal>,
    /// Asks sorted by price ascending (lowest first)
    asks: BTreeMap<Decimal, Decimal>,
    /// Whether the book has been initialized with a snapshot
    initialized: bool,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            initialized: false,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Replace the book wholesale with a snapshot
    ///
    /// Fails without touching the current state if either side is empty.
    pub fn init_snapshot(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) -> Result<()> {
        if bids.is_empty() || asks.is_empty() {
            return Err(MonitorError::InvalidSnapshot {
                symbol: self.symbol.clone(),
            });
        }

        self.bids.clear();
        self.asks.clear();

        for level in bids {
            self.update_side(Side::Bid, level);
        }
        for level in asks {
            self.update_side(Side::Ask, level);
        }

        self.initialized = true;
        Ok(())
    }

    /// Apply raw delta entries to both sides
    ///
    /// Malformed entries are skipped individually and counted in the report.
    pub fn apply_delta(&mut self, bids: &[Value], asks: &[Value]) -> DeltaReport {
        let mut report = DeltaReport::default();
        self.apply_raw_side(Side::Bid, bids, &mut report);
        self.apply_raw_side(Side::Ask, asks, &mut report);
        report
    }

    fn apply_raw_side(&mut self, side: Side, entries: &[Value], report: &mut DeltaReport) {
        for raw in entries {
            match PriceLevel::try_from(raw) {
                Ok(level) => {
                    if level.quantity.is_zero() {
                        report.removed += 1;
                    } else {
                        report.upserted += 1;
                    }
                    self.update_side(side, &level);
                }
                Err(e) => {
                    warn!(
                        symbol = %self.symbol,
                        side = side.as_str(),
                        entry = %raw,
                        error = %e,
                        "Skipping malformed level"
                    );
                    match side {
                        Side::Bid => report.skipped_bids += 1,
                        Side::Ask => report.skipped_asks += 1,
                    }
                }
            }
        }
    }

    /// Update a single price level
    fn update_side(&mut self, side: Side, level: &PriceLevel) {
        match side {
            Side::Bid => {
                if level.quantity.is_zero() {
                    self.bids.remove(&Reverse(level.price));
                } else {
                    self.bids.insert(Reverse(level.price), level.quantity);
                }
            }
            Side::Ask => {
                if level.quantity.is_zero() {
                    self.asks.remove(&level.price);
                } else {
                    self.asks.insert(level.price, level.quantity);
                }
            }
        }
    }

    /// Best `n` levels per side, or `None` if either side is empty
    pub fn top_n(&self, n: usize) -> Option<TopOfBook> {
        if self.bids.is_empty() || self.asks.is_empty() {
            return None;
        }

        Some(TopOfBook {
            symbol: self.symbol.clone(),
            bids: self
                .bids
                .iter()
                .take(n)
                .map(|(Reverse(p), q)| Level {
                    price: *p,
                    quantity: *q,
                })
                .collect(),
            asks: self
                .asks
                .iter()
                .take(n)
                .map(|(p, q)| Level {
                    price: *p,
                    quantity: *q,
                })
                .collect(),
        })
    }

    /// Get best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first_key_value().map(|(Reverse(p), _)| *p)
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first_key_value().map(|(p, _)| *p)
    }

    /// Get mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    /// Check if the book is initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    pub fn bid_quantity(&self, price: Decimal) -> Option<Decimal> {
        self.bids.get(&Reverse(price)).copied()
    }

    pub fn ask_quantity(&self, price: Decimal) -> Option<Decimal> {
        self.asks.get(&price).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn create_test_book() -> OrderBook {
        let mut book = OrderBook::new("BTCUSDT");
        book.init_snapshot(
            &[
                PriceLevel::new(dec!(50000), dec!(1.0)),
                PriceLevel::new(dec!(49999), dec!(2.0)),
            ],
            &[
                PriceLevel::new(dec!(50001), dec!(1.5)),
                PriceLevel::new(dec!(50002), dec!(2.5)),
            ],
        )
        .unwrap();
        book
    }

    #[test]
    fn test_best_bid_ask() {
        let book = create_test_book();
        assert_eq!(book.best_bid(), Some(dec!(50000)));
        assert_eq!(book.best_ask(), Some(dec!(50001)));
        assert_eq!(book.mid_price(), Some(dec!(50000.5)));
    }

    #[test]
    fn test_snapshot_requires_both_sides() {
        let mut book = create_test_book();
        let err = book
            .init_snapshot(&[PriceLevel::new(dec!(1), dec!(1))], &[])
            .unwrap_err();
        assert!(matches!(err, MonitorError::InvalidSnapshot { .. }));
        // Previous state survives a rejected snapshot
        assert_eq!(book.bid_levels(), 2);
    }

    #[test]
    fn test_snapshot_drops_zero_quantities() {
        let mut book = OrderBook::new("BTCUSDT");
        book.init_snapshot(
            &[
                PriceLevel::new(dec!(10), dec!(0)),
                PriceLevel::new(dec!(9), dec!(1)),
            ],
            &[PriceLevel::new(dec!(11), dec!(1))],
        )
        .unwrap();
        assert_eq!(book.bid_levels(), 1);
        assert_eq!(book.bid_quantity(dec!(10)), None);
    }

    #[test]
    fn test_apply_delta_upserts_and_removes() {
        let mut book = create_test_book();
        let report = book.apply_delta(
            &[json!(["50000", "3.0"]), json!(["49999", "0"])],
            &[json!(["50003", "1"])],
        );

        assert_eq!(
            report,
            DeltaReport {
                upserted: 2,
                removed: 1,
                ..DeltaReport::default()
            }
        );
        assert_eq!(book.bid_quantity(dec!(50000)), Some(dec!(3.0)));
        assert_eq!(book.bid_quantity(dec!(49999)), None);
        assert_eq!(book.ask_levels(), 3);
    }

    #[test]
    fn test_remove_absent_price_is_noop() {
        let mut book = create_test_book();
        let before = book.top_n(10);
        book.apply_delta(&[json!(["12345", "0"])], &[json!(["99999", "0.000"])]);
        book.apply_delta(&[json!(["12345", "0"])], &[]);
        assert_eq!(book.top_n(10), before);
    }

    #[test]
    fn test_malformed_entry_does_not_abort_delta() {
        let mut book = create_test_book();
        let report = book.apply_delta(
            &[json!(["oops", "1"]), json!(["49998", "4"])],
            &[json!(["50001", "nan?"]), json!(["50001", "0"])],
        );

        assert_eq!(report.skipped_bids, 1);
        assert_eq!(report.skipped_asks, 1);
        assert_eq!(book.bid_quantity(dec!(49998)), Some(dec!(4)));
        assert_eq!(book.ask_quantity(dec!(50001)), None);
    }

    #[test]
    fn test_top_n_ordering_and_length() {
        let mut book = create_test_book();
        book.apply_delta(
            &[json!(["49990", "1"]), json!(["49995", "1"]), json!(["50000.5", "1"])],
            &[json!(["50010", "1"]), json!(["50001.5", "1"])],
        );

        let top = book.top_n(3).unwrap();
        assert_eq!(top.bids.len(), 3);
        assert_eq!(top.asks.len(), 3);
        assert!(top.bids.windows(2).all(|w| w[0].price > w[1].price));
        assert!(top.asks.windows(2).all(|w| w[0].price < w[1].price));
        assert_eq!(top.bids[0].price, dec!(50000.5));
        assert_eq!(top.asks[0].price, dec!(50001));
        assert_eq!(top.asks[1].price, dec!(50001.5));
    }

    #[test]
    fn test_top_n_insufficient_depth() {
        let mut book = create_test_book();
        book.apply_delta(&[], &[json!(["50001", "0"]), json!(["50002", "0"])]);
        assert!(book.top_n(10).is_none());

        let empty = OrderBook::new("ETHUSDT");
        assert!(empty.top_n(1).is_none());
    }
}
