//! Notional volume imbalance over the top of book

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::orderbook::{Level, TopOfBook};

/// Stateless imbalance calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct ImbalanceEngine;

impl ImbalanceEngine {
    /// Signed ratio in [-1, 1] of bid vs ask notional over the first `top_n`
    /// levels per side
    ///
    /// Notional is `price * quantity`. Positive means bid side dominance.
    /// Returns `None` when the combined notional is zero.
    pub fn compute(snapshot: &TopOfBook, top_n: usize) -> Option<f64> {
        let bid_volume = notional(&snapshot.bids, top_n);
        let ask_volume = notional(&snapshot.asks, top_n);

        let total = bid_volume.saturating_add(ask_volume);
        if total.is_zero() {
            return None;
        }

        let ratio = (bid_volume - ask_volume).checked_div(total)?;
        ratio.to_f64().map(|r| r.clamp(-1.0, 1.0))
    }
}

fn notional(levels: &[Level], top_n: usize) -> Decimal {
    levels
        .iter()
        .take(top_n)
        .map(|l| l.price.checked_mul(l.quantity).unwrap_or(Decimal::MAX))
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, quantity: Decimal) -> Level {
        Level { price, quantity }
    }

    fn snapshot(bids: Vec<Level>, asks: Vec<Level>) -> TopOfBook {
        TopOfBook {
            symbol: "BTCUSDT".to_string(),
            bids,
            asks,
        }
    }

    #[test]
    fn test_equal_volume_is_zero() {
        let s = snapshot(vec![level(dec!(100), dec!(1))], vec![level(dec!(100), dec!(1))]);
        assert_eq!(ImbalanceEngine::compute(&s, 1), Some(0.0));
    }

    #[test]
    fn test_bids_only_is_one() {
        let s = snapshot(vec![level(dec!(100), dec!(1))], vec![]);
        assert_eq!(ImbalanceEngine::compute(&s, 1), Some(1.0));

        let s = snapshot(vec![], vec![level(dec!(100), dec!(1))]);
        assert_eq!(ImbalanceEngine::compute(&s, 1), Some(-1.0));
    }

    #[test]
    fn test_zero_volume_is_absent() {
        let s = snapshot(vec![], vec![]);
        assert_eq!(ImbalanceEngine::compute(&s, 10), None);
    }

    #[test]
    fn test_notional_weighting() {
        // Bids: 100*3 = 300, Asks: 200*1 = 200 -> (300-200)/500 = 0.2
        let s = snapshot(vec![level(dec!(100), dec!(3))], vec![level(dec!(200), dec!(1))]);
        let ratio = ImbalanceEngine::compute(&s, 10).unwrap();
        assert!((ratio - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_only_top_n_levels_count() {
        let s = snapshot(
            vec![level(dec!(100), dec!(1)), level(dec!(99), dec!(1000))],
            vec![level(dec!(101), dec!(1))],
        );
        let top1 = ImbalanceEngine::compute(&s, 1).unwrap();
        let top2 = ImbalanceEngine::compute(&s, 2).unwrap();
        assert!(top1 < 0.0);
        assert!(top2 > 0.9);
    }

    #[test]
    fn test_compute_is_pure() {
        let s = snapshot(
            vec![level(dec!(50000), dec!(1.25)), level(dec!(49999), dec!(0.5))],
            vec![level(dec!(50001), dec!(2))],
        );
        assert_eq!(ImbalanceEngine::compute(&s, 10), ImbalanceEngine::compute(&s, 10));
    }

    #[test]
    fn test_saturated_side_still_dominates() {
        let s = snapshot(
            vec![level(Decimal::MAX, dec!(2))],
            vec![level(dec!(100), dec!(1))],
        );
        let ratio = ImbalanceEngine::compute(&s, 10).unwrap();
        assert!(ratio > 0.99);
    }
}
