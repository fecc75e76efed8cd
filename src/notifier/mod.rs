//! Alert delivery
//!
//! The monitor only needs to know whether an alert was delivered; message
//! formatting and transport live behind the [`Notifier`] trait.

mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use chrono::NaiveTime;
use tracing::info;

/// Delivers an imbalance alert
///
/// Returns `true` only if the alert reached its destination. A `false`
/// leaves every throttle untouched so a later observation can retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, symbol: &str, value: f64, threshold: f64) -> bool;
}

/// Notifier that only writes alerts to the log
///
/// Used when no bot credentials are configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, symbol: &str, value: f64, threshold: f64) -> bool {
        info!(
            symbol = %symbol,
            imbalance = value,
            threshold = threshold.abs(),
            direction = direction(value),
            "Imbalance alert"
        );
        true
    }
}

/// `BTCUSDT` -> `BTC/USDT`
pub fn display_symbol(symbol: &str) -> String {
    match symbol.strip_suffix("USDT") {
        Some(base) if !base.is_empty() => format!("{}/USDT", base),
        _ => symbol.to_string(),
    }
}

fn direction(value: f64) -> &'static str {
    if value > 0.0 {
        "Buyers advantage"
    } else {
        "Sellers advantage"
    }
}

/// Human readable alert text
pub fn format_message(symbol: &str, value: f64, threshold: f64, time: NaiveTime) -> String {
    format!(
        "Imbalance Alert\n\n\
         Symbol: {}\n\
         Imbalance Ratio: {:.4}\n\
         Direction: {}\n\
         Threshold: |{:.4}| > {:.4}\n\
         Time: {}",
        display_symbol(symbol),
        value,
        direction(value),
        value,
        threshold.abs(),
        time.format("%H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_symbol() {
        assert_eq!(display_symbol("BTCUSDT"), "BTC/USDT");
        assert_eq!(display_symbol("ETHBTC"), "ETHBTC");
        assert_eq!(display_symbol("USDT"), "USDT");
    }

    #[test]
    fn test_format_message() {
        let time = NaiveTime::from_hms_opt(12, 34, 56).unwrap();
        let text = format_message("SOLUSDT", -0.61234, 0.5, time);

        assert!(text.starts_with("Imbalance Alert"));
        assert!(text.contains("Symbol: SOL/USDT"));
        assert!(text.contains("Imbalance Ratio: -0.6123"));
        assert!(text.contains("Direction: Sellers advantage"));
        assert!(text.contains("Threshold: |-0.6123| > 0.5000"));
        assert!(text.contains("Time: 12:34:56"));
    }

    #[tokio::test]
    async fn test_log_notifier_always_delivers() {
        assert!(LogNotifier.send("BTCUSDT", 0.7, 0.5).await);
    }
}
