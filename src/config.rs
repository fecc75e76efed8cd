//! Configuration module for the imbalance monitor

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{MonitorError, Result};

const PLACEHOLDER_TOKEN: &str = "your_telegram_bot_token";
const PLACEHOLDER_CHAT_ID: &str = "your_chat_id";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Symbols to monitor (e.g., ["BTCUSDT", "SOLUSDT"])
    pub symbols: Vec<String>,

    /// WebSocket endpoint for Binance
    pub ws_endpoint: String,

    /// REST API endpoint for snapshots
    pub rest_endpoint: String,

    /// Levels requested for the initial REST snapshot
    pub snapshot_limit: usize,

    /// Request timeout for the REST snapshot
    pub snapshot_timeout: Duration,

    /// Partial depth stream size (`@depth{N}@100ms`)
    pub stream_depth: usize,

    /// Levels per side used for the imbalance ratio
    pub top_n: usize,

    /// Alert threshold, compared by absolute value
    pub threshold: f64,

    /// Minimum difference for an imbalance value to count as changed
    pub change_epsilon: f64,

    /// Re-alert interval while the threshold stays exceeded
    pub periodic_realert_interval: Duration,

    /// Minimum time between two delivered notifications for one symbol
    pub notification_cooldown: Duration,

    /// Minimum difference from the last delivered value
    pub notification_min_delta: f64,

    /// Unchanged books are still forwarded after this long
    pub forward_freshness_floor: Duration,

    /// Telegram bot settings
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,

    /// Reconnection settings
    pub reconnect_delay_ms: u64,

    /// Grace period for in-flight notifications on shutdown
    pub shutdown_grace: Duration,

    /// Health check / metrics server port
    pub health_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let symbols = match env::var("SYMBOLS") {
            Ok(raw) => parse_symbols(&raw),
            Err(_) => defaults.symbols,
        };

        Ok(Self {
            symbols,
            ws_endpoint: env::var("WS_ENDPOINT").unwrap_or(defaults.ws_endpoint),
            rest_endpoint: env::var("REST_ENDPOINT").unwrap_or(defaults.rest_endpoint),
            snapshot_limit: env_or("SNAPSHOT_LIMIT", defaults.snapshot_limit),
            snapshot_timeout: env_secs("SNAPSHOT_TIMEOUT_SECS", defaults.snapshot_timeout),
            stream_depth: env_or("STREAM_DEPTH", defaults.stream_depth),
            top_n: env_or("TOP_ORDERS_COUNT", defaults.top_n),
            threshold: env_or("IMBALANCE_THRESHOLD", defaults.threshold),
            change_epsilon: env_or("CHANGE_EPSILON", defaults.change_epsilon),
            periodic_realert_interval: env_secs(
                "PERIODIC_REALERT_SECS",
                defaults.periodic_realert_interval,
            ),
            notification_cooldown: env_secs(
                "NOTIFICATION_COOLDOWN_SECS",
                defaults.notification_cooldown,
            ),
            notification_min_delta: env_or(
                "NOTIFICATION_MIN_DELTA",
                defaults.notification_min_delta,
            ),
            forward_freshness_floor: env_secs(
                "FORWARD_FRESHNESS_SECS",
                defaults.forward_freshness_floor,
            ),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),
            telegram_api_url: env::var("TELEGRAM_API_URL").unwrap_or(defaults.telegram_api_url),
            reconnect_delay_ms: env_or("RECONNECT_DELAY_MS", defaults.reconnect_delay_ms),
            shutdown_grace: env_secs("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace),
            health_port: env_or("HEALTH_PORT", defaults.health_port),
        })
    }

    /// Reject configurations the monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(MonitorError::ConfigError(
                "at least one symbol must be specified".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(MonitorError::ConfigError(
                "TOP_ORDERS_COUNT must be at least 1".to_string(),
            ));
        }
        if self.snapshot_timeout.is_zero() {
            return Err(MonitorError::ConfigError(
                "SNAPSHOT_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(MonitorError::ConfigError(format!(
                "IMBALANCE_THRESHOLD must be finite, got {}",
                self.threshold
            )));
        }

        if !self.has_telegram_credentials() {
            warn!("Telegram credentials not configured, alerts will only be logged");
        }

        Ok(())
    }

    /// Whether both bot token and chat id are set to non-placeholder values
    pub fn has_telegram_credentials(&self) -> bool {
        let token_ok =
            !self.telegram_bot_token.is_empty() && self.telegram_bot_token != PLACEHOLDER_TOKEN;
        let chat_ok =
            !self.telegram_chat_id.is_empty() && self.telegram_chat_id != PLACEHOLDER_CHAT_ID;
        token_ok && chat_ok
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTCUSDT".to_string(),
                "DOTUSDT".to_string(),
                "SOLUSDT".to_string(),
            ],
            ws_endpoint: "wss://stream.binance.com:9443/ws".to_string(),
            rest_endpoint: "https://api.binance.com/api/v3".to_string(),
            snapshot_limit: 20,
            snapshot_timeout: Duration::from_secs(5),
            stream_depth: 20,
            top_n: 10,
            threshold: 0.5,
            change_epsilon: 0.0001,
            periodic_realert_interval: Duration::from_secs(30),
            notification_cooldown: Duration::from_secs(10),
            notification_min_delta: 0.0005,
            forward_freshness_floor: Duration::from_secs(5),
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
            telegram_api_url: "https://api.telegram.org".to_string(),
            reconnect_delay_ms: 1000,
            shutdown_grace: Duration::from_secs(5),
            health_port: 9090,
        }
    }
}

/// Split a comma separated symbol list, upper-casing and dropping blanks and repeats
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(default)
}
