//! Error types for the imbalance monitor

use thiserror::Error;

/// Imbalance monitor errors
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("WebSocket connection error: {0}")]
    WebSocketConnection(String),

    #[error("WebSocket message error: {0}")]
    WebSocketMessage(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Invalid snapshot for {symbol}: bids and asks must both be non-empty")]
    InvalidSnapshot { symbol: String },

    #[error("Insufficient book depth for {symbol}")]
    InsufficientDepth { symbol: String },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("REST API error: {0}")]
    RestApiError(String),

    #[error("Notifier error: {0}")]
    NotifierError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection timeout")]
    ConnectionTimeout,
}

impl From<tokio_tungstenite::tungstenite::Error> for MonitorError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        MonitorError::WebSocketConnection(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::RestApiError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
