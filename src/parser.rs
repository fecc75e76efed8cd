//! Parser module for Binance depth messages
//!
//! Price levels are kept as raw JSON values until they are applied to a
//! book, so a single malformed entry can be skipped without rejecting the
//! rest of the message.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{MonitorError, Result};

/// Price level (price, quantity pair)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

impl TryFrom<&Value> for PriceLevel {
    type Error = MonitorError;

    /// Parse a `[price, quantity]` pair; both may be strings or numbers
    fn try_from(raw: &Value) -> Result<Self> {
        let pair = raw
            .as_array()
            .filter(|pair| pair.len() >= 2)
            .ok_or_else(|| MonitorError::ParseError(format!("invalid price level: {}", raw)))?;

        let price = decimal_from_value(&pair[0])?;
        let quantity = decimal_from_value(&pair[1])?;

        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(MonitorError::ParseError(format!(
                "negative quantity in level: {}",
                raw
            )));
        }

        Ok(Self { price, quantity })
    }
}

/// Depth message from either the REST snapshot endpoint or the partial
/// depth stream. Accepts both `bids`/`asks` and abbreviated `b`/`a` keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepthMessage {
    /// Last update ID (informational only, no gap detection is done)
    #[serde(default, rename = "lastUpdateId", alias = "u")]
    pub last_update_id: Option<u64>,

    /// Bid entries, unparsed
    #[serde(default, alias = "b")]
    pub bids: Vec<Value>,

    /// Ask entries, unparsed
    #[serde(default, alias = "a")]
    pub asks: Vec<Value>,
}

impl DepthMessage {
    /// Parse every entry on both sides, dropping malformed ones
    pub fn parsed_levels(&self) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        let parse = |side: &[Value]| {
            side.iter()
                .filter_map(|raw| PriceLevel::try_from(raw).ok())
                .collect::<Vec<_>>()
        };
        (parse(&self.bids), parse(&self.asks))
    }
}

/// Combined stream message wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct StreamMessage {
    /// Stream name
    pub stream: String,

    /// Data payload
    pub data: Value,
}

/// Parsed WebSocket message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Depth(DepthMessage),
    Unknown(String),
}

impl ParsedMessage {
    /// Parse a raw WebSocket message
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;

        // Combined streams wrap the payload
        if value.get("stream").is_some() && value.get("data").is_some() {
            let stream_msg: StreamMessage = serde_json::from_value(value)?;
            return Self::parse_value(stream_msg.data);
        }

        Self::parse_value(value)
    }

    fn parse_value(value: Value) -> Result<Self> {
        let is_depth = ["bids", "asks", "b", "a"]
            .iter()
            .any(|key| value.get(key).map(Value::is_array).unwrap_or(false));

        if is_depth {
            let depth: DepthMessage = serde_json::from_value(value)?;
            Ok(ParsedMessage::Depth(depth))
        } else {
            Ok(ParsedMessage::Unknown(value.to_string()))
        }
    }
}

fn decimal_from_value(value: &Value) -> Result<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(MonitorError::ParseError(format!(
                "non-numeric level field: {}",
                other
            )))
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| MonitorError::ParseError(format!("invalid decimal {:?}: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_partial_depth() {
        let raw = r#"{
            "lastUpdateId": 160,
            "bids": [["0.0024", "10"]],
            "asks": [["0.0026", "100"], ["0.0027", "0"]]
        }"#;

        let msg = ParsedMessage::parse(raw).unwrap();
        if let ParsedMessage::Depth(depth) = msg {
            assert_eq!(depth.last_update_id, Some(160));
            assert_eq!(depth.bids.len(), 1);
            assert_eq!(depth.asks.len(), 2);
            let (bids, asks) = depth.parsed_levels();
            assert_eq!(bids[0], PriceLevel::new(dec!(0.0024), dec!(10)));
            assert_eq!(asks[1].quantity, Decimal::ZERO);
        } else {
            panic!("Expected Depth");
        }
    }

    #[test]
    fn test_parse_abbreviated_keys() {
        let raw = r#"{
            "e": "depthUpdate",
            "E": 1672531200000,
            "s": "BTCUSDT",
            "U": 100,
            "u": 105,
            "b": [["50000.00", "1.5"]],
            "a": [["50001.00", "1.0"], ["50002.00", "0.5"]]
        }"#;

        match ParsedMessage::parse(raw).unwrap() {
            ParsedMessage::Depth(depth) => {
                assert_eq!(depth.last_update_id, Some(105));
                assert_eq!(depth.bids.len(), 1);
                assert_eq!(depth.asks.len(), 2);
            }
            other => panic!("Expected Depth, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_combined_stream() {
        let raw = r#"{
            "stream": "btcusdt@depth20@100ms",
            "data": {"lastUpdateId": 1, "bids": [["1", "1"]], "asks": []}
        }"#;

        match ParsedMessage::parse(raw).unwrap() {
            ParsedMessage::Depth(depth) => {
                assert_eq!(depth.bids.len(), 1);
                assert!(depth.asks.is_empty());
            }
            other => panic!("Expected Depth, got {:?}", other),
        }
    }

    #[test]
    fn test_subscription_ack_is_unknown() {
        let msg = ParsedMessage::parse(r#"{"result": null, "id": 1}"#).unwrap();
        assert!(matches!(msg, ParsedMessage::Unknown(_)));
    }

    #[test]
    fn test_level_accepts_numbers() {
        let level = PriceLevel::try_from(&json!([101.5, 2])).unwrap();
        assert_eq!(level, PriceLevel::new(dec!(101.5), dec!(2)));
    }

    #[test]
    fn test_malformed_levels_rejected() {
        assert!(PriceLevel::try_from(&json!(["abc", "1"])).is_err());
        assert!(PriceLevel::try_from(&json!(["100", null])).is_err());
        assert!(PriceLevel::try_from(&json!(["100"])).is_err());
        assert!(PriceLevel::try_from(&json!("100")).is_err());
        assert!(PriceLevel::try_from(&json!(["100", "-1"])).is_err());
    }

    #[test]
    fn test_parsed_levels_skips_malformed() {
        let depth = DepthMessage {
            last_update_id: None,
            bids: vec![json!(["100", "1"]), json!(["x", "1"]), json!(["99", "2"])],
            asks: vec![json!([])],
        };
        let (bids, asks) = depth.parsed_levels();
        assert_eq!(bids.len(), 2);
        assert!(asks.is_empty());
    }
}
