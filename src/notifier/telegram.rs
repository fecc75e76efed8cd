//! Telegram bot API notifier

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::{format_message, Notifier};
use crate::error::{MonitorError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends alerts through the Telegram `sendMessage` method
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: &str, chat_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_url.trim_end_matches('/'),
                bot_token
            ),
            chat_id: chat_id.to_string(),
        })
    }

    async fn post(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(|e| {
            MonitorError::NotifierError(format!("unreadable response ({}): {}", status, e))
        })?;

        if !status.is_success() || !body.ok {
            return Err(MonitorError::NotifierError(format!(
                "{}: {}",
                status,
                body.description.unwrap_or_default()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, symbol: &str, value: f64, threshold: f64) -> bool {
        let text = format_message(symbol, value, threshold, Local::now().time());

        match self.post(&text).await {
            Ok(()) => {
                debug!(symbol = %symbol, "Telegram message sent");
                true
            }
            Err(e) => {
                error!(symbol = %symbol, error = %e, "Error sending Telegram message");
                false
            }
        }
    }
}
