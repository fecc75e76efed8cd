//! WebSocket client for a single symbol's partial depth stream
//!
//! Handles connection and message reception.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::error::{MonitorError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client for one symbol
pub struct FeedClient {
    stream: Option<WsStream>,
    url: String,
    symbol: String,
}

impl FeedClient {
    /// Create a client for `{endpoint}/{symbol}@depth{depth}@100ms`
    pub fn new(endpoint: &str, symbol: &str, depth: usize) -> Self {
        Self {
            stream: None,
            url: stream_url(endpoint, symbol, depth),
            symbol: symbol.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect to the stream
    pub async fn connect(&mut self) -> Result<()> {
        info!(symbol = %self.symbol, url = %self.url, "Connecting to Binance WebSocket");

        let (ws_stream, response) = connect_async(&self.url).await.map_err(|e| {
            MonitorError::WebSocketConnection(format!("Failed to connect: {}", e))
        })?;

        info!(symbol = %self.symbol, status = ?response.status(), "WebSocket connected");
        self.stream = Some(ws_stream);

        Ok(())
    }

    /// Receive the next message
    ///
    /// `Ok(None)` means a control frame was handled and there is no payload.
    pub async fn recv(&mut self) -> Result<Option<String>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| MonitorError::WebSocketConnection("Not connected".to_string()))?;

        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                debug!(symbol = %self.symbol, len = text.len(), "Received text message");
                Ok(Some(text))
            }
            Some(Ok(Message::Binary(data))) => {
                let text = String::from_utf8_lossy(&data).to_string();
                Ok(Some(text))
            }
            Some(Ok(Message::Ping(data))) => {
                debug!(symbol = %self.symbol, "Received ping, sending pong");
                if let Some(stream) = self.stream.as_mut() {
                    let _ = stream.send(Message::Pong(data)).await;
                }
                Ok(None)
            }
            Some(Ok(Message::Pong(_))) => Ok(None),
            Some(Ok(Message::Close(frame))) => {
                warn!(symbol = %self.symbol, frame = ?frame, "Received close frame");
                self.stream = None;
                Err(MonitorError::WebSocketConnection(
                    "Connection closed".to_string(),
                ))
            }
            Some(Ok(Message::Frame(_))) => Ok(None),
            Some(Err(e)) => {
                error!(symbol = %self.symbol, error = %e, "WebSocket error");
                self.stream = None;
                Err(MonitorError::WebSocketMessage(e.to_string()))
            }
            None => {
                warn!(symbol = %self.symbol, "WebSocket stream ended");
                self.stream = None;
                Err(MonitorError::WebSocketConnection(
                    "Stream ended".to_string(),
                ))
            }
        }
    }

    /// Send a ping to keep connection alive
    pub async fn ping(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| MonitorError::WebSocketConnection("Not connected".to_string()))?;
        stream
            .send(Message::Ping(vec![]))
            .await
            .map_err(|e| MonitorError::WebSocketMessage(e.to_string()))
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the connection
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}

fn stream_url(endpoint: &str, symbol: &str, depth: usize) -> String {
    format!(
        "{}/{}@depth{}@100ms",
        endpoint.trim_end_matches('/'),
        symbol.to_lowercase(),
        depth
    )
}
