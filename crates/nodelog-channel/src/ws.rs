//! WebSocket transport over `tokio-tungstenite`.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::ChannelError;
use crate::transport::{Connector, Incoming, Transport};

/// Upper bound on the close handshake of a transport being torn down.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens WebSocket connections to a fixed `ws://` or `wss://` URL.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self) -> Result<WsTransport, ChannelError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        Ok(WsTransport {
            stream,
            closed: false,
        })
    }
}

/// An open WebSocket to the collector.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn ping(&mut self) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Ping(Default::default()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Incoming, ChannelError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
            };

            let incoming = match msg {
                Message::Text(text) => Incoming::Text(text.as_str().to_owned()),
                Message::Binary(_) => Incoming::Binary,
                Message::Ping(_) => Incoming::Ping,
                Message::Pong(_) => Incoming::Pong,
                Message::Close(_) => return None,
                Message::Frame(_) => continue,
            };
            return Some(Ok(incoming));
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match tokio::time::timeout(CLOSE_TIMEOUT, self.stream.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("websocket close failed: {}", e),
            Err(_) => tracing::debug!("websocket close timed out"),
        }
    }
}
