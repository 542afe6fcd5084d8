//! The seam between the state machine and the socket.

use std::future::Future;

use crate::error::ChannelError;

/// One inbound message, reduced to what the state machine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    Binary,
    Ping,
    Pong,
}

/// An open, message-oriented duplex connection.
pub trait Transport: Send {
    /// Sends one text message.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Sends a protocol-level ping.
    fn ping(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Waits for the next inbound message. `None` once the peer has closed.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Incoming, ChannelError>>> + Send;

    /// Closes the transport. Closing twice is a no-op.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens transports to the collector.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport + 'static;

    fn connect(&self) -> impl Future<Output = Result<Self::Transport, ChannelError>> + Send;
}
