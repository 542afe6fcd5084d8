//! Realtime channel to the remote event collector.
//!
//! One long-lived, authenticated WebSocket per process. A single supervision
//! task owns the transport and walks it through a fixed state machine:
//!
//! ```text
//!              ┌──────────────── (reconnect delay) ◄──────────────┐
//!              ▼                                                  │
//!        DISCONNECTED ──► CONNECTING ──► AUTHENTICATING ──► CONNECTED
//!                              │               │                  │
//!                              └── failure ────┴──── failure ─────┘
//! ```
//!
//! - After the transport opens, the channel sends one
//!   `AUTHENTICATION_NODE_REQUEST` frame and waits for the collector's
//!   success acknowledgement. Anything else, or silence past the liveness
//!   threshold, fails the handshake and the transport is discarded.
//! - While connected, a ping goes out every ping interval. A session with no
//!   pong for longer than the liveness threshold is force-closed.
//! - Every failure converges on `DISCONNECTED`, followed by a fixed reconnect
//!   delay. There is no terminal state short of an explicit shutdown.
//!
//! Callers interact only through [`RealtimeChannel::send`], which never
//! blocks: while connected it queues a `NODE_EVENT` frame for the current
//! session, otherwise it drops the event and says so.
//!
//! The transport sits behind the [`Connector`] / [`Transport`] traits so the
//! state machine can be driven without sockets. [`WsConnector`] is the
//! production implementation over `tokio-tungstenite`.

mod channel;
mod error;
mod frame;
mod state;
mod supervisor;
mod transport;
mod ws;

#[cfg(test)]
mod testing;

pub use channel::{ChannelConfig, ChannelHandle, RealtimeChannel, SendOutcome};
pub use error::ChannelError;
pub use frame::{InboundFrame, OutboundFrame, AUTHENTICATION_SUCCESS};
pub use state::ChannelState;
pub use transport::{Connector, Incoming, Transport};
pub use ws::{WsConnector, WsTransport};
