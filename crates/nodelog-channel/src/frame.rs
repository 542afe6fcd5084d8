//! JSON frames exchanged with the collector.

use nodelog_types::Event;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// The `event` value the collector sends to acknowledge authentication.
pub const AUTHENTICATION_SUCCESS: &str = "AUTHENTICATION_NODE_SUCCESS";

/// Frames the node sends.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundFrame<'a> {
    /// Sent once per session, immediately after the transport opens.
    AuthenticationNodeRequest { token: &'a str, name: &'a str },
    /// One published event. Carries the bare event, without the ingestion
    /// timestamp.
    NodeEvent { event: &'a Event },
}

impl OutboundFrame<'_> {
    /// Encodes the frame as a JSON text message.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The part of an inbound frame the channel looks at.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub event: Option<serde_json::Value>,
}

impl InboundFrame {
    /// Parses an inbound text message.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Malformed` if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns `true` if this frame is the authentication acknowledgement.
    pub fn is_authentication_success(&self) -> bool {
        self.event.as_ref().and_then(|v| v.as_str()) == Some(AUTHENTICATION_SUCCESS)
    }
}
