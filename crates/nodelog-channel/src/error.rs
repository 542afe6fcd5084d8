//! Error types for the realtime channel.
//!
//! None of these ever reach a publisher. They end a session, get logged, and
//! the supervision loop schedules the next connect attempt.

use std::time::Duration;

use thiserror::Error;

/// Why a session ended (or never started).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The transport could not be opened.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Opening the transport took longer than allowed.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// A read or write on an open transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer closed the transport.
    #[error("transport closed by peer")]
    Closed,

    /// The collector answered the authentication request with something
    /// other than the success acknowledgement.
    #[error("authentication rejected by collector")]
    HandshakeRejected,

    /// The collector did not answer the authentication request in time.
    #[error("no authentication response within {0:?}")]
    HandshakeTimeout(Duration),

    /// An inbound frame could not be parsed.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A well-formed frame arrived that the channel does not expect.
    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),

    /// No pong within the liveness threshold.
    #[error("no pong for {0:?}, peer unresponsive")]
    LivenessTimeout(Duration),

    /// A connect attempt was made while a session was already live.
    #[error("a session is already active")]
    AlreadyActive,
}
