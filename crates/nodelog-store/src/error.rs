//! Error types for the durable sink.

use thiserror::Error;

/// Errors from the synchronous store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection was available.
    #[error("store pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The envelope could not be serialized.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a [`DurableSink`](crate::DurableSink) did not accept an envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The write queue is at capacity; the envelope was dropped.
    #[error("durable sink queue is full")]
    QueueFull,

    /// The writer has stopped; nothing more will be persisted.
    #[error("durable sink writer has stopped")]
    Closed,
}
