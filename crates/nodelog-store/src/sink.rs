//! Fire-and-forget durable sink backed by the SQLite store.

use nodelog_db::DbPool;
use nodelog_types::Envelope;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::{SinkError, StoreError};
use crate::store::append_event;

/// Accepts envelopes for durable storage without waiting on I/O.
///
/// Implementations must return promptly: `append` runs on the caller's hot
/// path. An `Err` only reports that the envelope was not accepted; the
/// caller is free to ignore it.
pub trait DurableSink: Send + Sync {
    fn append(&self, envelope: Envelope) -> Result<(), SinkError>;
}

/// A [`DurableSink`] that hands envelopes to a single background writer.
///
/// Cloning is cheap and every clone feeds the same writer. The writer exits
/// once every clone has been dropped and the queue is drained.
#[derive(Clone)]
pub struct SqliteSink {
    tx: mpsc::Sender<Envelope>,
}

impl SqliteSink {
    /// Spawns the writer task on the current runtime.
    ///
    /// `capacity` bounds the number of envelopes waiting to be written;
    /// beyond that `append` drops the envelope and returns
    /// `SinkError::QueueFull`.
    pub fn spawn(pool: DbPool, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = tokio::spawn(run_writer(pool, rx));
        (Self { tx }, writer)
    }
}

impl DurableSink for SqliteSink {
    fn append(&self, envelope: Envelope) -> Result<(), SinkError> {
        self.tx.try_send(envelope).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::QueueFull,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Drains the queue one envelope at a time so rows land in submission order.
async fn run_writer(pool: DbPool, mut rx: mpsc::Receiver<Envelope>) {
    let mut written: u64 = 0;

    while let Some(envelope) = rx.recv().await {
        let event_type = envelope.event_type();
        let pool = pool.clone();

        let res = tokio::task::spawn_blocking(move || -> Result<_, StoreError> {
            let conn = pool.get()?;
            append_event(&conn, &envelope)
        })
        .await;

        match res {
            Ok(Ok(stored)) => {
                written += 1;
                tracing::trace!(id = stored.id, event_type, "event persisted");
            }
            Ok(Err(e)) => {
                tracing::warn!(event_type, "failed to persist event, dropping it: {}", e);
            }
            Err(e) => {
                tracing::error!(event_type, "event writer join error: {}", e);
            }
        }
    }

    tracing::info!(written, "event writer stopped");
}
