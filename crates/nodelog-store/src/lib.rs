//! Durable sink for stamped events.
//!
//! Every [`Envelope`](nodelog_types::Envelope) the relay accepts is appended
//! as one row of the `events` collection. The row carries the full flattened
//! envelope (event fields plus `time`) as JSON, with `event_type` and `time`
//! broken out as columns for filtering.
//!
//! Two layers:
//!
//! - [`append_event`] / [`query_events`] / [`count_events`] are synchronous
//!   operations on a single `rusqlite` connection.
//! - [`SqliteSink`] implements [`DurableSink`]: `append` only enqueues and
//!   returns immediately; a single writer task performs the inserts in
//!   submission order on the blocking pool. Insert failures are logged and
//!   dropped.
//!
//! ```rust,ignore
//! let (sink, writer) = SqliteSink::spawn(pool, 1024);
//! sink.append(Envelope::stamp(event))?;
//! drop(sink);
//! writer.await?; // drains whatever was queued
//! ```

mod error;
mod sink;
mod store;

pub use error::{SinkError, StoreError};
pub use sink::{DurableSink, SqliteSink};
pub use store::{append_event, count_events, query_events, EventFilter, StoredEvent};
