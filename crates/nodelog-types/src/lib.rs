//! Event schema shared by every nodelog crate.
//!
//! A game server node observes lobby, game, player, meeting and sabotage
//! occurrences and hands them to the relay as [`Event`] values. The relay
//! stamps each one into an [`Envelope`] exactly once, at ingestion, so the
//! durable store and the realtime collector see the same timestamp.
//!
//! # Wire shape
//!
//! Events are internally tagged on `type` with camelCase discriminators and
//! camelCase field names:
//!
//! ```json
//! { "type": "lobbyCreated", "creatorUuid": "u1", "lobbyUuid": "l1", "code": "ABCD" }
//! ```
//!
//! An envelope is the same object with a `time` field (milliseconds since the
//! Unix epoch) added alongside the event's own fields.
//!
//! # Forward compatibility
//!
//! The set of discriminators only ever grows. Readers of historical records
//! go through [`StoredRecord::parse`], which surfaces records written by a
//! newer schema as [`StoredRecord::Unrecognized`] instead of failing.

mod envelope;
mod event;
mod record;

pub use envelope::{now_millis, Envelope};
pub use event::{Detail, Event, EventCategory, PlayerSnapshot, Position, Scalar};
pub use record::{RecordError, StoredRecord};
