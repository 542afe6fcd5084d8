//! Ingestion-stamped events.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An [`Event`] plus the time the relay accepted it.
///
/// Serialized flat: the event's own fields, its `type`, and `time` side by
/// side in one JSON object. The timestamp is assigned once at ingestion and
/// never derived from the event's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub event: Event,
    /// Milliseconds since the Unix epoch.
    pub time: i64,
}

impl Envelope {
    /// Wraps `event` with the current wall-clock time.
    pub fn stamp(event: Event) -> Self {
        Self::at(event, now_millis())
    }

    /// Wraps `event` with an explicit timestamp.
    pub fn at(event: Event, time: i64) -> Self {
        Self { event, time }
    }

    /// Returns the `type` discriminator of the wrapped event.
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}
