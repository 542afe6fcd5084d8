//! Forward-compatible reading of stored envelopes.

use serde_json::Value;
use thiserror::Error;

use crate::envelope::Envelope;
use crate::event::Event;

/// Errors raised while reading a stored record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record is not valid JSON, or a known event type has the wrong shape.
    #[error("malformed event record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The record has no string `type` discriminator.
    #[error("event record has no type discriminator")]
    MissingType,
}

/// A record read back from the durable store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    /// A record this schema understands.
    Known(Envelope),
    /// A record written by a newer schema. Kept raw so callers can skip or
    /// forward it without losing data.
    Unrecognized {
        event_type: String,
        time: Option<i64>,
        raw: Value,
    },
}

impl StoredRecord {
    /// Parses one stored JSON record.
    ///
    /// Records whose `type` is not in [`Event::KNOWN_TYPES`] become
    /// [`StoredRecord::Unrecognized`].
    ///
    /// # Errors
    ///
    /// Returns `RecordError::MissingType` if there is no string `type`, or
    /// `RecordError::Malformed` if the JSON is invalid or a known event type
    /// does not match its schema.
    pub fn parse(json: &str) -> Result<Self, RecordError> {
        let raw: Value = serde_json::from_str(json)?;
        let event_type = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingType)?
            .to_string();

        if !Event::is_known_type(&event_type) {
            let time = raw.get("time").and_then(Value::as_i64);
            return Ok(Self::Unrecognized {
                event_type,
                time,
                raw,
            });
        }

        Ok(Self::Known(serde_json::from_value(raw)?))
    }

    /// Returns the `type` discriminator of the record.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Known(envelope) => envelope.event_type(),
            Self::Unrecognized { event_type, .. } => event_type,
        }
    }

    /// Returns the envelope if the record is one this schema understands.
    pub fn known(&self) -> Option<&Envelope> {
        match self {
            Self::Known(envelope) => Some(envelope),
            Self::Unrecognized { .. } => None,
        }
    }
}
