//! Append and read operations on the `events` table.

use nodelog_types::{Envelope, StoredRecord};
use rusqlite::{params, Connection};

use crate::error::StoreError;

/// Identity of a row written by [`append_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Auto-incremented row id; also the insertion order.
    pub id: i64,
    pub event_type: String,
    /// The envelope's ingestion timestamp, in milliseconds.
    pub time: i64,
}

/// Appends one envelope to the event collection.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the envelope cannot be encoded or
/// `StoreError::Database` on SQL failure.
pub fn append_event(conn: &Connection, envelope: &Envelope) -> Result<StoredEvent, StoreError> {
    let record_json = serde_json::to_string(envelope)?;
    let event_type = envelope.event_type();

    let id = conn.query_row(
        "INSERT INTO events (event_type, time, record_json)
         VALUES (?1, ?2, ?3)
         RETURNING id",
        params![event_type, envelope.time, record_json],
        |row| row.get::<_, i64>(0),
    )?;

    Ok(StoredEvent {
        id,
        event_type: event_type.to_string(),
        time: envelope.time,
    })
}

/// Filter criteria for [`query_events`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only records with this `type` discriminator.
    pub event_type: Option<String>,
    /// Only records stamped at or after this time, in milliseconds.
    pub since: Option<i64>,
    /// Maximum number of records to return (default: 100).
    pub limit: Option<i64>,
}

/// Reads stored records in insertion order.
///
/// Rows written by a newer schema come back as
/// [`StoredRecord::Unrecognized`] rather than failing the query.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure. A row whose known event
/// type does not match this build's schema is logged and skipped.
pub fn query_events(conn: &Connection, filter: &EventFilter) -> Result<Vec<StoredRecord>, StoreError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ref event_type) = filter.event_type {
        values.push(Box::new(event_type.clone()));
        clauses.push(format!("event_type = ?{}", values.len()));
    }

    if let Some(since) = filter.since {
        values.push(Box::new(since));
        clauses.push(format!("time >= ?{}", values.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    values.push(Box::new(filter.limit.unwrap_or(100)));
    let sql = format!(
        "SELECT id, record_json FROM events {where_clause} ORDER BY id ASC LIMIT ?{}",
        values.len()
    );

    let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| &**v).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(refs.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, json) = row?;
        match StoredRecord::parse(&json) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(id, "skipping non-conforming event record: {}", e),
        }
    }

    Ok(records)
}

/// Returns the number of stored records.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure.
pub fn count_events(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
}
