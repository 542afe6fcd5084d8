//! Newline-delimited JSON event ingest.

use nodelog_types::Event;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::Relay;

/// Counters for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub published: u64,
    pub skipped: u64,
}

/// Publishes one event per line of `reader` until end of input.
///
/// Blank lines are ignored. Lines that are not a known event are logged and
/// skipped; a read error ends the run like end of input does.
pub async fn ingest_lines<R>(relay: &Relay, reader: R) -> IngestStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = IngestStats::default();
    let mut lines = reader.lines();
    let mut line_no: u64 = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("failed to read event input: {}", e);
                break;
            }
        };
        line_no += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Event>(trimmed) {
            Ok(event) => {
                relay.publish(event);
                stats.published += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_no, "skipping unparseable event: {}", e);
                stats.skipped += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodelog_channel::{ChannelConfig, RealtimeChannel};
    use nodelog_store::{DurableSink, SinkError};
    use nodelog_types::Envelope;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        envelopes: Mutex<Vec<Envelope>>,
    }

    impl DurableSink for RecordingSink {
        fn append(&self, envelope: Envelope) -> Result<(), SinkError> {
            self.envelopes.lock().expect("sink lock poisoned").push(envelope);
            Ok(())
        }
    }

    #[tokio::test]
    async fn publishes_good_lines_and_skips_the_rest() {
        let sink = Arc::new(RecordingSink::default());
        let relay = Relay::new(
            sink.clone(),
            RealtimeChannel::new(ChannelConfig::new("secret", "node")),
        );

        let input = concat!(
            r#"{"type":"lobbyLeft","connectionUuid":"c1"}"#,
            "\n",
            "\n",
            "not json\n",
            r#"{"type":"teleported","playerUuid":"p1"}"#,
            "\n",
            r#"{"type":"ventExited","playerUuid":"p1","ventId":3}"#,
            "\n",
        );

        let stats = ingest_lines(&relay, input.as_bytes()).await;
        assert_eq!(
            stats,
            IngestStats {
                published: 2,
                skipped: 2
            }
        );

        let types: Vec<&str> = sink
            .envelopes
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(types, vec!["lobbyLeft", "ventExited"]);
    }

    #[tokio::test]
    async fn chat_without_lobby_is_published() {
        let sink = Arc::new(RecordingSink::default());
        let relay = Relay::new(
            sink.clone(),
            RealtimeChannel::new(ChannelConfig::new("secret", "node")),
        );

        let input = concat!(
            r#"{"type":"playerChat","connectionUuid":"c1","message":"gg"}"#,
            "\n",
            r#"{"type":"playerChat","connectionUuid":"c1","gameUuid":"g1","message":"where"}"#,
            "\n",
        );

        let stats = ingest_lines(&relay, input.as_bytes()).await;
        assert_eq!(stats.published, 2);
        assert_eq!(stats.skipped, 0);

        let stored = sink.envelopes.lock().expect("sink lock poisoned");
        assert_eq!(
            stored[0].event,
            Event::PlayerChat {
                connection_uuid: "c1".to_string(),
                lobby_uuid: None,
                game_uuid: None,
                message: "gg".to_string(),
            }
        );
    }
}
