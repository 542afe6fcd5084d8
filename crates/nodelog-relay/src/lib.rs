//! Event relay for game server nodes.
//!
//! [`Relay::publish`] is the single entry point for the host application.
//! Each call stamps the event once and hands it to two independent sinks:
//!
//! - the durable store, always attempted;
//! - the realtime collector, only while its channel is authenticated.
//!
//! Neither sink can block or fail the caller. Their outcomes are logged and
//! otherwise ignored.

pub mod config;
pub mod ingest;

use std::sync::Arc;

use nodelog_channel::{RealtimeChannel, SendOutcome};
use nodelog_store::DurableSink;
use nodelog_types::{Envelope, Event};

/// Fans published events out to the durable sink and the realtime channel.
///
/// Cheap to clone; clones share both sinks. Construct one per process and
/// pass it to every call site that reports events.
#[derive(Clone)]
pub struct Relay {
    sink: Arc<dyn DurableSink>,
    channel: RealtimeChannel,
}

impl Relay {
    pub fn new(sink: Arc<dyn DurableSink>, channel: RealtimeChannel) -> Self {
        Self { sink, channel }
    }

    /// Returns the realtime channel this relay forwards to.
    pub fn channel(&self) -> &RealtimeChannel {
        &self.channel
    }

    /// Records `event` with the current time and forwards it.
    ///
    /// Returns as soon as both sinks have been handed the event; no I/O is
    /// awaited. The collector receives the bare event, the store receives
    /// the stamped envelope.
    pub fn publish(&self, event: Event) {
        let envelope = Envelope::stamp(event);
        let event_type = envelope.event_type();

        match self.channel.send(&envelope.event) {
            SendOutcome::Queued => {}
            SendOutcome::NotConnected => {
                tracing::trace!(event_type, "collector not connected, event not forwarded");
            }
            outcome => {
                tracing::warn!(event_type, ?outcome, "event not forwarded to collector");
            }
        }

        let category = envelope.event.category();
        if let Err(e) = self.sink.append(envelope) {
            tracing::warn!(event_type, %category, "event not persisted: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodelog_channel::ChannelConfig;
    use nodelog_store::SinkError;
    use std::sync::Mutex;

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

    struct BrokenSink;

    impl DurableSink for BrokenSink {
        fn append(&self, _envelope: Envelope) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    fn channel() -> RealtimeChannel {
        RealtimeChannel::new(ChannelConfig::new("secret", "node-test"))
    }

    #[test]
    fn publish_stamps_and_stores_while_disconnected() {
        let sink = Arc::new(RecordingSink::default());
        let relay = Relay::new(sink.clone(), channel());

        let before = nodelog_types::now_millis();
        relay.publish(Event::LobbyDestroyed {
            lobby_uuid: "l1".to_string(),
        });

        let stored = sink.envelopes.lock().expect("sink lock poisoned");
        assert_eq!(stored.len(), 1);
        assert!(stored[0].time >= before);
        assert_eq!(
            stored[0].event,
            Event::LobbyDestroyed {
                lobby_uuid: "l1".to_string()
            }
        );
    }

    #[test]
    fn publish_preserves_call_order() {
        let sink = Arc::new(RecordingSink::default());
        let relay = Relay::new(sink.clone(), channel());

        for task in 0..5 {
            relay.publish(Event::PlayerTaskCompleted {
                player_uuid: "p1".to_string(),
                task,
            });
        }

        let tasks: Vec<u32> = sink
            .envelopes
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .map(|e| match e.event {
                Event::PlayerTaskCompleted { task, .. } => task,
                ref other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(tasks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn publish_survives_both_sinks_failing() {
        let relay = Relay::new(Arc::new(BrokenSink), channel());

        relay.publish(Event::HostReassigned {
            from_uuid: "c1".to_string(),
            to_uuid: "c2".to_string(),
        });
        assert_eq!(
            relay.channel().state(),
            nodelog_channel::ChannelState::Disconnected
        );
    }

    #[test]
    fn publish_is_safe_from_many_threads() {
        let sink = Arc::new(RecordingSink::default());
        let relay = Relay::new(sink.clone(), channel());

        let threads: Vec<_> = (0..8)
            .map(|n| {
                let relay = relay.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        relay.publish(Event::VentEntered {
                            player_uuid: format!("p{n}"),
                            vent_id: n,
                        });
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().expect("publishing thread panicked");
        }

        assert_eq!(sink.envelopes.lock().expect("sink lock poisoned").len(), 200);
    }
}
