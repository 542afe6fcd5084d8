//! The shared channel handle used by publishers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use nodelog_types::Event;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::frame::OutboundFrame;
use crate::state::{AtomicState, ChannelState};
use crate::supervisor::supervise;
use crate::transport::Connector;

/// Credentials and timings for the realtime channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Shared secret presented in the authentication request.
    pub token: String,
    /// Node identity presented in the authentication request.
    pub name: String,
    /// Fixed wait between a disconnect and the next connect attempt.
    pub reconnect_delay: Duration,
    /// How often a connected session pings the collector.
    pub ping_interval: Duration,
    /// Longest tolerated silence: without a pong for this long a connected
    /// session is closed. Also bounds the connect and authentication steps.
    pub liveness_threshold: Duration,
    /// Outbound frames buffered per session before `send` starts dropping.
    pub outbound_capacity: usize,
}

impl ChannelConfig {
    /// Default timings for the given credentials.
    pub fn new(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            reconnect_delay: Duration::from_secs(5),
            ping_interval: Duration::from_secs(5),
            liveness_threshold: Duration::from_secs(10),
            outbound_capacity: 256,
        }
    }
}

/// What happened to an event handed to [`RealtimeChannel::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued on the live session.
    Queued,
    /// No authenticated session; the event was dropped.
    NotConnected,
    /// The session's outbound queue is full; the event was dropped.
    QueueFull,
    /// The event could not be encoded; it was dropped.
    Encode,
}

/// The outbound queue of the session currently in `Connected`.
struct LiveSession {
    id: u64,
    outbound: mpsc::Sender<String>,
}

pub(crate) struct Shared {
    pub(crate) config: ChannelConfig,
    state: AtomicState,
    live: RwLock<Option<LiveSession>>,
    session_ids: AtomicU64,
    supervising: AtomicBool,
}

/// Handle to the realtime channel. Cheap to clone.
///
/// Publishers only ever call [`send`](Self::send) and [`state`](Self::state).
/// The connection itself is owned by the supervision task created with
/// [`start`](Self::start).
#[derive(Clone)]
pub struct RealtimeChannel {
    pub(crate) shared: Arc<Shared>,
}

impl RealtimeChannel {
    /// Creates a channel in `Disconnected`. Nothing connects until
    /// [`start`](Self::start) is called.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: AtomicState::new(ChannelState::Disconnected),
                live: RwLock::new(None),
                session_ids: AtomicU64::new(0),
                supervising: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ChannelState {
        self.shared.state.load()
    }

    /// Returns the configuration the channel was created with.
    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    /// Forwards `event` to the collector if a session is connected.
    ///
    /// Never blocks and never fails the caller; the outcome is informational.
    /// Events sent while not connected are dropped, not queued for later.
    pub fn send(&self, event: &Event) -> SendOutcome {
        if self.state() != ChannelState::Connected {
            return SendOutcome::NotConnected;
        }

        let frame = match (OutboundFrame::NodeEvent { event }).encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(event_type = event.event_type(), "failed to encode event frame: {}", e);
                return SendOutcome::Encode;
            }
        };

        let live = self.shared.live.read().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = live.as_ref() else {
            return SendOutcome::NotConnected;
        };

        match session.outbound.try_send(frame) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::QueueFull,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::NotConnected,
        }
    }

    /// Spawns the supervision task on the current runtime.
    ///
    /// Returns `None`, and leaves the running task alone, if the channel is
    /// already supervised. Dropping the returned handle stops the task the
    /// same way [`ChannelHandle::shutdown`] does, without waiting for it.
    pub fn start<C: Connector>(&self, connector: C) -> Option<ChannelHandle> {
        if self.shared.supervising.swap(true, Ordering::AcqRel) {
            tracing::warn!("realtime channel is already supervised, ignoring start");
            return None;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(supervise(self.clone(), connector, stop_rx));

        Some(ChannelHandle {
            stop: stop_tx,
            task,
        })
    }

    /// Claims the connect slot: `Disconnected` to `Connecting`.
    ///
    /// Any other state means a session is already in flight; the attempt is
    /// rejected and logged and nothing changes.
    pub(crate) fn try_begin_connect(&self) -> bool {
        match self
            .shared
            .state
            .transition(ChannelState::Disconnected, ChannelState::Connecting)
        {
            Ok(()) => true,
            Err(current) => {
                tracing::warn!(state = %current, "connect attempt while a session is active, ignoring");
                false
            }
        }
    }

    pub(crate) fn next_session_id(&self) -> u64 {
        self.shared.session_ids.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn set_state(&self, next: ChannelState) {
        let previous = self.shared.state.swap(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "channel state changed");
        }
    }

    /// Publishes the outbound queue of a newly authenticated session and
    /// marks the channel connected.
    pub(crate) fn go_live(&self, id: u64, outbound: mpsc::Sender<String>) {
        *self.shared.live.write().unwrap_or_else(PoisonError::into_inner) =
            Some(LiveSession { id, outbound });
        self.set_state(ChannelState::Connected);
    }

    /// Retracts session `id` and returns to `Disconnected`. Safe to call for
    /// a session that never went live or was already torn down.
    pub(crate) fn end_session(&self, id: u64) {
        let mut live = self.shared.live.write().unwrap_or_else(PoisonError::into_inner);
        if live.as_ref().is_some_and(|s| s.id == id) {
            *live = None;
        }
        drop(live);
        self.set_state(ChannelState::Disconnected);
    }

    pub(crate) fn release_supervision(&self) {
        self.shared.supervising.store(false, Ordering::Release);
    }
}

/// Owner of a running supervision task.
pub struct ChannelHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Stops the supervision task, closing the active transport, and waits
    /// for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("realtime channel supervisor join error: {}", e);
        }
    }

    /// Returns `true` once the supervision task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
