//! In-memory transport for driving the state machine in tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::ChannelError;
use crate::transport::{Connector, Incoming, Transport};

/// Something the channel wrote to a fake transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(String),
    Ping,
}

struct Inner {
    peers: mpsc::UnboundedSender<Peer>,
    refuse: AtomicBool,
    attempts: Mutex<Vec<Instant>>,
    live: Arc<AtomicUsize>,
    max_live: AtomicUsize,
}

/// Hands every opened transport's far end to the test as a [`Peer`].
#[derive(Clone)]
pub(crate) struct FakeConnector {
    inner: Arc<Inner>,
}

impl FakeConnector {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Peer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            inner: Arc::new(Inner {
                peers,
                refuse: AtomicBool::new(false),
                attempts: Mutex::new(Vec::new()),
                live: Arc::new(AtomicUsize::new(0)),
                max_live: AtomicUsize::new(0),
            }),
        };
        (connector, rx)
    }

    /// Makes every later connect attempt fail.
    pub(crate) fn refuse(&self, refuse: bool) {
        self.inner.refuse.store(refuse, Ordering::SeqCst);
    }

    /// When each connect attempt was made.
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.inner.attempts.lock().expect("attempts lock").clone()
    }

    /// The most transports that were ever open at once.
    pub(crate) fn max_live(&self) -> usize {
        self.inner.max_live.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self) -> Result<FakeTransport, ChannelError> {
        self.inner.attempts.lock().expect("attempts lock").push(Instant::now());
        if self.inner.refuse.load(Ordering::SeqCst) {
            return Err(ChannelError::Connect("connection refused".to_string()));
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let stalled = Arc::new(AtomicBool::new(false));
        let pings = Arc::new(AtomicUsize::new(0));

        let live = self.inner.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_live.fetch_max(live, Ordering::SeqCst);

        let _ = self.inner.peers.send(Peer {
            inbound: Some(inbound_tx),
            sent: sent_rx,
            closed: closed.clone(),
            stalled: stalled.clone(),
            pings: pings.clone(),
        });

        Ok(FakeTransport {
            inbound: inbound_rx,
            sent: sent_tx,
            closed,
            stalled,
            pings,
            live: self.inner.live.clone(),
        })
    }
}

pub(crate) struct FakeTransport {
    inbound: mpsc::UnboundedReceiver<Incoming>,
    sent: mpsc::UnboundedSender<Sent>,
    closed: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
    pings: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

/// Never resolves once the peer has stopped reading.
async fn writable(stalled: bool) {
    if stalled {
        std::future::pending::<()>().await;
    }
}

impl Transport for FakeTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        writable(self.stalled.load(Ordering::SeqCst)).await;
        self.sent
            .send(Sent::Text(text))
            .map_err(|_| ChannelError::Transport("peer gone".to_string()))
    }

    async fn ping(&mut self) -> Result<(), ChannelError> {
        writable(self.stalled.load(Ordering::SeqCst)).await;
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.sent
            .send(Sent::Ping)
            .map_err(|_| ChannelError::Transport("peer gone".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Incoming, ChannelError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for FakeTransport {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The collector's end of one fake transport.
pub(crate) struct Peer {
    inbound: Option<mpsc::UnboundedSender<Incoming>>,
    sent: mpsc::UnboundedReceiver<Sent>,
    closed: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
    pings: Arc<AtomicUsize>,
}

impl Peer {
    /// Next thing the channel wrote, or `None` once the transport is gone.
    pub(crate) async fn next(&mut self) -> Option<Sent> {
        self.sent.recv().await
    }

    /// Next text frame the channel wrote, skipping pings.
    pub(crate) async fn next_text(&mut self) -> String {
        loop {
            match self.next().await {
                Some(Sent::Text(text)) => return text,
                Some(Sent::Ping) => {}
                None => panic!("transport dropped before a text frame arrived"),
            }
        }
    }

    pub(crate) fn reply(&self, text: &str) {
        self.push(Incoming::Text(text.to_string()));
    }

    pub(crate) fn reply_pong(&self) {
        self.push(Incoming::Pong);
    }

    /// Closes the collector's side; the channel sees end of stream.
    pub(crate) fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Stops reading: every later write on this transport stays pending.
    pub(crate) fn stall_writes(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    fn push(&self, incoming: Incoming) {
        if let Some(inbound) = &self.inbound {
            // The channel may already have dropped this transport.
            let _ = inbound.send(incoming);
        }
    }
}
