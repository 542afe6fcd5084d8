//! The supervision loop: connect, authenticate, keep alive, reconnect.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, timeout, timeout_at, Instant, MissedTickBehavior};

use crate::channel::RealtimeChannel;
use crate::error::ChannelError;
use crate::frame::{InboundFrame, OutboundFrame};
use crate::state::ChannelState;
use crate::transport::{Connector, Incoming, Transport};

/// Smallest ping period the supervisor will run with.
const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// Resolves once a stop has been requested or the handle is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// How a bounded write ended without failing.
enum Written {
    Done,
    Stopped,
}

/// Runs one transport write of a connected session.
///
/// A write that is still pending when the peer has been silent for the
/// liveness threshold fails the session. A stop request abandons it.
async fn bounded_write(
    write: impl Future<Output = Result<(), ChannelError>>,
    last_pong: Instant,
    threshold: Duration,
    stop: &mut watch::Receiver<bool>,
) -> Result<Written, ChannelError> {
    tokio::select! {
        res = timeout_at(last_pong + threshold, write) => match res {
            Ok(res) => res.map(|()| Written::Done),
            Err(_) => Err(ChannelError::LivenessTimeout(last_pong.elapsed())),
        },
        () = stopped(stop) => Ok(Written::Stopped),
    }
}

/// Runs sessions back to back until stopped.
///
/// Every session failure is logged and followed by the fixed reconnect
/// delay. Exactly one session is ever in flight because this is the only
/// task that opens transports.
pub(crate) async fn supervise<C: Connector>(
    channel: RealtimeChannel,
    connector: C,
    mut stop: watch::Receiver<bool>,
) {
    let delay = channel.config().reconnect_delay;
    tracing::info!(reconnect_delay_ms = delay.as_millis() as u64, "realtime channel supervisor started");

    loop {
        if *stop.borrow() {
            break;
        }

        let session_id = channel.next_session_id();
        match run_session(&channel, &connector, session_id, &mut stop).await {
            Ok(()) => break,
            Err(ChannelError::AlreadyActive) => {}
            Err(e) => {
                tracing::warn!(
                    session_id,
                    delay_ms = delay.as_millis() as u64,
                    "realtime session ended, reconnecting after delay: {}",
                    e
                );
            }
        }

        tokio::select! {
            () = sleep(delay) => {}
            () = stopped(&mut stop) => break,
        }
    }

    channel.set_state(ChannelState::Disconnected);
    channel.release_supervision();
    tracing::info!("realtime channel supervisor stopped");
}

/// One transport lifetime. `Ok(())` means the session ended because a stop
/// was requested.
async fn run_session<C: Connector>(
    channel: &RealtimeChannel,
    connector: &C,
    session_id: u64,
    stop: &mut watch::Receiver<bool>,
) -> Result<(), ChannelError> {
    if !channel.try_begin_connect() {
        return Err(ChannelError::AlreadyActive);
    }

    let threshold = channel.config().liveness_threshold;
    tracing::debug!(session_id, "connecting to collector");

    let connected = tokio::select! {
        res = timeout(threshold, connector.connect()) => res,
        () = stopped(stop) => {
            channel.end_session(session_id);
            return Ok(());
        }
    };
    let mut transport = match connected {
        Ok(Ok(transport)) => transport,
        Ok(Err(e)) => {
            channel.end_session(session_id);
            return Err(e);
        }
        Err(_) => {
            channel.end_session(session_id);
            return Err(ChannelError::ConnectTimeout(threshold));
        }
    };

    let result = drive(channel, &mut transport, session_id, stop).await;

    // Retract the session before closing so no publisher can queue into it.
    channel.end_session(session_id);
    transport.close().await;
    result
}

/// Authenticates the open transport, then serves it until it fails.
async fn drive<T: Transport>(
    channel: &RealtimeChannel,
    transport: &mut T,
    session_id: u64,
    stop: &mut watch::Receiver<bool>,
) -> Result<(), ChannelError> {
    let config = channel.config();
    channel.set_state(ChannelState::Authenticating);

    let request = OutboundFrame::AuthenticationNodeRequest {
        token: &config.token,
        name: &config.name,
    }
    .encode()?;

    let deadline = sleep(config.liveness_threshold);
    tokio::pin!(deadline);

    tokio::select! {
        res = transport.send_text(request) => res?,
        () = &mut deadline => {
            return Err(ChannelError::HandshakeTimeout(config.liveness_threshold));
        }
        () = stopped(stop) => return Ok(()),
    }

    loop {
        tokio::select! {
            () = stopped(stop) => return Ok(()),
            () = &mut deadline => {
                return Err(ChannelError::HandshakeTimeout(config.liveness_threshold));
            }
            incoming = transport.recv() => match incoming {
                None => return Err(ChannelError::Closed),
                Some(Err(e)) => return Err(e),
                Some(Ok(Incoming::Ping | Incoming::Pong)) => {}
                Some(Ok(Incoming::Text(text))) => {
                    if InboundFrame::parse(&text)?.is_authentication_success() {
                        break;
                    }
                    return Err(ChannelError::HandshakeRejected);
                }
                Some(Ok(Incoming::Binary)) => return Err(ChannelError::HandshakeRejected),
            },
        }
    }

    let (outbound_tx, mut outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
    channel.go_live(session_id, outbound_tx);
    tracing::info!(session_id, name = %config.name, "authenticated with collector");

    // Fresh per session, so a previous session's silence cannot count here.
    let mut last_pong = Instant::now();
    let period = config.ping_interval.max(MIN_PING_INTERVAL);
    let mut ping = interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let threshold = config.liveness_threshold;

    loop {
        tokio::select! {
            () = stopped(stop) => return Ok(()),
            _ = ping.tick() => {
                let silent_for = last_pong.elapsed();
                if silent_for > threshold {
                    return Err(ChannelError::LivenessTimeout(silent_for));
                }
                if let Written::Stopped =
                    bounded_write(transport.ping(), last_pong, threshold, stop).await?
                {
                    return Ok(());
                }
            }
            Some(frame) = outbound_rx.recv() => {
                if let Written::Stopped =
                    bounded_write(transport.send_text(frame), last_pong, threshold, stop).await?
                {
                    return Ok(());
                }
            }
            incoming = transport.recv() => match incoming {
                None => return Err(ChannelError::Closed),
                Some(Err(e)) => return Err(e),
                Some(Ok(Incoming::Pong)) => last_pong = Instant::now(),
                Some(Ok(Incoming::Ping)) => {}
                Some(Ok(Incoming::Text(text))) => {
                    InboundFrame::parse(&text)?;
                    return Err(ChannelError::UnexpectedFrame(text));
                }
                Some(Ok(Incoming::Binary)) => {
                    return Err(ChannelError::UnexpectedFrame("binary message".to_string()));
                }
            },
        }
    }
}
