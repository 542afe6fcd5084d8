//! Connection states and their atomic storage.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where the channel is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelState {
    /// No transport. Also the state held during the reconnect delay.
    Disconnected = 0,
    /// Opening a transport.
    Connecting = 1,
    /// Transport open, waiting for the collector to accept the credentials.
    Authenticating = 2,
    /// Authenticated; events are forwarded.
    Connected = 3,
}

impl ChannelState {
    /// Returns the label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Authenticating => "AUTHENTICATING",
            Self::Connected => "CONNECTED",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Authenticating,
            3 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `ChannelState` that can be read from any thread.
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: ChannelState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> ChannelState {
        ChannelState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores `next` and returns the previous state.
    pub(crate) fn swap(&self, next: ChannelState) -> ChannelState {
        ChannelState::from_u8(self.0.swap(next as u8, Ordering::AcqRel))
    }

    /// Moves from `current` to `next` only if the state is still `current`.
    pub(crate) fn transition(&self, current: ChannelState, next: ChannelState) -> Result<(), ChannelState> {
        self.0
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ChannelState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_only_from_expected_state() {
        let state = AtomicState::new(ChannelState::Disconnected);

        assert_eq!(
            state.transition(ChannelState::Disconnected, ChannelState::Connecting),
            Ok(())
        );
        assert_eq!(
            state.transition(ChannelState::Disconnected, ChannelState::Connecting),
            Err(ChannelState::Connecting)
        );
        assert_eq!(state.load(), ChannelState::Connecting);
    }

    #[test]
    fn swap_returns_previous() {
        let state = AtomicState::new(ChannelState::Connected);
        assert_eq!(state.swap(ChannelState::Disconnected), ChannelState::Connected);
        assert_eq!(state.load().to_string(), "DISCONNECTED");
    }
}
