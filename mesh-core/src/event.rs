//! Events: one unit of work submitted to the daemon for ordered processing.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Clamps to 0 if the clock is before the epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Tagged payload of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PeerConnected {
        peer_id: u64,
        peer_uid: String,
    },
    PeerDisconnected {
        peer_id: u64,
    },
    /// Inbound data. `peer_uid` is a hint from the producer; the registry entry wins when present.
    DataReceived {
        peer_id: u64,
        peer_uid: String,
        data: Vec<u8>,
    },
    SendMessage {
        peer_id: u64,
        data: Vec<u8>,
    },
    /// In-band stop request. Events queued ahead of it are processed, later ones are discarded.
    Shutdown,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PeerConnected { .. } => "peer_connected",
            EventKind::PeerDisconnected { .. } => "peer_disconnected",
            EventKind::DataReceived { .. } => "data_received",
            EventKind::SendMessage { .. } => "send_message",
            EventKind::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Producer timestamp (ms). Unset events are stamped by the queue at enqueue time.
    pub timestamp: Option<i64>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: None,
        }
    }

    pub fn peer_connected(peer_id: u64, peer_uid: impl Into<String>) -> Self {
        Self::new(EventKind::PeerConnected {
            peer_id,
            peer_uid: peer_uid.into(),
        })
    }

    pub fn peer_disconnected(peer_id: u64) -> Self {
        Self::new(EventKind::PeerDisconnected { peer_id })
    }

    pub fn data_received(
        peer_id: u64,
        peer_uid: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(EventKind::DataReceived {
            peer_id,
            peer_uid: peer_uid.into(),
            data: data.into(),
        })
    }

    pub fn send_message(peer_id: u64, data: impl Into<Vec<u8>>) -> Self {
        Self::new(EventKind::SendMessage {
            peer_id,
            data: data.into(),
        })
    }

    pub(crate) fn shutdown() -> Self {
        Self::new(EventKind::Shutdown)
    }

    /// Set the producer timestamp (ms since epoch).
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamp with `now` if the producer left the timestamp unset. Returns the effective timestamp.
    pub(crate) fn stamp(&mut self, now: i64) -> i64 {
        *self.timestamp.get_or_insert(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_keeps_producer_timestamp() {
        let mut e = Event::peer_connected(1, "alice").with_timestamp(42);
        assert_eq!(e.stamp(1000), 42);
        assert_eq!(e.timestamp, Some(42));
    }

    #[test]
    fn stamp_fills_unset() {
        let mut e = Event::peer_disconnected(7);
        assert_eq!(e.timestamp, None);
        assert_eq!(e.stamp(1000), 1000);
        assert_eq!(e.stamp(2000), 1000);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Event::send_message(1, b"x".to_vec()).kind.name(), "send_message");
        assert_eq!(Event::shutdown().kind.name(), "shutdown");
    }
}
