//! Callback sink: host-supplied notifications, invoked synchronously on the worker thread.
//! Registered wholesale; a new set replaces the previous one.

use std::fmt;
use std::sync::Arc;

/// Status codes reported to the status callback (match the mobile wrapper's enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Stopped = 0,
    Running = 1,
    Error = -1,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// (peer_id, uid, data, timestamp)
pub type MessageFn = dyn Fn(u64, &str, &[u8], i64) + Send + Sync;
/// (status, message)
pub type StatusFn = dyn Fn(Status, &str) + Send + Sync;
/// (peer_id, uid, connected)
pub type PeerFn = dyn Fn(u64, &str, bool) + Send + Sync;

/// Typed capability record. Unset callbacks are silent no-ops.
#[derive(Default, Clone)]
pub struct Callbacks {
    on_message: Option<Arc<MessageFn>>,
    on_status: Option<Arc<StatusFn>>,
    on_peer: Option<Arc<PeerFn>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &str, &[u8], i64) + Send + Sync + 'static,
    {
        self.on_message = Some(Arc::new(f));
        self
    }

    pub fn on_status<F>(mut self, f: F) -> Self
    where
        F: Fn(Status, &str) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(f));
        self
    }

    pub fn on_peer<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &str, bool) + Send + Sync + 'static,
    {
        self.on_peer = Some(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_message.is_none() && self.on_status.is_none() && self.on_peer.is_none()
    }

    pub(crate) fn message(&self, peer_id: u64, uid: &str, data: &[u8], timestamp: i64) {
        if let Some(f) = &self.on_message {
            f(peer_id, uid, data, timestamp);
        }
    }

    pub(crate) fn status(&self, status: Status, message: &str) {
        if let Some(f) = &self.on_status {
            f(status, message);
        }
    }

    pub(crate) fn peer(&self, peer_id: u64, uid: &str, connected: bool) {
        if let Some(f) = &self.on_peer {
            f(peer_id, uid, connected);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_message", &self.on_message.is_some())
            .field("on_status", &self.on_status.is_some())
            .field("on_peer", &self.on_peer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn unset_callbacks_are_noops() {
        let cb = Callbacks::new();
        assert!(cb.is_empty());
        cb.message(1, "a", b"x", 0);
        cb.status(Status::Running, "running");
        cb.peer(1, "a", true);
    }

    #[test]
    fn builder_sets_only_given() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let cb = Callbacks::new().on_peer(move |id, uid, connected| {
            assert_eq!((id, uid, connected), (3, "carol", false));
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!cb.is_empty());
        cb.peer(3, "carol", false);
        cb.message(3, "carol", b"ignored", 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn status_codes() {
        assert_eq!(Status::Stopped.code(), 0);
        assert_eq!(Status::Running.code(), 1);
        assert_eq!(Status::Error.code(), -1);
    }
}
