//! Transport contract (deliver bytes to a peer) and the loopback test transport.

use crate::event::Event;
use crate::queue::EventSender;

/// Capability that actually delivers bytes to a peer. Fire-and-forget: the implementation
/// owns retry and drop policy. Called from the worker thread (queued sends) and from
/// caller threads (`send_message_to_uid`), so implementations must be thread-safe.
pub trait Transport: Send + Sync {
    fn transmit(&self, peer_id: u64, payload: &[u8]);
}

/// Re-injects every transmitted payload as a `DataReceived` event from the same peer.
/// Exercises the queue -> handler -> transport -> queue cycle without real I/O.
pub struct LoopbackTransport {
    sender: EventSender,
}

impl LoopbackTransport {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }
}

impl Transport for LoopbackTransport {
    fn transmit(&self, peer_id: u64, payload: &[u8]) {
        // uid is resolved from the registry on dispatch
        let accepted = self
            .sender
            .submit(Event::data_received(peer_id, String::new(), payload.to_vec()));
        if !accepted {
            tracing::debug!(
                peer_id,
                len = payload.len(),
                "loopback: daemon stopped, payload dropped"
            );
        }
    }
}
