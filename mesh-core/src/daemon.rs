//! Daemon: owns the event queue, the peer registry, the callback sink and the active transport,
//! and runs the single worker thread that dispatches events in FIFO order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::callbacks::{Callbacks, Status};
use crate::config::Config;
use crate::error::{MeshError, MeshResult};
use crate::event::{now_millis, Event, EventKind};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::queue::{EventQueue, EventSender};
use crate::registry::{PeerInfo, PeerRegistry};
use crate::transport::{LoopbackTransport, Transport};

/// State reachable from the worker thread.
struct Shared {
    queue: Arc<EventQueue>,
    registry: PeerRegistry,
    callbacks: RwLock<Arc<Callbacks>>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    worker_thread: Mutex<Option<ThreadId>>,
}

pub struct Daemon {
    shared: Arc<Shared>,
    /// Held across start/stop (including the join) so a restart never overlaps the old worker.
    worker: Mutex<Option<JoinHandle<()>>>,
    lifecycle: Mutex<Lifecycle>,
    config: Config,
}

impl Daemon {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Arc::new(EventQueue::new()),
                registry: PeerRegistry::new(),
                callbacks: RwLock::new(Arc::new(Callbacks::new())),
                transport: RwLock::new(None),
                worker_thread: Mutex::new(None),
            }),
            worker: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle::new()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Spawn the worker. No-op if already running.
    pub fn start(&self) -> MeshResult<()> {
        if self.on_worker_thread() {
            tracing::warn!("start() called from the worker thread, ignored");
            return Ok(());
        }
        {
            let mut worker = self.worker.lock();
            if !self.shared.queue.open() {
                return Ok(());
            }
            // worker left by an in-band shutdown; its loop has already exited
            if let Some(stale) = worker.take() {
                let _ = stale.join();
            }
            let shared = self.shared.clone();
            let spawned = thread::Builder::new()
                .name(self.config.worker_name.clone())
                .spawn(move || run_worker(shared));
            match spawned {
                Ok(handle) => *worker = Some(handle),
                Err(e) => {
                    self.shared.queue.close();
                    tracing::error!(error = %e, "failed to spawn worker thread");
                    drop(worker);
                    self.notify_status(Status::Error, "failed to spawn worker");
                    return Err(MeshError::Unknown);
                }
            }
            self.transition(LifecycleState::Running);
        }
        tracing::info!(worker = %self.config.worker_name, "daemon started");
        self.notify_status(Status::Running, "running");
        Ok(())
    }

    /// Stop the worker and join it. Events still queued are discarded. Idempotent.
    /// On the worker thread itself this only clears `running`; the join is left to the owner.
    pub fn stop(&self) {
        if self.on_worker_thread() {
            if self.shared.queue.close().is_some() {
                tracing::warn!("stop() called from the worker thread, join deferred");
            }
            return;
        }
        {
            let mut worker = self.worker.lock();
            let closed = self.shared.queue.close();
            let handle = worker.take();
            if closed.is_none() && handle.is_none() {
                return;
            }
            if let Some(discarded) = closed {
                if discarded > 0 {
                    tracing::warn!(discarded, "stopping with queued events, discarded");
                }
            }
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    tracing::error!("worker thread panicked");
                }
            }
            self.transition(LifecycleState::Stopped);
        }
        tracing::info!("daemon stopped");
        self.notify_status(Status::Stopped, "stopped");
    }

    /// Process everything queued so far, then stop. Events submitted after this call are discarded.
    pub fn drain_and_stop(&self) {
        if self.on_worker_thread() {
            tracing::warn!("drain_and_stop() called from the worker thread, ignored");
            return;
        }
        if self.shared.queue.push_shutdown() {
            let mut worker = self.worker.lock();
            if let Some(handle) = worker.take() {
                if handle.join().is_err() {
                    tracing::error!("worker thread panicked");
                }
            }
            self.transition(LifecycleState::Stopped);
            drop(worker);
            tracing::info!("daemon drained and stopped");
            self.notify_status(Status::Stopped, "stopped");
        } else {
            self.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.queue.is_running()
    }

    /// True only while a handler executes.
    pub fn is_busy(&self) -> bool {
        self.shared.queue.is_busy()
    }

    /// Number of queued, not yet dispatched events.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Accepted events that a stop discarded before dispatch, since creation.
    pub fn discarded(&self) -> u64 {
        self.shared.queue.discarded()
    }

    /// Block until the queue is empty and idle (or stopped). Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.queue.wait_idle(timeout)
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state()
    }

    /// Enqueue an event from any thread. Silently dropped when not running;
    /// returns whether accepted.
    /// `EventKind::Shutdown` is refused; use `drain_and_stop`.
    pub fn submit(&self, event: Event) -> bool {
        self.shared.queue.push(event)
    }

    pub fn sender(&self) -> EventSender {
        EventSender::new(self.shared.queue.clone())
    }

    /// Replace the active transport. Last write wins; visible to subsequent dispatches.
    pub fn set_transport(&self, transport: Option<Arc<dyn Transport>>) {
        *self.shared.transport.write() = transport;
    }

    /// Attach a loopback transport feeding this daemon's own queue.
    pub fn use_loopback(&self) {
        self.set_transport(Some(Arc::new(LoopbackTransport::new(self.sender()))));
    }

    pub fn set_callbacks(&self, callbacks: Callbacks) {
        *self.shared.callbacks.write() = Arc::new(callbacks);
    }

    pub fn clear_callbacks(&self) {
        self.set_callbacks(Callbacks::new());
    }

    /// Queue `data` for delivery to `peer_id` through the transport.
    pub fn send_message(&self, peer_id: u64, data: &[u8]) -> MeshResult<()> {
        self.validate_payload(data)?;
        if !self.submit(Event::send_message(peer_id, data.to_vec())) {
            return Err(MeshError::NotRunning);
        }
        Ok(())
    }

    /// Resolve `uid` through the registry and hand `data` straight to the transport,
    /// bypassing the queue.
    pub fn send_message_to_uid(&self, uid: &str, data: &[u8]) -> MeshResult<()> {
        self.validate_payload(data)?;
        if !self.is_running() {
            return Err(MeshError::NotRunning);
        }
        if uid.is_empty() {
            return Err(MeshError::InvalidParameter);
        }
        let peer_id = self
            .shared
            .registry
            .find_peer_id_for(uid)
            .ok_or(MeshError::PeerNotFound)?;
        match self.shared.transport() {
            Some(t) => t.transmit(peer_id, data),
            None => tracing::debug!(peer_id, len = data.len(), "no transport, message dropped"),
        }
        Ok(())
    }

    fn validate_payload(&self, data: &[u8]) -> MeshResult<()> {
        if data.is_empty() {
            return Err(MeshError::InvalidParameter);
        }
        if data.len() > self.config.max_message_len {
            return Err(MeshError::MessageTooLong {
                len: data.len(),
                max: self.config.max_message_len,
            });
        }
        Ok(())
    }

    pub fn peer_count(&self) -> usize {
        self.shared.registry.count()
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        self.shared.registry.snapshot()
    }

    pub fn uid_for(&self, peer_id: u64) -> Option<String> {
        self.shared.registry.find_uid_for(peer_id)
    }

    pub fn peer_id_for(&self, uid: &str) -> Option<u64> {
        self.shared.registry.find_peer_id_for(uid)
    }

    /// Test injection: enqueue a synthetic PeerConnected.
    pub fn simulate_peer_connect(&self, peer_id: u64, uid: &str) -> bool {
        self.submit(Event::peer_connected(peer_id, uid))
    }

    pub fn simulate_peer_disconnect(&self, peer_id: u64) -> bool {
        self.submit(Event::peer_disconnected(peer_id))
    }

    /// Test injection: enqueue a synthetic DataReceived.
    pub fn simulate_message(&self, peer_id: u64, data: &[u8]) -> bool {
        self.submit(Event::data_received(peer_id, String::new(), data.to_vec()))
    }

    fn transition(&self, to: LifecycleState) {
        if let Err(e) = self.lifecycle.lock().transition(to) {
            tracing::debug!(error = %e, "lifecycle");
        }
    }

    fn on_worker_thread(&self) -> bool {
        *self.shared.worker_thread.lock() == Some(thread::current().id())
    }

    fn notify_status(&self, status: Status, message: &str) {
        if !self.config.status_notifications {
            return;
        }
        let callbacks = self.shared.callbacks();
        if panic::catch_unwind(AssertUnwindSafe(|| callbacks.status(status, message))).is_err() {
            tracing::error!(status = status.code(), "status callback panicked");
        }
    }
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.stop();
        self.transition(LifecycleState::Destroyed);
    }
}

impl Shared {
    fn callbacks(&self) -> Arc<Callbacks> {
        self.callbacks.read().clone()
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.read().clone()
    }

    /// Run one handler. Locks are released before any callback or transport call;
    /// a panic inside either is contained here.
    fn dispatch(&self, event: Event) {
        let timestamp = event.timestamp.unwrap_or_else(now_millis);
        let kind = event.kind.name();
        tracing::debug!(kind, timestamp, "dispatch");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handle(event.kind, timestamp)));
        if outcome.is_err() {
            tracing::error!(kind, "handler panicked, event dropped");
        }
    }

    fn handle(&self, kind: EventKind, timestamp: i64) {
        match kind {
            EventKind::PeerConnected { peer_id, peer_uid } => {
                self.registry.add(peer_id, &peer_uid, timestamp);
                self.callbacks().peer(peer_id, &peer_uid, true);
            }
            EventKind::PeerDisconnected { peer_id } => match self.registry.remove(peer_id) {
                Some(info) => self.callbacks().peer(peer_id, &info.uid, false),
                None => tracing::debug!(peer_id, "disconnect for unknown peer"),
            },
            EventKind::DataReceived {
                peer_id,
                peer_uid,
                data,
            } => {
                let uid = self.registry.find_uid_for(peer_id).unwrap_or(peer_uid);
                self.callbacks().message(peer_id, &uid, &data, timestamp);
            }
            EventKind::SendMessage { peer_id, data } => match self.transport() {
                Some(t) => t.transmit(peer_id, &data),
                None => tracing::debug!(peer_id, len = data.len(), "no transport, message dropped"),
            },
            EventKind::Shutdown => {}
        }
    }
}

fn run_worker(shared: Arc<Shared>) {
    *shared.worker_thread.lock() = Some(thread::current().id());
    tracing::debug!("worker loop entered");
    while let Some(event) = shared.queue.next() {
        if matches!(event.kind, EventKind::Shutdown) {
            if let Some(discarded) = shared.queue.close() {
                if discarded > 0 {
                    tracing::warn!(discarded, "shutdown event: later events discarded");
                }
            }
            shared.queue.finish_dispatch();
            break;
        }
        shared.dispatch(event);
        shared.queue.finish_dispatch();
    }
    tracing::debug!("worker loop exited");
}
