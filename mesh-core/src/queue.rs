//! Event queue: unbounded FIFO under one mutex, with a condvar to wake the worker
//! and a second condvar for callers waiting on quiescence.
//! The same lock guards the `running` and `busy` flags.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::event::{now_millis, Event, EventKind};

#[derive(Default)]
struct QueueState {
    events: VecDeque<Event>,
    running: bool,
    busy: bool,
    /// Events thrown away by `close` since creation.
    discarded: u64,
}

#[derive(Default)]
pub struct EventQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    idle: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and wake the worker. Dropped (returns false) when not running.
    /// `Shutdown` is reserved for `Daemon::drain_and_stop` and is always refused here.
    pub fn push(&self, event: Event) -> bool {
        if matches!(event.kind, EventKind::Shutdown) {
            tracing::warn!("shutdown event rejected, use Daemon::drain_and_stop");
            return false;
        }
        self.enqueue(event)
    }

    /// Queue the in-band stop request.
    pub(crate) fn push_shutdown(&self) -> bool {
        self.enqueue(Event::shutdown())
    }

    fn enqueue(&self, mut event: Event) -> bool {
        {
            let mut state = self.state.lock();
            if !state.running {
                tracing::trace!(kind = event.kind.name(), "queue stopped, event dropped");
                return false;
            }
            event.stamp(now_millis());
            state.events.push_back(event);
        }
        self.available.notify_one();
        true
    }

    /// Flip to running. Returns false if already running.
    pub(crate) fn open(&self) -> bool {
        let mut state = self.state.lock();
        if state.running {
            return false;
        }
        state.running = true;
        true
    }

    /// Flip to stopped, discard whatever is still queued and wake every waiter.
    /// Returns the number of discarded events, or None if already stopped.
    pub(crate) fn close(&self) -> Option<usize> {
        let discarded = {
            let mut state = self.state.lock();
            if !state.running {
                return None;
            }
            state.running = false;
            let n = state.events.len();
            state.events.clear();
            state.discarded += n as u64;
            n
        };
        self.available.notify_all();
        self.idle.notify_all();
        Some(discarded)
    }

    /// Worker side: block until an event is available or the queue is closed.
    /// A returned event leaves the queue busy until `finish_dispatch`.
    pub(crate) fn next(&self) -> Option<Event> {
        let mut state = self.state.lock();
        loop {
            if !state.running {
                return None;
            }
            if let Some(event) = state.events.pop_front() {
                state.busy = true;
                return Some(event);
            }
            self.available.wait(&mut state);
        }
    }

    pub(crate) fn finish_dispatch(&self) {
        let quiet = {
            let mut state = self.state.lock();
            state.busy = false;
            state.events.is_empty()
        };
        if quiet {
            self.idle.notify_all();
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// Accepted events that were discarded by a stop instead of dispatched.
    pub fn discarded(&self) -> u64 {
        self.state.lock().discarded
    }

    /// Block until nothing is queued and no handler runs, or the queue is closed.
    /// Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.running && (state.busy || !state.events.is_empty()) {
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return !state.running || (!state.busy && state.events.is_empty());
            }
        }
        true
    }
}

/// Cloneable producer handle. Lets transports re-enter the pipeline without owning the daemon.
#[derive(Clone)]
pub struct EventSender {
    queue: Arc<EventQueue>,
}

impl EventSender {
    pub(crate) fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Same contract as `Daemon::submit`.
    pub fn submit(&self, event: Event) -> bool {
        self.queue.push(event)
    }
}
