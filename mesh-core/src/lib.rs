//! MeshCore event core.
//! Producers submit events from any thread; one worker thread dispatches them in order,
//! maintains the peer registry, drives the transport and notifies the host through callbacks.

pub mod callbacks;
pub mod config;
pub mod daemon;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod queue;
pub mod registry;
pub mod transport;

pub use callbacks::{Callbacks, Status};
pub use config::{Config, DEFAULT_MAX_MESSAGE_LEN};
pub use daemon::Daemon;
pub use error::{MeshError, MeshResult};
pub use event::{Event, EventKind};
pub use lifecycle::LifecycleState;
pub use queue::EventSender;
pub use registry::PeerInfo;
pub use transport::{LoopbackTransport, Transport};

// C ABI for the mobile shells and the C test harness.
pub mod ffi;
