//! Core configuration. Hosts build it directly or deserialize it from their own config file.

use serde::Deserialize;

/// Maximum payload accepted by the send operations (bytes).
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4096;

/// Thread name given to the worker.
pub const DEFAULT_WORKER_NAME: &str = "meshcore-worker";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Largest payload `send_message` accepts (default 4096).
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    #[serde(default = "default_worker_name")]
    pub worker_name: String,
    /// Invoke the status callback on start/stop (default true).
    #[serde(default = "default_status_notifications")]
    pub status_notifications: bool,
}

fn default_max_message_len() -> usize {
    DEFAULT_MAX_MESSAGE_LEN
}
fn default_worker_name() -> String {
    DEFAULT_WORKER_NAME.to_string()
}
fn default_status_notifications() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
            worker_name: default_worker_name(),
            status_notifications: default_status_notifications(),
        }
    }
}
