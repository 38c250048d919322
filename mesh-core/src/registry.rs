//! Peer registry: peer id -> metadata, guarded by its own lock (independent of the queue lock).
//! Written only from worker dispatch; read from any thread.

use std::collections::HashMap;

use parking_lot::Mutex;

/// One currently-known peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub peer_id: u64,
    /// Empty for anonymous peers.
    pub uid: String,
    pub connected: bool,
    /// Connection timestamp (ms since epoch).
    pub connected_at: i64,
}

#[derive(Default)]
pub struct PeerRegistry {
    peers: Mutex<HashMap<u64, PeerInfo>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `peer_id`.
    pub fn add(&self, peer_id: u64, uid: &str, connected_at: i64) {
        self.peers.lock().insert(
            peer_id,
            PeerInfo {
                peer_id,
                uid: uid.to_string(),
                connected: true,
                connected_at,
            },
        );
    }

    /// Remove and return the entry. Unknown ids return None.
    pub fn remove(&self, peer_id: u64) -> Option<PeerInfo> {
        self.peers.lock().remove(&peer_id)
    }

    pub fn contains(&self, peer_id: u64) -> bool {
        self.peers.lock().contains_key(&peer_id)
    }

    pub fn count(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn get(&self, peer_id: u64) -> Option<PeerInfo> {
        self.peers.lock().get(&peer_id).cloned()
    }

    pub fn find_uid_for(&self, peer_id: u64) -> Option<String> {
        self.peers.lock().get(&peer_id).map(|p| p.uid.clone())
    }

    /// Linear scan. Anonymous (empty) uids never match.
    pub fn find_peer_id_for(&self, uid: &str) -> Option<u64> {
        if uid.is_empty() {
            return None;
        }
        self.peers
            .lock()
            .values()
            .find(|p| p.uid == uid)
            .map(|p| p.peer_id)
    }

    /// Snapshot of all peers, ordered by peer id.
    pub fn snapshot(&self) -> Vec<PeerInfo> {
        let mut out: Vec<PeerInfo> = self.peers.lock().values().cloned().collect();
        out.sort_by_key(|p| p.peer_id);
        out
    }
}
