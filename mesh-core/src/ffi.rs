//! C ABI for linking mesh-core as a static library from the iOS/Android shells or other C hosts.
//! Declarations live in include/meshcore.h. Result codes are `MESHCORE_OK` or `MeshError::code()`.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic;
use std::ptr;
use std::slice;

use crate::callbacks::Callbacks;
use crate::error::{result_code, MeshError, MESHCORE_OK};
use crate::Daemon;

/// Opaque handle handed to C.
pub struct MeshCore {
    daemon: Daemon,
}

type OnMessage = extern "C" fn(*mut c_void, u64, *const c_char, *const u8, usize, i64);
type OnStatus = extern "C" fn(*mut c_void, c_int, *const c_char);
type OnPeer = extern "C" fn(*mut c_void, u64, *const c_char, bool);

/// Callback set registered from C. Any member may be null; all-null unregisters.
#[repr(C)]
pub struct MeshcoreCallbacks {
    pub on_message: Option<OnMessage>,
    pub on_status: Option<OnStatus>,
    pub on_peer: Option<OnPeer>,
    pub user_data: *mut c_void,
}

/// Host context pointer. The host guarantees it outlives the registration and tolerates
/// use from the worker thread.
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

impl UserData {
    fn ptr(self) -> *mut c_void {
        self.0
    }
}

/// NUL-terminated copy for C; strings with interior NULs become empty.
fn c_string(s: &str) -> CString {
    CString::new(s).unwrap_or_default()
}

impl MeshcoreCallbacks {
    fn to_callbacks(&self) -> Callbacks {
        let ud = UserData(self.user_data);
        let mut cb = Callbacks::new();
        if let Some(f) = self.on_message {
            cb = cb.on_message(move |peer_id, uid, data, timestamp| {
                let uid = c_string(uid);
                f(ud.ptr(), peer_id, uid.as_ptr(), data.as_ptr(), data.len(), timestamp);
            });
        }
        if let Some(f) = self.on_status {
            cb = cb.on_status(move |status, message| {
                let message = c_string(message);
                f(ud.ptr(), status.code(), message.as_ptr());
            });
        }
        if let Some(f) = self.on_peer {
            cb = cb.on_peer(move |peer_id, uid, connected| {
                let uid = c_string(uid);
                f(ud.ptr(), peer_id, uid.as_ptr(), connected);
            });
        }
        cb
    }
}

/// Borrow the core behind a handle. None if null.
fn core<'a>(h: *const MeshCore) -> Option<&'a MeshCore> {
    unsafe { h.as_ref() }
}

/// Borrow `len` bytes at `data`. None if null or empty.
fn payload<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() || len == 0 {
        return None;
    }
    Some(unsafe { slice::from_raw_parts(data, len) })
}

/// Borrow a NUL-terminated UTF-8 string. None if null or not UTF-8.
fn utf8<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

/// Library version as a static NUL-terminated string.
#[no_mangle]
pub extern "C" fn meshcore_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Create a core and start its worker. Returns opaque handle or null on failure.
#[no_mangle]
pub extern "C" fn meshcore_create() -> *mut MeshCore {
    let created = panic::catch_unwind(|| {
        let core = Box::new(MeshCore {
            daemon: Daemon::new(),
        });
        core.daemon.start().map(|()| core)
    });
    match created {
        Ok(Ok(core)) => Box::into_raw(core),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "meshcore_create: start failed");
            ptr::null_mut()
        }
        Err(_) => {
            tracing::error!(
                error = %MeshError::AllocationFailure,
                "meshcore_create: construction panicked"
            );
            ptr::null_mut()
        }
    }
}

/// Stop and free a core. No-op if h is null. Must not be called from a callback.
#[no_mangle]
pub extern "C" fn meshcore_destroy(h: *mut MeshCore) {
    if h.is_null() {
        return;
    }
    let core = unsafe { Box::from_raw(h) };
    core.daemon.stop();
}

/// Start (or restart) the worker. Returns 0, or -2 if h is null.
#[no_mangle]
pub extern "C" fn meshcore_start(h: *mut MeshCore) -> c_int {
    match core(h) {
        Some(c) => result_code(c.daemon.start()),
        None => MeshError::InvalidParameter.code(),
    }
}

/// Stop the worker; queued events are discarded. Idempotent. Must not be called from a callback.
#[no_mangle]
pub extern "C" fn meshcore_stop(h: *mut MeshCore) {
    if let Some(c) = core(h) {
        c.daemon.stop();
    }
}

/// False if h is null.
#[no_mangle]
pub extern "C" fn meshcore_is_running(h: *const MeshCore) -> bool {
    core(h).map(|c| c.daemon.is_running()).unwrap_or(false)
}

/// Replace the registered callbacks. Null `callbacks` (or all-null members) unregisters.
/// Callbacks run on the worker thread; string and byte arguments are valid only for the call.
#[no_mangle]
pub extern "C" fn meshcore_set_callbacks(
    h: *mut MeshCore,
    callbacks: *const MeshcoreCallbacks,
) -> c_int {
    let Some(c) = core(h) else {
        return MeshError::InvalidParameter.code();
    };
    let cb = match unsafe { callbacks.as_ref() } {
        Some(cbs) => cbs.to_callbacks(),
        None => Callbacks::new(),
    };
    c.daemon.set_callbacks(cb);
    MESHCORE_OK
}

/// Attach (enabled) or detach the loopback transport.
#[no_mangle]
pub extern "C" fn meshcore_use_loopback(h: *mut MeshCore, enabled: bool) -> c_int {
    let Some(c) = core(h) else {
        return MeshError::InvalidParameter.code();
    };
    if enabled {
        c.daemon.use_loopback();
    } else {
        c.daemon.set_transport(None);
    }
    MESHCORE_OK
}

/// Queue a message for peer_id. Returns 0, -1 not running, -2 null/empty, -3 too long.
#[no_mangle]
pub extern "C" fn meshcore_send_message(
    h: *mut MeshCore,
    peer_id: u64,
    data: *const u8,
    len: usize,
) -> c_int {
    let (Some(c), Some(bytes)) = (core(h), payload(data, len)) else {
        return MeshError::InvalidParameter.code();
    };
    result_code(c.daemon.send_message(peer_id, bytes))
}

/// Send directly to the peer registered under uid. Same codes as send_message, plus -4 unknown uid.
#[no_mangle]
pub extern "C" fn meshcore_send_message_to_uid(
    h: *mut MeshCore,
    uid: *const c_char,
    data: *const u8,
    len: usize,
) -> c_int {
    let (Some(c), Some(uid), Some(bytes)) = (core(h), utf8(uid), payload(data, len)) else {
        return MeshError::InvalidParameter.code();
    };
    result_code(c.daemon.send_message_to_uid(uid, bytes))
}

/// Number of peers in the registry. 0 if h is null.
#[no_mangle]
pub extern "C" fn meshcore_get_peer_count(h: *const MeshCore) -> u32 {
    core(h)
        .map(|c| u32::try_from(c.daemon.peer_count()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Test injection: enqueue a PeerConnected. uid may be null (anonymous).
#[no_mangle]
pub extern "C" fn meshcore_simulate_peer_connect(
    h: *mut MeshCore,
    peer_id: u64,
    uid: *const c_char,
) -> c_int {
    let Some(c) = core(h) else {
        return MeshError::InvalidParameter.code();
    };
    let uid = if uid.is_null() {
        ""
    } else {
        match utf8(uid) {
            Some(s) => s,
            None => return MeshError::InvalidParameter.code(),
        }
    };
    accepted_code(c.daemon.simulate_peer_connect(peer_id, uid))
}

/// Test injection: enqueue a PeerDisconnected.
#[no_mangle]
pub extern "C" fn meshcore_simulate_peer_disconnect(h: *mut MeshCore, peer_id: u64) -> c_int {
    match core(h) {
        Some(c) => accepted_code(c.daemon.simulate_peer_disconnect(peer_id)),
        None => MeshError::InvalidParameter.code(),
    }
}

/// Test injection: enqueue a DataReceived from peer_id.
#[no_mangle]
pub extern "C" fn meshcore_simulate_message(
    h: *mut MeshCore,
    peer_id: u64,
    data: *const u8,
    len: usize,
) -> c_int {
    let (Some(c), Some(bytes)) = (core(h), payload(data, len)) else {
        return MeshError::InvalidParameter.code();
    };
    accepted_code(c.daemon.simulate_message(peer_id, bytes))
}

/// Static NUL-terminated description of a result code.
#[no_mangle]
pub extern "C" fn meshcore_error_string(code: c_int) -> *const c_char {
    let s: &'static [u8] = match code {
        0 => b"ok\0",
        -1 => b"daemon is not running\0",
        -2 => b"invalid parameter\0",
        -3 => b"message too long\0",
        -4 => b"peer not found\0",
        -6 => b"allocation failure\0",
        _ => b"unknown error\0",
    };
    s.as_ptr() as *const c_char
}

fn accepted_code(accepted: bool) -> c_int {
    if accepted {
        MESHCORE_OK
    } else {
        MeshError::NotRunning.code()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Log {
        messages: Mutex<Vec<(u64, String, Vec<u8>)>>,
        peers: Mutex<Vec<(u64, String, bool)>>,
        statuses: Mutex<Vec<(c_int, String)>>,
    }

    fn log_of<'a>(ud: *mut c_void) -> &'a Log {
        unsafe { &*(ud as *const Log) }
    }

    extern "C" fn on_message(
        ud: *mut c_void,
        peer_id: u64,
        uid: *const c_char,
        data: *const u8,
        len: usize,
        _ts: i64,
    ) {
        let uid = unsafe { CStr::from_ptr(uid) }.to_string_lossy().into_owned();
        let data = unsafe { slice::from_raw_parts(data, len) }.to_vec();
        log_of(ud).messages.lock().unwrap().push((peer_id, uid, data));
    }

    extern "C" fn on_status(ud: *mut c_void, status: c_int, message: *const c_char) {
        let message = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
        log_of(ud).statuses.lock().unwrap().push((status, message));
    }

    extern "C" fn on_peer(ud: *mut c_void, peer_id: u64, uid: *const c_char, connected: bool) {
        let uid = unsafe { CStr::from_ptr(uid) }.to_string_lossy().into_owned();
        log_of(ud).peers.lock().unwrap().push((peer_id, uid, connected));
    }

    fn register(h: *mut MeshCore, log: &Log) {
        let cbs = MeshcoreCallbacks {
            on_message: Some(on_message),
            on_status: Some(on_status),
            on_peer: Some(on_peer),
            user_data: log as *const Log as *mut c_void,
        };
        assert_eq!(meshcore_set_callbacks(h, &cbs), MESHCORE_OK);
    }

    fn settle(h: *mut MeshCore) {
        assert!(core(h).unwrap().daemon.wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn create_is_running_destroy() {
        let h = meshcore_create();
        assert!(!h.is_null());
        assert!(meshcore_is_running(h));
        meshcore_stop(h);
        assert!(!meshcore_is_running(h));
        meshcore_stop(h);
        assert_eq!(meshcore_start(h), MESHCORE_OK);
        assert!(meshcore_is_running(h));
        meshcore_destroy(h);
    }

    #[test]
    fn null_handle_is_tolerated() {
        let null = ptr::null_mut();
        meshcore_destroy(null);
        meshcore_stop(null);
        assert!(!meshcore_is_running(null));
        assert_eq!(meshcore_get_peer_count(null), 0);
        assert_eq!(meshcore_start(null), -2);
        assert_eq!(meshcore_send_message(null, 1, b"x".as_ptr(), 1), -2);
        assert_eq!(meshcore_set_callbacks(null, ptr::null()), -2);
        assert_eq!(meshcore_simulate_peer_connect(null, 1, ptr::null()), -2);
    }

    #[test]
    fn send_message_codes() {
        let h = meshcore_create();
        let max = crate::config::DEFAULT_MAX_MESSAGE_LEN;
        let buf = vec![1u8; max + 1];
        assert_eq!(meshcore_send_message(h, 1, buf.as_ptr(), max), MESHCORE_OK);
        assert_eq!(meshcore_send_message(h, 1, buf.as_ptr(), max + 1), -3);
        assert_eq!(meshcore_send_message(h, 1, buf.as_ptr(), 0), -2);
        assert_eq!(meshcore_send_message(h, 1, ptr::null(), 4), -2);
        meshcore_stop(h);
        assert_eq!(meshcore_send_message(h, 1, buf.as_ptr(), 1), -1);
        meshcore_destroy(h);
    }

    #[test]
    fn callbacks_and_peer_count() {
        let log = Log::default();
        let h = meshcore_create();
        register(h, &log);
        let uid = CString::new("alice").unwrap();
        assert_eq!(meshcore_simulate_peer_connect(h, 9, uid.as_ptr()), MESHCORE_OK);
        assert_eq!(meshcore_simulate_message(h, 9, b"hey".as_ptr(), 3), MESHCORE_OK);
        settle(h);
        assert_eq!(meshcore_get_peer_count(h), 1);
        assert_eq!(meshcore_simulate_peer_disconnect(h, 9), MESHCORE_OK);
        settle(h);
        assert_eq!(meshcore_get_peer_count(h), 0);
        meshcore_destroy(h);

        assert_eq!(*log.messages.lock().unwrap(), vec![(9, "alice".to_string(), b"hey".to_vec())]);
        assert_eq!(
            *log.peers.lock().unwrap(),
            vec![(9, "alice".to_string(), true), (9, "alice".to_string(), false)]
        );
        assert_eq!(*log.statuses.lock().unwrap(), vec![(0, "stopped".to_string())]);
    }

    #[test]
    fn send_to_uid_over_loopback() {
        let log = Log::default();
        let h = meshcore_create();
        register(h, &log);
        assert_eq!(meshcore_use_loopback(h, true), MESHCORE_OK);
        let uid = CString::new("bob").unwrap();
        let missing = CString::new("nobody").unwrap();
        meshcore_simulate_peer_connect(h, 2, uid.as_ptr());
        settle(h);
        assert_eq!(meshcore_send_message_to_uid(h, missing.as_ptr(), b"x".as_ptr(), 1), -4);
        assert_eq!(meshcore_send_message_to_uid(h, ptr::null(), b"x".as_ptr(), 1), -2);
        assert_eq!(meshcore_send_message_to_uid(h, uid.as_ptr(), b"echo".as_ptr(), 4), MESHCORE_OK);
        settle(h);
        assert_eq!(*log.messages.lock().unwrap(), vec![(2, "bob".to_string(), b"echo".to_vec())]);
        meshcore_destroy(h);
    }

    #[test]
    fn null_callbacks_unregister() {
        let log = Log::default();
        let h = meshcore_create();
        register(h, &log);
        assert_eq!(meshcore_set_callbacks(h, ptr::null()), MESHCORE_OK);
        meshcore_simulate_peer_connect(h, 1, ptr::null());
        settle(h);
        meshcore_destroy(h);
        assert!(log.peers.lock().unwrap().is_empty());
        assert!(log.statuses.lock().unwrap().is_empty());
    }

    #[test]
    fn version_and_error_strings() {
        let v = unsafe { CStr::from_ptr(meshcore_version()) }.to_str().unwrap();
        assert_eq!(v, env!("CARGO_PKG_VERSION"));
        let e = unsafe { CStr::from_ptr(meshcore_error_string(-3)) }.to_str().unwrap();
        assert_eq!(e, "message too long");
        let e = unsafe { CStr::from_ptr(meshcore_error_string(-5)) }.to_str().unwrap();
        assert_eq!(e, "unknown error");
    }
}
