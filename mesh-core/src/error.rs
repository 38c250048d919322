//! Error taxonomy and the stable C result codes it maps to.

/// Result code for success at the C boundary.
pub const MESHCORE_OK: i32 = 0;

/// Errors returned synchronously at the call boundary. Nothing that reaches the queue fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("daemon is not running")]
    NotRunning,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("message too long: {len} bytes (max {max})")]
    MessageTooLong { len: usize, max: usize },
    #[error("peer not found")]
    PeerNotFound,
    #[error("allocation failure")]
    AllocationFailure,
    #[error("unknown error")]
    Unknown,
}

pub type MeshResult<T> = Result<T, MeshError>;

impl MeshError {
    /// C result code. -5 stays reserved (QueueFull in the mobile wrapper; the queue is unbounded).
    pub fn code(&self) -> i32 {
        match self {
            MeshError::NotRunning => -1,
            MeshError::InvalidParameter => -2,
            MeshError::MessageTooLong { .. } => -3,
            MeshError::PeerNotFound => -4,
            MeshError::AllocationFailure => -6,
            MeshError::Unknown => -99,
        }
    }
}

/// Collapse a result into its C code.
pub fn result_code(r: MeshResult<()>) -> i32 {
    match r {
        Ok(()) => MESHCORE_OK,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wrapper_enum() {
        assert_eq!(MeshError::NotRunning.code(), -1);
        assert_eq!(MeshError::InvalidParameter.code(), -2);
        assert_eq!(MeshError::MessageTooLong { len: 5000, max: 4096 }.code(), -3);
        assert_eq!(MeshError::PeerNotFound.code(), -4);
        assert_eq!(MeshError::Unknown.code(), -99);
    }

    #[test]
    fn result_code_ok_is_zero() {
        assert_eq!(result_code(Ok(())), MESHCORE_OK);
        assert_eq!(result_code(Err(MeshError::PeerNotFound)), -4);
    }

    #[test]
    fn too_long_display_has_sizes() {
        let e = MeshError::MessageTooLong { len: 4097, max: 4096 };
        assert_eq!(e.to_string(), "message too long: 4097 bytes (max 4096)");
    }
}
