use std::io;

use thiserror::Error;

/// Failures raised by the platform layer.
///
/// An unsupported platform is not an error: callers get `Ok(None)` or
/// `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum OsError {
    /// Priority level outside the three defined values.
    #[error("invalid I/O priority level {0}, expected 0 (realtime), 1 (normal) or 2 (idle)")]
    InvalidArgument(i64),
    /// The record buffer for mount enumeration could not be reserved.
    #[error("cannot allocate room for {requested} mount records")]
    ResourceExhaustion { requested: usize },
    /// The kernel reported an I/O scheduling class we have no mapping for.
    #[error("unknown I/O scheduling class {0}")]
    UnknownPriorityClass(u32),
    #[error("{call} failed: {source}")]
    Syscall {
        call: &'static str,
        #[source]
        source: io::Error,
    },
}

impl OsError {
    pub(crate) fn last_os_error(call: &'static str) -> Self {
        OsError::Syscall {
            call,
            source: io::Error::last_os_error(),
        }
    }
}
