use serde::{Deserialize, Serialize};

use crate::OsError;

/// I/O scheduling level of the calling process.
///
/// The integer encoding (`Realtime = 0`, `Normal = 1`, `Idle = 2`) is what
/// hosts pass to [`IoPriority::try_from`]; the OS class behind each level is
/// decided by the platform backend.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum IoPriority {
    Realtime,
    Normal,
    Idle,
}

impl IoPriority {
    pub const ALL: [IoPriority; 3] = [IoPriority::Realtime, IoPriority::Normal, IoPriority::Idle];

    pub fn level(self) -> i64 {
        match self {
            IoPriority::Realtime => 0,
            IoPriority::Normal => 1,
            IoPriority::Idle => 2,
        }
    }
}

impl TryFrom<i64> for IoPriority {
    type Error = OsError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(IoPriority::Realtime),
            1 => Ok(IoPriority::Normal),
            2 => Ok(IoPriority::Idle),
            other => Err(OsError::InvalidArgument(other)),
        }
    }
}

/// Reads and writes the I/O priority of the current process.
///
/// Changes made through [`IoPriorityBackend::set`] are OS state, not
/// remembered in-process. Where the OS keeps the priority per thread (Linux),
/// the process id addresses the main thread only.
pub trait IoPriorityBackend: Send + Sync {
    /// `Ok(None)` when the platform cannot report a priority.
    fn get(&self) -> Result<Option<IoPriority>, OsError>;

    /// `Ok(false)` when the platform has no way to apply it.
    fn set(&self, priority: IoPriority) -> Result<bool, OsError>;
}

impl<B: IoPriorityBackend + ?Sized> IoPriorityBackend for Box<B> {
    fn get(&self) -> Result<Option<IoPriority>, OsError> {
        (**self).get()
    }

    fn set(&self, priority: IoPriority) -> Result<bool, OsError> {
        (**self).set(priority)
    }
}

/// Validates a raw host level and applies it.
///
/// The backend is not touched when `level` is out of range.
pub fn set_io_priority_level<B>(backend: &B, level: i64) -> Result<bool, OsError>
where
    B: IoPriorityBackend + ?Sized,
{
    let priority = IoPriority::try_from(level)?;
    backend.set(priority)
}
