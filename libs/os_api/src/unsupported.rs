use log::debug;

use crate::{IoPriority, IoPriorityBackend, MountEntry, MountSource, OsError};

/// Mount source for platforms without a mount listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedMountSource;

impl MountSource for UnsupportedMountSource {
    fn list(&self) -> Result<Option<Vec<MountEntry>>, OsError> {
        Ok(None)
    }
}

/// Accepts every request and applies none of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPriorityBackend;

impl IoPriorityBackend for UnsupportedPriorityBackend {
    fn get(&self) -> Result<Option<IoPriority>, OsError> {
        Ok(None)
    }

    fn set(&self, priority: IoPriority) -> Result<bool, OsError> {
        debug!("I/O priority {:?} not available on this platform", priority);
        Ok(false)
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
)))]
pub struct OS;

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
)))]
impl OS {
    pub fn mount_source() -> UnsupportedMountSource {
        UnsupportedMountSource
    }

    pub fn priority_backend() -> UnsupportedPriorityBackend {
        UnsupportedPriorityBackend
    }

    pub fn list_mounts() -> Result<Option<Vec<MountEntry>>, OsError> {
        Self::mount_source().list()
    }

    pub fn get_io_priority() -> Result<Option<IoPriority>, OsError> {
        Self::priority_backend().get()
    }

    pub fn set_io_priority(priority: IoPriority) -> Result<bool, OsError> {
        Self::priority_backend().set(priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_io_priority_level;

    #[test]
    fn reports_nothing() {
        assert_eq!(UnsupportedMountSource.list().unwrap(), None);
        assert_eq!(UnsupportedPriorityBackend.get().unwrap(), None);
    }

    #[test]
    fn set_is_a_no_op_but_still_validates() {
        assert!(!set_io_priority_level(&UnsupportedPriorityBackend, 1).unwrap());
        assert!(matches!(
            set_io_priority_level(&UnsupportedPriorityBackend, 3),
            Err(OsError::InvalidArgument(3))
        ));
    }
}
