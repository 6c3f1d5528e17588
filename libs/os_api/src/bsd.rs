// bsd_platform_ops.rs: macOS, FreeBSD and OpenBSD share getfsstat(2);
// NetBSD has the same call as getvfsstat(2) over `struct statvfs`.

use std::mem::size_of;

use libc::MNT_NOWAIT;
#[cfg(not(target_os = "netbsd"))]
use libc::{getfsstat as fs_stat, statfs as fs_record};
#[cfg(target_os = "netbsd")]
use libc::{getvfsstat as fs_stat, statvfs as fs_record};

use crate::mount::{c_chars_to_string, collect_counted};
use crate::unsupported::UnsupportedPriorityBackend;
use crate::{IoPriority, IoPriorityBackend, MountEntry, MountSource, OsError};

pub struct OS;

impl OS {
    pub fn mount_source() -> SyscallMountSource {
        SyscallMountSource
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

/// Asks the kernel for its mount list with `getfsstat(2)` (`getvfsstat(2)`
/// on NetBSD).
#[derive(Debug, Default, Clone, Copy)]
pub struct SyscallMountSource;

impl MountSource for SyscallMountSource {
    fn list(&self) -> Result<Option<Vec<MountEntry>>, OsError> {
        let fetch = |buf: *mut fs_record, capacity: usize| {
            let bufsize = capacity * size_of::<fs_record>();
            unsafe { fs_stat(buf, bufsize as _, MNT_NOWAIT) }
        };
        let to_entry = |r: &fs_record| {
            MountEntry::new(
                c_chars_to_string(&r.f_mntfromname),
                c_chars_to_string(&r.f_mntonname),
                c_chars_to_string(&r.f_fstypename),
            )
        };
        // The kernel fills at most `bufsize` bytes and returns the record count.
        let mounts = unsafe { collect_counted(fetch, to_entry) }?;
        Ok(Some(mounts))
    }
}
