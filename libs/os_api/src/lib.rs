mod error;
mod mount;
mod process;
mod unsupported;

pub use error::OsError;
pub use mount::{MountEntry, MountSource};
pub use process::{IoPriority, IoPriorityBackend, set_io_priority_level};
pub use unsupported::{UnsupportedMountSource, UnsupportedPriorityBackend};

#[cfg(unix)]
mod mtab;
#[cfg(unix)]
pub use mtab::{
    DEFAULT_MOUNT_TABLE, MountVerifier, SkipVerify, StatfsVerifier, TableFileMountSource,
    TableScan,
};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
mod bsd;

// The platform's default sources, behind the same `OS` name everywhere
#[cfg(target_os = "linux")]
pub use linux::{OS, SyscallPriorityBackend};
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
pub use bsd::{OS, SyscallMountSource};
#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
)))]
pub use unsupported::OS;
