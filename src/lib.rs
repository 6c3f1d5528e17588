//! Mounted filesystem listing and I/O priority control for the current
//! process.
//!
//! Platform code lives in `os_api`; this crate adds configuration,
//! filesystem-type exclusion and path lookup on top.

mod config;
mod error;
mod filesystem;
mod probe;

pub use config::{ProbeConfig, CONFIG_FILE_NAME, CURRENT_CONFIG_VERSION};
pub use error::ProbeError;
pub use filesystem::{filesystem_for_path, FsTypeFilter};
pub use os_api::{
    IoPriority, IoPriorityBackend, MountEntry, MountSource, OsError, UnsupportedMountSource,
    UnsupportedPriorityBackend, OS,
};
#[cfg(unix)]
pub use os_api::{MountVerifier, SkipVerify, StatfsVerifier, TableFileMountSource, TableScan};
pub use probe::Probe;
