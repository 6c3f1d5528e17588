use std::path::Path;

use log::debug;
#[cfg(not(unix))]
use log::warn;
use os_api::{IoPriority, IoPriorityBackend, MountEntry, MountSource, OS};

use crate::config::ProbeConfig;
use crate::filesystem::{filesystem_for_path, FsTypeFilter};
use crate::ProbeError;

/// Entry point for hosts: mount listing and I/O priority behind one value.
///
/// Every call goes to the OS; nothing is cached between calls.
pub struct Probe {
    mounts: Box<dyn MountSource>,
    priority: Box<dyn IoPriorityBackend>,
    exclude: FsTypeFilter,
}

impl Default for Probe {
    fn default() -> Self {
        Probe::with_sources(OS::mount_source(), OS::priority_backend())
    }
}

impl Probe {
    /// Platform defaults, no filesystem type exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from the config file next to the executable, or from defaults
    /// when there is none.
    pub fn from_default_config() -> Result<Self, ProbeError> {
        Self::from_config(&ProbeConfig::load())
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        Ok(Probe {
            mounts: mount_source_for(config),
            priority: Box::new(OS::priority_backend()),
            exclude: config.fs_type_filter()?,
        })
    }

    pub fn with_sources<M, P>(mounts: M, priority: P) -> Self
    where
        M: MountSource + 'static,
        P: IoPriorityBackend + 'static,
    {
        Probe {
            mounts: Box::new(mounts),
            priority: Box::new(priority),
            exclude: FsTypeFilter::default(),
        }
    }

    pub fn excluding(mut self, filter: FsTypeFilter) -> Self {
        self.exclude = filter;
        self
    }

    /// Lists mounted filesystems in OS order.
    ///
    /// `Ok(None)` on platforms with no mount listing. An empty list means
    /// nothing could be determined, which includes an unreadable mount table.
    pub fn list_mounts(&self) -> Result<Option<Vec<MountEntry>>, ProbeError> {
        let Some(mut mounts) = self.mounts.list()? else {
            return Ok(None);
        };
        let removed = self.exclude.apply(&mut mounts);
        if removed > 0 {
            debug!("{} mounts excluded by filesystem type", removed);
        }
        Ok(Some(mounts))
    }

    /// The listed mount holding `path`, if any.
    pub fn filesystem_for(&self, path: impl AsRef<Path>) -> Result<Option<MountEntry>, ProbeError> {
        let Some(mounts) = self.list_mounts()? else {
            return Ok(None);
        };
        Ok(filesystem_for_path(&mounts, path.as_ref()).cloned())
    }

    pub fn get_io_priority(&self) -> Result<Option<IoPriority>, ProbeError> {
        Ok(self.priority.get()?)
    }

    /// Changes the I/O priority of the process's main thread, the one whose
    /// thread id equals the process id. Other threads, including the caller
    /// when it is not the main thread, keep their own class. `Ok(false)` when
    /// the platform cannot apply it.
    pub fn set_io_priority(&self, priority: IoPriority) -> Result<bool, ProbeError> {
        Ok(self.priority.set(priority)?)
    }

    /// Same as [`Probe::set_io_priority`] for a raw level: 0 realtime,
    /// 1 normal, 2 idle. Anything else is rejected before the OS is asked.
    pub fn set_io_priority_level(&self, level: i64) -> Result<bool, ProbeError> {
        Ok(os_api::set_io_priority_level(&self.priority, level)?)
    }
}

#[cfg(unix)]
fn mount_source_for(config: &ProbeConfig) -> Box<dyn MountSource> {
    use std::path::PathBuf;

    use os_api::{SkipVerify, TableFileMountSource, DEFAULT_MOUNT_TABLE};

    let table = config
        .mount_table
        .clone()
        .or_else(|| cfg!(target_os = "linux").then(|| PathBuf::from(DEFAULT_MOUNT_TABLE)));
    match table {
        Some(table) if config.verify_mounts => Box::new(TableFileMountSource::new(table)),
        Some(table) => Box::new(TableFileMountSource::with_verifier(table, SkipVerify)),
        None => Box::new(OS::mount_source()),
    }
}

#[cfg(not(unix))]
fn mount_source_for(config: &ProbeConfig) -> Box<dyn MountSource> {
    if let Some(table) = &config.mount_table {
        warn!("mount table {:?} ignored on this platform", table);
    }
    Box::new(OS::mount_source())
}
