use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::filesystem::FsTypeFilter;
use crate::ProbeError;

/// Current version of the config file schema
pub const CURRENT_CONFIG_VERSION: u32 = 1;

pub const CONFIG_FILE_NAME: &str = "platform-probe.json";

/// Settings for a [`crate::Probe`], stored as JSON.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Version of the config schema
    #[serde(default = "current_config_version")]
    pub version: u32,
    /// Mount table to read instead of the platform default. Only honored on
    /// unix systems.
    #[serde(default)]
    pub mount_table: Option<PathBuf>,
    /// Check each mount table entry with `statfs` before listing it.
    #[serde(default = "default_verify_mounts")]
    pub verify_mounts: bool,
    /// Filesystem type patterns to leave out of listings.
    #[serde(default)]
    pub exclude_fs_types: Vec<String>,
    /// Also leave out proc, sysfs, cgroup and similar kernel filesystems.
    #[serde(default)]
    pub skip_pseudo_filesystems: bool,
}

fn current_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_verify_mounts() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            version: CURRENT_CONFIG_VERSION,
            mount_table: None,
            verify_mounts: true,
            exclude_fs_types: Vec::new(),
            skip_pseudo_filesystems: false,
        }
    }
}

impl ProbeConfig {
    /// `platform-probe.json` next to the running executable.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .map(|mut p| {
                p.set_file_name(CONFIG_FILE_NAME);
                p
            })
            .unwrap_or_else(|_| CONFIG_FILE_NAME.into())
    }

    /// Loads [`ProbeConfig::default_path`], with the same fallbacks as
    /// [`ProbeConfig::load_from_path`].
    pub fn load() -> ProbeConfig {
        Self::load_from_path(&Self::default_path())
    }

    /// Loads the config, falling back to defaults if the file is missing,
    /// unreadable, malformed or from an unknown schema version.
    pub fn load_from_path(path: &Path) -> ProbeConfig {
        match Self::try_load_from_path(path) {
            Ok(config) => config,
            Err(ProbeError::ConfigIo { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                info!("no config at {:?}, using defaults", path);
                ProbeConfig::default()
            }
            Err(e) => {
                warn!("{}; using defaults", e);
                ProbeConfig::default()
            }
        }
    }

    pub fn try_load_from_path(path: &Path) -> Result<ProbeConfig, ProbeError> {
        let data = fs::read_to_string(path).map_err(|source| ProbeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let format_err = |source: serde_json::Error| ProbeError::ConfigFormat {
            path: path.to_path_buf(),
            source,
        };

        #[derive(Deserialize)]
        struct VersionCheck {
            pub version: Option<u32>,
        }

        let v_check: VersionCheck = serde_json::from_str(&data).map_err(format_err)?;
        match v_check.version {
            Some(CURRENT_CONFIG_VERSION) | None => {
                serde_json::from_str(&data).map_err(format_err)
            }
            Some(other) => {
                warn!(
                    "config {:?} has schema version {}, expected {}; using defaults",
                    path, other, CURRENT_CONFIG_VERSION
                );
                Ok(ProbeConfig::default())
            }
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ProbeError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ProbeError::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ProbeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compiles the exclusion patterns, adding the pseudo filesystem preset
    /// when asked to.
    pub fn fs_type_filter(&self) -> Result<FsTypeFilter, ProbeError> {
        let mut filter = FsTypeFilter::new(&self.exclude_fs_types)?;
        if self.skip_pseudo_filesystems {
            filter.extend(FsTypeFilter::pseudo());
        }
        Ok(filter)
    }
}
