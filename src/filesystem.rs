use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;
use os_api::MountEntry;
use regex::Regex;

use crate::ProbeError;

/// Kernel-provided filesystems that hold no user data.
const PSEUDO_FS_TYPES: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup2?",
    "configfs",
    "debugfs",
    "devfs",
    "devpts",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "proc",
    "pstore",
    "rpc_pipefs",
    "securityfs",
    "selinuxfs",
    "sysfs",
    "tracefs",
];

static PSEUDO_FILESYSTEMS: Lazy<FsTypeFilter> = Lazy::new(|| {
    FsTypeFilter::new(PSEUDO_FS_TYPES.iter().copied())
        .expect("built-in pseudo filesystem patterns must compile")
});

/// Drops mounts whose filesystem type matches any of a set of patterns.
///
/// Each pattern must match the whole type name, so `ext` does not exclude
/// `ext4`.
#[derive(Debug, Clone, Default)]
pub struct FsTypeFilter {
    patterns: Vec<Regex>,
}

impl FsTypeFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, ProbeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(&format!("^(?:{p})$")).map_err(|source| ProbeError::Pattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FsTypeFilter { patterns })
    }

    /// The built-in set of pseudo filesystems (proc, sysfs, cgroup, ...).
    pub fn pseudo() -> &'static FsTypeFilter {
        &PSEUDO_FILESYSTEMS
    }

    pub fn extend(&mut self, other: &FsTypeFilter) {
        self.patterns.extend(other.patterns.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn excludes(&self, fs_type: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(fs_type))
    }

    /// Removes excluded entries in place and returns how many went.
    pub fn apply(&self, mounts: &mut Vec<MountEntry>) -> usize {
        if self.is_empty() {
            return 0;
        }
        let before = mounts.len();
        mounts.retain(|m| {
            let excluded = self.excludes(m.fs_type());
            if excluded {
                debug!(
                    "excluding {} on {}: {} filesystem",
                    m.device(),
                    m.mount_point(),
                    m.fs_type()
                );
            }
            !excluded
        });
        before - mounts.len()
    }
}

/// Finds the mount that holds `path`.
///
/// The deepest mount point wins; among entries on the same mount point the
/// one listed last is the one on top.
pub fn filesystem_for_path<'a>(mounts: &'a [MountEntry], path: &Path) -> Option<&'a MountEntry> {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    mounts
        .iter()
        .filter(|m| path.starts_with(m.mount_point()))
        .max_by_key(|m| Path::new(m.mount_point()).components().count())
}
