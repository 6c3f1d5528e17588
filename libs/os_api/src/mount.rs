use std::os::raw::{c_char, c_int};
use std::ptr::null_mut;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::OsError;

/// Extra records reserved past the reported count, for mounts that appear
/// between the counting and the fill call.
pub(crate) const MOUNT_SLACK: usize = 4;

/// One mounted filesystem as reported by the OS at query time.
///
/// Device, mount point and type are never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMountEntry")]
pub struct MountEntry {
    device: String,
    #[serde(rename = "mount")]
    mount_point: String,
    #[serde(rename = "type")]
    fs_type: String,
    /// Mount options, when the source reports them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
}

/// Wire shape of [`MountEntry`], checked before it becomes one.
#[derive(Deserialize)]
struct RawMountEntry {
    device: String,
    mount: String,
    #[serde(rename = "type")]
    fs_type: String,
    #[serde(default)]
    options: Vec<String>,
}

impl TryFrom<RawMountEntry> for MountEntry {
    type Error = String;

    fn try_from(raw: RawMountEntry) -> Result<Self, Self::Error> {
        MountEntry::new(raw.device, raw.mount, raw.fs_type)
            .map(|entry| entry.with_options(raw.options))
            .ok_or_else(|| "device, mount and type must not be empty".to_string())
    }
}

impl MountEntry {
    /// Returns `None` if any of the three fields is empty.
    pub fn new(
        device: impl Into<String>,
        mount_point: impl Into<String>,
        fs_type: impl Into<String>,
    ) -> Option<Self> {
        let (device, mount_point, fs_type) = (device.into(), mount_point.into(), fs_type.into());
        if device.is_empty() || mount_point.is_empty() || fs_type.is_empty() {
            return None;
        }
        Some(MountEntry {
            device,
            mount_point,
            fs_type,
            options: Vec::new(),
        })
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    pub fn fs_type(&self) -> &str {
        &self.fs_type
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// Something that can enumerate the mounted filesystems.
pub trait MountSource: Send + Sync {
    /// Lists the current mounts in the order the OS reports them.
    ///
    /// `Ok(None)` means the platform has no way to answer. An empty list
    /// means "nothing could be determined", not necessarily zero mounts.
    fn list(&self) -> Result<Option<Vec<MountEntry>>, OsError>;
}

impl<S: MountSource + ?Sized> MountSource for Box<S> {
    fn list(&self) -> Result<Option<Vec<MountEntry>>, OsError> {
        (**self).list()
    }
}

/// Count-then-fill over a `getfsstat(2)`-style call.
///
/// `fetch(buf, capacity)` is first called with a null buffer to get the
/// record count, then with room for that many records plus
/// [`MOUNT_SLACK`]. A count `<= 0` from the first call or a negative one
/// from the second yields an empty list.
///
/// # Safety
///
/// When handed a non-null buffer, `fetch` must initialize the first `n`
/// records it returns (or all `capacity` of them, if `n` is larger).
#[cfg_attr(
    not(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    )),
    allow(dead_code)
)]
pub(crate) unsafe fn collect_counted<R, F, E>(
    mut fetch: F,
    extract: E,
) -> Result<Vec<MountEntry>, OsError>
where
    F: FnMut(*mut R, usize) -> c_int,
    E: Fn(&R) -> Option<MountEntry>,
{
    let count = fetch(null_mut(), 0);
    if count <= 0 {
        debug!("mount count call reported {}", count);
        return Ok(Vec::new());
    }

    let capacity = count as usize + MOUNT_SLACK;
    let mut records: Vec<R> = Vec::new();
    records
        .try_reserve_exact(capacity)
        .map_err(|_| OsError::ResourceExhaustion {
            requested: capacity,
        })?;

    let filled = fetch(records.as_mut_ptr(), capacity);
    if filled < 0 {
        warn!("mount listing failed: {}", std::io::Error::last_os_error());
        return Ok(Vec::new());
    }
    unsafe { records.set_len((filled as usize).min(capacity)) };

    Ok(records.iter().filter_map(|r| extract(r)).collect())
}

/// Copies a fixed-size C string field, stopping at the first NUL or at the
/// end of the array, whichever comes first.
#[cfg_attr(
    not(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    )),
    allow(dead_code)
)]
pub(crate) fn c_chars_to_string(field: &[c_char]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
