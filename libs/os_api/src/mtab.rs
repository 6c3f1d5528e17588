// Mount table file reader (fstab(5) format, as used by /etc/mtab and /proc/mounts).

use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nix::sys::statfs::statfs;

use crate::{MountEntry, MountSource, OsError};

pub const DEFAULT_MOUNT_TABLE: &str = "/etc/mtab";

/// Confirms that a mount point from the table is live right now.
pub trait MountVerifier: Send + Sync {
    fn is_mounted(&self, mount_point: &Path) -> bool;
}

impl<F> MountVerifier for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_mounted(&self, mount_point: &Path) -> bool {
        self(mount_point)
    }
}

/// Accepts an entry when `statfs(2)` on its directory succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatfsVerifier;

impl MountVerifier for StatfsVerifier {
    fn is_mounted(&self, mount_point: &Path) -> bool {
        match statfs(mount_point) {
            Ok(_) => true,
            Err(errno) => {
                debug!("statfs {:?} failed: {}", mount_point, errno);
                false
            }
        }
    }
}

/// Trusts every table entry without touching the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipVerify;

impl MountVerifier for SkipVerify {
    fn is_mounted(&self, _mount_point: &Path) -> bool {
        true
    }
}

/// Result of one pass over a mount table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableScan {
    pub entries: Vec<MountEntry>,
    /// Well-formed entries dropped because verification failed.
    pub skipped: usize,
    /// Lines with a missing or empty device, directory or type.
    pub malformed: usize,
}

/// Lists mounts by reading a mount table file and checking each entry.
#[derive(Debug, Clone)]
pub struct TableFileMountSource<V = StatfsVerifier> {
    table: PathBuf,
    verifier: V,
}

impl TableFileMountSource<StatfsVerifier> {
    pub fn new(table: impl Into<PathBuf>) -> Self {
        Self::with_verifier(table, StatfsVerifier)
    }
}

impl Default for TableFileMountSource<StatfsVerifier> {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_TABLE)
    }
}

impl<V: MountVerifier> TableFileMountSource<V> {
    pub fn with_verifier(table: impl Into<PathBuf>, verifier: V) -> Self {
        TableFileMountSource {
            table: table.into(),
            verifier,
        }
    }

    /// Reads the table once. An unreadable table yields an empty scan.
    pub fn scan(&self) -> TableScan {
        let mut scan = TableScan::default();
        let content = match fs::read(&self.table) {
            Ok(content) => content,
            Err(e) => {
                warn!("cannot read mount table {:?}: {}", self.table, e);
                return scan;
            }
        };

        for line in content.split(|&b| b == b'\n') {
            let Some(fields) = split_fields(line) else {
                continue;
            };
            let Some((entry, dir)) = parse_fields(&fields) else {
                scan.malformed += 1;
                continue;
            };
            if !self.verifier.is_mounted(Path::new(OsStr::from_bytes(&dir))) {
                debug!(
                    "skipping {} on {}: mount point not reachable",
                    entry.device(),
                    entry.mount_point()
                );
                scan.skipped += 1;
                continue;
            }
            scan.entries.push(entry);
        }
        scan
    }
}

impl<V: MountVerifier> MountSource for TableFileMountSource<V> {
    fn list(&self) -> Result<Option<Vec<MountEntry>>, OsError> {
        let scan = self.scan();
        if scan.skipped > 0 || scan.malformed > 0 {
            debug!(
                "{:?}: {} mounts listed, {} unverifiable, {} malformed",
                self.table,
                scan.entries.len(),
                scan.skipped,
                scan.malformed
            );
        }
        Ok(Some(scan.entries))
    }
}

/// Splits a table line into whitespace-separated fields. Blank lines and
/// comments yield `None`.
fn split_fields(line: &[u8]) -> Option<Vec<&[u8]>> {
    let fields: Vec<&[u8]> = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|f| !f.is_empty())
        .collect();
    match fields.first() {
        None => None,
        Some(first) if first.starts_with(b"#") => None,
        Some(_) => Some(fields),
    }
}

/// Builds the entry and hands back the decoded mount directory as raw bytes,
/// which may not be valid UTF-8.
fn parse_fields(fields: &[&[u8]]) -> Option<(MountEntry, Vec<u8>)> {
    if fields.len() < 3 {
        return None;
    }
    let text = |raw: &[u8]| String::from_utf8_lossy(raw).into_owned();
    let dir = unescape(fields[1]);
    let entry = MountEntry::new(
        text(&unescape(fields[0])),
        text(&dir),
        text(&unescape(fields[2])),
    )?;
    let options = fields
        .get(3)
        .map(|opts| {
            String::from_utf8_lossy(opts)
                .split(',')
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some((entry.with_options(options), dir))
}

/// Decodes the `\NNN` octal escapes the kernel writes for spaces, tabs,
/// newlines and backslashes.
fn unescape(field: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(field.len());
    let mut i = 0;
    while i < field.len() {
        if field[i] == b'\\' && i + 3 < field.len() && is_octal_triplet(&field[i + 1..i + 4]) {
            let value = field[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(field[i]);
        i += 1;
    }
    out
}

fn is_octal_triplet(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}
