use std::sync::{Arc, Mutex};

use platform_probe::{
    FsTypeFilter, IoPriority, IoPriorityBackend, MountEntry, MountSource, OsError, Probe,
    ProbeConfig, UnsupportedMountSource, UnsupportedPriorityBackend,
};

struct FakeMounts(Vec<MountEntry>);

impl MountSource for FakeMounts {
    fn list(&self) -> Result<Option<Vec<MountEntry>>, OsError> {
        Ok(Some(self.0.clone()))
    }
}

/// Keeps the "OS" priority in memory and records every set.
#[derive(Clone, Default)]
struct FakeScheduler {
    current: Arc<Mutex<Option<IoPriority>>>,
    sets: Arc<Mutex<Vec<IoPriority>>>,
}

impl IoPriorityBackend for FakeScheduler {
    fn get(&self) -> Result<Option<IoPriority>, OsError> {
        Ok(*self.current.lock().unwrap())
    }

    fn set(&self, priority: IoPriority) -> Result<bool, OsError> {
        self.sets.lock().unwrap().push(priority);
        *self.current.lock().unwrap() = Some(priority);
        Ok(true)
    }
}

fn mount(device: &str, mount_point: &str, fs_type: &str) -> MountEntry {
    MountEntry::new(device, mount_point, fs_type).unwrap()
}

#[test]
fn lists_source_records_in_order() {
    let probe = Probe::with_sources(
        FakeMounts(vec![mount("/dev/sda1", "/", "ext4"), mount("tmpfs", "/tmp", "tmpfs")]),
        FakeScheduler::default(),
    );
    let mounts = probe.list_mounts().unwrap().unwrap();
    assert_eq!(
        mounts,
        vec![mount("/dev/sda1", "/", "ext4"), mount("tmpfs", "/tmp", "tmpfs")]
    );
}

#[test]
fn zero_mounts_is_an_empty_list() {
    let probe = Probe::with_sources(FakeMounts(Vec::new()), FakeScheduler::default());
    assert_eq!(probe.list_mounts().unwrap(), Some(Vec::new()));
}

#[test]
fn every_level_round_trips_through_the_backend() {
    let scheduler = FakeScheduler::default();
    let probe = Probe::with_sources(FakeMounts(Vec::new()), scheduler.clone());
    for p in IoPriority::ALL {
        assert!(probe.set_io_priority_level(p.level()).unwrap());
        assert_eq!(probe.get_io_priority().unwrap(), Some(p));
    }
    assert_eq!(scheduler.sets.lock().unwrap().len(), 3);
}

#[test]
fn out_of_range_levels_do_not_touch_the_os() {
    let scheduler = FakeScheduler::default();
    let probe = Probe::with_sources(FakeMounts(Vec::new()), scheduler.clone());
    for level in [3, -1] {
        let err = probe.set_io_priority_level(level).unwrap_err();
        assert!(err.is_invalid_argument());
    }
    assert!(scheduler.sets.lock().unwrap().is_empty());
    assert_eq!(probe.get_io_priority().unwrap(), None);
}

#[test]
fn unsupported_platform_answers_nothing() {
    let probe = Probe::with_sources(UnsupportedMountSource, UnsupportedPriorityBackend);
    assert_eq!(probe.list_mounts().unwrap(), None);
    assert_eq!(probe.filesystem_for("/").unwrap(), None);
    assert_eq!(probe.get_io_priority().unwrap(), None);
    assert!(!probe.set_io_priority(IoPriority::Idle).unwrap());
    assert!(probe.set_io_priority_level(7).unwrap_err().is_invalid_argument());
}

#[test]
fn excluded_types_are_dropped() {
    let probe = Probe::with_sources(
        FakeMounts(vec![
            mount("/dev/sda1", "/", "ext4"),
            mount("proc", "/proc", "proc"),
            mount("/dev/loop0", "/snap/core", "squashfs"),
        ]),
        FakeScheduler::default(),
    )
    .excluding(FsTypeFilter::new(["squashfs", "proc"]).unwrap());
    let mounts = probe.list_mounts().unwrap().unwrap();
    assert_eq!(mounts, vec![mount("/dev/sda1", "/", "ext4")]);
}

#[test]
fn filesystem_for_picks_the_deepest_mount() {
    let probe = Probe::with_sources(
        FakeMounts(vec![mount("/dev/sda1", "/", "ext4"), mount("/dev/sda2", "/home", "xfs")]),
        FakeScheduler::default(),
    );
    let fs = probe.filesystem_for("/home/user/file.txt").unwrap().unwrap();
    assert_eq!(fs.fs_type(), "xfs");
}

#[cfg(unix)]
mod table_file {
    use std::fs;

    use super::*;

    #[test]
    fn config_table_lists_only_reachable_mounts() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("live");
        fs::create_dir(&live).unwrap();
        let table = dir.path().join("mtab");
        fs::write(
            &table,
            format!(
                "/dev/sdb1 {} ext4 rw 0 0\n/dev/sdc1 {} ext4 rw 0 0\n",
                live.display(),
                dir.path().join("stale").display()
            ),
        )
        .unwrap();

        let config = ProbeConfig {
            mount_table: Some(table.clone()),
            ..ProbeConfig::default()
        };
        let mounts = Probe::from_config(&config).unwrap().list_mounts().unwrap().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].device(), "/dev/sdb1");

        let config = ProbeConfig {
            mount_table: Some(table),
            verify_mounts: false,
            ..ProbeConfig::default()
        };
        let mounts = Probe::from_config(&config).unwrap().list_mounts().unwrap().unwrap();
        assert_eq!(mounts.len(), 2);
    }

    #[test]
    fn missing_table_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProbeConfig {
            mount_table: Some(dir.path().join("no-such-mtab")),
            ..ProbeConfig::default()
        };
        let probe = Probe::from_config(&config).unwrap();
        assert_eq!(probe.list_mounts().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn bad_exclusion_pattern_fails_construction() {
        let config = ProbeConfig {
            exclude_fs_types: vec!["[".into()],
            ..ProbeConfig::default()
        };
        assert!(Probe::from_config(&config).is_err());
    }
}

#[cfg(target_os = "linux")]
#[test]
fn real_listing_has_no_empty_fields() {
    let Some(mounts) = Probe::new().list_mounts().unwrap() else {
        panic!("linux always has a mount listing");
    };
    for m in &mounts {
        assert!(!m.device().is_empty());
        assert!(!m.mount_point().is_empty());
        assert!(!m.fs_type().is_empty());
    }
}

#[test]
fn default_config_builds_a_working_facade() {
    let facade = Probe::from_default_config().unwrap();
    assert!(facade.set_io_priority_level(3).is_err());
}
