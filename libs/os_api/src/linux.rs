// linux_platform_ops.rs

use libc::{SYS_ioprio_get, SYS_ioprio_set, c_int, c_long, syscall};
use log::{debug, info};
use nix::unistd::getpid;

use crate::mtab::TableFileMountSource;
use crate::{IoPriority, IoPriorityBackend, MountEntry, MountSource, OsError};

// <uapi/linux/ioprio.h>
const IOPRIO_CLASS_SHIFT: u32 = 13;
const IOPRIO_PRIO_MASK: c_int = (1 << IOPRIO_CLASS_SHIFT) - 1;
const IOPRIO_WHO_PROCESS: c_int = 1;

const IOPRIO_CLASS_NONE: u32 = 0;
const IOPRIO_CLASS_RT: u32 = 1;
const IOPRIO_CLASS_BE: u32 = 2;
const IOPRIO_CLASS_IDLE: u32 = 3;

/// Priority data used for the best-effort class when none is requested.
const IOPRIO_BE_DEFAULT: c_int = 4;
/// Highest urgency inside the realtime class.
const IOPRIO_RT_HIGHEST: c_int = 7;

pub struct OS;

impl OS {
    pub fn mount_source() -> TableFileMountSource {
        TableFileMountSource::default()
    }

    pub fn priority_backend() -> SyscallPriorityBackend {
        SyscallPriorityBackend
    }

    /// Lists mounts from `/etc/mtab`, keeping only entries whose directory
    /// answers `statfs`.
    pub fn list_mounts() -> Result<Option<Vec<MountEntry>>, OsError> {
        Self::mount_source().list()
    }

    pub fn get_io_priority() -> Result<Option<IoPriority>, OsError> {
        Self::priority_backend().get()
    }

    /// Changes the I/O class of the main thread (thread id == pid). Other
    /// threads keep theirs, and so does the caller if it is one of them.
    pub fn set_io_priority(priority: IoPriority) -> Result<bool, OsError> {
        Self::priority_backend().set(priority)
    }
}

/// `ioprio_get(2)` / `ioprio_set(2)` with `IOPRIO_WHO_PROCESS` and
/// `getpid()`.
///
/// The kernel keeps the class per thread and reads that id as a thread id,
/// so both calls act on the main thread alone. Threads already running keep
/// their class, whichever thread makes the call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyscallPriorityBackend;

impl IoPriorityBackend for SyscallPriorityBackend {
    fn get(&self) -> Result<Option<IoPriority>, OsError> {
        let pid = getpid().as_raw();
        let ret = unsafe { syscall(SYS_ioprio_get, IOPRIO_WHO_PROCESS, pid) };
        if ret < 0 {
            return Err(OsError::last_os_error("ioprio_get"));
        }
        let class = ioprio_class(ret);
        debug!("ioprio_get for pid {} gave {} (class {})", pid, ret, class);
        priority_from_class(class).map(Some)
    }

    fn set(&self, priority: IoPriority) -> Result<bool, OsError> {
        let pid = getpid().as_raw();
        let (class, data) = class_and_data(priority);
        let value = ioprio_value(class, data);
        let ret = unsafe { syscall(SYS_ioprio_set, IOPRIO_WHO_PROCESS, pid, value) };
        if ret < 0 {
            return Err(OsError::last_os_error("ioprio_set"));
        }
        info!(
            "I/O priority of pid {} set to {:?} (class {}, data {})",
            pid, priority, class, data
        );
        Ok(true)
    }
}

fn ioprio_value(class: u32, data: c_int) -> c_int {
    ((class as c_int) << IOPRIO_CLASS_SHIFT) | (data & IOPRIO_PRIO_MASK)
}

fn ioprio_class(value: c_long) -> u32 {
    (value >> IOPRIO_CLASS_SHIFT) as u32
}

fn class_and_data(priority: IoPriority) -> (u32, c_int) {
    match priority {
        IoPriority::Idle => (IOPRIO_CLASS_IDLE, 0),
        IoPriority::Normal => (IOPRIO_CLASS_BE, IOPRIO_BE_DEFAULT),
        IoPriority::Realtime => (IOPRIO_CLASS_RT, IOPRIO_RT_HIGHEST),
    }
}

fn priority_from_class(class: u32) -> Result<IoPriority, OsError> {
    match class {
        IOPRIO_CLASS_NONE | IOPRIO_CLASS_IDLE => Ok(IoPriority::Idle),
        IOPRIO_CLASS_BE => Ok(IoPriority::Normal),
        IOPRIO_CLASS_RT => Ok(IoPriority::Realtime),
        other => Err(OsError::UnknownPriorityClass(other)),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn encodes_class_and_data() {
        assert_eq!(ioprio_value(IOPRIO_CLASS_IDLE, 0), 3 << 13);
        assert_eq!(ioprio_value(IOPRIO_CLASS_BE, 4), (2 << 13) | 4);
        assert_eq!(ioprio_value(IOPRIO_CLASS_RT, 7), (1 << 13) | 7);
    }

    #[test]
    fn every_level_decodes_back() {
        for p in IoPriority::ALL {
            let (class, data) = class_and_data(p);
            let value = ioprio_value(class, data) as c_long;
            assert_eq!(priority_from_class(ioprio_class(value)).unwrap(), p);
        }
    }

    #[test]
    fn no_class_reads_as_idle() {
        assert_eq!(priority_from_class(IOPRIO_CLASS_NONE).unwrap(), IoPriority::Idle);
    }

    #[test]
    fn unknown_class_is_an_error() {
        assert!(matches!(
            priority_from_class(5),
            Err(OsError::UnknownPriorityClass(5))
        ));
    }

    // The kernel lets unprivileged callers pick idle and best-effort; some
    // sandboxes refuse the syscall outright, in which case there is nothing to check.
    #[test]
    #[serial]
    fn set_then_get_round_trips() {
        let backend = OS::priority_backend();
        if backend.get().is_err() {
            return;
        }
        // Ends on best-effort so the rest of the test binary is not starved.
        for p in [IoPriority::Idle, IoPriority::Normal] {
            if backend.set(p).is_err() {
                return;
            }
            assert_eq!(backend.get().unwrap(), Some(p));
        }
    }

    /// Raw ioprio value of the calling thread (`who == 0`).
    fn own_thread_ioprio() -> c_long {
        unsafe { syscall(SYS_ioprio_get, IOPRIO_WHO_PROCESS, 0) }
    }

    #[test]
    #[serial]
    fn set_reaches_the_main_thread_only() {
        let backend = OS::priority_backend();
        if backend.get().is_err() {
            return;
        }
        let caller_before = own_thread_ioprio();
        let worker = std::thread::spawn(move || {
            let before = own_thread_ioprio();
            let applied = backend.set(IoPriority::Idle);
            (before, applied, own_thread_ioprio())
        });
        let (worker_before, applied, worker_after) = worker.join().unwrap();
        if applied.is_err() {
            return;
        }

        assert_eq!(worker_after, worker_before);
        // With a single test thread the harness runs us on the main thread.
        let on_main_thread = unsafe { syscall(libc::SYS_gettid) } == getpid().as_raw() as c_long;
        if !on_main_thread {
            assert_eq!(own_thread_ioprio(), caller_before);
        }
        assert_eq!(backend.get().unwrap(), Some(IoPriority::Idle));

        backend.set(IoPriority::Normal).unwrap();
    }
}
