//! Read/write monitor shared by every list of a pipeline.
//!
//! One monitor instance guards an entire chain of lists so that a complete
//! multi-operator propagation is atomic to outside readers. The write guard is
//! re-entrant for the thread that holds it: downstream callbacks running inside
//! a propagation may read upstream lists, and element mutation callbacks fired
//! from inside a propagation may re-acquire the write guard.

use crate::error::{CollectionError, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared handle to a pipeline monitor.
pub type SharedMonitor = Arc<dyn Monitor>;

/// Read/write guard abstraction. Guards release on drop.
pub trait Monitor: Send + Sync {
    fn acquire_read(&self) -> MonitorGuard<'_>;
    fn acquire_write(&self) -> MonitorGuard<'_>;
}

/// RAII guard returned by [`Monitor`] implementations.
#[must_use = "the monitor is released as soon as the guard is dropped"]
pub struct MonitorGuard<'a> {
    kind: GuardKind<'a>,
}

enum GuardKind<'a> {
    /// No lock held: no-op monitor, or a nested acquisition by the writer.
    Unlocked,
    Read(#[allow(dead_code)] RwLockReadGuard<'a, ()>),
    Write {
        owner: &'a AtomicUsize,
        _lock: RwLockWriteGuard<'a, ()>,
    },
}

impl MonitorGuard<'_> {
    /// A guard that holds nothing.
    pub fn unlocked() -> Self {
        MonitorGuard {
            kind: GuardKind::Unlocked,
        }
    }

    /// True when this guard actually owns the write lock (not nested, not no-op).
    pub fn is_write(&self) -> bool {
        matches!(self.kind, GuardKind::Write { .. })
    }
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        // Clear ownership before the write lock itself is released.
        if let GuardKind::Write { owner, .. } = &self.kind {
            owner.store(NO_OWNER, Ordering::Release);
        }
    }
}

impl fmt::Debug for MonitorGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            GuardKind::Unlocked => "unlocked",
            GuardKind::Read(_) => "read",
            GuardKind::Write { .. } => "write",
        };
        write!(f, "MonitorGuard({kind})")
    }
}

const NO_OWNER: usize = 0;

thread_local! {
    static THREAD_TOKEN: u8 = const { 0 };
}

/// Process-unique, non-zero token for the calling thread.
fn current_thread_token() -> usize {
    THREAD_TOKEN.with(|token| token as *const u8 as usize)
}

/// Locking monitor backed by a `parking_lot` read/write lock.
#[derive(Default)]
pub struct ReadWriteMonitor {
    lock: RwLock<()>,
    owner: AtomicUsize,
}

impl ReadWriteMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a monitor already wrapped in a shared handle.
    pub fn shared() -> SharedMonitor {
        Arc::new(Self::new())
    }

    /// Whether the calling thread currently holds the write guard.
    pub fn is_write_held_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Acquire) == current_thread_token()
    }
}

impl Monitor for ReadWriteMonitor {
    fn acquire_read(&self) -> MonitorGuard<'_> {
        if self.is_write_held_by_current_thread() {
            return MonitorGuard::unlocked();
        }
        MonitorGuard {
            kind: GuardKind::Read(self.lock.read_recursive()),
        }
    }

    fn acquire_write(&self) -> MonitorGuard<'_> {
        if self.is_write_held_by_current_thread() {
            return MonitorGuard::unlocked();
        }
        let lock = self.lock.write();
        self.owner.store(current_thread_token(), Ordering::Release);
        MonitorGuard {
            kind: GuardKind::Write {
                owner: &self.owner,
                _lock: lock,
            },
        }
    }
}

impl fmt::Debug for ReadWriteMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadWriteMonitor")
            .field("write_held", &(self.owner.load(Ordering::Relaxed) != NO_OWNER))
            .finish()
    }
}

/// Monitor for single-threaded pipelines; every guard is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

impl NoopMonitor {
    pub fn shared() -> SharedMonitor {
        Arc::new(NoopMonitor)
    }
}

impl Monitor for NoopMonitor {
    fn acquire_read(&self) -> MonitorGuard<'_> {
        MonitorGuard::unlocked()
    }

    fn acquire_write(&self) -> MonitorGuard<'_> {
        MonitorGuard::unlocked()
    }
}

/// Fail unless `joined` is the same monitor instance as `pipeline`.
///
/// Everything linked into one pipeline must share its monitor: callbacks from
/// a differently guarded list or reference would edit operator state outside
/// the pipeline's write guard, and take the two locks in the opposite order.
pub fn ensure_same_monitor(
    pipeline: &SharedMonitor,
    joined: &SharedMonitor,
    what: &str,
) -> Result<()> {
    if std::ptr::addr_eq(Arc::as_ptr(pipeline), Arc::as_ptr(joined)) {
        Ok(())
    } else {
        Err(CollectionError::InvalidArgument(format!(
            "{what} is guarded by a different monitor than the pipeline"
        )))
    }
}
