//! Access and synchronization vocabulary shared with the driver.

use crate::clock::VectorClock;

/// Opaque identifier for a shared object. Only equality matters; the
/// driver typically derives it from a memory address or a
/// `(container, field)` hash.
pub type ObjectId = u64;

/// Opaque identifier for a lock, same rules as [`ObjectId`].
pub type LockId = u64;

/// Kind of a shared-memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    /// True for writes.
    pub fn is_write(self) -> bool {
        matches!(self, AccessKind::Write)
    }

    /// Two accesses to the same object are dependent when at least one
    /// side is a write.
    pub fn conflicts_with(self, other: AccessKind) -> bool {
        self.is_write() || other.is_write()
    }
}

/// One recorded access to a shared object.
///
/// Immutable once recorded; copied by value into the object history.
/// `path_id` is the index of the branch at which the access occurred,
/// `clock` a snapshot of the accessing thread's scheduling-causality
/// clock at that moment.
#[derive(Clone, Debug)]
pub struct AccessRecord {
    pub path_id: usize,
    pub thread_id: usize,
    pub clock: VectorClock,
    pub kind: AccessKind,
}

impl AccessRecord {
    pub fn new(path_id: usize, thread_id: usize, clock: VectorClock, kind: AccessKind) -> Self {
        Self {
            path_id,
            thread_id,
            clock,
            kind,
        }
    }

    /// True when this access is ordered before a point whose clock is
    /// `later` — i.e. synchronization already serializes the pair and no
    /// backtrack is needed.
    pub fn happens_before(&self, later: &VectorClock) -> bool {
        self.clock.partial_le(later)
    }
}

/// Synchronization events that extend the happens-before relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    /// A lock was acquired; the acquiring thread inherits the clock
    /// stored at the lock's most recent release.
    LockAcquire { lock: LockId },
    /// A lock was released; the releasing thread's clock is stored on
    /// the lock.
    LockRelease { lock: LockId },
    /// A thread spawned `child`; the child inherits the parent's clocks.
    ThreadSpawn { child: usize },
    /// The reporting thread joined on `target`, which must have finished.
    ThreadJoin { target: usize },
}
