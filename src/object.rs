//! Per-object access history for conflict detection.

use std::collections::HashMap;

use crate::access::{AccessKind, AccessRecord};

/// Access history of one shared object.
///
/// Keeps the most recent read and the most recent write *per thread*. A
/// write by one thread depends on both the latest read and the latest
/// write of every other thread: backtracking at a read position lets the
/// scheduler interleave between a read and a subsequent write on the
/// same object (check-then-act bugs), while backtracking at a write
/// position only reorders whole read-write pairs. Keeping a single
/// global last-access instead would let one thread's read shadow
/// another's before its conflict with a later write is ever evaluated.
#[derive(Clone, Debug, Default)]
pub struct ObjectState {
    reads: HashMap<usize, AccessRecord>,
    writes: HashMap<usize, AccessRecord>,
}

impl ObjectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored accesses that an incoming access of `kind` by
    /// `thread_id` depends on.
    ///
    /// - A read depends on the latest write of every other thread.
    /// - A write depends on the latest read *and* the latest write of
    ///   every other thread. When a thread's stored read and write sit
    ///   at the same branch they are one backtrack target; only the
    ///   write is returned.
    pub fn dependent_accesses(&self, kind: AccessKind, thread_id: usize) -> Vec<&AccessRecord> {
        match kind {
            AccessKind::Read => self
                .writes
                .iter()
                .filter(|(tid, _)| **tid != thread_id)
                .map(|(_, access)| access)
                .collect(),
            AccessKind::Write => {
                let mut dependencies: Vec<&AccessRecord> = self
                    .writes
                    .iter()
                    .filter(|(tid, _)| **tid != thread_id)
                    .map(|(_, access)| access)
                    .collect();
                for (tid, read) in &self.reads {
                    if *tid == thread_id {
                        continue;
                    }
                    let same_branch = self
                        .writes
                        .get(tid)
                        .is_some_and(|write| write.path_id == read.path_id);
                    if !same_branch {
                        dependencies.push(read);
                    }
                }
                dependencies
            }
        }
    }

    /// Record an access, replacing the thread's previous record of the
    /// same kind.
    pub fn record(&mut self, access: AccessRecord) {
        match access.kind {
            AccessKind::Read => {
                self.reads.insert(access.thread_id, access);
            }
            AccessKind::Write => {
                self.writes.insert(access.thread_id, access);
            }
        }
    }
}
