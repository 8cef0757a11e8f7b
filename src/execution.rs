//! Per-run state container.

use std::collections::{HashMap, HashSet};

use crate::access::{LockId, ObjectId};
use crate::clock::VectorClock;
use crate::error::{EngineError, Result};
use crate::object::ObjectState;
use crate::path::ThreadStatus;
use crate::thread::ThreadState;

/// Why an execution stopped.
///
/// `Deadlock` means at least one thread was still blocked when no thread
/// remained runnable; `Completed` means every thread finished.
/// `BranchLimit` means the per-execution branch cap cut the run short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    Deadlock,
    BranchLimit,
}

/// State of one execution: thread clocks and flags, object access
/// histories, lock release clocks, and the schedule trace.
///
/// All per-run state lives here; the engine carries only the exploration
/// tree across runs. Created by `Engine::begin_execution` and discarded
/// when the run ends.
pub struct Execution {
    pub(crate) threads: Vec<ThreadState>,
    pub(crate) objects: HashMap<ObjectId, ObjectState>,
    pub(crate) lock_releases: HashMap<LockId, VectorClock>,
    pub(crate) locks_acquired: HashSet<LockId>,
    pub(crate) active_thread: usize,
    pub(crate) stop: Option<StopReason>,
    /// Sequence of thread ids chosen so far.
    pub schedule_trace: Vec<usize>,
}

impl Execution {
    pub(crate) fn new(num_threads: usize) -> Self {
        let mut threads: Vec<ThreadState> =
            (0..num_threads).map(|_| ThreadState::new(num_threads)).collect();
        // The initial thread is born one step into its own timeline.
        threads[0].causality.increment(0);
        threads[0].dpor.increment(0);

        Self {
            threads,
            objects: HashMap::new(),
            lock_releases: HashMap::new(),
            locks_acquired: HashSet::new(),
            active_thread: 0,
            stop: None,
            schedule_trace: Vec::new(),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    fn check_thread(&self, thread_id: usize) -> Result<()> {
        if thread_id >= self.threads.len() {
            return Err(EngineError::ThreadOutOfRange {
                thread_id,
                num_threads: self.threads.len(),
            });
        }
        Ok(())
    }

    /// Mark a thread finished. Finishing twice is a driver bug.
    pub fn finish_thread(&mut self, thread_id: usize) -> Result<()> {
        self.check_thread(thread_id)?;
        if self.threads[thread_id].finished {
            return Err(EngineError::ThreadAlreadyFinished(thread_id));
        }
        self.threads[thread_id].finished = true;
        Ok(())
    }

    /// Mark a thread blocked (e.g. waiting on a held lock).
    pub fn block_thread(&mut self, thread_id: usize) -> Result<()> {
        self.check_thread(thread_id)?;
        if self.threads[thread_id].finished {
            return Err(EngineError::ThreadAlreadyFinished(thread_id));
        }
        self.threads[thread_id].blocked = true;
        Ok(())
    }

    /// Clear a thread's blocked flag.
    pub fn unblock_thread(&mut self, thread_id: usize) -> Result<()> {
        self.check_thread(thread_id)?;
        self.threads[thread_id].blocked = false;
        Ok(())
    }

    /// Mark a voluntary yield; the thread is deprioritized at the next
    /// scheduling point and the flag clears when it next runs.
    pub fn yield_thread(&mut self, thread_id: usize) -> Result<()> {
        self.check_thread(thread_id)?;
        self.threads[thread_id].yielded = true;
        Ok(())
    }

    /// Ids of threads currently eligible for scheduling.
    pub fn runnable_threads(&self) -> Vec<usize> {
        self.threads
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_runnable())
            .map(|(tid, _)| tid)
            .collect()
    }

    /// True when no thread is runnable but at least one is blocked.
    pub fn is_deadlocked(&self) -> bool {
        self.threads.iter().all(|t| !t.is_runnable())
            && self.threads.iter().any(|t| t.blocked && !t.finished)
    }

    /// Why the run stopped, once `schedule` has returned `None`.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// True when the run ended abnormally (deadlock or branch cap).
    pub fn aborted(&self) -> bool {
        matches!(
            self.stop,
            Some(StopReason::Deadlock) | Some(StopReason::BranchLimit)
        )
    }

    /// Per-thread statuses at the current scheduling point, as recorded
    /// into a fresh branch.
    pub(crate) fn statuses(&self) -> Vec<ThreadStatus> {
        self.threads
            .iter()
            .map(|t| {
                if t.finished {
                    ThreadStatus::Disabled
                } else if t.blocked {
                    ThreadStatus::Blocked
                } else if t.yielded {
                    ThreadStatus::Yielded
                } else {
                    ThreadStatus::Pending
                }
            })
            .collect()
    }
}
