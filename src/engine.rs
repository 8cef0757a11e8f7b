//! The exploration engine: orchestrates scheduling, conflict detection,
//! and depth-first advancement over the interleaving tree.

use metrics::{counter, gauge};

use crate::access::{AccessKind, AccessRecord, ObjectId, SyncEvent};
use crate::config::ExploreConfig;
use crate::error::{EngineError, Result};
use crate::execution::{Execution, StopReason};
use crate::metrics::names;
use crate::path::Path;

/// Systematic interleaving exploration engine.
///
/// The engine enumerates every meaningfully distinct thread interleaving
/// of a modeled program exactly once, using dynamic partial order
/// reduction with optional preemption bounding. It owns the exploration
/// tree (the [`Path`]), which persists across executions; everything
/// else lives in the per-run [`Execution`].
///
/// The driver alternates between asking which thread to run
/// ([`schedule`](Engine::schedule)), running that thread to its next
/// observable event, and reporting the event back
/// ([`report_access`](Engine::report_access) /
/// [`report_sync`](Engine::report_sync)). When a run ends,
/// [`next_execution`](Engine::next_execution) advances the tree; it
/// returns `false` once the tree is exhausted.
pub struct Engine {
    config: ExploreConfig,
    path: Path,
    executions_completed: u64,
}

impl Engine {
    /// Create an engine with a validated configuration.
    pub fn new(config: ExploreConfig) -> Result<Self> {
        config.validate()?;
        let path = Path::new(config.preemption_bound);
        Ok(Self {
            config,
            path,
            executions_completed: 0,
        })
    }

    /// Start a fresh execution.
    ///
    /// The exploration tree itself is untouched, and the replay cursor
    /// returns to the start of the recorded prefix: two consecutive
    /// calls without an intervening `next_execution` yield runs that
    /// schedule identically.
    pub fn begin_execution(&mut self) -> Execution {
        self.path.rewind();
        Execution::new(self.config.num_threads)
    }

    /// Pick which thread runs next, or `None` when the run is over.
    ///
    /// A `None` return records a [`StopReason`] on the execution:
    /// `Completed` when every thread finished, `Deadlock` when some
    /// thread is still blocked, `BranchLimit` when the per-execution
    /// branch cap was hit.
    pub fn schedule(&mut self, execution: &mut Execution) -> Result<Option<usize>> {
        if execution.stop.is_some() {
            return Ok(None);
        }
        if self.path.position() >= self.config.max_branches {
            tracing::warn!(
                max_branches = self.config.max_branches,
                "branch limit exceeded; aborting execution"
            );
            execution.stop = Some(StopReason::BranchLimit);
            return Ok(None);
        }

        let statuses = execution.statuses();
        match self.path.schedule(&statuses, execution.active_thread)? {
            Some(thread_id) => {
                let thread = &mut execution.threads[thread_id];
                thread.causality.increment(thread_id);
                thread.dpor.increment(thread_id);
                thread.yielded = false;
                execution.active_thread = thread_id;
                execution.schedule_trace.push(thread_id);
                tracing::trace!(thread_id, position = self.path.position(), "scheduled");
                Ok(Some(thread_id))
            }
            None => {
                execution.stop = Some(if execution.is_deadlocked() {
                    tracing::debug!("no runnable thread; deadlock");
                    StopReason::Deadlock
                } else {
                    StopReason::Completed
                });
                Ok(None)
            }
        }
    }

    /// Report a shared-memory access by `thread_id` to `object_id`.
    ///
    /// Every prior dependent access by another thread that is concurrent
    /// with this one (its clock snapshot not dominated by the accessing
    /// thread's clock) gets a backtrack point at the branch where it
    /// occurred, so the reversed ordering will be explored.
    pub fn report_access(
        &mut self,
        execution: &mut Execution,
        thread_id: usize,
        object_id: ObjectId,
        kind: AccessKind,
    ) -> Result<()> {
        self.check_thread(thread_id)?;

        let clock = execution.threads[thread_id].dpor.clone();
        let path_id = self.path.position().saturating_sub(1);
        let state = execution.objects.entry(object_id).or_default();

        let backtracks: Vec<usize> = state
            .dependent_accesses(kind, thread_id)
            .into_iter()
            .filter(|prior| !prior.happens_before(&clock))
            .map(|prior| prior.path_id)
            .collect();
        for target in backtracks {
            tracing::debug!(
                thread_id,
                object_id,
                target,
                "concurrent dependent access; inserting backtrack"
            );
            self.path.add_backtrack(target, thread_id);
        }

        state.record(AccessRecord::new(path_id, thread_id, clock, kind));
        Ok(())
    }

    /// Report a synchronization event, extending happens-before.
    pub fn report_sync(
        &mut self,
        execution: &mut Execution,
        thread_id: usize,
        event: SyncEvent,
    ) -> Result<()> {
        self.check_thread(thread_id)?;

        match event {
            SyncEvent::LockAcquire { lock } => {
                if let Some(release_clock) = execution.lock_releases.get(&lock) {
                    let release_clock = release_clock.clone();
                    let thread = &mut execution.threads[thread_id];
                    thread.causality.join(&release_clock);
                    thread.dpor.join(&release_clock);
                }
                execution.locks_acquired.insert(lock);
                let thread = &mut execution.threads[thread_id];
                thread.causality.increment(thread_id);
                thread.dpor.increment(thread_id);
            }
            SyncEvent::LockRelease { lock } => {
                if !execution.locks_acquired.contains(&lock) {
                    tracing::warn!(thread_id, lock, "release of a never-acquired lock");
                }
                let clock = execution.threads[thread_id].causality.clone();
                execution.lock_releases.insert(lock, clock);
            }
            SyncEvent::ThreadSpawn { child } => {
                self.check_thread(child)?;
                let (causality, dpor) = {
                    let parent = &execution.threads[thread_id];
                    (parent.causality.clone(), parent.dpor.clone())
                };
                let child_state = &mut execution.threads[child];
                child_state.causality.join(&causality);
                child_state.dpor.join(&dpor);

                let parent = &mut execution.threads[thread_id];
                parent.causality.increment(thread_id);
                parent.dpor.increment(thread_id);
            }
            SyncEvent::ThreadJoin { target } => {
                self.check_thread(target)?;
                if !execution.threads[target].finished {
                    return Err(EngineError::ThreadNotFinished(target));
                }
                let (causality, dpor) = {
                    let joined = &execution.threads[target];
                    (joined.causality.clone(), joined.dpor.clone())
                };
                let thread = &mut execution.threads[thread_id];
                thread.causality.join(&causality);
                thread.dpor.join(&dpor);
            }
        }
        Ok(())
    }

    /// Finish the current execution and advance to the next unexplored
    /// interleaving. Returns `false` when exploration is over, either
    /// because the tree is exhausted or the execution cap was reached.
    pub fn next_execution(&mut self) -> bool {
        self.executions_completed += 1;
        counter!(names::EXECUTIONS_TOTAL).increment(1);
        gauge!(names::TREE_DEPTH).set(self.path.depth() as f64);

        if let Some(max) = self.config.max_executions {
            if self.executions_completed >= max {
                tracing::debug!(max, "execution limit reached");
                return false;
            }
        }
        self.path.advance()
    }

    /// Executions completed so far.
    pub fn executions_completed(&self) -> u64 {
        self.executions_completed
    }

    /// Path length reached by the last run.
    pub fn tree_depth(&self) -> usize {
        self.path.depth()
    }

    /// Configured thread count.
    pub fn num_threads(&self) -> usize {
        self.config.num_threads
    }

    fn check_thread(&self, thread_id: usize) -> Result<()> {
        if thread_id >= self.config.num_threads {
            return Err(EngineError::ThreadOutOfRange {
                thread_id,
                num_threads: self.config.num_threads,
            });
        }
        Ok(())
    }
}
