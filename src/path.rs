//! The exploration tree: branches, replay, and depth-first advancement.

use metrics::counter;

use crate::error::{EngineError, Result};
use crate::metrics::{backtrack_kind, names};

/// Status of one thread at one branch.
///
/// Within a branch: every runnable thread starts `Pending`, exactly one
/// is promoted to `Active` (the chosen thread), conflict detection marks
/// alternatives `Backtrack`, and `Visited` marks alternatives already
/// explored. `Blocked` and `Yielded` mirror the runtime state at the
/// scheduling point; `Disabled` marks threads ineligible to run there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    Disabled,
    Pending,
    Active,
    Backtrack,
    Visited,
    Blocked,
    Yielded,
}

impl ThreadStatus {
    /// True for statuses under which the thread could run at this branch.
    pub fn is_schedulable(self) -> bool {
        matches!(
            self,
            ThreadStatus::Pending
                | ThreadStatus::Active
                | ThreadStatus::Backtrack
                | ThreadStatus::Yielded
        )
    }

    /// True when the thread is an unexplored candidate for backtracking.
    fn is_backtrack_candidate(self) -> bool {
        matches!(self, ThreadStatus::Pending | ThreadStatus::Yielded)
    }

    /// True when the thread could have been chosen to run at this branch
    /// without waiting — the statuses a preemption is counted against.
    /// A yielded thread gave up its turn voluntarily, so running someone
    /// else over it is not a preemption.
    fn counts_for_preemption(self) -> bool {
        matches!(
            self,
            ThreadStatus::Pending
                | ThreadStatus::Active
                | ThreadStatus::Backtrack
                | ThreadStatus::Visited
        )
    }
}

/// One scheduling decision in the exploration tree.
#[derive(Clone, Debug)]
pub struct Branch {
    /// Per-thread status at this decision point, indexed by thread id.
    pub statuses: Vec<ThreadStatus>,
    /// The thread chosen to run.
    pub active_thread: usize,
    /// Cumulative preemptions up to and including this branch.
    pub preemptions: u32,
}

impl Branch {
    fn new(statuses: Vec<ThreadStatus>, active_thread: usize, preemptions: u32) -> Self {
        Self {
            statuses,
            active_thread,
            preemptions,
        }
    }
}

/// Ordered sequence of branches plus the replay cursor.
///
/// While the cursor is inside the recorded prefix, scheduling replays
/// prior decisions verbatim; past it, new branches are appended. The
/// path persists across executions — it is the exploration tree.
pub struct Path {
    branches: Vec<Branch>,
    cursor: usize,
    preemption_bound: Option<u32>,
}

impl Path {
    pub fn new(preemption_bound: Option<u32>) -> Self {
        Self {
            branches: Vec::new(),
            cursor: 0,
            preemption_bound,
        }
    }

    /// Number of branches scheduled so far in the current execution.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Total branches in the tree (the depth reached by the last run).
    pub fn depth(&self) -> usize {
        self.branches.len()
    }

    /// Reset the replay cursor to the start of the recorded prefix.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// The branch at `path_id`, if recorded.
    pub fn branch(&self, path_id: usize) -> Option<&Branch> {
        self.branches.get(path_id)
    }

    /// Pick the thread to run at the current scheduling point.
    ///
    /// `statuses` is the per-thread runtime view (`Disabled` / `Blocked`
    /// / `Yielded` / `Pending`) and `prev_active` the tail of the
    /// schedule trace. Inside the recorded prefix the decision is
    /// replayed; a recorded thread that is no longer schedulable means
    /// the driver diverged from the prior run and is reported as an
    /// invariant violation.
    pub fn schedule(
        &mut self,
        statuses: &[ThreadStatus],
        prev_active: usize,
    ) -> Result<Option<usize>> {
        if self.cursor < self.branches.len() {
            let chosen = self.branches[self.cursor].active_thread;
            if !statuses
                .get(chosen)
                .is_some_and(|s| s.is_backtrack_candidate())
            {
                return Err(EngineError::InvariantBroken(format!(
                    "replay mismatch at branch {}: recorded thread {chosen} is not runnable",
                    self.cursor
                )));
            }
            self.cursor += 1;
            return Ok(Some(chosen));
        }

        // Exploration: prefer the previously active thread to minimize
        // preemptions, then the lowest pending thread, then the lowest
        // yielded one.
        let pending = |tid: usize| statuses[tid] == ThreadStatus::Pending;
        let chosen = if pending(prev_active) {
            Some(prev_active)
        } else {
            (0..statuses.len())
                .find(|&tid| pending(tid))
                .or_else(|| (0..statuses.len()).find(|&tid| statuses[tid] == ThreadStatus::Yielded))
        };
        let Some(chosen) = chosen else {
            return Ok(None);
        };

        // The first decision of a run has no previously-active thread,
        // so it can never preempt.
        let preempted =
            !self.branches.is_empty() && chosen != prev_active && pending(prev_active);
        let preemptions =
            self.branches.last().map_or(0, |b| b.preemptions) + u32::from(preempted);

        let mut recorded = statuses.to_vec();
        recorded[chosen] = ThreadStatus::Active;
        self.branches.push(Branch::new(recorded, chosen, preemptions));
        self.cursor += 1;
        counter!(names::BRANCHES_TOTAL).increment(1);
        Ok(Some(chosen))
    }

    /// Mark `thread_id` for future exploration at branch `path_id`.
    ///
    /// Under a preemption bound, a request that would exceed the bound
    /// falls back to the earliest feasible branch; when none exists the
    /// request is dropped, which is sound within the bounded regime but
    /// not complete.
    pub fn add_backtrack(&mut self, path_id: usize, thread_id: usize) {
        let Some(branch) = self.branches.get(path_id) else {
            return;
        };
        if !branch
            .statuses
            .get(thread_id)
            .is_some_and(|s| s.is_backtrack_candidate())
        {
            return;
        }
        if let Some(bound) = self.preemption_bound {
            if self.preemptions_if_chosen(path_id, thread_id) > bound {
                self.add_conservative_backtrack(path_id, thread_id, bound);
                return;
            }
        }
        self.branches[path_id].statuses[thread_id] = ThreadStatus::Backtrack;
        counter!(names::BACKTRACKS_TOTAL, "kind" => backtrack_kind::DIRECT).increment(1);
    }

    /// Walk backward from `path_id` for the earliest branch at which
    /// `thread_id` can still be explored without exceeding the bound.
    fn add_conservative_backtrack(&mut self, path_id: usize, thread_id: usize, bound: u32) {
        for earlier in (0..path_id).rev() {
            let candidate = self.branches[earlier]
                .statuses
                .get(thread_id)
                .is_some_and(|s| s.is_backtrack_candidate());
            if candidate && self.preemptions_if_chosen(earlier, thread_id) <= bound {
                self.branches[earlier].statuses[thread_id] = ThreadStatus::Backtrack;
                counter!(names::BACKTRACKS_TOTAL, "kind" => backtrack_kind::CONSERVATIVE)
                    .increment(1);
                return;
            }
        }
        tracing::debug!(
            path_id,
            thread_id,
            "backtrack dropped: no feasible branch within preemption bound"
        );
        counter!(names::BACKTRACKS_TOTAL, "kind" => backtrack_kind::DROPPED).increment(1);
    }

    /// Cumulative preemption count branch `path_id` would carry if its
    /// choice were changed to `thread_id`.
    fn preemptions_if_chosen(&self, path_id: usize, thread_id: usize) -> u32 {
        if path_id == 0 {
            return 0;
        }
        let base = self.branches[path_id - 1].preemptions;
        let prev_active = self.branches[path_id - 1].active_thread;
        let preempted = thread_id != prev_active
            && self.branches[path_id].statuses[prev_active].counts_for_preemption();
        base + u32::from(preempted)
    }

    /// Advance to the next unexplored execution, depth-first.
    ///
    /// Walks backward from the last branch, marking each exhausted
    /// choice `Visited` and popping branches without remaining
    /// backtracks. Returns `false` when the tree is exhausted.
    pub fn advance(&mut self) -> bool {
        while !self.branches.is_empty() {
            let path_id = self.branches.len() - 1;
            let branch = &mut self.branches[path_id];
            let active = branch.active_thread;
            if branch.statuses[active] == ThreadStatus::Active {
                branch.statuses[active] = ThreadStatus::Visited;
            }

            if let Some(next) = branch
                .statuses
                .iter()
                .position(|s| *s == ThreadStatus::Backtrack)
            {
                branch.statuses[next] = ThreadStatus::Active;
                branch.active_thread = next;
                // The flip can change whether this branch preempts.
                let preemptions = self.preemptions_if_chosen(path_id, next);
                self.branches[path_id].preemptions = preemptions;
                self.cursor = 0;
                return true;
            }

            self.branches.pop();
        }
        self.cursor = 0;
        false
    }
}
