//! End-to-end scenarios driving the engine through modeled programs.
//!
//! The runner plays the driver role: threads are lists of operations
//! over shared objects and locks, executed one observable event per
//! scheduling turn, with lock blocking handled driver-side exactly as a
//! real instrumentation layer would.

use std::collections::{HashMap, HashSet};

use crate::{
    AccessKind, Engine, ExploreConfig, ExplorationReport, LockId, ObjectId, StopReason, SyncEvent,
};

/// One step of a modeled thread.
#[derive(Clone, Copy, Debug)]
enum Op {
    Read(ObjectId),
    Write(ObjectId),
    Acquire(LockId),
    Release(LockId),
}

/// Outcome of one modeled run.
#[derive(Clone, Debug)]
struct Run {
    trace: Vec<usize>,
    stop: StopReason,
    /// Preemptions as observed by the driver: turns handed to a
    /// different thread while the previous one could still run.
    preemptions: u32,
    /// `(thread, op index)` in the order the ops actually executed.
    steps: Vec<(usize, usize)>,
}

/// A modeled multithreaded program.
struct ModelProgram {
    threads: Vec<Vec<Op>>,
    /// Model each lock acquisition attempt as a write to the lock word,
    /// making acquisition order itself a contested decision. Off, locks
    /// influence exploration only through their happens-before edges.
    lock_word_accesses: bool,
}

impl ModelProgram {
    fn new(threads: Vec<Vec<Op>>) -> Self {
        Self {
            threads,
            lock_word_accesses: false,
        }
    }

    fn with_lock_words(threads: Vec<Vec<Op>>) -> Self {
        Self {
            threads,
            lock_word_accesses: true,
        }
    }

    /// Drive one execution to its end.
    fn run(&self, engine: &mut Engine) -> crate::Result<Run> {
        let n = self.threads.len();
        let mut execution = engine.begin_execution();
        let mut pcs = vec![0usize; n];
        let mut finished = vec![false; n];
        let mut blocked = vec![false; n];
        let mut owner: HashMap<LockId, usize> = HashMap::new();
        let mut waiters: HashMap<LockId, Vec<usize>> = HashMap::new();
        let mut steps = Vec::new();
        let mut preemptions = 0u32;
        let mut prev: Option<usize> = None;

        loop {
            for tid in 0..n {
                if !finished[tid] && pcs[tid] >= self.threads[tid].len() {
                    execution.finish_thread(tid)?;
                    finished[tid] = true;
                }
            }

            let Some(tid) = engine.schedule(&mut execution)? else {
                break;
            };
            if let Some(p) = prev {
                if p != tid && !finished[p] && !blocked[p] {
                    preemptions += 1;
                }
            }
            prev = Some(tid);

            match self.threads[tid][pcs[tid]] {
                Op::Read(object) => {
                    engine.report_access(&mut execution, tid, object, AccessKind::Read)?;
                }
                Op::Write(object) => {
                    engine.report_access(&mut execution, tid, object, AccessKind::Write)?;
                }
                Op::Acquire(lock) => {
                    if self.lock_word_accesses {
                        // The attempt touches the lock word whether or
                        // not it succeeds.
                        engine.report_access(&mut execution, tid, lock, AccessKind::Write)?;
                    }
                    if owner.get(&lock).is_some_and(|&holder| holder != tid) {
                        execution.block_thread(tid)?;
                        blocked[tid] = true;
                        waiters.entry(lock).or_default().push(tid);
                        continue;
                    }
                    owner.insert(lock, tid);
                    engine.report_sync(&mut execution, tid, SyncEvent::LockAcquire { lock })?;
                }
                Op::Release(lock) => {
                    owner.remove(&lock);
                    engine.report_sync(&mut execution, tid, SyncEvent::LockRelease { lock })?;
                    for waiter in waiters.remove(&lock).unwrap_or_default() {
                        execution.unblock_thread(waiter)?;
                        blocked[waiter] = false;
                    }
                }
            }
            steps.push((tid, pcs[tid]));
            pcs[tid] += 1;
        }

        Ok(Run {
            trace: execution.schedule_trace.clone(),
            stop: execution.stop_reason().expect("run ended without a stop reason"),
            preemptions,
            steps,
        })
    }
}

/// Explore the whole tree, collecting one `Run` per execution.
fn explore(program: &ModelProgram, config: ExploreConfig) -> Vec<Run> {
    let mut engine = Engine::new(config).unwrap();
    let mut runs = Vec::new();
    loop {
        runs.push(program.run(&mut engine).unwrap());
        assert!(runs.len() < 10_000, "exploration failed to terminate");
        if !engine.next_execution() {
            break;
        }
    }
    runs
}

fn assert_unique_traces(runs: &[Run]) {
    let set: HashSet<Vec<usize>> = runs.iter().map(|r| r.trace.clone()).collect();
    assert_eq!(set.len(), runs.len(), "duplicate schedule explored");
}

/// Replay a read-modify-write counter over the recorded steps: even op
/// indices read the counter into a local, odd ones write local + 1 back.
fn replay_counter(run: &Run, num_threads: usize) -> i64 {
    let mut counter = 0i64;
    let mut local = vec![0i64; num_threads];
    for &(tid, pc) in &run.steps {
        if pc % 2 == 0 {
            local[tid] = counter;
        } else {
            counter = local[tid] + 1;
        }
    }
    counter
}

#[test]
fn test_lost_update_two_threads() {
    // Two threads each read-modify-write one shared counter.
    let increment = vec![Op::Read(0), Op::Write(0)];
    let program = ModelProgram::new(vec![increment.clone(), increment]);
    let runs = explore(&program, ExploreConfig::new(2));

    // The first run is fully sequential under the tie-break policy.
    assert_eq!(runs[0].trace, vec![0, 0, 1, 1]);
    assert_eq!(replay_counter(&runs[0], 2), 2);

    // Some interleaving loses an update.
    assert!(runs.len() >= 2);
    assert!(runs.iter().any(|run| replay_counter(run, 2) != 2));
    assert_unique_traces(&runs);
    assert!(runs.iter().all(|run| run.stop == StopReason::Completed));
}

#[test]
fn test_disjoint_objects_single_execution() {
    let program = ModelProgram::new(vec![
        vec![Op::Read(0), Op::Write(0)],
        vec![Op::Read(1), Op::Write(1)],
    ]);
    let runs = explore(&program, ExploreConfig::new(2));

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].trace, vec![0, 0, 1, 1]);
}

#[test]
fn test_locked_critical_sections_two_orders() {
    // Lock-protected read-modify-write; the lock word itself is the
    // only contested access, so exactly the two acquisition orders are
    // explored and the counter invariant holds in both.
    let section = vec![Op::Acquire(100), Op::Read(0), Op::Write(0), Op::Release(100)];
    let program = ModelProgram::with_lock_words(vec![section.clone(), section]);
    let runs = explore(&program, ExploreConfig::new(2));

    assert_eq!(runs.len(), 2);
    for run in &runs {
        assert_eq!(run.stop, StopReason::Completed);
        let counter = run
            .steps
            .iter()
            .filter(|&&(_, pc)| pc == 2)
            .count();
        assert_eq!(counter, 2, "both critical sections executed");
    }
    // Both orders of entering the critical section were seen.
    let first_holders: HashSet<usize> = runs.iter().map(|r| r.steps[0].0).collect();
    assert_eq!(first_holders.len(), 2);
}

#[test]
fn test_locked_counter_never_loses_updates() {
    let section = vec![Op::Acquire(100), Op::Read(0), Op::Write(0), Op::Release(100)];
    let program = ModelProgram::with_lock_words(vec![section.clone(), section]);
    let runs = explore(&program, ExploreConfig::new(2));

    for run in &runs {
        let mut counter = 0i64;
        let mut local = vec![0i64; 2];
        for &(tid, pc) in &run.steps {
            match pc {
                1 => local[tid] = counter,
                2 => counter = local[tid] + 1,
                _ => {}
            }
        }
        assert_eq!(counter, 2, "trace {:?} lost an update", run.trace);
    }
}

#[test]
fn test_sync_edges_cancel_exploration() {
    // Same program, but lock acquisition modeled purely as a
    // happens-before edge: every dependent pair is ordered by the lock,
    // so a single execution suffices.
    let section = vec![Op::Acquire(100), Op::Read(0), Op::Write(0), Op::Release(100)];
    let program = ModelProgram::new(vec![section.clone(), section]);
    let runs = explore(&program, ExploreConfig::new(2));

    assert_eq!(runs.len(), 1);
}

#[test]
fn test_preemption_bound_zero_runs_threads_whole() {
    // Three conflicting writes per thread; with bound zero only the two
    // run-to-completion orders exist.
    let writes = vec![Op::Write(0), Op::Write(0), Op::Write(0)];
    let program = ModelProgram::new(vec![writes.clone(), writes]);
    let runs = explore(&program, ExploreConfig::new(2).with_preemption_bound(0));

    let traces: Vec<Vec<usize>> = runs.iter().map(|r| r.trace.clone()).collect();
    assert_eq!(traces, vec![vec![0, 0, 0, 1, 1, 1], vec![1, 1, 1, 0, 0, 0]]);
    assert!(runs.iter().all(|run| run.preemptions == 0));
}

#[test]
fn test_preemption_bound_respected() {
    let increment = vec![Op::Read(0), Op::Write(0)];
    let program = ModelProgram::new(vec![increment.clone(), increment]);
    let runs = explore(&program, ExploreConfig::new(2).with_preemption_bound(1));

    assert!(runs.len() >= 2);
    for run in &runs {
        assert!(
            run.preemptions <= 1,
            "trace {:?} used {} preemptions",
            run.trace,
            run.preemptions
        );
    }
}

#[test]
fn test_deadlock_detected_and_explored_past() {
    // Opposite lock acquisition orders; at least one interleaving ends
    // with both threads blocked, and exploration still terminates.
    let program = ModelProgram::with_lock_words(vec![
        vec![Op::Acquire(100), Op::Acquire(101)],
        vec![Op::Acquire(101), Op::Acquire(100)],
    ]);
    let runs = explore(&program, ExploreConfig::new(2));

    assert!(runs.iter().any(|run| run.stop == StopReason::Deadlock));
    assert_unique_traces(&runs);
}

#[test]
fn test_three_threads_read_read_write_full_coverage() {
    // Two independent readers against one writer: every ordering of
    // each read relative to the write is explored, including both reads
    // on opposite sides of the write.
    let program = ModelProgram::new(vec![
        vec![Op::Read(0)],
        vec![Op::Read(0)],
        vec![Op::Write(0)],
    ]);
    let runs = explore(&program, ExploreConfig::new(3));

    let mut combos = HashSet::new();
    for run in &runs {
        let write_at = run.steps.iter().position(|&(tid, _)| tid == 2).unwrap();
        let read0_at = run.steps.iter().position(|&(tid, _)| tid == 0).unwrap();
        let read1_at = run.steps.iter().position(|&(tid, _)| tid == 1).unwrap();
        combos.insert((read0_at < write_at, read1_at < write_at));
    }

    assert_eq!(combos.len(), 4, "missing read/write orderings: {combos:?}");
    assert!(runs.len() >= 4);
    assert_unique_traces(&runs);
}

#[test]
fn test_three_threads_counter_finds_lost_update() {
    let increment = vec![Op::Read(0), Op::Write(0)];
    let program = ModelProgram::new(vec![increment.clone(), increment.clone(), increment]);
    let runs = explore(&program, ExploreConfig::new(3));

    assert!(runs.iter().any(|run| replay_counter(run, 3) != 3));
    assert_unique_traces(&runs);
}

#[test]
fn test_replay_is_deterministic_across_begin_calls() {
    // Two executions begun without advancing the tree schedule
    // identically.
    let increment = vec![Op::Read(0), Op::Write(0)];
    let program = ModelProgram::new(vec![increment.clone(), increment]);

    let mut engine = Engine::new(ExploreConfig::new(2)).unwrap();
    let first = program.run(&mut engine).unwrap();
    let second = program.run(&mut engine).unwrap();

    assert_eq!(first.trace, second.trace);
    assert_eq!(first.steps, second.steps);
}

#[test]
fn test_branch_limit_stops_run() {
    let increment = vec![Op::Read(0), Op::Write(0)];
    let program = ModelProgram::new(vec![increment.clone(), increment]);
    let runs = explore(&program, ExploreConfig::new(2).with_max_branches(2));

    assert_eq!(runs[0].stop, StopReason::BranchLimit);
    assert_eq!(runs[0].trace.len(), 2);
}

#[test]
fn test_execution_limit_marks_report_incomplete() {
    let increment = vec![Op::Read(0), Op::Write(0)];
    let program = ModelProgram::new(vec![increment.clone(), increment]);

    let mut engine = Engine::new(ExploreConfig::new(2).with_max_executions(1)).unwrap();
    let mut report = ExplorationReport::new();

    let run = program.run(&mut engine).unwrap();
    report.executions_explored += 1;
    if replay_counter(&run, 2) != 2 {
        report.record_failure(0, run.trace.clone());
    }
    if !engine.next_execution() {
        // The tree was not exhausted; the cap fired first.
        report.mark_incomplete();
    }

    assert!(!report.complete);
    assert_eq!(report.executions_explored, 1);
    // The sequential first run satisfies the invariant.
    assert!(report.property_holds);
}

#[test]
fn test_report_collects_counterexample() {
    let increment = vec![Op::Read(0), Op::Write(0)];
    let program = ModelProgram::new(vec![increment.clone(), increment]);

    let mut engine = Engine::new(ExploreConfig::new(2)).unwrap();
    let mut report = ExplorationReport::new();
    loop {
        let run = program.run(&mut engine).unwrap();
        if replay_counter(&run, 2) != 2 {
            report.record_failure(report.executions_explored, run.trace.clone());
        }
        report.executions_explored += 1;
        if !engine.next_execution() {
            break;
        }
    }

    assert!(!report.property_holds);
    let counterexample = report.counterexample.as_ref().unwrap();
    assert!(counterexample.len() == 4);
    assert!(report.complete);
}
