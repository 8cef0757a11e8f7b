//! Explore the classic lost-update race and print the counterexample.
//!
//! Run with: cargo run --example lost_update
//!
//! Two threads each read a shared counter into a local and write the
//! incremented local back. The engine enumerates the distinct
//! interleavings; the ones where both reads happen before either write
//! lose an update.

use weft::{AccessKind, Engine, ExploreConfig, ExplorationReport};

const COUNTER: u64 = 0;

/// One thread's steps: read the counter, then write it back + 1.
const STEPS_PER_THREAD: usize = 2;

fn main() -> weft::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut engine = Engine::new(ExploreConfig::new(2).with_preemption_bound(2))?;
    let mut report = ExplorationReport::new();

    loop {
        let mut execution = engine.begin_execution();
        let mut counter = 0i64;
        let mut local = [0i64; 2];
        let mut pcs = [0usize; 2];

        loop {
            for tid in 0..2 {
                if pcs[tid] == STEPS_PER_THREAD {
                    execution.finish_thread(tid)?;
                    pcs[tid] += 1; // finish exactly once
                }
            }
            let Some(tid) = engine.schedule(&mut execution)? else {
                break;
            };
            if pcs[tid] == 0 {
                engine.report_access(&mut execution, tid, COUNTER, AccessKind::Read)?;
                local[tid] = counter;
            } else {
                engine.report_access(&mut execution, tid, COUNTER, AccessKind::Write)?;
                counter = local[tid] + 1;
            }
            pcs[tid] += 1;
        }

        if counter != 2 {
            report.record_failure(report.executions_explored, execution.schedule_trace.clone());
            tracing::info!(
                counter,
                trace = ?execution.schedule_trace,
                "lost update"
            );
        }
        report.executions_explored += 1;

        if !engine.next_execution() {
            break;
        }
    }

    println!("executions explored: {}", report.executions_explored);
    println!("property holds:      {}", report.property_holds);
    if let Some(trace) = &report.counterexample {
        println!("counterexample:      {trace:?}");
    }
    Ok(())
}
