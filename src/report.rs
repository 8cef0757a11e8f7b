//! Driver-facing exploration summary.

use serde::{Deserialize, Serialize};

/// One failing execution: which run it was and the schedule that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Zero-based execution index.
    pub execution: u64,
    /// Sequence of thread ids chosen during the failing run.
    pub trace: Vec<usize>,
}

/// Summary of one exploration.
///
/// The engine produces schedule traces; the property judgment belongs to
/// the driver, which checks its invariant after each run and records
/// failures here. `complete` is false when a limit (`max_branches`,
/// `max_executions`) cut exploration short.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationReport {
    /// True while no failure has been recorded.
    pub property_holds: bool,
    /// Total executions explored.
    pub executions_explored: u64,
    /// Schedule of the first failing execution, if any.
    pub counterexample: Option<Vec<usize>>,
    /// All failing executions.
    pub failures: Vec<Failure>,
    /// False when exploration was cut short by a configured limit.
    pub complete: bool,
}

impl ExplorationReport {
    pub fn new() -> Self {
        Self {
            property_holds: true,
            executions_explored: 0,
            counterexample: None,
            failures: Vec::new(),
            complete: true,
        }
    }

    /// Record a failing execution. The first failure becomes the
    /// counterexample.
    pub fn record_failure(&mut self, execution: u64, trace: Vec<usize>) {
        self.property_holds = false;
        if self.counterexample.is_none() {
            self.counterexample = Some(trace.clone());
        }
        self.failures.push(Failure { execution, trace });
    }

    /// Flag that exploration stopped before the tree was exhausted.
    pub fn mark_incomplete(&mut self) {
        self.complete = false;
    }
}

impl Default for ExplorationReport {
    fn default() -> Self {
        Self::new()
    }
}
