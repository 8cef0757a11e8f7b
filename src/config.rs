//! Configuration for the exploration engine.

use crate::error::{EngineError, Result};

/// Default cap on branches created within a single execution.
pub const DEFAULT_MAX_BRANCHES: usize = 100_000;

/// Exploration configuration.
///
/// `num_threads` is fixed for the lifetime of an engine; every execution
/// models exactly that many threads. The two caps are safety valves:
/// `max_branches` bounds work inside one execution, `max_executions`
/// bounds the total number of interleavings explored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExploreConfig {
    /// Number of modeled threads per execution.
    pub num_threads: usize,

    /// Maximum preemptions allowed per execution; `None` = unbounded.
    pub preemption_bound: Option<u32>,

    /// Cap on branches (scheduling decisions) within one execution.
    pub max_branches: usize,

    /// Hard cap on total executions explored; `None` = exhaustive.
    pub max_executions: Option<u64>,
}

impl ExploreConfig {
    /// Create a configuration for the given thread count with default bounds.
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            preemption_bound: None,
            max_branches: DEFAULT_MAX_BRANCHES,
            max_executions: None,
        }
    }

    /// Set the preemption bound.
    pub fn with_preemption_bound(mut self, bound: u32) -> Self {
        self.preemption_bound = Some(bound);
        self
    }

    /// Set the per-execution branch cap.
    pub fn with_max_branches(mut self, max_branches: usize) -> Self {
        self.max_branches = max_branches;
        self
    }

    /// Set the global execution cap.
    pub fn with_max_executions(mut self, max_executions: u64) -> Self {
        self.max_executions = Some(max_executions);
        self
    }

    /// Validate the configuration.
    ///
    /// # Checks
    ///
    /// - At least one thread
    /// - Branch cap is positive
    /// - Execution cap, if set, is positive
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(EngineError::Config(
                "num_threads must be at least 1".into(),
            ));
        }
        if self.max_branches == 0 {
            return Err(EngineError::Config(
                "max_branches must be at least 1".into(),
            ));
        }
        if self.max_executions == Some(0) {
            return Err(EngineError::Config(
                "max_executions must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self::new(2)
    }
}
