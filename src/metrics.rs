//! Metrics for the exploration engine.
//!
//! Uses the `metrics` crate facade; install any recorder to export.
//!
//! # Metrics
//!
//! ## Counters
//! - `weft_executions_total` - Executions completed
//! - `weft_branches_total` - Branches created across all executions
//! - `weft_backtracks_total` - Backtrack insertions by kind
//!   (`direct`, `conservative`, `dropped`)
//!
//! ## Gauges
//! - `weft_tree_depth` - Path length reached by the last execution

/// Metric names as constants for consistency.
pub mod names {
    /// Executions completed counter.
    pub const EXECUTIONS_TOTAL: &str = "weft_executions_total";
    /// Branches created counter.
    pub const BRANCHES_TOTAL: &str = "weft_branches_total";
    /// Backtrack insertions counter.
    pub const BACKTRACKS_TOTAL: &str = "weft_backtracks_total";
    /// Exploration tree depth gauge.
    pub const TREE_DEPTH: &str = "weft_tree_depth";
}

/// Backtrack kind labels.
pub mod backtrack_kind {
    /// Inserted at the requested branch.
    pub const DIRECT: &str = "direct";
    /// Relocated to an earlier branch to respect the preemption bound.
    pub const CONSERVATIVE: &str = "conservative";
    /// No feasible branch within the bound; request dropped.
    pub const DROPPED: &str = "dropped";
}
