//! Error types for the exploration engine.

use thiserror::Error;

/// Errors that can occur while driving the exploration engine.
///
/// Soft terminations (the per-execution branch cap and the global
/// execution cap) are deliberately *not* errors: they surface as a
/// [`StopReason`](crate::execution::StopReason) on the execution and as
/// `next_execution()` returning `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Configuration rejected at engine creation
    #[error("configuration error: {0}")]
    Config(String),

    /// A reported thread id is outside `[0, num_threads)`
    #[error("thread {thread_id} out of range (num_threads = {num_threads})")]
    ThreadOutOfRange {
        thread_id: usize,
        num_threads: usize,
    },

    /// `finish_thread` called on a thread that already finished
    #[error("thread {0} already finished")]
    ThreadAlreadyFinished(usize),

    /// A join was reported against a thread that has not finished
    #[error("thread {0} has not finished; join reported too early")]
    ThreadNotFinished(usize),

    /// Internal consistency check failed; indicates a bug in the engine
    #[error("internal invariant broken: {0}")]
    InvariantBroken(String),
}

impl EngineError {
    /// Check if this error is a driver usage error.
    ///
    /// Usage errors leave the engine and the exploration tree unchanged;
    /// the driver may correct its event stream and continue.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::ThreadOutOfRange { .. }
                | Self::ThreadAlreadyFinished(_)
                | Self::ThreadNotFinished(_)
        )
    }

    /// Check if this error indicates a bug in the engine itself.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InvariantBroken(_))
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
