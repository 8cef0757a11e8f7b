//! Systematic interleaving exploration for deterministic concurrency
//! testing.
//!
//! Given a multithreaded program modeled as a stream of shared-memory
//! accesses and synchronization events, the engine enumerates every
//! meaningfully distinct thread interleaving exactly once, using dynamic
//! partial order reduction (DPOR) with optional preemption bounding.
//!
//! # Overview
//!
//! The engine is a library with a narrow event-driven API. An external
//! driver owns the actual threads (or tasks, or a bytecode tracer) and
//! alternates between three moves:
//!
//! 1. Ask the engine which thread to run next ([`Engine::schedule`]).
//! 2. Run that thread until it performs an observable event.
//! 3. Report the event back ([`Engine::report_access`] /
//!    [`Engine::report_sync`]).
//!
//! When a run ends, [`Engine::next_execution`] advances the exploration
//! tree to the next unexplored interleaving; it returns `false` once the
//! tree is exhausted. Replay of previously recorded prefixes is fully
//! deterministic, so the same configuration and event stream always
//! explore the same schedules.
//!
//! Accesses to the same object where at least one side writes are
//! *dependent*; when two dependent accesses are concurrent (not ordered
//! by lock, spawn, or join edges), a backtrack point is inserted so the
//! reversed order gets explored. Properly synchronized programs
//! therefore collapse to very few executions.
//!
//! # Example
//!
//! Two threads each writing the same object explore both orders:
//!
//! ```
//! use weft::{AccessKind, Engine, ExploreConfig};
//!
//! # fn main() -> weft::Result<()> {
//! let mut engine = Engine::new(ExploreConfig::new(2))?;
//! loop {
//!     let mut execution = engine.begin_execution();
//!     while let Some(thread_id) = engine.schedule(&mut execution)? {
//!         engine.report_access(&mut execution, thread_id, 0, AccessKind::Write)?;
//!         execution.finish_thread(thread_id)?;
//!     }
//!     if !engine.next_execution() {
//!         break;
//!     }
//! }
//! assert_eq!(engine.executions_completed(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`VectorClock`]: happens-before tracking
//! - [`ObjectState`]: per-object access history feeding conflict detection
//! - [`Path`]: the exploration tree with its replay cursor
//! - [`Execution`]: all per-run state
//! - [`Engine`]: orchestration and bounds enforcement
//! - [`ExplorationReport`]: driver-side result accumulation

mod access;
mod clock;
mod config;
mod engine;
mod error;
mod execution;
pub mod metrics;
mod object;
mod path;
mod report;
mod thread;

#[cfg(test)]
mod integration;

pub use access::{AccessKind, AccessRecord, LockId, ObjectId, SyncEvent};
pub use clock::VectorClock;
pub use config::{ExploreConfig, DEFAULT_MAX_BRANCHES};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use execution::{Execution, StopReason};
pub use object::ObjectState;
pub use path::{Branch, Path, ThreadStatus};
pub use report::{ExplorationReport, Failure};
pub use thread::ThreadState;
