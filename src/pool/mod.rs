//! Worker Pool Module
//!
//! This module provides the execution engine of echopool: a fixed-size pool
//! of worker threads consuming jobs from a single shared queue.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        WorkerPool                           │
//! │                                                             │
//! │   submit(job) ──> ┌───────────────────┐                     │
//! │                   │   shared queue    │  (LIFO, one mutex)  │
//! │                   └─────────┬─────────┘                     │
//! │                             │ wake-up signal                │
//! │        ┌────────────┬───────┴────┬────────────┐             │
//! │        ▼            ▼            ▼            ▼             │
//! │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐       │
//! │   │worker 0 │  │worker 1 │  │worker 2 │  │worker N │       │
//! │   └─────────┘  └─────────┘  └─────────┘  └─────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shutdown Modes
//!
//! - **Drain** ([`WorkerPool::drain_and_finish`]): stop accepting new jobs,
//!   let everything already queued run to completion.
//! - **Abandon** ([`WorkerPool::abandon_and_stop`]): stop now, discard
//!   queued jobs, keep only what is already mid-execution.
//!
//! ## Queue Ordering
//!
//! Consumption is LIFO: the most recently submitted job runs first. There
//! is no fairness guarantee across jobs or workers.

pub mod job;
pub mod worker_pool;

// Re-export commonly used types
pub use job::Job;
pub use worker_pool::{PoolError, WorkerPool};
