//! Connection Handler Module
//!
//! This module handles individual client connections. Each accepted
//! connection becomes one [`EchoHandler`] job, owned exclusively by the
//! worker that dequeues it. No two threads ever touch the same connection.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Accept loop hands the stream to a new EchoHandler
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │        Echo Loop             │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Non-blocking receive    │◄┼── retried in place on
//!    │  └───────────┬─────────────┘ │   "would block"
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send the bytes back     │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │ peer closed / error
//!        ▼
//! 3. Brief pause, shutdown both directions, release the stream
//! ```
//!
//! ## I/O Policy
//!
//! The stream is non-blocking and the loop polls it without parking the
//! thread. CPU is spent spinning while a connection is idle, which keeps
//! a worker occupied for the lifetime of its connection. The receive
//! buffer is allocated once per connection and reused for every cycle.

pub mod handler;

// Re-export commonly used types
pub use handler::{EchoHandler, ServerStats};
