//! # echopool - A Bounded Worker-Pool TCP Echo Server
//!
//! echopool pairs a fixed-size pool of worker threads with a TCP accept
//! loop: every accepted connection becomes one job, executed by exactly
//! one worker, which echoes received bytes back to the peer until the
//! connection ends.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              echopool                               │
//! │                                                                     │
//! │  ┌─────────────┐   accept    ┌─────────────┐   submit               │
//! │  │  Listening  │────────────>│ EchoHandler │──────────┐             │
//! │  │   socket    │             │    (Job)    │          │             │
//! │  └─────────────┘             └─────────────┘          ▼             │
//! │         ▲                                   ┌──────────────────┐    │
//! │         │ shutdown(2)                      │    WorkerPool     │    │
//! │  ┌──────┴───────┐                          │                   │    │
//! │  │ ServerHandle │                          │  shared LIFO queue│    │
//! │  │ (signal glue)│                          │  ┌──┐ ┌──┐ ┌──┐   │    │
//! │  └──────────────┘                          │  │w0│ │w1│ │wN│   │    │
//! │                                            │  └──┘ └──┘ └──┘   │    │
//! │                                            └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use echopool::{Server, ServerConfig};
//!
//! let server = Server::new(ServerConfig::default()).unwrap();
//! let handle = server.handle();
//!
//! // Hand `handle` to whatever decides when to stop, then run the
//! // accept loop on this thread:
//! server.start();
//! ```
//!
//! ## Module Overview
//!
//! - [`pool`]: the worker pool and the [`Job`] abstraction
//! - [`connection`]: the per-connection echo handler
//! - [`server`]: socket setup, the accept loop, and the stop surface
//!
//! ## Design Highlights
//!
//! ### One Connection, One Worker
//!
//! A connection handler owns its stream exclusively and runs on a single
//! worker from dispatch to close. The pool never sees a job again once a
//! worker has dequeued it, so no synchronization is needed on the
//! connection itself.
//!
//! ### LIFO Dispatch
//!
//! The shared queue is consumed last-in-first-out: the most recently
//! accepted connection is served first. There is no fairness guarantee;
//! under load, older queued connections wait longer.
//!
//! ### Two Ways Down
//!
//! A polite stop closes the listening socket and lets everything already
//! accepted finish. An immediate stop additionally abandons the queue,
//! keeping only the jobs workers are currently executing. Dropping the
//! server always drains before stopping, so normal teardown loses
//! nothing.

pub mod connection;
pub mod pool;
pub mod server;

// Re-export commonly used types for convenience
pub use connection::{EchoHandler, ServerStats};
pub use pool::{Job, PoolError, WorkerPool};
pub use server::{Server, ServerConfig, ServerError, ServerHandle};

/// The default port the server listens on
pub const DEFAULT_PORT: u16 = 7777;

/// The default host the server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default listen backlog
pub const DEFAULT_BACKLOG: u32 = 1000;

/// The default number of worker threads
pub const DEFAULT_WORKERS: usize = 4;

/// The default per-connection receive buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Version of echopool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
