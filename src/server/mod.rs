//! TCP Server Module
//!
//! This module owns the listening socket and the worker pool, and wires
//! them together: the accept loop turns every accepted connection into an
//! [`EchoHandler`](crate::connection::EchoHandler) job and submits it to
//! the pool.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! │                                                             │
//! │  ┌─────────────┐  accept   ┌─────────────┐  submit          │
//! │  │  Listening  │──────────>│ EchoHandler │─────────┐        │
//! │  │   socket    │           │   (Job)     │         │        │
//! │  └─────────────┘           └─────────────┘         ▼        │
//! │         ▲                                   ┌────────────┐  │
//! │         │ shutdown(2)                       │ WorkerPool │  │
//! │  ┌──────┴───────┐                           └────────────┘  │
//! │  │ ServerHandle │  stop_politely / stop_immediately         │
//! │  └──────────────┘                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stopping
//!
//! - [`ServerHandle::stop_politely`] shuts the listening socket down, which
//!   fails the blocked accept call and ends the loop. In-flight
//!   connections are untouched.
//! - [`ServerHandle::stop_immediately`] abandons the pool first (queued
//!   connections are dropped, running ones finish) and then stops the
//!   listener.
//!
//! Dropping the [`Server`] drains the pool, stops the listener, and joins
//! every worker, so normal teardown leaks neither threads nor descriptors.

pub mod config;
pub mod listener;

// Re-export commonly used types
pub use config::ServerConfig;
pub use listener::{Server, ServerError, ServerHandle};
