//! Server Configuration
//!
//! Construction-time settings for the server. Three of these matter to the
//! protocol surface (port, backlog, worker count); host and buffer size
//! round out a deployable binary.

use crate::{DEFAULT_BACKLOG, DEFAULT_BUFFER_SIZE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WORKERS};

/// Configuration for [`Server`](crate::Server).
///
/// The defaults match the standard deployment: port 7777, a listen backlog
/// of 1000, four workers, and a 1 KiB per-connection buffer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// TCP port to listen on. Port 0 asks the OS for an ephemeral port,
    /// which the tests use.
    pub port: u16,

    /// Listen backlog handed to the kernel
    pub backlog: u32,

    /// Number of worker threads in the pool. Each busy connection occupies
    /// one worker, so this bounds the number of concurrently served
    /// clients.
    pub workers: usize,

    /// Size in bytes of each connection's receive buffer
    pub buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            workers: DEFAULT_WORKERS,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a `host:port` string.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
