//! Echo Connection Handler
//!
//! One [`EchoHandler`] owns one accepted connection for its whole lifetime
//! and echoes every received byte back to the peer unchanged. There is no
//! application-layer framing: whatever a single receive returns is sent
//! straight back.
//!
//! The handler runs as a pool job, so a connection occupies one worker
//! from dispatch until the peer disconnects or an I/O error ends it.

use crate::pool::Job;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Pause before shutting down a finished connection.
///
/// Closing immediately after the last send can reset the connection with
/// the final echo still queued in the kernel; this gives it a moment to
/// drain.
const CLOSE_DELAY: Duration = Duration::from_millis(1);

/// Counters shared by the accept loop and every connection handler.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total bytes received from clients
    pub bytes_read: AtomicU64,
    /// Total bytes echoed back
    pub bytes_written: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles one accepted connection, echoing received bytes back.
///
/// The connection alternates between receiving and sending until the peer
/// closes or an error ends it:
///
/// - receive of zero bytes: the peer closed gracefully, stop.
/// - receive would block: no data yet, poll again.
/// - any other receive error: stop.
/// - send of zero bytes or any send error: stop.
pub struct EchoHandler {
    /// The connection, in non-blocking mode, owned exclusively by this job
    stream: TcpStream,

    /// Peer address (for logging)
    peer: SocketAddr,

    /// Receive buffer, allocated once and reused for every cycle
    buffer: Vec<u8>,

    /// Shared counters
    stats: Arc<ServerStats>,
}

impl EchoHandler {
    /// Creates a handler for one accepted connection.
    ///
    /// The stream must already be in non-blocking mode; the accept loop
    /// switches it before constructing the handler.
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        buffer_size: usize,
        stats: Arc<ServerStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream,
            peer,
            buffer: vec![0; buffer_size],
            stats,
        }
    }

    /// One receive/send cycle. Returns `false` once the connection is done.
    fn echo_once(&mut self) -> bool {
        match self.stream.read(&mut self.buffer) {
            Ok(0) => {
                trace!(client = %self.peer, "peer closed the connection");
                false
            }
            Ok(received) => {
                self.stats.bytes_read(received);
                match self.stream.write(&self.buffer[..received]) {
                    Ok(sent) if sent > 0 => {
                        self.stats.bytes_written(sent);
                        trace!(client = %self.peer, received, sent, "echoed");
                        true
                    }
                    Ok(_) => {
                        trace!(client = %self.peer, "send wrote nothing");
                        false
                    }
                    Err(e) => {
                        debug!(client = %self.peer, error = %e, "send failed");
                        false
                    }
                }
            }
            // No data yet. Poll again without parking the thread.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
            Err(e) => {
                debug!(client = %self.peer, error = %e, "receive failed");
                false
            }
        }
    }
}

impl Job for EchoHandler {
    fn perform(mut self: Box<Self>, worker_id: usize) {
        debug!(worker = worker_id, client = %self.peer, "connection dispatched");

        while self.echo_once() {}

        // Let the final echo drain before the socket goes away.
        thread::sleep(CLOSE_DELAY);
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!(client = %self.peer, error = %e, "shutdown on closed connection");
        }

        self.stats.connection_closed();
        debug!(worker = worker_id, client = %self.peer, "connection closed");
    }
}
