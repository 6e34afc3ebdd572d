//! TCP Server Implementation
//!
//! The server prepares its listening socket at construction time and runs
//! a blocking accept loop on whatever thread calls [`Server::start`]. Each
//! accepted connection is switched to non-blocking mode, wrapped in an
//! [`EchoHandler`], and submitted to the worker pool.
//!
//! Stopping works through the socket, not through thread interrupts:
//! shutting the listener down makes the blocked accept call fail, and the
//! loop exits on any accept failure.

use crate::connection::{EchoHandler, ServerStats};
use crate::pool::{PoolError, WorkerPool};
use crate::server::ServerConfig;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Errors that make server construction fail.
///
/// All of these are fatal: the server is not usable and nothing is
/// retried. Each variant maps to one step of socket preparation, plus one
/// for the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured bind address did not resolve
    #[error("invalid bind address: {0}")]
    Address(#[source] io::Error),

    /// The listening socket could not be created
    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    /// A socket option could not be set
    #[error("failed to set socket options: {0}")]
    Options(#[source] io::Error),

    /// The socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The socket could not start listening
    #[error("failed to listen with backlog {backlog}: {source}")]
    Listen {
        backlog: u32,
        #[source]
        source: io::Error,
    },

    /// The worker pool could not be started
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// State shared between the server and its control handles.
struct ServerShared {
    listener: TcpListener,
    pool: WorkerPool,
    stats: Arc<ServerStats>,
    buffer_size: usize,
}

impl ServerShared {
    fn stop_politely(&self) {
        // Shutting the listener down fails the blocked accept call, which
        // is what ends the accept loop. In-flight connections are
        // untouched. A listener that is already shut down reports an
        // error here, which makes repeated stops harmless.
        if let Err(e) = SockRef::from(&self.listener).shutdown(Shutdown::Both) {
            debug!(error = %e, "listener already shut down");
        }
    }

    fn stop_immediately(&self) {
        self.pool.abandon_and_stop();
        self.stop_politely();
    }
}

/// A TCP echo server that dispatches each accepted connection to a
/// bounded worker pool.
///
/// The listening socket is fully prepared (reuse options, bind, listen) in
/// [`Server::new`]; [`Server::start`] then occupies the calling thread
/// with the accept loop until the listener is shut down from another
/// thread through a [`ServerHandle`].
///
/// # Example
///
/// ```no_run
/// use echopool::{Server, ServerConfig};
///
/// let server = Server::new(ServerConfig::default()).unwrap();
/// let handle = server.handle();
///
/// // hand `handle` to signal-handling glue, then:
/// server.start();
/// ```
pub struct Server {
    shared: Arc<ServerShared>,
}

impl Server {
    /// Prepares the listening socket and starts the worker pool.
    ///
    /// Socket preparation creates the socket, enables address reuse (and
    /// port reuse on Unix), binds the configured address, and starts
    /// listening with the configured backlog.
    ///
    /// # Errors
    ///
    /// Any failure during socket preparation or pool startup is returned
    /// as a [`ServerError`] and the server must not be used.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = resolve_bind_address(&config)?;
        let listener = prepare_socket(addr, config.backlog)?;
        let pool = WorkerPool::new(config.workers)?;

        info!(
            addr = %listener.local_addr().map_err(ServerError::Socket)?,
            backlog = config.backlog,
            workers = config.workers,
            "server ready"
        );

        Ok(Server {
            shared: Arc::new(ServerShared {
                listener,
                pool,
                stats: Arc::new(ServerStats::new()),
                buffer_size: config.buffer_size,
            }),
        })
    }

    /// Runs the accept loop on the calling thread.
    ///
    /// Exactly one thread runs this loop while the server is up. Each
    /// accepted connection becomes an [`EchoHandler`] job in the pool. The
    /// call returns once accept fails, which is how
    /// [`stop_politely`](Server::stop_politely) and
    /// [`stop_immediately`](Server::stop_immediately) end it from another
    /// thread.
    pub fn start(&self) {
        info!("accepting connections");

        loop {
            match self.shared.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(client = %peer, "connection accepted");
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!(client = %peer, error = %e, "dropping connection, could not make it non-blocking");
                        continue;
                    }
                    self.shared.pool.submit(EchoHandler::new(
                        stream,
                        peer,
                        self.shared.buffer_size,
                        Arc::clone(&self.shared.stats),
                    ));
                }
                Err(e) => {
                    info!(error = %e, "leaving accept loop");
                    break;
                }
            }
        }
    }

    /// Shuts down the listening socket so the accept loop exits on its
    /// own. Does not touch the worker pool. Safe to call repeatedly.
    pub fn stop_politely(&self) {
        self.shared.stop_politely();
    }

    /// Abandons the worker pool (queued connections are dropped, running
    /// ones finish), then stops the listener. The descriptor itself is
    /// released when the server is dropped.
    pub fn stop_immediately(&self) {
        self.shared.stop_immediately();
    }

    /// Returns the address the server is actually listening on.
    ///
    /// Useful when the configured port is 0 and the OS picked one.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.shared.listener.local_addr()
    }

    /// Returns the shared connection counters.
    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.shared.stats)
    }

    /// Returns a cloneable handle for stopping the server from another
    /// thread, typically signal-handling glue.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shared.pool.drain_and_finish();
        self.shared.stop_politely();
        // The queue is already empty, so this only joins the workers.
        self.shared.pool.abandon_and_stop();
    }
}

/// Control surface for a running [`Server`].
///
/// The handle exposes exactly the operations the surrounding process
/// wiring needs: a polite stop and a forceful one. It keeps the shared
/// state alive but does not own the server's teardown; that stays with
/// the [`Server`] value itself.
#[derive(Clone)]
pub struct ServerHandle {
    shared: Arc<ServerShared>,
}

impl ServerHandle {
    /// See [`Server::stop_politely`].
    pub fn stop_politely(&self) {
        self.shared.stop_politely();
    }

    /// See [`Server::stop_immediately`].
    pub fn stop_immediately(&self) {
        self.shared.stop_immediately();
    }
}

fn resolve_bind_address(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    config
        .bind_address()
        .to_socket_addrs()
        .map_err(ServerError::Address)?
        .next()
        .ok_or_else(|| {
            ServerError::Address(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no socket addresses found",
            ))
        })
}

/// Creates the listening socket: reuse options, bind, listen.
fn prepare_socket(addr: SocketAddr, backlog: u32) -> Result<TcpListener, ServerError> {
    let domain = Domain::for_address(addr);
    let socket =
        Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(ServerError::Socket)?;

    socket.set_reuse_address(true).map_err(ServerError::Options)?;

    #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
    socket.set_reuse_port(true).map_err(ServerError::Options)?;

    socket
        .bind(&addr.into())
        .map_err(|source| ServerError::Bind { addr, source })?;

    let raw_backlog = i32::try_from(backlog).unwrap_or(i32::MAX);
    socket
        .listen(raw_backlog)
        .map_err(|source| ServerError::Listen { backlog, source })?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::Duration;

    fn test_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            backlog: 5,
            workers: 2,
            ..ServerConfig::default()
        }
    }

    /// Starts a server on an ephemeral port and runs its accept loop on a
    /// background thread. The server is dropped on that thread when the
    /// loop ends, which exercises the teardown path in every test.
    fn start_server(config: ServerConfig) -> (SocketAddr, ServerHandle, thread::JoinHandle<()>) {
        let server = Server::new(config).unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.handle();
        let accept_thread = thread::spawn(move || {
            server.start();
        });
        (addr, handle, accept_thread)
    }

    #[test]
    fn echoes_ping_to_three_concurrent_clients() {
        let (addr, handle, server) = start_server(test_config());

        let mut clients = Vec::new();
        for _ in 0..3 {
            clients.push(thread::spawn(move || {
                let mut client = TcpStream::connect(addr).unwrap();
                client.write_all(b"ping").unwrap();

                let mut reply = [0u8; 4];
                client.read_exact(&mut reply).unwrap();
                assert_eq!(&reply, b"ping");
            }));
        }
        for client in clients {
            client.join().unwrap();
        }

        handle.stop_politely();
        server.join().unwrap();
    }

    #[test]
    fn polite_stop_is_idempotent() {
        let (_addr, handle, server) = start_server(test_config());

        handle.stop_politely();
        handle.stop_politely();

        // The accept loop exits and the server is dropped after an
        // explicit stop without hanging or panicking.
        server.join().unwrap();
    }

    #[test]
    fn immediate_stop_unblocks_the_accept_loop() {
        let (addr, handle, server) = start_server(test_config());

        // Prove the server is live, then close the connection so the
        // worker serving it can finish; an immediate stop still waits for
        // jobs that are already executing.
        let client = TcpStream::connect(addr).unwrap();
        drop(client);

        handle.stop_immediately();
        server.join().unwrap();
    }

    #[test]
    fn construction_fails_when_the_port_is_taken() {
        // A plain listener without port reuse occupies the port, so the
        // server's bind step must fail.
        let existing = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = existing.local_addr().unwrap().port();

        let config = ServerConfig {
            port,
            ..ServerConfig::default()
        };
        let result = Server::new(config);
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[test]
    fn stats_reflect_served_connections() {
        let server = Server::new(test_config()).unwrap();
        let stats = server.stats();
        let addr = server.local_addr().unwrap();
        let handle = server.handle();
        let accept_thread = thread::spawn(move || server.start());

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"ping").unwrap();
        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).unwrap();
        drop(client);

        // The handler finishes shortly after the peer closes.
        for _ in 0..100 {
            if stats.connections_accepted.load(Ordering::Relaxed) == 1
                && stats.active_connections.load(Ordering::Relaxed) == 0
            {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 4);

        handle.stop_politely();
        accept_thread.join().unwrap();
    }
}
