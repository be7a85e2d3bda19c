//! TCP Server
//!
//! Accepts connections and dispatches them to the worker pool.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, WordbankError};
use crate::store::RecordStore;

use super::{Connection, WorkerPool};

/// TCP server for Wordbank
///
/// Owns the listening socket, an acceptor thread and a [`WorkerPool`]. Each
/// accepted connection becomes a [`Connection`] job on the pool.
///
/// ## Lifecycle
/// - `new` binds the socket
/// - `start` spawns the acceptor (and a fresh pool if needed)
/// - `shutdown` stops the acceptor, closes the socket, hangs up open
///   connections and shuts the pool down. It does not wait for running
///   workers to finish.
/// - `create_socket` / `create_socket_on` rebind after a shutdown so the
///   server can be started again
pub struct Server {
    config: Config,
    store: Arc<RecordStore>,

    /// Bound socket waiting for `start`
    listener: Option<TcpListener>,

    /// Address of the most recently bound socket
    local_addr: SocketAddr,

    pool: Option<Arc<WorkerPool>>,
    acceptor: Option<JoinHandle<()>>,

    /// Stop signal polled by the acceptor
    stop: Arc<AtomicBool>,

    /// True while the acceptor loop runs
    running: Arc<AtomicBool>,

    connections: Arc<ConnectionRegistry>,
}

impl Server {
    /// Create a server and bind it to `config.listen_addr`
    pub fn new(config: Config, store: Arc<RecordStore>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Bound to {}", local_addr);

        Ok(Self {
            config,
            store,
            listener: Some(listener),
            local_addr,
            pool: None,
            acceptor: None,
            stop: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            connections: Arc::new(ConnectionRegistry::default()),
        })
    }

    /// Rebind to the address the server was last bound to
    pub fn create_socket(&mut self) -> Result<()> {
        self.bind(self.local_addr)
    }

    /// Rebind to `port` on the same interface
    pub fn create_socket_on(&mut self, port: u16) -> Result<()> {
        self.bind(SocketAddr::new(self.local_addr.ip(), port))
    }

    fn bind<A: ToSocketAddrs>(&mut self, addr: A) -> Result<()> {
        if self.is_running() {
            return Err(WordbankError::Config(
                "cannot rebind while the server is running".to_string(),
            ));
        }

        let listener = TcpListener::bind(addr)?;
        self.local_addr = listener.local_addr()?;
        self.listener = Some(listener);
        tracing::info!("Bound to {}", self.local_addr);
        Ok(())
    }

    /// Start accepting connections on a background acceptor thread
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(WordbankError::Config("server is already running".to_string()));
        }
        // Reap an acceptor that stopped on its own
        self.join_acceptor();

        let listener = self.listener.take().ok_or_else(|| {
            WordbankError::Config("no listening socket, call create_socket first".to_string())
        })?;
        listener.set_nonblocking(true)?;

        let pool = match &self.pool {
            Some(pool) if !pool.is_shutdown() => Arc::clone(pool),
            _ => {
                let pool = Arc::new(WorkerPool::new(self.config.worker_threads)?);
                self.pool = Some(Arc::clone(&pool));
                pool
            }
        };

        self.stop.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let acceptor = Acceptor {
            listener,
            addr: self.local_addr,
            pool,
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            stop: Arc::clone(&self.stop),
            running: Arc::clone(&self.running),
            connections: Arc::clone(&self.connections),
        };

        let handle = thread::Builder::new()
            .name("wordbank-acceptor".to_string())
            .spawn(move || acceptor.run());

        match handle {
            Ok(handle) => {
                self.acceptor = Some(handle);
                tracing::info!(
                    "Listening on {} with {} workers",
                    self.local_addr,
                    self.config.worker_threads
                );
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Start and block until the acceptor stops
    ///
    /// Use a [`StopHandle`] from another thread to end it.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        self.join_acceptor();
        Ok(())
    }

    /// Stop the acceptor and release the listening socket
    ///
    /// Open connections and the pool are left alone.
    pub fn close_socket(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.join_acceptor();
        self.listener = None;
    }

    /// Stop accepting, hang up open connections and shut the pool down
    ///
    /// Best-effort: workers are signalled but not waited for.
    pub fn shutdown(&mut self) {
        self.close_socket();

        let closed = self.connections.close_all();
        if closed > 0 {
            tracing::info!("Closed {} open connections", closed);
        }

        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
        tracing::info!("Server on {} shut down", self.local_addr);
    }

    /// Handle that can stop the acceptor from another thread
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    fn join_acceptor(&mut self) {
        if let Some(handle) = self.acceptor.take() {
            if handle.join().is_err() {
                tracing::error!("Acceptor thread panicked");
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Whether the acceptor loop is currently active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address of the most recently bound socket
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of client connections currently open
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    /// The store this server serves
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.is_running() || self.pool.is_some() {
            self.shutdown();
        }
    }
}

/// Stops a running [`Server`] acceptor from another thread
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
}

impl StopHandle {
    /// Signal the acceptor to stop; it exits within one poll interval
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// State moved onto the acceptor thread
struct Acceptor {
    listener: TcpListener,
    addr: SocketAddr,
    pool: Arc<WorkerPool>,
    store: Arc<RecordStore>,
    config: Config,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    connections: Arc<ConnectionRegistry>,
}

impl Acceptor {
    /// Accept until stopped, the pool shuts down, or accept fails
    ///
    /// The listener is non-blocking so the stop flag is seen within one poll
    /// interval; dropping it on return closes the socket.
    fn run(self) {
        let poll = self.config.accept_poll_interval();

        loop {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("Listener on {} closed", self.addr);
                break;
            }
            if self.pool.is_shutdown() {
                tracing::info!("Worker pool shut down, listener on {} closing", self.addr);
                break;
            }

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!("Accepted connection from {}", peer);
                    if let Err(e) = self.dispatch(stream) {
                        if matches!(e, WordbankError::PoolShutdown) {
                            tracing::info!("Worker pool shut down, listener on {} closing", self.addr);
                            break;
                        }
                        tracing::warn!("Could not serve {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("Accept failed on {}: {}", self.addr, e);
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
    }

    /// Hand an accepted stream to the pool
    fn dispatch(&self, stream: TcpStream) -> Result<()> {
        // Accepted sockets may inherit non-blocking mode from the listener
        stream.set_nonblocking(false)?;

        let id = self.connections.register(&stream)?;
        let store = Arc::clone(&self.store);
        let connections = Arc::clone(&self.connections);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = self.pool.spawn(move || {
            serve(stream, store, read_ms, write_ms);
            connections.unregister(id);
        });

        if spawned.is_err() {
            self.connections.unregister(id);
        }
        spawned
    }
}

/// Run one connection to completion
fn serve(stream: TcpStream, store: Arc<RecordStore>, read_ms: u64, write_ms: u64) {
    let mut connection = match Connection::new(stream, store) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Could not set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!("Could not set timeouts for {}: {}", connection.peer_addr(), e);
    }

    if let Err(e) = connection.handle() {
        tracing::warn!("Connection {} closed with error: {}", connection.peer_addr(), e);
    }
}

/// Open client sockets, so shutdown can hang them up
#[derive(Default)]
struct ConnectionRegistry {
    next_id: AtomicU64,
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl ConnectionRegistry {
    fn register(&self, stream: &TcpStream) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.streams.lock().insert(id, stream.try_clone()?);
        Ok(id)
    }

    fn unregister(&self, id: u64) {
        self.streams.lock().remove(&id);
    }

    /// Shut down every registered socket, returning how many there were
    fn close_all(&self) -> usize {
        let streams: Vec<_> = self.streams.lock().drain().collect();
        for (_, stream) in &streams {
            let _ = stream.shutdown(Shutdown::Both);
        }
        streams.len()
    }

    fn len(&self) -> usize {
        self.streams.lock().len()
    }
}
