//! Client Proxy
//!
//! Reaches a remote record store through a [`Server`](super::Server).

use std::fmt;
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::entry::Entry;
use crate::error::{Result, WordbankError};
use crate::protocol::{read_response, write_request, Request, Response};
use crate::store::EntryStore;

/// A connection to a Wordbank server that exposes the [`EntryStore`] API
///
/// Every call sends one request and blocks until its response arrives. If the
/// connection turns out to be dropped, the client reconnects once; only
/// idempotent requests (FIND, GET, PING) are re-sent on the new connection.
pub struct Client {
    addr: SocketAddr,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    stream: Mutex<Option<Stream>>,
}

/// One established connection
struct Stream {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Stream {
    fn open(
        addr: SocketAddr,
        connect_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, connect_timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(read_timeout)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    fn call(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        read_response(&mut self.reader)
    }

    fn close(&self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

impl Client {
    /// Connect to `addr` with default timeouts
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::connect_with(addr, &Config::default())
    }

    /// Connect to `addr` using the client timeouts from `config`
    ///
    /// Fails fast if the server is unreachable.
    pub fn connect_with<A: ToSocketAddrs>(addr: A, config: &Config) -> Result<Self> {
        config.validate()?;

        let connect_timeout = config.connect_timeout();
        let read_timeout = match config.client_read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        let mut last_err = None;
        for addr in addr.to_socket_addrs()? {
            match Stream::open(addr, connect_timeout, read_timeout) {
                Ok(stream) => {
                    tracing::debug!("Connected to {}", addr);
                    return Ok(Self {
                        addr,
                        connect_timeout,
                        read_timeout,
                        stream: Mutex::new(Some(stream)),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            WordbankError::InvalidArgument("address resolved to nothing".to_string())
        }))
    }

    fn open(&self) -> Result<Stream> {
        Stream::open(self.addr, self.connect_timeout, self.read_timeout)
    }

    /// Send a request and wait for its response
    ///
    /// A connection that failed mid-call is discarded, since a late response
    /// would be read as the answer to the next request.
    fn call(&self, request: Request) -> Result<Response> {
        let mut guard = self.stream.lock();

        let mut stream = match guard.take() {
            Some(stream) => stream,
            // Previous connection was discarded, nothing is in flight
            None => self.open()?,
        };

        let err = match stream.call(&request) {
            Ok(response) => {
                *guard = Some(stream);
                return Ok(response);
            }
            Err(e) => e,
        };
        stream.close();

        if !err.is_disconnect() {
            return Err(err);
        }

        tracing::debug!("Connection to {} dropped ({}), reconnecting", self.addr, err);
        let mut stream = self.open()?;

        if !request.is_idempotent() {
            // The server may or may not have applied it
            *guard = Some(stream);
            return Err(err);
        }

        tracing::debug!("Re-sending {} to {}", request.name(), self.addr);
        let response = stream.call(&request);
        if response.is_ok() {
            *guard = Some(stream);
        } else {
            stream.close();
        }
        response
    }

    /// Check the server is alive
    pub fn ping(&self) -> Result<()> {
        self.call(Request::Ping)?.into_pong()
    }

    /// Server address this client talks to
    pub fn server_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send QUIT and release the connection
    pub fn close(self) -> Result<()> {
        self.quit()
    }

    fn quit(&self) -> Result<()> {
        let Some(mut stream) = self.stream.lock().take() else {
            return Ok(());
        };
        let result = stream.call(&Request::Quit).and_then(Response::into_done);
        stream.close();
        result
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            tracing::debug!("QUIT to {} failed: {}", self.addr, e);
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("addr", &self.addr).finish()
    }
}

impl EntryStore for Client {
    fn add(&self, entry: Entry) -> Result<()> {
        self.call(Request::Add { entry })?.into_done()
    }

    fn remove(&self, entry: &Entry) -> Result<()> {
        self.call(Request::Remove {
            entry: entry.clone(),
        })?
        .into_done()
    }

    fn update(&self, new_entry: Entry, old_entry: &Entry) -> Result<()> {
        self.call(Request::Update {
            new_entry,
            old_entry: old_entry.clone(),
        })?
        .into_done()
    }

    fn find(&self, pattern: &str) -> Result<Vec<Entry>> {
        self.call(Request::Find {
            pattern: pattern.to_string(),
        })?
        .into_entries()
    }

    fn get_all(&self) -> Result<Vec<Entry>> {
        self.call(Request::Get)?.into_entries()
    }

    fn save(&self) -> Result<()> {
        self.call(Request::Save)?.into_done()
    }
}

/// Reachability of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Server accepted a connection and answered PING
    Online,
    /// Server could not be reached or did not answer
    Offline,
}

/// Open a throwaway connection to `addr` and ping it
pub fn probe<A: ToSocketAddrs>(addr: A, timeout: Duration) -> ServerStatus {
    let timeout_ms = u64::try_from(timeout.as_millis())
        .unwrap_or(u64::MAX)
        .max(1);
    let config = Config {
        connect_timeout_ms: timeout_ms,
        client_read_timeout_ms: timeout_ms,
        ..Config::default()
    };

    let status = Client::connect_with(addr, &config).and_then(|client| {
        client.ping()?;
        client.close()
    });

    match status {
        Ok(()) => ServerStatus::Online,
        Err(e) => {
            tracing::debug!("Server probe failed: {}", e);
            ServerStatus::Offline
        }
    }
}
