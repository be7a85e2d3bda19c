//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, WordbankError};
use crate::protocol::{read_request, write_response, Failure, Request, Response};
use crate::store::RecordStore;

/// Handles a single client connection
///
/// Reads one request at a time, runs it against the store and writes back
/// exactly one response, until the client sends QUIT, the stream ends or an
/// error occurs. Failures here never affect other connections.
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the record store
    store: Arc<RecordStore>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(stream: TcpStream, store: Arc<RecordStore>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            store,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = no timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns when the client quits or disconnects, or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let request = match read_request(&mut self.reader) {
                Ok(request) => request,
                Err(ref e) if e.is_disconnect() => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(WordbankError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // WouldBlock on unix, TimedOut on windows
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    // Tell the client why before hanging up, if it is still listening
                    let _ = self.send_response(Response::Failed(Failure::Protocol(e.to_string())));
                    return Err(e);
                }
            };

            tracing::trace!("Received {} from {}: {:?}", request.name(), self.peer_addr, request);

            if request == Request::Quit {
                tracing::debug!("Client {} quit", self.peer_addr);
                // The acknowledgement is a courtesy; the session is over either way
                let _ = self.send_response(Response::Done);
                return Ok(());
            }

            let response = self.execute_request(request);

            if let Err(e) = self.send_response(response) {
                if e.is_disconnect() {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a request and return a response
    fn execute_request(&self, request: Request) -> Response {
        let name = request.name();
        match self.store.execute(request) {
            Ok(response) => {
                tracing::debug!("{} from {} succeeded", name, self.peer_addr);
                response
            }
            Err(e) => {
                if e.is_domain() {
                    tracing::info!("{} from {} rejected: {}", name, self.peer_addr, e);
                } else {
                    tracing::warn!("{} from {} failed: {}", name, self.peer_addr, e);
                }
                Response::Failed(Failure::from(&e))
            }
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
