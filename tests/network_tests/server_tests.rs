//! Tests for Server and Connection
//!
//! These tests verify:
//! - Requests over a raw framed connection
//! - Per-connection error isolation
//! - Server lifecycle (start/shutdown/rebind/restart)

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use wordbank::protocol::{read_response, write_request, Failure, Request, Response};
use wordbank::{Config, Entry, RecordStore, Server, WordbankError};

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .db_path(temp_dir.path().join("words.db"))
        .listen_addr("127.0.0.1:0")
        .worker_threads(4)
        .accept_poll_ms(10)
        .build()
        .unwrap()
}

fn setup_server() -> (TempDir, Server) {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let store = Arc::new(RecordStore::create(config.clone()).unwrap());
    let mut server = Server::new(config, store).unwrap();
    server.start().unwrap();
    (temp_dir, server)
}

/// A bare protocol connection, without the reconnect logic of `Client`
struct RawConnection {
    stream: TcpStream,
}

impl RawConnection {
    fn open(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        Self { stream }
    }

    fn call(&mut self, request: Request) -> Response {
        write_request(&mut self.stream, &request).unwrap();
        read_response(&mut self.stream).unwrap()
    }

    /// True once the server has closed its side
    fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.stream.read(&mut buf), Ok(0) | Err(_))
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn inu() -> Entry {
    Entry::new("inu", "いぬ", "dog")
}

// =============================================================================
// Request Handling Tests
// =============================================================================

#[test]
fn test_add_then_remove_over_connection() {
    let (_temp, server) = setup_server();
    let mut conn = RawConnection::open(server.local_addr());

    assert_eq!(conn.call(Request::Add { entry: inu() }), Response::Done);
    assert!(server.store().contains(&inu()));

    assert_eq!(conn.call(Request::Remove { entry: inu() }), Response::Done);
    assert!(!server.store().get_all().iter().any(|e| e.key() == "inu"));
}

#[test]
fn test_queries_over_connection() {
    let (_temp, server) = setup_server();
    server.store().add(inu()).unwrap();
    let mut conn = RawConnection::open(server.local_addr());

    assert_eq!(conn.call(Request::Get), Response::Entries(vec![inu()]));
    assert_eq!(
        conn.call(Request::Find {
            pattern: "いぬ".to_string()
        }),
        Response::Entries(vec![inu()])
    );
    assert_eq!(conn.call(Request::Ping), Response::Pong);
}

#[test]
fn test_domain_failure_keeps_connection_open() {
    let (_temp, server) = setup_server();
    let mut conn = RawConnection::open(server.local_addr());

    assert_eq!(
        conn.call(Request::Remove { entry: inu() }),
        Response::Failed(Failure::EntryDoesNotExist(inu()))
    );
    assert!(matches!(
        conn.call(Request::Find {
            pattern: "[".to_string()
        }),
        Response::Failed(Failure::InvalidRegexPattern(_))
    ));

    // Still usable
    assert_eq!(conn.call(Request::Ping), Response::Pong);
}

#[test]
fn test_save_over_connection() {
    let (temp, server) = setup_server();
    let mut conn = RawConnection::open(server.local_addr());

    conn.call(Request::Add { entry: inu() });
    assert_eq!(conn.call(Request::Save), Response::Done);

    let contents = std::fs::read_to_string(temp.path().join("words.db")).unwrap();
    assert_eq!(contents, "inu;いぬ;dog\n");
}

#[test]
fn test_quit_is_acknowledged() {
    let (_temp, server) = setup_server();
    let mut conn = RawConnection::open(server.local_addr());

    assert_eq!(conn.call(Request::Quit), Response::Done);
    assert!(conn.is_closed());
}

#[test]
fn test_bad_frame_gets_protocol_failure() {
    let (_temp, server) = setup_server();
    let mut conn = RawConnection::open(server.local_addr());

    // Wrong version byte
    conn.stream.write_all(&[0xEE, 0, 0, 0, 0]).unwrap();

    let response = read_response(&mut conn.stream).unwrap();
    assert!(matches!(response, Response::Failed(Failure::Protocol(_))));
    assert!(conn.is_closed());
}

#[test]
fn test_bad_client_does_not_affect_others() {
    let (_temp, server) = setup_server();
    let mut good = RawConnection::open(server.local_addr());
    let mut bad = RawConnection::open(server.local_addr());

    bad.stream.write_all(b"garbage!").unwrap();
    drop(bad);

    assert_eq!(good.call(Request::Add { entry: inu() }), Response::Done);
    assert_eq!(good.call(Request::Get), Response::Entries(vec![inu()]));
}

#[test]
fn test_many_concurrent_connections() {
    let (_temp, server) = setup_server();
    let addr = server.local_addr();

    // More clients than workers; queued connections are served in turn
    let handles: Vec<_> = (0..12)
        .map(|i| {
            thread::spawn(move || {
                let mut conn = RawConnection::open(addr);
                let entry = Entry::new(format!("key{}", i), "r", "m");
                assert_eq!(conn.call(Request::Add { entry }), Response::Done);
                assert_eq!(conn.call(Request::Quit), Response::Done);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.store().len(), 12);
}

#[test]
fn test_active_connections_tracked() {
    let (_temp, server) = setup_server();
    let mut conn = RawConnection::open(server.local_addr());
    conn.call(Request::Ping);

    assert_eq!(server.active_connections(), 1);

    conn.call(Request::Quit);
    assert!(wait_until(|| server.active_connections() == 0));
}

#[test]
fn test_idle_connection_times_out() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir);
    config.read_timeout_ms = 100;
    let store = Arc::new(RecordStore::create(config.clone()).unwrap());
    let mut server = Server::new(config, store).unwrap();
    server.start().unwrap();

    let mut conn = RawConnection::open(server.local_addr());
    assert_eq!(conn.call(Request::Ping), Response::Pong);

    assert!(conn.is_closed());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_start_and_shutdown() {
    let (_temp, mut server) = setup_server();
    assert!(server.is_running());

    server.shutdown();

    assert!(!server.is_running());
    assert!(TcpStream::connect(server.local_addr()).is_err());
}

#[test]
fn test_start_twice_fails() {
    let (_temp, mut server) = setup_server();

    assert!(matches!(server.start(), Err(WordbankError::Config(_))));
}

#[test]
fn test_rebind_while_running_fails() {
    let (_temp, mut server) = setup_server();

    assert!(matches!(server.create_socket(), Err(WordbankError::Config(_))));
}

#[test]
fn test_start_without_socket_fails() {
    let (_temp, mut server) = setup_server();
    server.shutdown();

    assert!(matches!(server.start(), Err(WordbankError::Config(_))));
}

#[test]
fn test_shutdown_hangs_up_open_connections() {
    let (_temp, mut server) = setup_server();
    let mut conn = RawConnection::open(server.local_addr());
    assert_eq!(conn.call(Request::Ping), Response::Pong);

    server.shutdown();

    assert!(conn.is_closed());
}

#[test]
fn test_restart_on_same_port() {
    let (_temp, mut server) = setup_server();
    let addr = server.local_addr();
    server.store().add(inu()).unwrap();

    server.shutdown();
    server.create_socket().unwrap();
    server.start().unwrap();

    assert_eq!(server.local_addr(), addr);
    let mut conn = RawConnection::open(addr);
    assert_eq!(conn.call(Request::Get), Response::Entries(vec![inu()]));
}

#[test]
fn test_restart_on_other_port() {
    let (_temp, mut server) = setup_server();
    server.shutdown();

    server.create_socket_on(0).unwrap();
    server.start().unwrap();

    let mut conn = RawConnection::open(server.local_addr());
    assert_eq!(conn.call(Request::Ping), Response::Pong);
}

#[test]
fn test_run_until_stopped() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let store = Arc::new(RecordStore::create(config.clone()).unwrap());
    let mut server = Server::new(config, store).unwrap();
    let addr = server.local_addr();
    let stop = server.stop_handle();

    let handle = thread::spawn(move || {
        server.run().unwrap();
        server
    });

    let mut conn = RawConnection::open(addr);
    assert_eq!(conn.call(Request::Ping), Response::Pong);

    stop.stop();
    let server = handle.join().unwrap();
    assert!(!server.is_running());
}
