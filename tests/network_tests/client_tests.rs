//! Tests for Client
//!
//! These tests verify:
//! - The remote EntryStore API and its typed errors
//! - Reconnecting after the server restarts
//! - Server probing

use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use wordbank::network::{probe, ServerStatus};
use wordbank::{Client, Config, Entry, EntryStore, RecordStore, Server, WordbankError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_server() -> (TempDir, Server) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("words.db"))
        .listen_addr("127.0.0.1:0")
        .worker_threads(4)
        .accept_poll_ms(10)
        .build()
        .unwrap();
    let store = Arc::new(RecordStore::create(config.clone()).unwrap());
    let mut server = Server::new(config, store).unwrap();
    server.start().unwrap();
    (temp_dir, server)
}

fn unused_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

fn inu() -> Entry {
    Entry::new("inu", "いぬ", "dog")
}

fn neko() -> Entry {
    Entry::new("neko", "ねこ", "cat")
}

/// The same sequence of calls, run against any front end
fn exercise(store: &dyn EntryStore) {
    store.add(inu()).unwrap();
    store.add(neko()).unwrap();
    store.update(Entry::new("inu", "いぬ", "puppy"), &inu()).unwrap();
    store.remove(&neko()).unwrap();

    assert_eq!(store.get_all().unwrap(), vec![Entry::new("inu", "いぬ", "puppy")]);
    assert_eq!(store.find("pup").unwrap().len(), 1);
    assert!(store.find("cat").unwrap().is_empty());
}

// =============================================================================
// EntryStore API Tests
// =============================================================================

#[test]
fn test_client_behaves_like_local_store() {
    let (_temp, server) = setup_server();
    let client = Client::connect(server.local_addr()).unwrap();

    exercise(&client);

    let local_temp = TempDir::new().unwrap();
    let local = RecordStore::create(
        Config::builder()
            .db_path(local_temp.path().join("local.db"))
            .build()
            .unwrap(),
    )
    .unwrap();
    exercise(&local);

    assert_eq!(client.get_all().unwrap(), local.get_all());
    assert_eq!(server.store().get_all(), local.get_all());
}

#[test]
fn test_client_typed_errors() {
    let (_temp, server) = setup_server();
    let client = Client::connect(server.local_addr()).unwrap();
    client.add(inu()).unwrap();

    match client.add(inu()) {
        Err(WordbankError::EntryAlreadyExists(entry)) => assert_eq!(entry, inu()),
        other => panic!("Expected EntryAlreadyExists, got {:?}", other),
    }
    assert!(matches!(
        client.remove(&neko()),
        Err(WordbankError::EntryDoesNotExist(_))
    ));
    assert!(matches!(
        client.update(inu(), &Entry::new("inu", "いぬ", "wolf")),
        Err(WordbankError::StaleEntry(_))
    ));
    assert!(matches!(
        client.find(""),
        Err(WordbankError::InvalidRegexPattern(_))
    ));
    assert!(matches!(
        client.add(Entry::new("a;b", "c", "d")),
        Err(WordbankError::InvalidArgument(_))
    ));

    // Stale update left the original in place
    assert_eq!(client.get_all().unwrap(), vec![inu()]);
}

#[test]
fn test_client_save() {
    let (temp, server) = setup_server();
    let client = Client::connect(server.local_addr()).unwrap();
    client.add(inu()).unwrap();

    client.save().unwrap();

    let contents = std::fs::read_to_string(temp.path().join("words.db")).unwrap();
    assert_eq!(contents, "inu;いぬ;dog\n");
}

#[test]
fn test_client_ping_and_close() {
    let (_temp, server) = setup_server();
    let client = Client::connect(server.local_addr()).unwrap();

    client.ping().unwrap();
    assert_eq!(client.server_addr(), server.local_addr());
    client.close().unwrap();
}

#[test]
fn test_client_drop_releases_connection() {
    let (_temp, server) = setup_server();
    {
        let client = Client::connect(server.local_addr()).unwrap();
        client.ping().unwrap();
        assert_eq!(server.active_connections(), 1);
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while server.active_connections() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(server.active_connections(), 0);
}

#[test]
fn test_two_clients_see_each_other() {
    let (_temp, server) = setup_server();
    let alice = Client::connect(server.local_addr()).unwrap();
    let bob = Client::connect(server.local_addr()).unwrap();

    alice.add(inu()).unwrap();
    bob.update(Entry::new("inu", "いぬ", "puppy"), &inu()).unwrap();

    // Alice's view is now stale
    assert!(matches!(
        alice.update(Entry::new("inu", "いぬ", "hound"), &inu()),
        Err(WordbankError::StaleEntry(_))
    ));
    assert_eq!(alice.find("puppy").unwrap().len(), 1);
}

// =============================================================================
// Connection Failure Tests
// =============================================================================

#[test]
fn test_connect_to_closed_port_fails() {
    let addr = unused_addr();

    let result = Client::connect(addr.as_str());
    assert!(matches!(result, Err(WordbankError::Io(_))));
}

#[test]
fn test_connect_with_zero_timeout_rejected() {
    let (_temp, server) = setup_server();
    let config = Config {
        connect_timeout_ms: 0,
        ..Config::default()
    };

    let result = Client::connect_with(server.local_addr(), &config);
    assert!(matches!(result, Err(WordbankError::Config(_))));
}

#[test]
fn test_reconnect_retries_idempotent_request() {
    let (_temp, mut server) = setup_server();
    let client = Client::connect(server.local_addr()).unwrap();
    client.add(inu()).unwrap();

    server.shutdown();
    server.create_socket().unwrap();
    server.start().unwrap();

    // The old connection was hung up; FIND is re-sent on a new one
    assert_eq!(client.find("dog").unwrap(), vec![inu()]);
}

#[test]
fn test_reconnect_does_not_resend_mutation() {
    let (_temp, mut server) = setup_server();
    let client = Client::connect(server.local_addr()).unwrap();
    client.ping().unwrap();

    server.shutdown();
    server.create_socket().unwrap();
    server.start().unwrap();

    // ADD is not re-sent, the caller sees the dropped connection
    assert!(matches!(client.add(inu()), Err(WordbankError::Io(_))));
    assert!(server.store().is_empty());

    // The client already holds the new connection
    client.add(inu()).unwrap();
    assert_eq!(server.store().get_all(), vec![inu()]);
}

#[test]
fn test_call_fails_while_server_down() {
    let (_temp, mut server) = setup_server();
    let client = Client::connect(server.local_addr()).unwrap();

    server.shutdown();

    assert!(client.get_all().is_err());
}

// =============================================================================
// Probe Tests
// =============================================================================

#[test]
fn test_probe_online() {
    let (_temp, server) = setup_server();

    assert_eq!(
        probe(server.local_addr(), Duration::from_secs(2)),
        ServerStatus::Online
    );
}

#[test]
fn test_probe_with_huge_timeout() {
    let (_temp, server) = setup_server();

    // Millisecond count does not fit in a u64
    assert_eq!(probe(server.local_addr(), Duration::MAX), ServerStatus::Online);
}

#[test]
fn test_probe_offline() {
    let addr = unused_addr();

    assert_eq!(
        probe(addr.as_str(), Duration::from_millis(500)),
        ServerStatus::Offline
    );
}

#[test]
fn test_probe_after_shutdown() {
    let (_temp, mut server) = setup_server();
    let addr = server.local_addr();
    server.shutdown();

    assert_eq!(probe(addr, Duration::from_millis(500)), ServerStatus::Offline);
}
