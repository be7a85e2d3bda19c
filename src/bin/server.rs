//! Wordbank Server Binary
//!
//! Loads the database file and serves it over TCP. Reads console commands
//! from stdin while running.

use std::io::{self, BufRead};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use wordbank::{Config, DuplicateKeyPolicy, RecordStore, Server};

/// Wordbank Server
#[derive(Parser, Debug)]
#[command(name = "wordbank-server")]
#[command(about = "Concurrent vocabulary record store server")]
#[command(version)]
struct Args {
    /// Database file
    #[arg(short, long, default_value = "./wordbank.db")]
    db: String,

    /// Field delimiter used in the database file
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Start with an empty store if the database file does not exist
    #[arg(long)]
    create: bool,

    /// Refuse to add an entry whose key is already stored
    #[arg(long)]
    reject_duplicate_keys: bool,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7777")]
    listen: String,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "25")]
    workers: usize,
}

const HELP: &str = "commands: save | status | stop | start | quit";

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wordbank=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Wordbank Server v{}", wordbank::VERSION);
    tracing::info!("Database file: {}", args.db);
    tracing::info!("Listen address: {}", args.listen);

    let policy = if args.reject_duplicate_keys {
        DuplicateKeyPolicy::Reject
    } else {
        DuplicateKeyPolicy::Overwrite
    };

    // Build config from args
    let config = match Config::builder()
        .db_path(&args.db)
        .delimiter(args.delimiter)
        .duplicate_key_policy(policy)
        .listen_addr(&args.listen)
        .worker_threads(args.workers)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    // Open store
    let opened = if args.create {
        RecordStore::open_or_create(config.clone())
    } else {
        RecordStore::open(config.clone())
    };
    let store = match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open {}: {}", args.db, e);
            std::process::exit(1);
        }
    };

    // Start server
    let mut server = match Server::new(config, Arc::clone(&store)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = server.start() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("{}", HELP);
    console(&mut server, &store);

    server.shutdown();
    if let Err(e) = store.save() {
        tracing::error!("Final save failed: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Serve console commands until `quit` or end of input
fn console(server: &mut Server, store: &RecordStore) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Could not read console input: {}", e);
                break;
            }
        };

        match line.trim() {
            "" => {}
            "save" => match store.save() {
                Ok(()) => tracing::info!("Saved"),
                Err(e) => tracing::error!("Save failed: {}", e),
            },
            "status" => tracing::info!(
                "{} on {}, {} entries, {} open connections",
                if server.is_running() { "running" } else { "stopped" },
                server.local_addr(),
                store.len(),
                server.active_connections()
            ),
            "stop" => server.shutdown(),
            "start" => {
                let restarted = if server.is_running() {
                    Ok(())
                } else {
                    server.create_socket().and_then(|_| server.start())
                };
                if let Err(e) = restarted {
                    tracing::error!("Could not start: {}", e);
                }
            }
            "quit" | "exit" => break,
            other => tracing::warn!("Unknown command {:?}; {}", other, HELP),
        }
    }
}
