//! Wordbank CLI Client
//!
//! Command-line interface for interacting with a Wordbank server.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use wordbank::network::{probe, ServerStatus};
use wordbank::persistence::export_csv;
use wordbank::{Client, Entry, EntryStore, Result};

/// Wordbank CLI
#[derive(Parser, Debug)]
#[command(name = "wordbank-cli")]
#[command(about = "CLI for the Wordbank record store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7777")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add an entry
    Add {
        key: String,
        reading: String,
        meaning: String,
    },

    /// Remove the entry stored under a key
    Remove {
        key: String,
    },

    /// Replace an entry, provided it has not changed on the server
    Update {
        /// Current key
        old_key: String,
        /// Current reading
        old_reading: String,
        /// Current meaning
        old_meaning: String,
        /// New key
        key: String,
        /// New reading
        reading: String,
        /// New meaning
        meaning: String,
    },

    /// Print entries where a regular expression matches any field
    Find {
        pattern: String,
    },

    /// Print every entry
    List,

    /// Ask the server to write its database file
    Save,

    /// Check whether the server is reachable
    Ping {
        /// Seconds to wait for an answer
        #[arg(short, long, default_value = "2")]
        timeout: u64,
    },

    /// Export every entry to a CSV file
    Export {
        /// Output file
        path: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    if let Commands::Ping { timeout } = args.command {
        match probe(&args.server, Duration::from_secs(timeout)) {
            ServerStatus::Online => println!("{} is online", args.server),
            ServerStatus::Offline => {
                println!("{} is offline", args.server);
                std::process::exit(1);
            }
        }
        return;
    }

    let client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&client, args.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(client: &Client, command: Commands) -> Result<()> {
    match command {
        Commands::Add { key, reading, meaning } => {
            client.add(Entry::new(key, reading, meaning))?;
            println!("OK");
        }
        Commands::Remove { key } => {
            // Removal only looks at the key
            client.remove(&Entry::new(key, "", ""))?;
            println!("OK");
        }
        Commands::Update {
            old_key,
            old_reading,
            old_meaning,
            key,
            reading,
            meaning,
        } => {
            let old = Entry::new(old_key, old_reading, old_meaning);
            client.update(Entry::new(key, reading, meaning), &old)?;
            println!("OK");
        }
        Commands::Find { pattern } => print_entries(&client.find(&pattern)?),
        Commands::List => print_entries(&client.get_all()?),
        Commands::Save => {
            client.save()?;
            println!("OK");
        }
        Commands::Export { path } => {
            let entries = client.get_all()?;
            export_csv(&entries, &path)?;
            println!("Exported {} entries to {}", entries.len(), path.display());
        }
        Commands::Ping { .. } => {
            client.ping()?;
            println!("PONG");
        }
    }
    Ok(())
}

fn print_entries(entries: &[Entry]) {
    for entry in entries {
        println!("{}", entry);
    }
    if entries.is_empty() {
        println!("(no entries)");
    }
}
