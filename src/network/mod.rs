//! Network Module
//!
//! TCP server, connection handling and client proxy.
//!
//! ## Architecture
//! - Single acceptor thread per server
//! - Fixed-size worker pool, one connection per job
//! - Requests routed through the RecordStore
//! - Client proxy speaking the same protocol

mod pool;
mod server;
mod connection;
mod client;

pub use pool::WorkerPool;
pub use server::{Server, StopHandle};
pub use connection::Connection;
pub use client::{probe, Client, ServerStatus};
