//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Frame Format (V1)
//!
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Ver (1)  │ Len (4)  │     Payload (bincode)       │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Requests and responses use the same frame; the payload is a bincode
//! encoded [`Request`] or [`Response`]. Every request gets exactly one
//! response on the same connection, in order.
//!
//! ### Commands
//! - ADD, REMOVE, UPDATE: mutate the store, answered with `Done`
//! - FIND, GET: answered with `Entries`
//! - SAVE: answered with `Done`
//! - PING: answered with `Pong`
//! - QUIT: answered with `Done`, then the server closes the connection
//!
//! Any failure is answered with `Failed` carrying a typed [`Failure`].

mod request;
mod response;
mod codec;

pub use request::Request;
pub use response::{Failure, Response};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
    PROTOCOL_VERSION,
};
