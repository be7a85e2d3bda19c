//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Ver (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! - Ver: protocol version, currently [`PROTOCOL_VERSION`]
//! - Len: payload length, big endian
//! - Payload: bincode encoded [`Request`] or [`Response`]

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, WordbankError};
use super::{Request, Response};

/// Current protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Header size: 1 byte version + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frame Encoding/Decoding
// =============================================================================

fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(message)?;
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(WordbankError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u8(PROTOCOL_VERSION);
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);

    Ok(frame.to_vec())
}

/// Parse and validate a header, returning the payload length
fn parse_header(mut header: &[u8]) -> Result<usize> {
    let version = header.get_u8();
    if version != PROTOCOL_VERSION {
        return Err(WordbankError::Protocol(format!(
            "Unsupported protocol version: {} (expected {})",
            version, PROTOCOL_VERSION
        )));
    }

    let payload_len = header.get_u32();
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(WordbankError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    Ok(payload_len as usize)
}

fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_SIZE {
        return Err(WordbankError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = parse_header(&bytes[..HEADER_SIZE])?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(WordbankError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok(bincode::deserialize(&bytes[HEADER_SIZE..total_len])?)
}

fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = parse_header(&header)?;

    // Read payload
    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }

    Ok(bincode::deserialize(&payload)?)
}

fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let bytes = encode_frame(message)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to a complete frame
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    encode_frame(request)
}

/// Decode a request from a complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    decode_frame(bytes)
}

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    read_frame(reader)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    write_frame(writer, request)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to a complete frame
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    encode_frame(response)
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    decode_frame(bytes)
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    read_frame(reader)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_frame(writer, response)
}
