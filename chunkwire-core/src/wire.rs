//! Flat binary codec: tag byte, fixed header, variable payload. One message per frame.
//!
//! | Variant       | Layout after tag                     |
//! |---------------|--------------------------------------|
//! | Ack           | (none)                               |
//! | Info          | size: u32 LE, name: UTF-8 (rest)     |
//! | Chunk         | chunk_number: u8, chunk_bytes (rest) |
//! | InfoRequest   | id: UTF-8 (rest)                     |
//! | ChunkSizeInfo | chunk_size: u32 LE                   |
//! | ChunkRequest  | number: u8                           |
//!
//! No length prefix is written: the transport delivers whole frames.

use std::str::Utf8Error;

use crate::protocol::{Message, MessageType, ProtocolVersion, SIZE_FIELD_LEN};

/// Info: tag + size + at least one name byte.
const INFO_MIN_LEN: usize = 1 + SIZE_FIELD_LEN + 1;
/// InfoRequest: tag + at least one id byte.
const INFO_REQUEST_MIN_LEN: usize = 2;
/// Chunk: tag + chunk number; the payload may be empty.
const CHUNK_HEADER_LEN: usize = 2;
const CHUNK_REQUEST_MIN_LEN: usize = 2;
const CHUNK_SIZE_INFO_MIN_LEN: usize = 1 + SIZE_FIELD_LEN;

/// Error decoding a frame into a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,
    #[error("unknown message tag {0}")]
    UnknownTag(u8),
    #[error("expected {expected} message, found tag {found}")]
    TypeMismatch { expected: MessageType, found: u8 },
    #[error("{ty} frame too short: {len} bytes, need at least {min}")]
    TooShort {
        ty: MessageType,
        len: usize,
        min: usize,
    },
    #[error("chunk frame is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid utf-8 text: {0}")]
    Encoding(#[from] Utf8Error),
}

/// Encoder/decoder bound to one [`ProtocolVersion`]. Stateless and `Copy`;
/// share freely across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codec {
    version: ProtocolVersion,
}

impl Codec {
    pub const fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Encode a message into a single frame.
    pub fn encode(&self, msg: &Message) -> Vec<u8> {
        encode_with(self.version, msg)
    }

    /// Decode one complete frame. `expected_chunk_size` is only consulted for
    /// Chunk frames, which must then be exactly `2 + expected_chunk_size` long.
    pub fn decode(
        &self,
        bytes: &[u8],
        expected_chunk_size: Option<usize>,
    ) -> Result<Message, DecodeError> {
        let result = decode_with(self.version, bytes, expected_chunk_size);
        match &result {
            Ok(msg) => tracing::trace!(
                version = %self.version,
                ty = %msg.message_type(),
                len = bytes.len(),
                "decoded frame"
            ),
            Err(e) => tracing::debug!(
                version = %self.version,
                tag = bytes.first().copied(),
                len = bytes.len(),
                error = %e,
                "rejected frame"
            ),
        }
        result
    }

    /// Message type named by the frame's tag byte, without decoding the rest.
    pub fn peek_type(&self, bytes: &[u8]) -> Option<MessageType> {
        bytes.first().and_then(|&tag| self.version.message_type(tag))
    }
}

/// Encode with the current protocol's tags.
pub fn encode(msg: &Message) -> Vec<u8> {
    encode_with(ProtocolVersion::Current, msg)
}

/// Decode with the current protocol's tags. See [`Codec::decode`].
pub fn decode(bytes: &[u8], expected_chunk_size: Option<usize>) -> Result<Message, DecodeError> {
    decode_with(ProtocolVersion::Current, bytes, expected_chunk_size)
}

pub fn encode_with(version: ProtocolVersion, msg: &Message) -> Vec<u8> {
    let mut out = Vec::with_capacity(msg.encoded_len());
    out.push(version.tag(msg.message_type()));
    match msg {
        Message::Ack => {}
        Message::Info { name, size } => {
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(name.as_bytes());
        }
        Message::InfoRequest { id } => out.extend_from_slice(id.as_bytes()),
        Message::Chunk {
            chunk_number,
            chunk_bytes,
        } => {
            out.push(*chunk_number);
            out.extend_from_slice(chunk_bytes);
        }
        Message::ChunkRequest { number } => out.push(*number),
        Message::ChunkSizeInfo { chunk_size } => out.extend_from_slice(&chunk_size.to_le_bytes()),
    }
    out
}

/// Route a frame to its variant decoder by the leading tag.
pub fn decode_with(
    version: ProtocolVersion,
    bytes: &[u8],
    expected_chunk_size: Option<usize>,
) -> Result<Message, DecodeError> {
    let tag = *bytes.first().ok_or(DecodeError::Empty)?;
    let ty = version
        .message_type(tag)
        .ok_or(DecodeError::UnknownTag(tag))?;
    match ty {
        MessageType::Ack => decode_ack(version, bytes),
        MessageType::Info => decode_info(version, bytes),
        MessageType::Chunk => decode_chunk(version, bytes, expected_chunk_size),
        MessageType::InfoRequest => decode_info_request(version, bytes),
        MessageType::ChunkSizeInfo => decode_chunk_size_info(version, bytes),
        MessageType::ChunkRequest => decode_chunk_request(version, bytes),
    }
}

/// Ack: only the tag is checked.
pub fn decode_ack(version: ProtocolVersion, bytes: &[u8]) -> Result<Message, DecodeError> {
    ensure_len(MessageType::Ack, bytes, 1)?;
    expect_tag(version, MessageType::Ack, bytes)?;
    Ok(Message::Ack)
}

pub fn decode_info(version: ProtocolVersion, bytes: &[u8]) -> Result<Message, DecodeError> {
    ensure_len(MessageType::Info, bytes, INFO_MIN_LEN)?;
    expect_tag(version, MessageType::Info, bytes)?;
    let size = read_u32_le(bytes, 1);
    let name = read_text(&bytes[1 + SIZE_FIELD_LEN..])?;
    Ok(Message::Info { name, size })
}

pub fn decode_info_request(version: ProtocolVersion, bytes: &[u8]) -> Result<Message, DecodeError> {
    ensure_len(MessageType::InfoRequest, bytes, INFO_REQUEST_MIN_LEN)?;
    expect_tag(version, MessageType::InfoRequest, bytes)?;
    let id = read_text(&bytes[1..])?;
    Ok(Message::InfoRequest { id })
}

/// Chunk: with `expected_chunk_size`, the frame must carry exactly that many payload bytes.
/// `Some(0)` is a real hint (payload must be empty); only `None` skips the check.
pub fn decode_chunk(
    version: ProtocolVersion,
    bytes: &[u8],
    expected_chunk_size: Option<usize>,
) -> Result<Message, DecodeError> {
    if let Some(expected) = expected_chunk_size {
        let expected = CHUNK_HEADER_LEN.saturating_add(expected);
        if bytes.len() != expected {
            return Err(DecodeError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
    }
    ensure_len(MessageType::Chunk, bytes, CHUNK_HEADER_LEN)?;
    expect_tag(version, MessageType::Chunk, bytes)?;
    Ok(Message::Chunk {
        chunk_number: bytes[1],
        chunk_bytes: bytes[CHUNK_HEADER_LEN..].to_vec(),
    })
}

pub fn decode_chunk_request(
    version: ProtocolVersion,
    bytes: &[u8],
) -> Result<Message, DecodeError> {
    ensure_len(MessageType::ChunkRequest, bytes, CHUNK_REQUEST_MIN_LEN)?;
    expect_tag(version, MessageType::ChunkRequest, bytes)?;
    Ok(Message::ChunkRequest { number: bytes[1] })
}

pub fn decode_chunk_size_info(
    version: ProtocolVersion,
    bytes: &[u8],
) -> Result<Message, DecodeError> {
    ensure_len(MessageType::ChunkSizeInfo, bytes, CHUNK_SIZE_INFO_MIN_LEN)?;
    expect_tag(version, MessageType::ChunkSizeInfo, bytes)?;
    Ok(Message::ChunkSizeInfo {
        chunk_size: read_u32_le(bytes, 1),
    })
}

fn ensure_len(ty: MessageType, bytes: &[u8], min: usize) -> Result<(), DecodeError> {
    if bytes.len() < min {
        return Err(DecodeError::TooShort {
            ty,
            len: bytes.len(),
            min,
        });
    }
    Ok(())
}

/// Call after `ensure_len` with `min >= 1`.
fn expect_tag(version: ProtocolVersion, ty: MessageType, bytes: &[u8]) -> Result<(), DecodeError> {
    let found = bytes[0];
    if found != version.tag(ty) {
        return Err(DecodeError::TypeMismatch { expected: ty, found });
    }
    Ok(())
}

/// Caller guarantees `bytes.len() >= at + 4`.
fn read_u32_le(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; SIZE_FIELD_LEN];
    buf.copy_from_slice(&bytes[at..at + SIZE_FIELD_LEN]);
    u32::from_le_bytes(buf)
}

fn read_text(bytes: &[u8]) -> Result<String, DecodeError> {
    Ok(std::str::from_utf8(bytes)?.to_owned())
}
