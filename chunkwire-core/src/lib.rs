//! Chunkwire wire protocol: message types and the flat binary codec.
//! Pure and synchronous: the host owns the transport and hands in one frame at a time.

pub mod chunk;
pub mod protocol;
pub mod wire;

pub use chunk::{
    chunk_count, chunk_digest, chunk_number, chunk_range, ChunkLimitError, MAX_CHUNKS,
};
pub use protocol::{Message, MessageType, ProtocolVersion, UnknownVersion};
pub use wire::{decode, encode, Codec, DecodeError};
