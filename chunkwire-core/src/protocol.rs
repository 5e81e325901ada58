//! Chunkwire protocol: message types, tag registry and protocol versions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Length of the little-endian `u32` carried by Info and ChunkSizeInfo.
pub const SIZE_FIELD_LEN: usize = 4;

/// Every message kind on the wire. The numeric tag depends on the active
/// [`ProtocolVersion`]; see [`ProtocolVersion::tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Ack,
    /// Client -> server: file name and size.
    Info,
    /// Client -> server: one chunk of file data.
    Chunk,
    /// Server -> client: ask for file info, carrying the session ID.
    InfoRequest,
    /// Server -> client: chunk size the receiver expects.
    ChunkSizeInfo,
    /// Either direction: ask for a chunk by number.
    ChunkRequest,
}

impl MessageType {
    /// All message types, in tag order of the current protocol.
    pub const ALL: [MessageType; 6] = [
        MessageType::Ack,
        MessageType::Info,
        MessageType::Chunk,
        MessageType::InfoRequest,
        MessageType::ChunkSizeInfo,
        MessageType::ChunkRequest,
    ];

    /// Name used on the wire by the given protocol version (the File family
    /// prefixes the data-carrying messages).
    pub fn name(self, version: ProtocolVersion) -> &'static str {
        match (self, version) {
            (MessageType::Ack, _) => "Ack",
            (MessageType::Info, ProtocolVersion::Current) => "Info",
            (MessageType::Info, ProtocolVersion::File) => "FileInfo",
            (MessageType::Chunk, ProtocolVersion::Current) => "Chunk",
            (MessageType::Chunk, ProtocolVersion::File) => "FileChunk",
            (MessageType::InfoRequest, ProtocolVersion::Current) => "InfoRequest",
            (MessageType::InfoRequest, ProtocolVersion::File) => "FileInfoRequest",
            (MessageType::ChunkSizeInfo, _) => "ChunkSizeInfo",
            (MessageType::ChunkRequest, _) => "ChunkRequest",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name(ProtocolVersion::Current))
    }
}

/// Tag assignment in use by one session. The two versions share layouts but
/// not tags, and are never mixed within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Ack=0, Info=1, Chunk=2, InfoRequest=51, ChunkSizeInfo=52, ChunkRequest=101.
    #[default]
    Current,
    /// Older "File-" family: FileChunk=1, FileInfo=2, others as in `Current`.
    File,
}

impl ProtocolVersion {
    /// Wire tag of `ty` in this version.
    pub const fn tag(self, ty: MessageType) -> u8 {
        match self {
            ProtocolVersion::Current => match ty {
                MessageType::Ack => 0,
                MessageType::Info => 1,
                MessageType::Chunk => 2,
                MessageType::InfoRequest => 51,
                MessageType::ChunkSizeInfo => 52,
                MessageType::ChunkRequest => 101,
            },
            ProtocolVersion::File => match ty {
                MessageType::Ack => 0,
                MessageType::Chunk => 1,
                MessageType::Info => 2,
                MessageType::InfoRequest => 51,
                MessageType::ChunkSizeInfo => 52,
                MessageType::ChunkRequest => 101,
            },
        }
    }

    /// Reverse lookup of [`tag`](Self::tag). `None` for unassigned tags.
    pub fn message_type(self, tag: u8) -> Option<MessageType> {
        MessageType::ALL
            .into_iter()
            .find(|&ty| self.tag(ty) == tag)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Current => f.write_str("current"),
            ProtocolVersion::File => f.write_str("file"),
        }
    }
}

/// Unrecognised protocol version name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol version {0:?} (expected \"current\" or \"file\")")]
pub struct UnknownVersion(pub String);

impl FromStr for ProtocolVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(ProtocolVersion::Current),
            "file" => Ok(ProtocolVersion::File),
            _ => Err(UnknownVersion(s.to_owned())),
        }
    }
}

/// All wire messages. Encoding is the flat tag-first layout in the wire module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    /// Acknowledge a received message.
    Ack,
    /// File name and size in bytes.
    Info { name: String, size: u32 },
    /// Request file info for a session.
    InfoRequest { id: String },
    /// Chunk payload; chunk 0 is the first.
    Chunk {
        chunk_number: u8,
        #[serde(with = "hex_bytes")]
        chunk_bytes: Vec<u8>,
    },
    /// Request a chunk by number.
    ChunkRequest { number: u8 },
    /// Chunk size in bytes. The last chunk may be smaller.
    ChunkSizeInfo { chunk_size: u32 },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Ack => MessageType::Ack,
            Message::Info { .. } => MessageType::Info,
            Message::InfoRequest { .. } => MessageType::InfoRequest,
            Message::Chunk { .. } => MessageType::Chunk,
            Message::ChunkRequest { .. } => MessageType::ChunkRequest,
            Message::ChunkSizeInfo { .. } => MessageType::ChunkSizeInfo,
        }
    }

    pub fn info(name: impl Into<String>, size: u32) -> Self {
        Message::Info {
            name: name.into(),
            size,
        }
    }

    pub fn info_request(id: impl Into<String>) -> Self {
        Message::InfoRequest { id: id.into() }
    }

    pub fn chunk(chunk_number: u8, chunk_bytes: impl Into<Vec<u8>>) -> Self {
        Message::Chunk {
            chunk_number,
            chunk_bytes: chunk_bytes.into(),
        }
    }

    /// Length of this message once encoded: tag, fixed header, payload.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Message::Ack => 0,
            Message::Info { name, .. } => SIZE_FIELD_LEN + name.len(),
            Message::InfoRequest { id } => id.len(),
            Message::Chunk { chunk_bytes, .. } => 1 + chunk_bytes.len(),
            Message::ChunkRequest { .. } => 1,
            Message::ChunkSizeInfo { .. } => SIZE_FIELD_LEN,
        }
    }
}

/// Chunk payloads render as hex in JSON output.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSIONS: [ProtocolVersion; 2] = [ProtocolVersion::Current, ProtocolVersion::File];

    #[test]
    fn current_tags_are_stable() {
        let v = ProtocolVersion::Current;
        assert_eq!(v.tag(MessageType::Ack), 0);
        assert_eq!(v.tag(MessageType::Info), 1);
        assert_eq!(v.tag(MessageType::Chunk), 2);
        assert_eq!(v.tag(MessageType::InfoRequest), 51);
        assert_eq!(v.tag(MessageType::ChunkSizeInfo), 52);
        assert_eq!(v.tag(MessageType::ChunkRequest), 101);
    }

    #[test]
    fn file_family_swaps_info_and_chunk() {
        let v = ProtocolVersion::File;
        assert_eq!(v.tag(MessageType::Chunk), 1);
        assert_eq!(v.tag(MessageType::Info), 2);
        assert_eq!(v.message_type(51), Some(MessageType::InfoRequest));
        assert_eq!(MessageType::Info.name(v), "FileInfo");
    }

    #[test]
    fn tags_are_a_bijection_in_every_version() {
        for v in VERSIONS {
            let mut seen = std::collections::HashSet::new();
            for ty in MessageType::ALL {
                assert!(seen.insert(v.tag(ty)), "{v}: tag reused by {ty}");
                assert_eq!(v.message_type(v.tag(ty)), Some(ty));
            }
        }
    }

    #[test]
    fn unassigned_tags_have_no_type() {
        for v in VERSIONS {
            assert_eq!(v.message_type(3), None);
            assert_eq!(v.message_type(255), None);
        }
    }

    #[test]
    fn version_parses_from_name() {
        assert_eq!("current".parse::<ProtocolVersion>(), Ok(ProtocolVersion::Current));
        assert_eq!(" FILE ".parse::<ProtocolVersion>(), Ok(ProtocolVersion::File));
        assert!("v2".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn encoded_len_counts_utf8_bytes() {
        assert_eq!(Message::Ack.encoded_len(), 1);
        assert_eq!(Message::info("test", 123).encoded_len(), 9);
        // 12 two- or three-byte characters plus ".mp3"
        assert_eq!(Message::info("ΪΫψИдҡӪ←Ⅱ.mp3", 0).encoded_len(), 1 + 4 + 24);
        assert_eq!(Message::chunk(0, vec![]).encoded_len(), 2);
        assert_eq!(Message::ChunkRequest { number: 7 }.encoded_len(), 2);
        assert_eq!(Message::ChunkSizeInfo { chunk_size: 1 }.encoded_len(), 5);
    }

    #[test]
    fn json_renders_chunk_bytes_as_hex() {
        let json = serde_json::to_string(&Message::chunk(3, vec![0xde, 0xad])).unwrap();
        assert_eq!(json, r#"{"type":"chunk","chunk_number":3,"chunk_bytes":"dead"}"#);
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Message::chunk(3, vec![0xde, 0xad]));
    }
}
