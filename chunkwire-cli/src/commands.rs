//! Subcommand bodies. Each returns the text to print so it can be tested without a terminal.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chunkwire_core::{chunk, Codec, Message, ProtocolVersion};
use clap::Subcommand;
use serde_json::json;

use crate::config::OutputFormat;

/// Message to build for `chunkwire encode`.
#[derive(Debug, Subcommand)]
pub enum EncodeCmd {
    /// Acknowledge a received message.
    Ack,
    /// File name and size.
    Info {
        #[arg(long)]
        name: String,
        #[arg(long)]
        size: u32,
    },
    /// Ask the uploader for file info.
    InfoRequest {
        /// Session ID (default: a fresh UUID).
        #[arg(long)]
        id: Option<String>,
    },
    /// One chunk of file data, given inline or read from a file.
    Chunk {
        #[arg(long)]
        number: u8,
        /// Payload as hex.
        #[arg(long, conflicts_with = "file")]
        data: Option<String>,
        /// File to slice the chunk from.
        #[arg(long, requires = "chunk_size")]
        file: Option<PathBuf>,
        #[arg(long)]
        chunk_size: Option<u32>,
    },
    /// Chunk size the receiver expects.
    ChunkSizeInfo {
        #[arg(long)]
        size: u32,
    },
    /// Ask for a chunk by number.
    ChunkRequest {
        #[arg(long)]
        number: u8,
    },
}

/// Build the message described by `cmd`.
pub fn build_message(cmd: &EncodeCmd) -> anyhow::Result<Message> {
    let msg = match cmd {
        EncodeCmd::Ack => Message::Ack,
        EncodeCmd::Info { name, size } => Message::info(name.as_str(), *size),
        EncodeCmd::InfoRequest { id } => match id {
            Some(id) => Message::info_request(id.as_str()),
            None => Message::info_request(uuid::Uuid::new_v4().to_string()),
        },
        EncodeCmd::Chunk {
            number,
            data,
            file,
            chunk_size,
        } => {
            let bytes = match (data, file, chunk_size) {
                (Some(data), None, _) => parse_hex(data)?,
                (None, Some(path), Some(size)) => read_chunk(path, *number, *size)?,
                (None, None, _) => Vec::new(),
                _ => bail!("chunk needs either --data or --file with --chunk-size"),
            };
            Message::chunk(*number, bytes)
        }
        EncodeCmd::ChunkSizeInfo { size } => Message::ChunkSizeInfo { chunk_size: *size },
        EncodeCmd::ChunkRequest { number } => Message::ChunkRequest { number: *number },
    };
    Ok(msg)
}

/// `chunkwire encode`: the frame as lowercase hex.
pub fn encode(codec: Codec, cmd: &EncodeCmd) -> anyhow::Result<String> {
    let msg = build_message(cmd)?;
    Ok(hex::encode(codec.encode(&msg)))
}

/// `chunkwire decode`: parse a hex frame and describe it.
pub fn decode(
    codec: Codec,
    frame_hex: &str,
    expected_chunk_size: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let frame = parse_hex(frame_hex)?;
    let msg = codec
        .decode(&frame, expected_chunk_size)
        .with_context(|| format!("decoding {}-byte frame", frame.len()))?;
    render_message(&msg, codec.version(), format)
}

/// `chunkwire plan`: chunk count and byte ranges for a file.
pub fn plan(file_size: u64, chunk_size: u32, format: OutputFormat) -> anyhow::Result<String> {
    let ranges = chunk::plan(file_size, chunk_size).with_context(|| {
        format!(
            "planning {file_size} bytes; chunk size must be at least {}",
            chunk::min_chunk_size(file_size)
        )
    })?;
    match format {
        OutputFormat::Json => {
            let ranges: Vec<[u64; 2]> = ranges.iter().map(|r| [r.start, r.end]).collect();
            let v = json!({
                "file_size": file_size,
                "chunk_size": chunk_size,
                "chunks": ranges.len(),
                "ranges": ranges,
            });
            Ok(serde_json::to_string_pretty(&v)?)
        }
        OutputFormat::Text => {
            let mut out = format!("{} chunks of {chunk_size} bytes", ranges.len());
            for (n, r) in ranges.iter().enumerate() {
                write!(out, "\n{n}\t{}..{}", r.start, r.end)?;
            }
            Ok(out)
        }
    }
}

pub fn render_message(
    msg: &Message,
    version: ProtocolVersion,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let name = msg.message_type().name(version);
    match format {
        OutputFormat::Json => {
            let mut v = json!({
                "protocol": version,
                "tag": version.tag(msg.message_type()),
                "name": name,
                "message": msg,
            });
            if let Message::Chunk { chunk_bytes, .. } = msg {
                v["payload_len"] = json!(chunk_bytes.len());
                v["sha256"] = json!(hex::encode(chunk::chunk_digest(chunk_bytes)));
            }
            Ok(serde_json::to_string_pretty(&v)?)
        }
        OutputFormat::Text => Ok(match msg {
            Message::Ack => name.to_string(),
            Message::Info { name: file, size } => format!("{name} name={file:?} size={size}"),
            Message::InfoRequest { id } => format!("{name} id={id:?}"),
            Message::Chunk {
                chunk_number,
                chunk_bytes,
            } => format!(
                "{name} number={chunk_number} len={} sha256={}",
                chunk_bytes.len(),
                hex::encode(chunk::chunk_digest(chunk_bytes))
            ),
            Message::ChunkRequest { number } => format!("{name} number={number}"),
            Message::ChunkSizeInfo { chunk_size } => format!("{name} chunk_size={chunk_size}"),
        }),
    }
}

/// Accepts optional `0x` prefix and embedded whitespace.
pub fn parse_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).context("frame is not valid hex")
}

fn read_chunk(path: &Path, number: u8, chunk_size: u32) -> anyhow::Result<Vec<u8>> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let total = f.metadata()?.len();
    chunk::chunk_count(total, chunk_size)?;
    let range = chunk::chunk_range(number, chunk_size, total)?;
    f.seek(SeekFrom::Start(range.start))?;
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    f.read_exact(&mut buf)
        .with_context(|| format!("reading chunk {number} of {}", path.display()))?;
    tracing::debug!(number, start = range.start, end = range.end, "read chunk");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn encode_info_as_hex() {
        let cmd = EncodeCmd::Info {
            name: "test".into(),
            size: 123,
        };
        assert_eq!(encode(Codec::default(), &cmd).unwrap(), "017b00000074657374");
    }

    #[test]
    fn encode_uses_configured_tags() {
        let cmd = EncodeCmd::Chunk {
            number: 1,
            data: Some("ff".into()),
            file: None,
            chunk_size: None,
        };
        let codec = Codec::new(ProtocolVersion::File);
        assert_eq!(encode(codec, &cmd).unwrap(), "0101ff");
    }

    #[test]
    fn info_request_defaults_to_uuid() {
        let msg = build_message(&EncodeCmd::InfoRequest { id: None }).unwrap();
        match msg {
            Message::InfoRequest { id } => assert!(uuid::Uuid::parse_str(&id).is_ok()),
            other => panic!("expected InfoRequest, got {other:?}"),
        }
    }

    #[test]
    fn chunk_is_sliced_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&(0u8..25).collect::<Vec<_>>()).unwrap();
        let cmd = EncodeCmd::Chunk {
            number: 2,
            data: None,
            file: Some(f.path().to_path_buf()),
            chunk_size: Some(10),
        };
        assert_eq!(
            build_message(&cmd).unwrap(),
            Message::chunk(2, (20u8..25).collect::<Vec<_>>())
        );
    }

    #[test]
    fn chunk_past_end_of_file_fails() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0; 5]).unwrap();
        let cmd = EncodeCmd::Chunk {
            number: 1,
            data: None,
            file: Some(f.path().to_path_buf()),
            chunk_size: Some(10),
        };
        assert!(build_message(&cmd).is_err());
    }

    #[test]
    fn decode_renders_text() {
        let out = decode(Codec::default(), "02 00 00010203", None, OutputFormat::Text).unwrap();
        assert!(out.starts_with("Chunk number=0 len=4 sha256="), "{out}");
        let out = decode(Codec::default(), "0x00", None, OutputFormat::Text).unwrap();
        assert_eq!(out, "Ack");
    }

    #[test]
    fn decode_renders_json() {
        let out = decode(Codec::default(), "3400010000", None, OutputFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["tag"], 52);
        assert_eq!(v["name"], "ChunkSizeInfo");
        assert_eq!(v["message"]["chunk_size"], 256);
    }

    #[test]
    fn decode_reports_failures() {
        assert!(decode(Codec::default(), "65", None, OutputFormat::Text).is_err());
        assert!(decode(Codec::default(), "zz", None, OutputFormat::Text).is_err());
        assert!(decode(Codec::default(), "020000", Some(2), OutputFormat::Text).is_err());
    }

    #[test]
    fn plan_lists_ranges() {
        assert_eq!(
            plan(25, 10, OutputFormat::Text).unwrap(),
            "3 chunks of 10 bytes\n0\t0..10\n1\t10..20\n2\t20..25"
        );
        assert!(plan(1000, 1, OutputFormat::Text).is_err());
    }
}
