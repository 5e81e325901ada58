// chunkwire: encode, decode and plan chunkwire protocol frames from the command line.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use chunkwire_core::{Codec, ProtocolVersion};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::EncodeCmd;
use crate::config::OutputFormat;

#[derive(Parser)]
#[command(name = "chunkwire", version, about = "Chunked file-transfer wire protocol tool")]
struct Cli {
    /// Config file (default: ~/.config/chunkwire/config.toml, then /etc/chunkwire/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tag set: "current" or "file". Overrides config.
    #[arg(long, global = true)]
    protocol: Option<ProtocolVersion>,

    /// Output format. Overrides config.
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a message and print the frame as hex.
    Encode {
        #[command(subcommand)]
        message: EncodeCmd,
    },
    /// Decode a hex frame and print the message.
    Decode {
        /// Frame bytes as hex.
        frame: String,
        /// Required payload length for chunk frames.
        #[arg(long)]
        expected_chunk_size: Option<usize>,
    },
    /// Print how a file splits into chunks.
    Plan {
        #[arg(long)]
        file_size: u64,
        #[arg(long)]
        chunk_size: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("chunkwire: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = config::load(cli.config.as_deref())?;
    let protocol = cli.protocol.unwrap_or(cfg.protocol);
    let format = cli.format.unwrap_or(cfg.format);
    let codec = Codec::new(protocol);
    tracing::debug!(%protocol, ?format, "starting");

    let out = match &cli.command {
        Command::Encode { message } => commands::encode(codec, message)?,
        Command::Decode {
            frame,
            expected_chunk_size,
        } => commands::decode(codec, frame, *expected_chunk_size, format)?,
        Command::Plan {
            file_size,
            chunk_size,
        } => commands::plan(*file_size, *chunk_size, format)?,
    };
    println!("{out}");
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
