//! Load config from file and environment.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chunkwire_core::ProtocolVersion;
use clap::ValueEnum;
use serde::Deserialize;

/// Output format for decoded messages and plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

/// CLI configuration. File: ~/.config/chunkwire/config.toml or /etc/chunkwire/config.toml.
/// Env overrides: CHUNKWIRE_PROTOCOL, CHUNKWIRE_FORMAT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Tag set used for encoding and decoding (default "current").
    #[serde(default)]
    pub protocol: ProtocolVersion,
    /// Output format (default "text").
    #[serde(default)]
    pub format: OutputFormat,
}

/// Load config: defaults, then `explicit` or the first config file found, then env vars.
/// An explicit path must exist and parse.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let c = match explicit {
        Some(path) => load_from(path)?,
        None => load_file().unwrap_or_default(),
    };
    Ok(apply_env(c, |key| std::env::var(key).ok()))
}

pub fn load_from(path: &Path) -> anyhow::Result<Config> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parsing config {}", path.display()))
}

fn apply_env(mut c: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(s) = var("CHUNKWIRE_PROTOCOL") {
        match s.parse() {
            Ok(v) => c.protocol = v,
            Err(e) => tracing::warn!("ignoring CHUNKWIRE_PROTOCOL: {e}"),
        }
    }
    if let Some(s) = var("CHUNKWIRE_FORMAT") {
        match OutputFormat::from_str(s.trim(), true) {
            Ok(f) => c.format = f,
            Err(e) => tracing::warn!("ignoring CHUNKWIRE_FORMAT: {e}"),
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/chunkwire/config.toml"));
    }
    out.push(PathBuf::from("/etc/chunkwire/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    let path = config_paths().into_iter().find(|p| p.exists())?;
    match load_from(&path) {
        Ok(c) => {
            tracing::debug!(path = %path.display(), "loaded config");
            Some(c)
        }
        Err(e) => {
            tracing::warn!("{e:#}; using defaults");
            None
        }
    }
}
