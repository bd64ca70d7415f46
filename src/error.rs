//! Error taxonomy for discovery and asset synchronization.
//!
//! Only [`DiscoveryError`] is ever returned as a hard failure. Every other
//! type here is collected into a report and logged by the component that
//! hit it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The core directory could not be listed. Fatal to a discovery pass.
#[derive(Debug, Error)]
#[error("Failed to list core directory {path:?}: {source}")]
pub struct DiscoveryError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// The descriptor table could not be parsed.
#[derive(Debug, Error)]
pub enum DescriptorParseError {
    #[error("Descriptor table could not be read from {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Descriptor table is not valid UTF-8")]
    InvalidUtf8,
    #[error("Line {line}: expected `key = value`")]
    MissingSeparator { line: usize },
    #[error("Line {line}: empty key")]
    EmptyKey { line: usize },
    #[error("Line {line}: unterminated quoted value")]
    UnterminatedQuote { line: usize },
}

/// A single directory entry could not be turned into a core descriptor.
#[derive(Debug, Error)]
pub enum PluginConstructionError {
    #[error("Failed to read directory entry in {dir:?}: {source}")]
    Entry {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to inspect {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("File name of {path:?} is not valid UTF-8")]
    NonUtf8Name { path: PathBuf },
}

/// The version stamp could not be read. Treated as "no stamp recorded".
#[derive(Debug, Error)]
pub enum StampReadError {
    #[error("Failed to read stamp {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Stamp {path:?} holds {len} bytes, expected 4")]
    Corrupt { path: PathBuf, len: usize },
}

/// The version stamp could not be written after an extraction pass.
#[derive(Debug, Error)]
#[error("Failed to write stamp {path:?}: {source}")]
pub struct StampWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// One asset group failed part-way through extraction.
#[derive(Debug, Error)]
#[error("Failed to extract asset group `{group}` at {path:?}: {source}")]
pub struct GroupExtractionError {
    pub group: String,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
