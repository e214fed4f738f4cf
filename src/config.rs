//! Configuration for the decoder and the `psd-blocks` command.
//!
//! Library callers build a [`DecodeOptions`] directly. The binary parses a
//! [`Config`] from command-line arguments and environment variables, then
//! derives the options from it.
//!
//! # Environment Variables
//!
//! - `PSDB_FORMAT` - Output format, `text` or `json` (default: text)
//! - `PSDB_MAX_DEPTH` - Nested layer container ceiling (default: 16)
//! - `PSDB_PARALLEL` - Decode layers on worker threads (default: false)
//! - `PSDB_ENCODING` - Encoding of Pascal layer names, `latin1` or `utf8`

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::io::StringEncoding;

// =============================================================================
// Default Values
// =============================================================================

/// Default ceiling on nested layer containers.
pub const DEFAULT_MAX_DEPTH: usize = 16;

// =============================================================================
// Decode Options
// =============================================================================

/// Options that control a decoding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting of layer containers inside tagged blocks.
    ///
    /// Exceeding it fails the whole pass with `DepthExceeded`.
    pub max_depth: usize,

    /// Decode the layers of a document in parallel.
    pub parallel: bool,

    /// Encoding of Pascal layer names inside nested layer containers.
    pub encoding: StringEncoding,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            parallel: false,
            encoding: StringEncoding::Latin1,
        }
    }
}

impl DecodeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_encoding(mut self, encoding: StringEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Validate the options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("max_depth must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Output rendering of the decoded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per tagged block
    Text,

    /// The full decoded tree as JSON
    Json,
}

/// Encoding of single-byte layer names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NameEncoding {
    Latin1,
    Utf8,
}

impl From<NameEncoding> for StringEncoding {
    fn from(value: NameEncoding) -> Self {
        match value {
            NameEncoding::Latin1 => StringEncoding::Latin1,
            NameEncoding::Utf8 => StringEncoding::Utf8,
        }
    }
}

/// psd-blocks - Decode the tagged blocks of a PSD or PSB document.
///
/// Reads the layer records and global tagged blocks of a document and
/// prints what each block decodes to. Blocks that cannot be decoded are
/// reported and passed through as raw bytes.
#[derive(Parser, Debug, Clone)]
#[command(name = "psd-blocks")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Path of the PSD or PSB file to read.
    pub file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "PSDB_FORMAT")]
    pub format: OutputFormat,

    /// Maximum nesting of layer containers inside tagged blocks.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, env = "PSDB_MAX_DEPTH")]
    pub max_depth: usize,

    /// Decode layers in parallel.
    #[arg(long, default_value_t = false, env = "PSDB_PARALLEL")]
    pub parallel: bool,

    /// Encoding of Pascal-string layer names.
    #[arg(long, value_enum, default_value_t = NameEncoding::Latin1, env = "PSDB_ENCODING")]
    pub encoding: NameEncoding,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.file.as_os_str().is_empty() {
            return Err("An input file is required".to_string());
        }
        self.decode_options().validate()
    }

    /// Library options derived from the command line.
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::default()
            .with_max_depth(self.max_depth)
            .with_parallel(self.parallel)
            .with_encoding(self.encoding.into())
    }
}

// =============================================================================
// Tests
// =============================================================================
