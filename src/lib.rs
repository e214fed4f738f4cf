//! # PSD Tagged Blocks
//!
//! A decoder for the tagged blocks ("additional layer information") of
//! layered PSD and PSB documents.
//!
//! Every layer record carries a list of typed, length-prefixed chunks. This
//! library decodes each chunk into a structured record: adjustment layer
//! settings, descriptor-backed settings, vector masks, patterns, gradient
//! maps, nested layer containers and more. A chunk that cannot be decoded
//! never aborts the pass; it is kept as its original bytes and a diagnostic
//! is recorded.
//!
//! ## Architecture
//!
//! - [`io`] - Bounds-checked big-endian cursor
//! - [`mod@format`] - Type codes, descriptor and engine-data parsers, layer
//!   container and document readers
//! - [`blocks`] - Decoder registry, per-format decoders and diagnostics
//! - [`config`] - Decode options and CLI configuration
//! - [`error`] - Error types for each layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use psd_tagged_blocks::{read_document, BlockDecoder, DecodeOptions, StringEncoding};
//!
//! let data = Bytes::from(std::fs::read("image.psd").unwrap());
//! let document = read_document(&data, StringEncoding::Latin1).unwrap();
//!
//! let decoder = BlockDecoder::new(DecodeOptions::default());
//! let decoded = decoder.decode_document(document).unwrap();
//! for layer in &decoded.layers {
//!     for block in &layer.blocks {
//!         println!("{}: {}", layer.name, block.code);
//!     }
//! }
//! ```

pub mod blocks;
pub mod config;
pub mod error;
pub mod format;
pub mod io;

// Re-export commonly used types
pub use blocks::{
    BlockDecoder, Chunk, ChunkDecoder, DecodeContext, Decoded, DecodedChunk, DecodedDocument,
    DecodedLayer, Diagnostic, DiagnosticKind, Diagnostics, Registry, RegistryBuilder,
};
pub use config::{Config, DecodeOptions, NameEncoding, OutputFormat, DEFAULT_MAX_DEPTH};
pub use error::{
    BlockError, CursorError, DescriptorError, DocumentError, EngineDataError, LayerError,
};
pub use format::{
    decode_descriptor, read_document, read_layers, BlockKey, Descriptor, DescriptorValue, Document,
    EngineData, EngineValue, FormatVersion, Header, LayerRecord, Layers, TypeCode,
};
pub use io::{Cursor, StringEncoding};
