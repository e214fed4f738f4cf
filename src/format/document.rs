//! Top-level document reader.
//!
//! Locates the layer container and the global tagged blocks of a PSD/PSB
//! file. Sections that carry no tagged blocks are skipped.
//!
//! # File Layout
//!
//! ```text
//! Header (26 bytes):
//!   [u8; 4]  '8BPS'
//!   u16      version (1 = PSD, 2 = PSB)
//!   [u8; 6]  reserved
//!   u16      channel count
//!   u32      height
//!   u32      width
//!   u16      bits per channel
//!   u16      color mode
//!
//! u32 + bytes    color mode data (skipped)
//! u32 + bytes    image resources (skipped)
//! u32/u64        layer and mask section length
//!   u32/u64      layer info length, followed by the layer container
//!   u32 + bytes  global layer mask (skipped)
//!   ...          global tagged blocks
//! ...            merged image data (ignored)
//! ```

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::blocks::Chunk;
use crate::error::{DocumentError, LayerError};
use crate::format::layers::{read_layers_from, read_tagged_blocks, Layers};
use crate::format::{FormatVersion, TypeCode};
use crate::io::{Cursor, StringEncoding};

const DOCUMENT_SIGNATURE: TypeCode = TypeCode::new(*b"8BPS");

/// Fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: FormatVersion,
    pub channels: u16,
    pub height: u32,
    pub width: u32,
    pub depth: u16,
    pub color_mode: u16,
}

/// The parts of a document that carry tagged blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub header: Header,

    /// The layer container, absent when the document has no layer info
    pub layers: Option<Layers>,

    /// Tagged blocks following the global layer mask
    pub global_blocks: Vec<Chunk>,
}

fn to_len(value: u64, context: &'static str) -> Result<usize, DocumentError> {
    usize::try_from(value).map_err(|_| {
        DocumentError::Layer(LayerError::InvalidLength {
            context,
            length: value,
        })
    })
}

/// Read a document from an in-memory file.
pub fn read_document(data: &Bytes, encoding: StringEncoding) -> Result<Document, DocumentError> {
    let mut cursor = Cursor::new(data);
    let header = read_header(&mut cursor)?;
    let version = header.version;
    debug!(
        version = ?version,
        width = header.width,
        height = header.height,
        depth = header.depth,
        "Read document header"
    );

    let color_mode_len = cursor.read_u32()? as usize;
    cursor.skip(color_mode_len)?;
    let resources_len = cursor.read_u32()? as usize;
    cursor.skip(resources_len)?;

    let section_len = to_len(cursor.read_length(version.is_large())?, "layer and mask section")?;
    let mut section = cursor.sub_cursor(section_len)?;
    if section.is_empty() {
        return Ok(Document {
            header,
            layers: None,
            global_blocks: Vec::new(),
        });
    }

    let info_len = to_len(section.read_length(version.is_large())?, "layer info")?;
    let layers = if info_len > 0 {
        let mut info = section.sub_cursor(info_len)?;
        Some(read_layers_from(data, &mut info, encoding, header.depth, version)?)
    } else {
        None
    };

    let global_blocks = if section.remaining() >= 4 {
        let mask_len = section.read_u32()? as usize;
        section.skip(mask_len)?;
        let remaining = section.remaining();
        read_tagged_blocks(data, &mut section, remaining, version)?
    } else {
        Vec::new()
    };
    debug!(
        layers = layers.as_ref().map_or(0, |l| l.records.len()),
        global_blocks = global_blocks.len(),
        "Read layer and mask section"
    );

    Ok(Document {
        header,
        layers,
        global_blocks,
    })
}

fn read_header(cursor: &mut Cursor<'_>) -> Result<Header, DocumentError> {
    let signature = cursor.read_key()?;
    if signature != DOCUMENT_SIGNATURE {
        return Err(DocumentError::InvalidSignature(signature));
    }
    let raw_version = cursor.read_u16()?;
    let version =
        FormatVersion::from_u16(raw_version).ok_or(DocumentError::UnsupportedVersion(raw_version))?;
    cursor.skip(6)?;

    Ok(Header {
        version,
        channels: cursor.read_u16()?,
        height: cursor.read_u32()?,
        width: cursor.read_u32()?,
        depth: cursor.read_u16()?,
        color_mode: cursor.read_u16()?,
    })
}
