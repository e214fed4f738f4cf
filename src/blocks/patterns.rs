//! Pattern blocks (`Patt`, `Pat2`, `Pat3`).
//!
//! A pattern block is a run of length-prefixed pattern records, each
//! holding a header and a virtual memory array list with the raster data.
//!
//! # Layout
//!
//! ```text
//! Pattern record:
//!   u32            length of the record
//!   u32            version (1)
//!   u32            image mode
//!   i16 x 2        point
//!   unicode        name
//!   pascal         unique id
//!   [u16; 3] x 256 color table (indexed mode only)
//!   VMA list:
//!     u32          version (3)
//!     u32          length
//!     u32 x 4      rectangle
//!     u32          channel count
//!     channel count + 2 arrays:
//!       u32        is written, 0 skips the array
//!       u32        array length, 0 skips the array
//!       u32        depth
//!       u32 x 4    rectangle
//!       u16        pixel depth
//!       u8         compression
//!       ...        array length - 23 bytes of channel data
//! ```
//!
//! Every record must consume exactly its declared length.

use bytes::Bytes;
use serde::Serialize;
use tracing::trace;

use crate::error::BlockError;
use crate::format::ColorMode;
use crate::io::{hex_bytes, Cursor, StringEncoding};

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded};

const PATTERN_VERSION: u32 = 1;
const VMA_LIST_VERSION: u32 = 3;

/// Header bytes of a populated array that are counted in its length.
const VMA_HEADER_LEN: usize = 23;

/// Extra array slots beyond the channel count (user and sheet masks).
const VMA_EXTRA_SLOTS: u32 = 2;

/// Entries in an indexed color table.
const COLOR_TABLE_LEN: usize = 256;

/// Bytes at the end of a block that cannot start another record.
const MIN_TRAILER_LEN: usize = 4;

// =============================================================================
// Records
// =============================================================================

/// One populated channel array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualMemoryArray {
    pub is_written: u32,
    pub depth: u32,
    /// Top, left, bottom, right
    pub rectangle: [u32; 4],
    pub pixel_depth: u16,
    /// 0 raw, 1 RLE
    pub compression: u8,

    #[serde(serialize_with = "hex_bytes")]
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualMemoryArrayList {
    pub version: u32,
    pub length: u32,
    pub rectangle: [u32; 4],
    /// Populated arrays only
    pub channels: Vec<VirtualMemoryArray>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub version: u32,
    pub image_mode: u32,
    pub point: [i16; 2],
    pub name: String,
    pub id: String,
    pub color_table: Option<Vec<[u16; 3]>>,
    pub data: VirtualMemoryArrayList,
}

// =============================================================================
// Decoder
// =============================================================================

pub struct PatternsDecoder;

impl PatternsDecoder {
    fn read_pattern(payload: &Bytes, cursor: &mut Cursor<'_>) -> Result<Pattern, BlockError> {
        let version = cursor.read_u32()?;
        if version != PATTERN_VERSION {
            return Err(BlockError::UnsupportedVersion {
                block: "pattern",
                version,
            });
        }
        let image_mode = cursor.read_u32()?;
        let point = cursor.read_i16s::<2>()?;
        let name = cursor.read_unicode_string()?;
        let id = cursor.read_pascal_string(StringEncoding::Latin1, 1)?;

        let color_table = if ColorMode::from_u32(image_mode) == Some(ColorMode::Indexed) {
            let mut table = Vec::with_capacity(COLOR_TABLE_LEN);
            for _ in 0..COLOR_TABLE_LEN {
                table.push(cursor.read_u16s::<3>()?);
            }
            Some(table)
        } else {
            None
        };

        let data = Self::read_vma_list(payload, cursor)?;
        Ok(Pattern {
            version,
            image_mode,
            point,
            name,
            id,
            color_table,
            data,
        })
    }

    fn read_vma_list(
        payload: &Bytes,
        cursor: &mut Cursor<'_>,
    ) -> Result<VirtualMemoryArrayList, BlockError> {
        let version = cursor.read_u32()?;
        if version != VMA_LIST_VERSION {
            return Err(BlockError::UnsupportedVersion {
                block: "virtual memory array list",
                version,
            });
        }
        let length = cursor.read_u32()?;
        let rectangle = cursor.read_u32s::<4>()?;
        let channel_count = cursor.read_u32()?;

        let mut channels = Vec::new();
        for _ in 0..channel_count.saturating_add(VMA_EXTRA_SLOTS) {
            let is_written = cursor.read_u32()?;
            if is_written == 0 {
                continue;
            }
            let array_length = cursor.read_u32()? as usize;
            if array_length == 0 {
                continue;
            }
            let data_len = array_length.checked_sub(VMA_HEADER_LEN).ok_or_else(|| {
                BlockError::InvalidValue(format!(
                    "virtual memory array length {} is shorter than its header",
                    array_length
                ))
            })?;

            let depth = cursor.read_u32()?;
            let array_rect = cursor.read_u32s::<4>()?;
            let pixel_depth = cursor.read_u16()?;
            let compression = cursor.read_u8()?;
            let data = payload.slice_ref(cursor.read_bytes(data_len)?);
            channels.push(VirtualMemoryArray {
                is_written,
                depth,
                rectangle: array_rect,
                pixel_depth,
                compression,
                data,
            });
        }

        Ok(VirtualMemoryArrayList {
            version,
            length,
            rectangle,
            channels,
        })
    }
}

impl ChunkDecoder for PatternsDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let mut patterns = Vec::new();

        while cursor.remaining() > MIN_TRAILER_LEN {
            let length = cursor.read_u32()? as usize;
            if length == 0 {
                break;
            }

            let mut record = cursor.sub_cursor(length)?;
            let pattern = Self::read_pattern(payload, &mut record)?;
            if !record.is_at_end() {
                return Err(BlockError::LengthMismatch {
                    context: "pattern",
                    declared: length,
                    consumed: record.position(),
                });
            }

            trace!(name = %pattern.name, id = %pattern.id, "Read pattern");
            patterns.push(pattern);
        }

        Ok(Decoded::Patterns(patterns))
    }
}

// =============================================================================
// Tests
// =============================================================================
