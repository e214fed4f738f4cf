//! Layer container reader.
//!
//! Reads the layer-info structure shared by the document's layer section
//! and by the nested `Lr16`/`Lr32` blocks:
//!
//! ```text
//! i16              layer count (negative: first alpha channel holds the
//!                  merged transparency)
//! layer records    bounds, channel table, blend mode, flags, extra data
//!                  (mask, blending ranges, name, tagged blocks)
//! channel data     per layer, per channel: u16 compression + bytes
//! ```
//!
//! Channel pixel data is kept compressed. Tagged blocks are split into
//! [`Chunk`]s whose payloads share the caller's buffer.

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::blocks::Chunk;
use crate::error::LayerError;
use crate::format::{BlockKey, FormatVersion, TypeCode};
use crate::io::{hex_bytes, Cursor, StringEncoding};

/// Minimum size of a tagged block header: signature, key and a u32 length.
const BLOCK_HEADER_LEN: usize = 12;

// =============================================================================
// Records
// =============================================================================

/// Channel table entry of a layer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    /// Channel id: 0.. color, -1 transparency, -2 user mask, -3 real mask
    pub id: i16,

    /// Byte length of the channel's image data, including compression tag
    pub length: u64,
}

/// Layer display flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerFlags {
    pub transparency_protected: bool,
    pub visible: bool,
    pub pixel_data_irrelevant: bool,
}

impl LayerFlags {
    fn from_bits(bits: u8) -> Self {
        Self {
            transparency_protected: bits & 0x01 != 0,
            visible: bits & 0x02 == 0,
            pixel_data_irrelevant: bits & 0x18 == 0x18,
        }
    }
}

/// Real (vector-derived) mask parameters of a 36-byte mask record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RealMask {
    pub flags: u8,
    pub background: u8,
    pub rect: [i32; 4],
}

/// Layer mask or adjustment layer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaskData {
    /// Top, left, bottom, right
    pub rect: [i32; 4],
    pub default_color: u8,
    pub flags: u8,
    pub real: Option<RealMask>,
}

/// Source and destination range of one blending-range entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlendingRange {
    pub source: [u16; 2],
    pub destination: [u16; 2],
}

/// Layer blending ranges ("Blend If").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlendingRanges {
    pub composite: Option<BlendingRange>,
    pub channels: Vec<BlendingRange>,
}

/// Compressed image data of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelData {
    /// 0 raw, 1 RLE, 2 zip, 3 zip with prediction
    pub compression: u16,

    #[serde(serialize_with = "hex_bytes")]
    pub data: Bytes,
}

/// A layer record carrying blocks of type `B`.
///
/// The reader produces `LayerRecord<Chunk>`; decoding the blocks yields
/// `LayerRecord<DecodedChunk>` through [`LayerRecord::try_map_blocks`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerRecord<B> {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub channels: Vec<ChannelInfo>,
    pub blend_mode: TypeCode,
    pub opacity: u8,
    pub clipping: u8,
    pub flags: LayerFlags,
    pub mask: Option<MaskData>,
    pub blending_ranges: BlendingRanges,
    pub name: String,
    pub blocks: Vec<B>,
    pub channel_data: Vec<ChannelData>,
}

impl<B> LayerRecord<B> {
    pub fn width(&self) -> i64 {
        i64::from(self.right) - i64::from(self.left)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.bottom) - i64::from(self.top)
    }

    /// Transform every block, keeping the rest of the record.
    ///
    /// Stops at the first error.
    pub fn try_map_blocks<C, E>(
        self,
        f: impl FnMut(B) -> Result<C, E>,
    ) -> Result<LayerRecord<C>, E> {
        let blocks = self.blocks.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(LayerRecord {
            top: self.top,
            left: self.left,
            bottom: self.bottom,
            right: self.right,
            channels: self.channels,
            blend_mode: self.blend_mode,
            opacity: self.opacity,
            clipping: self.clipping,
            flags: self.flags,
            mask: self.mask,
            blending_ranges: self.blending_ranges,
            name: self.name,
            blocks,
            channel_data: self.channel_data,
        })
    }
}

/// A layer container as read from the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layers {
    /// Whether the stored layer count was negative
    pub merged_alpha: bool,

    /// Bits per channel sample of the container's image data
    pub channel_depth: u16,

    pub records: Vec<LayerRecord<Chunk>>,
}

// =============================================================================
// Reader
// =============================================================================

fn to_len(value: u64, context: &'static str) -> Result<usize, LayerError> {
    usize::try_from(value).map_err(|_| LayerError::InvalidLength {
        context,
        length: value,
    })
}

/// Read a layer container occupying the whole of `data`.
///
/// `data` starts at the layer count; nested containers carry no length
/// prefix of their own.
pub fn read_layers(
    data: &Bytes,
    encoding: StringEncoding,
    channel_depth: u16,
    version: FormatVersion,
) -> Result<Layers, LayerError> {
    let mut cursor = Cursor::new(data);
    read_layers_from(data, &mut cursor, encoding, channel_depth, version)
}

/// Read a layer container at the cursor position.
///
/// `parent` must be the buffer the cursor reads from; block payloads and
/// channel data are sliced out of it without copying.
pub(crate) fn read_layers_from(
    parent: &Bytes,
    cursor: &mut Cursor<'_>,
    encoding: StringEncoding,
    channel_depth: u16,
    version: FormatVersion,
) -> Result<Layers, LayerError> {
    let count = cursor.read_i16()?;
    let merged_alpha = count < 0;
    let count = count.unsigned_abs() as usize;
    debug!(count, merged_alpha, channel_depth, "Reading layer container");

    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        let record = read_layer_record(parent, cursor, encoding, version)?;
        trace!(index, name = %record.name, blocks = record.blocks.len(), "Read layer record");
        records.push(record);
    }

    for record in &mut records {
        for channel in &record.channels {
            let len = to_len(channel.length, "channel data")?;
            if len < 2 {
                return Err(LayerError::InvalidLength {
                    context: "channel data",
                    length: channel.length,
                });
            }
            let mut channel_cursor = cursor.sub_cursor(len)?;
            let compression = channel_cursor.read_u16()?;
            let data = parent.slice_ref(channel_cursor.rest());
            record.channel_data.push(ChannelData { compression, data });
        }
    }

    Ok(Layers {
        merged_alpha,
        channel_depth,
        records,
    })
}

fn read_layer_record(
    parent: &Bytes,
    cursor: &mut Cursor<'_>,
    encoding: StringEncoding,
    version: FormatVersion,
) -> Result<LayerRecord<Chunk>, LayerError> {
    let [top, left, bottom, right] = cursor.read_i32s::<4>()?;

    let channel_count = cursor.read_u16()?;
    let mut channels = Vec::with_capacity(channel_count.min(64) as usize);
    for _ in 0..channel_count {
        let id = cursor.read_i16()?;
        let length = cursor.read_length(version.is_large())?;
        channels.push(ChannelInfo { id, length });
    }

    let signature = cursor.read_key()?;
    if signature != TypeCode::SIGNATURE_8BIM {
        return Err(LayerError::InvalidSignature(signature));
    }
    let blend_mode = cursor.read_key()?;
    let opacity = cursor.read_u8()?;
    let clipping = cursor.read_u8()?;
    let flags = LayerFlags::from_bits(cursor.read_u8()?);
    cursor.skip(1)?;

    let extra_length = cursor.read_u32()? as usize;
    let mut extra = cursor.sub_cursor(extra_length)?;

    let mask = read_mask_data(&mut extra)?;
    let blending_ranges = read_blending_ranges(&mut extra)?;
    let name = extra.read_pascal_string(encoding, 4)?;
    let remaining = extra.remaining();
    let blocks = read_tagged_blocks(parent, &mut extra, remaining, version)?;

    Ok(LayerRecord {
        top,
        left,
        bottom,
        right,
        channels,
        blend_mode,
        opacity,
        clipping,
        flags,
        mask,
        blending_ranges,
        name,
        blocks,
        channel_data: Vec::new(),
    })
}

fn read_mask_data(cursor: &mut Cursor<'_>) -> Result<Option<MaskData>, LayerError> {
    let size = cursor.read_u32()? as usize;
    let mut mask = cursor.sub_cursor(size)?;
    match size {
        0 => Ok(None),
        20 | 36 => {
            let rect = mask.read_i32s::<4>()?;
            let default_color = mask.read_u8()?;
            let flags = mask.read_u8()?;
            let real = if size == 36 {
                let real_flags = mask.read_u8()?;
                let background = mask.read_u8()?;
                let real_rect = mask.read_i32s::<4>()?;
                Some(RealMask {
                    flags: real_flags,
                    background,
                    rect: real_rect,
                })
            } else {
                None
            };
            Ok(Some(MaskData {
                rect,
                default_color,
                flags,
                real,
            }))
        }
        _ => {
            warn!(size, "Unexpected layer mask data size, skipping");
            Ok(None)
        }
    }
}

fn read_blending_ranges(cursor: &mut Cursor<'_>) -> Result<BlendingRanges, LayerError> {
    let length = cursor.read_u32()? as usize;
    let mut ranges_cursor = cursor.sub_cursor(length)?;

    let mut ranges = BlendingRanges::default();
    while ranges_cursor.remaining() >= 8 {
        let [s0, s1, d0, d1] = ranges_cursor.read_u16s::<4>()?;
        let range = BlendingRange {
            source: [s0, s1],
            destination: [d0, d1],
        };
        if ranges.composite.is_none() {
            ranges.composite = Some(range);
        } else {
            ranges.channels.push(range);
        }
    }
    Ok(ranges)
}

/// Split up to `length` bytes of tagged blocks at the cursor into chunks.
///
/// Reading stops early at anything that does not start with a block
/// signature. Payloads exclude the padding to a 4-byte boundary.
pub(crate) fn read_tagged_blocks(
    parent: &Bytes,
    cursor: &mut Cursor<'_>,
    length: usize,
    version: FormatVersion,
) -> Result<Vec<Chunk>, LayerError> {
    let mut section = cursor.sub_cursor(length.min(cursor.remaining()))?;
    let mut chunks = Vec::new();

    while section.remaining() >= BLOCK_HEADER_LEN {
        let signature = section.read_key()?;
        if !signature.is_block_signature() {
            trace!(signature = %signature, "Tagged block list ended without signature");
            break;
        }
        let code = section.read_key()?;
        let wide = version.is_large() && BlockKey::has_wide_length(code);
        let declared = section.read_length(wide)?;
        let len = to_len(declared, "tagged block")?;
        let payload = section.read_bytes(len)?;
        let pad = (4 - len % 4) % 4;
        section.skip(pad.min(section.remaining()))?;

        trace!(code = %code, len, "Read tagged block");
        chunks.push(Chunk::new(code, parent.slice_ref(payload)));
    }

    Ok(chunks)
}

// =============================================================================
// Tests
// =============================================================================
