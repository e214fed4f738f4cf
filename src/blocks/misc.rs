//! Small fixed-layout layer settings.

use bytes::Bytes;
use serde::Serialize;

use crate::error::BlockError;
use crate::io::Cursor;

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded};

// =============================================================================
// Records
// =============================================================================

/// Lock flags of a layer (`lspf`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtectedSetting {
    pub transparency: bool,
    pub composite: bool,
    pub position: bool,
}

impl ProtectedSetting {
    pub fn from_bits(bits: u32) -> Self {
        Self {
            transparency: bits & 0x01 != 0,
            composite: bits & 0x02 != 0,
            position: bits & 0x04 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterMask {
    /// Color space id followed by four components
    pub color: [u8; 10],
    pub opacity: u16,
}

// =============================================================================
// Decoders
// =============================================================================

pub struct ProtectedDecoder;

impl ChunkDecoder for ProtectedDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let bits = Cursor::new(payload).read_u32()?;
        Ok(Decoded::Protected(ProtectedSetting::from_bits(bits)))
    }
}

pub struct ReferencePointDecoder;

impl ChunkDecoder for ReferencePointDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        Ok(Decoded::ReferencePoint(ReferencePoint {
            x: cursor.read_f64()?,
            y: cursor.read_f64()?,
        }))
    }
}

pub struct SheetColorDecoder;

impl ChunkDecoder for SheetColorDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        Ok(Decoded::SheetColor(Cursor::new(payload).read_u16s::<4>()?))
    }
}

pub struct FilterMaskDecoder;

impl ChunkDecoder for FilterMaskDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        Ok(Decoded::FilterMask(FilterMask {
            color: cursor.read_array()?,
            opacity: cursor.read_u16()?,
        }))
    }
}

/// A list of channel indices, read until the payload is exhausted.
pub struct ChannelBlendRestrictionsDecoder;

impl ChunkDecoder for ChannelBlendRestrictionsDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let mut channels = Vec::with_capacity(payload.len() / 4);
        while cursor.remaining() >= 4 {
            channels.push(cursor.read_u32()?);
        }
        Ok(Decoded::ChannelBlendRestrictions(channels))
    }
}

/// Single-flag blocks stored as a u32 (`clbl`, `infx`, `knko`).
pub struct BooleanDecoder;

impl ChunkDecoder for BooleanDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        Ok(Decoded::Boolean(Cursor::new(payload).read_u32()? != 0))
    }
}

pub struct FillOpacityDecoder;

impl ChunkDecoder for FillOpacityDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let [opacity, _, _, _] = Cursor::new(payload).read_array::<4>()?;
        Ok(Decoded::FillOpacity(opacity))
    }
}

pub struct UnicodeLayerNameDecoder;

impl ChunkDecoder for UnicodeLayerNameDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        Ok(Decoded::UnicodeLayerName(
            Cursor::new(payload).read_unicode_string()?,
        ))
    }
}

pub struct LayerIdDecoder;

impl ChunkDecoder for LayerIdDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        Ok(Decoded::LayerId(Cursor::new(payload).read_u32()?))
    }
}

// =============================================================================
// Tests
// =============================================================================
