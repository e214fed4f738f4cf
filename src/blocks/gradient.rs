//! Gradient map settings (`grdm`).

use bytes::Bytes;
use serde::Serialize;

use crate::error::BlockError;
use crate::io::Cursor;

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded};

const GRADIENT_VERSION: u16 = 1;

/// The only interpolation table shape found in real files.
const SUPPORTED_EXPANSION: u16 = 2;
const SUPPORTED_LENGTH: u16 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorStop {
    pub location: i32,
    pub midpoint: i32,
    pub mode: u16,
    pub color: [u16; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransparencyStop {
    pub location: u32,
    pub midpoint: u32,
    pub opacity: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradientSettings {
    pub version: u16,
    pub reversed: bool,
    pub dithered: bool,
    pub name: String,
    pub color_stops: Vec<ColorStop>,
    pub transparency_stops: Vec<TransparencyStop>,
    pub expansion: u16,
    pub interpolation: u16,
    pub length: u16,
    pub mode: u16,
    pub random_seed: u32,
    pub show_transparency: bool,
    pub use_vector_color: bool,
    pub roughness: u32,
    pub color_model: u16,
    pub minimum_color: [u16; 4],
    pub maximum_color: [u16; 4],
}

pub struct GradientMapDecoder;

impl ChunkDecoder for GradientMapDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        if version != GRADIENT_VERSION {
            return Err(BlockError::UnsupportedVersion {
                block: "gradient map",
                version: u32::from(version),
            });
        }
        let reversed = cursor.read_bool()?;
        let dithered = cursor.read_bool()?;
        let name = cursor.read_unicode_string()?;

        let color_count = cursor.read_u16()?;
        let mut color_stops = Vec::with_capacity(color_count as usize);
        for _ in 0..color_count {
            color_stops.push(ColorStop {
                location: cursor.read_i32()?,
                midpoint: cursor.read_i32()?,
                mode: cursor.read_u16()?,
                color: cursor.read_u16s::<4>()?,
            });
            // Undocumented per-stop word
            cursor.skip(2)?;
        }

        let transparency_count = cursor.read_u16()?;
        let mut transparency_stops = Vec::with_capacity(transparency_count as usize);
        for _ in 0..transparency_count {
            transparency_stops.push(TransparencyStop {
                location: cursor.read_u32()?,
                midpoint: cursor.read_u32()?,
                opacity: cursor.read_u16()?,
            });
        }

        let [expansion, interpolation, length, mode] = cursor.read_u16s::<4>()?;
        if expansion != SUPPORTED_EXPANSION || length != SUPPORTED_LENGTH {
            return Err(BlockError::UnsupportedParameters(format!(
                "gradient expansion {} with length {}",
                expansion, length
            )));
        }

        let random_seed = cursor.read_u32()?;
        let show_transparency = cursor.read_u16()? != 0;
        let use_vector_color = cursor.read_u16()? != 0;
        let roughness = cursor.read_u32()?;
        let color_model = cursor.read_u16()?;
        let minimum_color = cursor.read_u16s::<4>()?;
        let maximum_color = cursor.read_u16s::<4>()?;
        cursor.skip(2)?;

        Ok(Decoded::GradientMap(Box::new(GradientSettings {
            version,
            reversed,
            dithered,
            name,
            color_stops,
            transparency_stops,
            expansion,
            interpolation,
            length,
            mode,
            random_seed,
            show_transparency,
            use_vector_color,
            roughness,
            color_model,
            minimum_color,
            maximum_color,
        })))
    }
}
