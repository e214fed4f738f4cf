//! Fixed-layout adjustment-layer decoders.
//!
//! Each decoder validates the block's version field before reading the
//! rest of the record. Payloads may carry trailing data after the fields
//! decoded here (newer writers append extra sections); it is ignored.

use bytes::Bytes;
use serde::Serialize;

use crate::error::BlockError;
use crate::format::TypeCode;
use crate::io::Cursor;

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded};

/// Number of per-channel records in a levels block.
const LEVEL_RECORD_COUNT: usize = 29;

/// Number of hue ranges in a hue/saturation block.
const HUE_RANGE_COUNT: usize = 6;

/// Number of color rows in a selective color block.
const SELECTIVE_COLOR_ROWS: usize = 10;

fn check_version(block: &'static str, version: u16, supported: &[u16]) -> Result<(), BlockError> {
    if supported.contains(&version) {
        Ok(())
    } else {
        Err(BlockError::UnsupportedVersion {
            block,
            version: u32::from(version),
        })
    }
}

// =============================================================================
// Brightness / Contrast
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrightnessContrast {
    pub brightness: i16,
    pub contrast: i16,
    pub mean: u16,
    pub lab: bool,
}

pub struct BrightnessContrastDecoder;

impl ChunkDecoder for BrightnessContrastDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        Ok(Decoded::BrightnessContrast(BrightnessContrast {
            brightness: cursor.read_i16()?,
            contrast: cursor.read_i16()?,
            mean: cursor.read_u16()?,
            lab: cursor.read_bool()?,
        }))
    }
}

// =============================================================================
// Levels
// =============================================================================

/// One channel of a levels adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelRecord {
    pub input_floor: u16,
    pub input_ceiling: u16,
    pub output_floor: u16,
    pub output_ceiling: u16,
    /// Stored in hundredths
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Levels {
    pub version: u16,
    pub records: Vec<LevelRecord>,
}

pub struct LevelsDecoder;

impl LevelsDecoder {
    const VERSION: u16 = 2;
}

impl ChunkDecoder for LevelsDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        check_version("levels", version, &[Self::VERSION])?;

        let mut records = Vec::with_capacity(LEVEL_RECORD_COUNT);
        for _ in 0..LEVEL_RECORD_COUNT {
            let [input_floor, input_ceiling, output_floor, output_ceiling, gamma] =
                cursor.read_u16s::<5>()?;
            records.push(LevelRecord {
                input_floor,
                input_ceiling,
                output_floor,
                output_ceiling,
                gamma: f64::from(gamma) / 100.0,
            });
        }

        Ok(Decoded::Levels(Levels { version, records }))
    }
}

// =============================================================================
// Curves
// =============================================================================

/// Control points of one channel curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurveData {
    /// Channel index, only known for curves in the extra marker
    pub channel: Option<u16>,
    /// (output, input) pairs
    pub points: Vec<[u16; 2]>,
}

/// Trailing section of version-1 curves blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurvesExtraMarker {
    pub tag: TypeCode,
    pub version: u16,
    pub curves: Vec<CurveData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Curves {
    pub version: u16,
    /// Number of curves, after expanding a version-1 channel bitmask
    pub count: u32,
    pub curves: Vec<CurveData>,
    pub extra: Option<CurvesExtraMarker>,
}

pub struct CurvesDecoder;

impl CurvesDecoder {
    const VERSIONS: [u16; 2] = [1, 4];

    fn read_points(cursor: &mut Cursor<'_>) -> Result<Vec<[u16; 2]>, BlockError> {
        let point_count = cursor.read_u16()?;
        let mut points = Vec::with_capacity(point_count.min(256) as usize);
        for _ in 0..point_count {
            points.push(cursor.read_u16s::<2>()?);
        }
        Ok(points)
    }
}

impl ChunkDecoder for CurvesDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        cursor.skip(1)?;
        let version = cursor.read_u16()?;
        check_version("curves", version, &Self::VERSIONS)?;

        // Version 1 stores a bitmask of the channels that have a curve
        let count = match cursor.read_u32()? {
            bits if version == 1 => bits.count_ones(),
            count => count,
        };

        let mut curves = Vec::new();
        for _ in 0..count {
            curves.push(CurveData {
                channel: None,
                points: Self::read_points(&mut cursor)?,
            });
        }

        let extra = if version == 1 && !cursor.is_at_end() {
            let tag = cursor.read_key()?;
            let extra_version = cursor.read_u16()?;
            let extra_count = cursor.read_u32()?;
            let mut extra_curves = Vec::new();
            for _ in 0..extra_count {
                let channel = cursor.read_u16()?;
                extra_curves.push(CurveData {
                    channel: Some(channel),
                    points: Self::read_points(&mut cursor)?,
                });
            }
            Some(CurvesExtraMarker {
                tag,
                version: extra_version,
                curves: extra_curves,
            })
        } else {
            None
        };

        Ok(Decoded::Curves(Curves {
            version,
            count,
            curves,
            extra,
        }))
    }
}

// =============================================================================
// Exposure
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exposure {
    pub version: u16,
    pub exposure: f32,
    pub offset: f32,
    pub gamma: f32,
}

pub struct ExposureDecoder;

impl ChunkDecoder for ExposureDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        check_version("exposure", version, &[1])?;
        Ok(Decoded::Exposure(Exposure {
            version,
            exposure: cursor.read_f32()?,
            offset: cursor.read_f32()?,
            gamma: cursor.read_f32()?,
        }))
    }
}

// =============================================================================
// Hue / Saturation
// =============================================================================

/// One of the six hue ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HueSaturationRange {
    /// Range limits
    pub range: [i16; 4],
    /// Hue, saturation, lightness
    pub settings: [i16; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HueSaturation {
    pub version: u16,
    pub enable_colorization: bool,
    pub colorization: [i16; 3],
    pub master: [i16; 3],
    pub ranges: Vec<HueSaturationRange>,
}

/// Decoder for both `hue ` and `hue2`.
pub struct HueSaturationDecoder;

impl ChunkDecoder for HueSaturationDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        check_version("hue/saturation", version, &[2])?;
        let enable_colorization = cursor.read_bool()?;
        cursor.skip(1)?;

        let colorization = cursor.read_i16s::<3>()?;
        let master = cursor.read_i16s::<3>()?;
        let mut ranges = Vec::with_capacity(HUE_RANGE_COUNT);
        for _ in 0..HUE_RANGE_COUNT {
            ranges.push(HueSaturationRange {
                range: cursor.read_i16s::<4>()?,
                settings: cursor.read_i16s::<3>()?,
            });
        }

        Ok(Decoded::HueSaturation(HueSaturation {
            version,
            enable_colorization,
            colorization,
            master,
            ranges,
        }))
    }
}

// =============================================================================
// Color Balance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorBalance {
    pub shadows: [i16; 3],
    pub midtones: [i16; 3],
    pub highlights: [i16; 3],
    pub preserve_luminosity: bool,
}

pub struct ColorBalanceDecoder;

impl ChunkDecoder for ColorBalanceDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        Ok(Decoded::ColorBalance(ColorBalance {
            shadows: cursor.read_i16s::<3>()?,
            midtones: cursor.read_i16s::<3>()?,
            highlights: cursor.read_i16s::<3>()?,
            preserve_luminosity: cursor.read_bool()?,
        }))
    }
}

// =============================================================================
// Photo Filter
// =============================================================================

/// Photo filter settings. Version 3 stores an XYZ color, version 2 a color
/// space id and components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhotoFilter {
    pub version: u16,
    pub xyz: Option<[u32; 3]>,
    pub color_space: Option<u16>,
    pub color_components: Option<[u16; 4]>,
    pub density: u32,
    pub preserve_luminosity: bool,
}

pub struct PhotoFilterDecoder;

impl ChunkDecoder for PhotoFilterDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        check_version("photo filter", version, &[2, 3])?;

        let (xyz, color_space, color_components) = if version == 3 {
            (Some(cursor.read_u32s::<3>()?), None, None)
        } else {
            let space = cursor.read_u16()?;
            (None, Some(space), Some(cursor.read_u16s::<4>()?))
        };

        Ok(Decoded::PhotoFilter(PhotoFilter {
            version,
            xyz,
            color_space,
            color_components,
            density: cursor.read_u32()?,
            preserve_luminosity: cursor.read_bool()?,
        }))
    }
}

// =============================================================================
// Channel Mixer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelMixer {
    pub version: u16,
    pub monochrome: bool,
    pub settings: [u16; 5],
}

pub struct ChannelMixerDecoder;

impl ChunkDecoder for ChannelMixerDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        check_version("channel mixer", version, &[1])?;
        Ok(Decoded::ChannelMixer(ChannelMixer {
            version,
            monochrome: cursor.read_u16()? != 0,
            settings: cursor.read_u16s::<5>()?,
        }))
    }
}

// =============================================================================
// Selective Color
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectiveColor {
    pub version: u16,
    /// 0 relative, 1 absolute
    pub method: u16,
    /// Cyan, magenta, yellow, black deltas per color row
    pub items: Vec<[i16; 4]>,
}

pub struct SelectiveColorDecoder;

impl ChunkDecoder for SelectiveColorDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        check_version("selective color", version, &[1])?;
        let method = cursor.read_u16()?;
        let mut items = Vec::with_capacity(SELECTIVE_COLOR_ROWS);
        for _ in 0..SELECTIVE_COLOR_ROWS {
            items.push(cursor.read_i16s::<4>()?);
        }
        Ok(Decoded::SelectiveColor(SelectiveColor {
            version,
            method,
            items,
        }))
    }
}

// =============================================================================
// Posterize / Threshold
// =============================================================================

/// Both blocks store a single u16 followed by two pad bytes.
fn read_scalar(payload: &Bytes) -> Result<u16, BlockError> {
    let [value, _] = Cursor::new(payload).read_u16s::<2>()?;
    Ok(value)
}

pub struct PosterizeDecoder;

impl ChunkDecoder for PosterizeDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        read_scalar(payload).map(Decoded::Posterize)
    }
}

pub struct ThresholdDecoder;

impl ChunkDecoder for ThresholdDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        read_scalar(payload).map(Decoded::Threshold)
    }
}

// =============================================================================
// Tests
// =============================================================================
