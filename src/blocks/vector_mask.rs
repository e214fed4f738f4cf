//! Vector mask settings (`vmsk`, `vsms`).
//!
//! After an 8-byte header the payload is a sequence of 26-byte path
//! records. Each record starts with a selector that decides how the
//! remaining 24 bytes are read. Coordinates are 8.24 fixed point.

use bytes::Bytes;
use serde::Serialize;

use crate::error::BlockError;
use crate::format::PathSelector;
use crate::io::Cursor;

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded};

const VECTOR_MASK_VERSION: u32 = 3;
const HEADER_LEN: usize = 8;
const RECORD_LEN: usize = 26;

/// Scale of an 8.24 fixed-point value.
const FIXED_POINT_ONE: f64 = 16_777_216.0;

/// Convert an 8.24 fixed-point integer to a float.
pub fn fixed_to_f64(value: i32) -> f64 {
    f64::from(value) / FIXED_POINT_ONE
}

/// A bezier knot; every point is (vertical, horizontal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BezierKnot {
    pub preceding: [f64; 2],
    pub anchor: [f64; 2],
    pub leaving: [f64; 2],
}

/// One path record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PathRecord {
    SubpathLength {
        closed: bool,
        knot_count: u16,
    },
    Knot {
        closed: bool,
        linked: bool,
        knot: BezierKnot,
    },
    PathFillRule,
    Clipboard {
        top: f64,
        left: f64,
        bottom: f64,
        right: f64,
        resolution: f64,
    },
    InitialFillRule {
        rule: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMaskSetting {
    pub version: u32,
    pub invert: bool,
    pub not_link: bool,
    pub disable: bool,
    pub path: Vec<PathRecord>,
}

pub struct VectorMaskDecoder;

impl VectorMaskDecoder {
    fn read_point(cursor: &mut Cursor<'_>) -> Result<[f64; 2], BlockError> {
        let [vertical, horizontal] = cursor.read_i32s::<2>()?;
        Ok([fixed_to_f64(vertical), fixed_to_f64(horizontal)])
    }

    fn read_knot(cursor: &mut Cursor<'_>) -> Result<BezierKnot, BlockError> {
        Ok(BezierKnot {
            preceding: Self::read_point(cursor)?,
            anchor: Self::read_point(cursor)?,
            leaving: Self::read_point(cursor)?,
        })
    }

    fn read_record(cursor: &mut Cursor<'_>) -> Result<PathRecord, BlockError> {
        use PathSelector as S;

        let raw = cursor.read_u16()?;
        let selector = PathSelector::from_u16(raw).ok_or(BlockError::UnrecognizedSelector(raw))?;
        let record = match selector {
            S::ClosedSubpathLength | S::OpenSubpathLength => {
                let knot_count = cursor.read_u16()?;
                cursor.skip(22)?;
                PathRecord::SubpathLength {
                    closed: selector == S::ClosedSubpathLength,
                    knot_count,
                }
            }
            S::ClosedSubpathKnotLinked
            | S::ClosedSubpathKnotUnlinked
            | S::OpenSubpathKnotLinked
            | S::OpenSubpathKnotUnlinked => PathRecord::Knot {
                closed: matches!(
                    selector,
                    S::ClosedSubpathKnotLinked | S::ClosedSubpathKnotUnlinked
                ),
                linked: matches!(selector, S::ClosedSubpathKnotLinked | S::OpenSubpathKnotLinked),
                knot: Self::read_knot(cursor)?,
            },
            S::PathFillRule => {
                cursor.skip(24)?;
                PathRecord::PathFillRule
            }
            S::Clipboard => {
                let [top, left, bottom, right, resolution] = cursor.read_i32s::<5>()?;
                cursor.skip(4)?;
                PathRecord::Clipboard {
                    top: fixed_to_f64(top),
                    left: fixed_to_f64(left),
                    bottom: fixed_to_f64(bottom),
                    right: fixed_to_f64(right),
                    resolution: fixed_to_f64(resolution),
                }
            }
            S::InitialFillRule => {
                let rule = cursor.read_u16()?;
                cursor.skip(22)?;
                PathRecord::InitialFillRule { rule }
            }
        };
        Ok(record)
    }
}

impl ChunkDecoder for VectorMaskDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u32()?;
        if version != VECTOR_MASK_VERSION {
            return Err(BlockError::UnsupportedVersion {
                block: "vector mask",
                version,
            });
        }
        let flags = cursor.read_u32()?;

        let record_count = payload.len().saturating_sub(HEADER_LEN) / RECORD_LEN;
        let mut path = Vec::with_capacity(record_count);
        for _ in 0..record_count {
            path.push(Self::read_record(&mut cursor)?);
        }

        Ok(Decoded::VectorMask(VectorMaskSetting {
            version,
            invert: flags & 0x01 != 0,
            not_link: flags & 0x02 != 0,
            disable: flags & 0x04 != 0,
            path,
        }))
    }
}
