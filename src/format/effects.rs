//! Layer-effects parsing.
//!
//! Two generations of effects storage exist:
//! - `lrFX`: a fixed-layout list of effect records, each tagged with a
//!   4-byte effect key (`cmnS`, `dsdw`, `isdw`, `oglw`, `iglw`, `bevl`,
//!   `sofi`). Record bodies are kept as raw bytes.
//! - `lfx2`/`lmfx`/`lfxs`: an object-based effects descriptor preceded by
//!   two version words.

use bytes::Bytes;
use serde::Serialize;
use tracing::trace;

use crate::error::BlockError;
use crate::format::descriptor::{decode_descriptor, Descriptor};
use crate::format::TypeCode;
use crate::io::{hex_bytes, Cursor};

/// Descriptor version used by object-based effects.
const OBJECT_EFFECTS_DESCRIPTOR_VERSION: u32 = 16;

/// One record of the legacy effects list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyEffect {
    /// Effect key, e.g. `dsdw` for drop shadow
    pub key: TypeCode,

    /// Record body, starting after the size field
    #[serde(serialize_with = "hex_bytes")]
    pub data: Bytes,
}

/// Decoded `lrFX` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyEffects {
    pub version: u16,
    pub effects: Vec<LegacyEffect>,
}

/// Decoded object-based effects block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEffects {
    pub version: u32,
    pub descriptor_version: u32,
    pub descriptor: Descriptor,
}

/// Parse a legacy `lrFX` payload.
///
/// Layout: version u16, count u16, then per effect a block signature,
/// a 4-byte effect key, a u32 size and the record body.
pub fn decode_legacy_effects(data: &Bytes) -> Result<LegacyEffects, BlockError> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u16()?;
    let count = cursor.read_u16()?;

    let mut effects = Vec::with_capacity(count.min(16) as usize);
    for _ in 0..count {
        let signature = cursor.read_key()?;
        if !signature.is_block_signature() {
            return Err(BlockError::MalformedSignature {
                expected: TypeCode::SIGNATURE_8BIM,
                found: signature,
            });
        }
        let key = cursor.read_key()?;
        let size = cursor.read_u32()? as usize;
        let body = cursor.read_bytes(size)?;
        trace!(effect = %key, size, "Read legacy effect record");
        effects.push(LegacyEffect {
            key,
            data: data.slice_ref(body),
        });
    }

    Ok(LegacyEffects { version, effects })
}

/// Parse an object-based effects payload (`lfx2`, `lmfx`, `lfxs`).
pub fn decode_object_effects(data: &[u8]) -> Result<ObjectEffects, BlockError> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u32()?;
    let descriptor_version = cursor.read_u32()?;
    if version != 0 || descriptor_version != OBJECT_EFFECTS_DESCRIPTOR_VERSION {
        return Err(BlockError::UnsupportedVersion {
            block: "object effects",
            version: if version != 0 {
                version
            } else {
                descriptor_version
            },
        });
    }

    let descriptor = decode_descriptor(&mut cursor)?;
    Ok(ObjectEffects {
        version,
        descriptor_version,
        descriptor,
    })
}
