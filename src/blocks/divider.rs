//! Section divider settings (`lsct`, `lsdk`).
//!
//! A divider marks a layer as the start or end of a group. The payload is
//! a u32 section type, optionally followed by a block signature and a
//! blend mode key when it is exactly 12 bytes long.

use bytes::Bytes;
use serde::Serialize;

use crate::blocks::DiagnosticKind;
use crate::error::BlockError;
use crate::format::{BlockKey, SectionDividerType, TypeCode};
use crate::io::Cursor;

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded};

/// Payload length that carries a blend mode key.
const WITH_BLEND_MODE_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Divider {
    /// Code of the block this divider came from
    pub block: TypeCode,

    pub section_type: u32,

    /// `None` for section types outside the known set
    pub kind: Option<SectionDividerType>,

    pub blend_mode: Option<TypeCode>,
}

/// Decoder for one divider key; the key is recorded in the output.
pub struct SectionDividerDecoder {
    key: BlockKey,
}

impl SectionDividerDecoder {
    pub fn new(key: BlockKey) -> Self {
        Self { key }
    }
}

impl ChunkDecoder for SectionDividerDecoder {
    fn decode(&self, payload: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let section_type = cursor.read_u32()?;
        let kind = SectionDividerType::from_u32(section_type);
        if kind.is_none() {
            ctx.diagnostics().push(
                self.key.code(),
                DiagnosticKind::UnrecognizedSectionType,
                format!("Unknown section divider type {}", section_type),
            );
        }

        let blend_mode = if payload.len() == WITH_BLEND_MODE_LEN {
            let signature = cursor.read_key()?;
            if !signature.is_block_signature() {
                return Err(BlockError::MalformedSignature {
                    expected: TypeCode::SIGNATURE_8BIM,
                    found: signature,
                });
            }
            Some(cursor.read_key()?)
        } else {
            None
        };

        Ok(Decoded::Divider(Divider {
            block: self.key.code(),
            section_type,
            kind,
            blend_mode,
        }))
    }
}
