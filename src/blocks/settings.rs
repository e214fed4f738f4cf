//! Descriptor-backed settings and the bridges to the effects, linked-layer
//! and engine-data parsers.
//!
//! Most modern blocks are a version word followed by an action descriptor.
//! A descriptor the engine cannot decode fails the whole block, which the
//! registry then passes through as raw bytes.

use bytes::Bytes;
use serde::Serialize;
use tracing::trace;

use crate::blocks::DiagnosticKind;
use crate::error::BlockError;
use crate::format::descriptor::{decode_descriptor, Descriptor, DescriptorValue};
use crate::format::effects::{decode_legacy_effects, decode_object_effects};
use crate::format::linked::decode_linked_layers;
use crate::format::{BlockKey, EngineData, TypeCode};
use crate::io::{hex_bytes, Cursor};

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded};

/// Descriptor version written by every current writer.
const DESCRIPTOR_VERSION: u32 = 16;

/// Metadata items shorter than this are never tried as descriptors.
const METADATA_DESCRIPTOR_MIN_LEN: usize = 16;

/// Descriptor field holding the text engine data of a type layer.
const ENGINE_DATA_FIELD: &str = "EngineData";

fn unsupported(block: &'static str, version: u32) -> BlockError {
    BlockError::UnsupportedVersion { block, version }
}

// =============================================================================
// Plain Descriptor Blocks
// =============================================================================

/// A version word followed by a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptorBlock {
    pub version: u32,
    pub descriptor: Descriptor,
}

/// Decoder shared by every block laid out as `u32 version, descriptor`.
///
/// The wrapping function picks the [`Decoded`] variant.
pub struct DescriptorBlockDecoder {
    wrap: fn(DescriptorBlock) -> Decoded,
}

impl DescriptorBlockDecoder {
    pub fn new(wrap: fn(DescriptorBlock) -> Decoded) -> Self {
        Self { wrap }
    }
}

impl ChunkDecoder for DescriptorBlockDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u32()?;
        let descriptor = decode_descriptor(&mut cursor)?;
        Ok((self.wrap)(DescriptorBlock {
            version,
            descriptor,
        }))
    }
}

// =============================================================================
// Versioned Descriptors
// =============================================================================

/// A block version and a descriptor version followed by a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedDescriptor {
    pub version: u32,
    pub descriptor_version: u32,
    pub descriptor: Descriptor,
}

/// `clrL`: the block version is a u16.
pub struct ColorLookupDecoder;

impl ChunkDecoder for ColorLookupDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = u32::from(cursor.read_u16()?);
        let descriptor_version = cursor.read_u32()?;
        let descriptor = decode_descriptor(&mut cursor)?;
        Ok(Decoded::ColorLookup(VersionedDescriptor {
            version,
            descriptor_version,
            descriptor,
        }))
    }
}

/// `vogk`: both versions must match.
pub struct VectorOriginationDecoder;

impl ChunkDecoder for VectorOriginationDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u32()?;
        if version != 1 {
            return Err(unsupported("vector origination", version));
        }
        let descriptor_version = cursor.read_u32()?;
        if descriptor_version != DESCRIPTOR_VERSION {
            return Err(unsupported("vector origination descriptor", descriptor_version));
        }
        let descriptor = decode_descriptor(&mut cursor)?;
        Ok(Decoded::VectorOriginationData(VersionedDescriptor {
            version,
            descriptor_version,
            descriptor,
        }))
    }
}

// =============================================================================
// Placed Layer
// =============================================================================

/// `SoLd` / `SoLE` smart object placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLayer {
    /// Identifier, normally `soLD`
    pub kind: TypeCode,
    pub version: u32,
    pub descriptor_version: u32,
    pub descriptor: Descriptor,
}

pub struct PlacedLayerDecoder;

impl ChunkDecoder for PlacedLayerDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        Ok(Decoded::PlacedLayer(PlacedLayer {
            kind: cursor.read_key()?,
            version: cursor.read_u32()?,
            descriptor_version: cursor.read_u32()?,
            descriptor: decode_descriptor(&mut cursor)?,
        }))
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// One entry of a `shmd` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataItem {
    pub signature: TypeCode,
    pub key: TypeCode,
    pub copy_on_sheet_duplication: bool,

    #[serde(serialize_with = "hex_bytes")]
    pub data: Bytes,

    /// The item data decoded as a descriptor block, when it is one
    pub descriptor: Option<DescriptorBlock>,
}

pub struct MetadataDecoder;

impl MetadataDecoder {
    fn try_descriptor(data: &[u8]) -> Result<DescriptorBlock, BlockError> {
        let mut cursor = Cursor::new(data);
        let version = cursor.read_u32()?;
        let descriptor = decode_descriptor(&mut cursor)?;
        Ok(DescriptorBlock {
            version,
            descriptor,
        })
    }
}

impl ChunkDecoder for MetadataDecoder {
    fn decode(&self, payload: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let count = cursor.read_u32()?;

        let mut items = Vec::with_capacity(count.min(64) as usize);
        for _ in 0..count {
            let signature = cursor.read_key()?;
            let key = cursor.read_key()?;
            if signature != TypeCode::SIGNATURE_8BIM {
                ctx.diagnostics().push(
                    BlockKey::MetadataSetting.code(),
                    DiagnosticKind::Partial,
                    format!("Metadata item {} has signature {}", key, signature),
                );
            }
            let copy_on_sheet_duplication = cursor.read_bool()?;
            cursor.skip(3)?;
            let length = cursor.read_u32()? as usize;
            let data = payload.slice_ref(cursor.read_bytes(length)?);

            let descriptor = if data.len() >= METADATA_DESCRIPTOR_MIN_LEN {
                match Self::try_descriptor(&data) {
                    Ok(block) => Some(block),
                    Err(err) => {
                        ctx.diagnostics().push(
                            BlockKey::MetadataSetting.code(),
                            DiagnosticKind::Partial,
                            format!("Metadata item {} kept as raw data: {}", key, err),
                        );
                        None
                    }
                }
            } else {
                None
            };

            trace!(key = %key, length, "Read metadata item");
            items.push(MetadataItem {
                signature,
                key,
                copy_on_sheet_duplication,
                data,
                descriptor,
            });
        }

        Ok(Decoded::Metadata(items))
    }
}

// =============================================================================
// Type Tool
// =============================================================================

/// `TySh` text layer settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeToolObjectSetting {
    pub version: u16,

    /// xx, xy, yx, yy, tx, ty
    pub transform: [f64; 6],

    pub text_version: u16,
    pub text_descriptor_version: u32,
    pub text: Descriptor,

    pub warp_version: u16,
    pub warp_descriptor_version: u32,
    pub warp: Descriptor,

    /// Left, top, right, bottom
    pub bounds: [i32; 4],
}

pub struct TypeToolDecoder;

impl TypeToolDecoder {
    const VERSION: u16 = 1;
    const TEXT_VERSION: u16 = 50;
    const WARP_VERSION: u16 = 1;

    /// Replace the raw engine data field of the text descriptor with the
    /// parsed tree. A parse failure leaves the field untouched.
    fn parse_engine_data(text: &mut Descriptor, ctx: &DecodeContext<'_>) {
        let Some(field) = text.get_mut(ENGINE_DATA_FIELD) else {
            return;
        };
        let DescriptorValue::RawData(raw) = field else {
            return;
        };
        match EngineData::parse(raw) {
            Ok(parsed) => *field = DescriptorValue::EngineData(parsed),
            Err(err) => ctx.diagnostics().push(
                BlockKey::TypeToolObjectSetting.code(),
                DiagnosticKind::Partial,
                format!("Engine data kept raw: {}", err),
            ),
        }
    }
}

impl ChunkDecoder for TypeToolDecoder {
    fn decode(&self, payload: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u16()?;
        if version != Self::VERSION {
            return Err(unsupported("type tool", u32::from(version)));
        }

        let mut transform = [0.0; 6];
        for value in &mut transform {
            *value = cursor.read_f64()?;
        }

        let text_version = cursor.read_u16()?;
        if text_version != Self::TEXT_VERSION {
            return Err(unsupported("type tool text", u32::from(text_version)));
        }
        let text_descriptor_version = cursor.read_u32()?;
        if text_descriptor_version != DESCRIPTOR_VERSION {
            return Err(unsupported("type tool text descriptor", text_descriptor_version));
        }
        let mut text = decode_descriptor(&mut cursor)?;
        Self::parse_engine_data(&mut text, ctx);

        let warp_version = cursor.read_u16()?;
        if warp_version != Self::WARP_VERSION {
            return Err(unsupported("type tool warp", u32::from(warp_version)));
        }
        let warp_descriptor_version = cursor.read_u32()?;
        if warp_descriptor_version != DESCRIPTOR_VERSION {
            return Err(unsupported("type tool warp descriptor", warp_descriptor_version));
        }
        let warp = decode_descriptor(&mut cursor)?;
        let bounds = cursor.read_i32s::<4>()?;

        Ok(Decoded::TypeToolObjectSetting(Box::new(TypeToolObjectSetting {
            version,
            transform,
            text_version,
            text_descriptor_version,
            text,
            warp_version,
            warp_descriptor_version,
            warp,
            bounds,
        })))
    }
}

// =============================================================================
// Collaborator Bridges
// =============================================================================

pub struct LegacyEffectsDecoder;

impl ChunkDecoder for LegacyEffectsDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        decode_legacy_effects(payload).map(Decoded::LegacyEffects)
    }
}

pub struct ObjectEffectsDecoder;

impl ChunkDecoder for ObjectEffectsDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        decode_object_effects(payload).map(Decoded::ObjectEffects)
    }
}

pub struct LinkedLayersDecoder;

impl ChunkDecoder for LinkedLayersDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        decode_linked_layers(payload).map(Decoded::LinkedLayers)
    }
}

/// `Txt2`: a bare engine-data document.
pub struct TextEngineDataDecoder;

impl ChunkDecoder for TextEngineDataDecoder {
    fn decode(&self, payload: &Bytes, _: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        Ok(Decoded::TextEngineData(EngineData::parse(payload)?))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockDecoder;
    use crate::error::DescriptorError;
    use crate::format::FormatVersion;

    fn run(
        decoder: &dyn ChunkDecoder,
        block_decoder: &BlockDecoder,
        data: Vec<u8>,
    ) -> Result<Decoded, BlockError> {
        let ctx = DecodeContext {
            version: FormatVersion::Psd,
            depth: 0,
            decoder: block_decoder,
        };
        decoder.decode(&Bytes::from(data), &ctx)
    }

    fn push_id(out: &mut Vec<u8>, id: &str) {
        if id.len() == 4 {
            out.extend_from_slice(&0u32.to_be_bytes());
        } else {
            out.extend_from_slice(&(id.len() as u32).to_be_bytes());
        }
        out.extend_from_slice(id.as_bytes());
    }

    /// A descriptor with one `long` item and, optionally, one raw data item.
    fn descriptor(value: i32, raw: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut out = 0u32.to_be_bytes().to_vec();
        push_id(&mut out, "null");
        let count: u32 = if raw.is_some() { 2 } else { 1 };
        out.extend_from_slice(&count.to_be_bytes());
        push_id(&mut out, "Vl  ");
        out.extend_from_slice(b"long");
        out.extend_from_slice(&value.to_be_bytes());
        if let Some((key, bytes)) = raw {
            push_id(&mut out, key);
            out.extend_from_slice(b"tdta");
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(bytes);
        }
        out
    }

    #[test]
    fn test_descriptor_block() {
        let mut data = 16u32.to_be_bytes().to_vec();
        data.extend(descriptor(7, None));

        let decoder = DescriptorBlockDecoder::new(Decoded::Vibrance);
        match run(&decoder, &BlockDecoder::default(), data).unwrap() {
            Decoded::Vibrance(block) => {
                assert_eq!(block.version, 16);
                assert_eq!(block.descriptor.class_id, "null");
                assert_eq!(block.descriptor.get("Vl  "), Some(&DescriptorValue::Integer(7)));
            }
            other => panic!("expected vibrance, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_field_type_fails_block() {
        let mut data = 16u32.to_be_bytes().to_vec();
        data.extend_from_slice(&0u32.to_be_bytes());
        push_id(&mut data, "null");
        data.extend_from_slice(&1u32.to_be_bytes());
        push_id(&mut data, "Bad ");
        data.extend_from_slice(b"????");

        let decoder = DescriptorBlockDecoder::new(Decoded::SolidColor);
        let err = run(&decoder, &BlockDecoder::default(), data).unwrap_err();
        assert_eq!(
            err,
            BlockError::Descriptor(DescriptorError::UnrecognizedFieldType("????".to_string()))
        );
    }

    #[test]
    fn test_vector_origination_versions() {
        let mut data = 1u32.to_be_bytes().to_vec();
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend(descriptor(1, None));
        assert!(matches!(
            run(&VectorOriginationDecoder, &BlockDecoder::default(), data).unwrap(),
            Decoded::VectorOriginationData(_)
        ));

        let mut data = 1u32.to_be_bytes().to_vec();
        data.extend_from_slice(&15u32.to_be_bytes());
        assert!(matches!(
            run(&VectorOriginationDecoder, &BlockDecoder::default(), data),
            Err(BlockError::UnsupportedVersion { version: 15, .. })
        ));
    }

    #[test]
    fn test_color_lookup() {
        let mut data = 1u16.to_be_bytes().to_vec();
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend(descriptor(3, None));
        match run(&ColorLookupDecoder, &BlockDecoder::default(), data).unwrap() {
            Decoded::ColorLookup(block) => {
                assert_eq!(block.version, 1);
                assert_eq!(block.descriptor_version, 16);
            }
            other => panic!("expected color lookup, got {:?}", other),
        }
    }

    #[test]
    fn test_placed_layer() {
        let mut data = b"soLD".to_vec();
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend(descriptor(9, None));
        match run(&PlacedLayerDecoder, &BlockDecoder::default(), data).unwrap() {
            Decoded::PlacedLayer(placed) => {
                assert_eq!(placed.kind, TypeCode::new(*b"soLD"));
                assert_eq!(placed.version, 4);
            }
            other => panic!("expected placed layer, got {:?}", other),
        }
    }

    fn metadata_item(key: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = b"8BIM".to_vec();
        out.extend_from_slice(key);
        out.extend_from_slice(&[1, 0, 0, 0]);
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_metadata_items() {
        let mut descriptor_body = 16u32.to_be_bytes().to_vec();
        descriptor_body.extend(descriptor(2, None));
        let garbage = [0xFFu8; 20];

        let mut data = 3u32.to_be_bytes().to_vec();
        data.extend(metadata_item(b"cust", &descriptor_body));
        data.extend(metadata_item(b"mlst", &garbage));
        data.extend(metadata_item(b"tmln", &[1, 2]));

        let block_decoder = BlockDecoder::default();
        match run(&MetadataDecoder, &block_decoder, data).unwrap() {
            Decoded::Metadata(items) => {
                assert_eq!(items.len(), 3);
                assert!(items[0].copy_on_sheet_duplication);
                assert!(items[0].descriptor.is_some());
                assert!(items[1].descriptor.is_none());
                assert_eq!(items[1].data.len(), 20);
                assert!(items[2].descriptor.is_none());
            }
            other => panic!("expected metadata, got {:?}", other),
        }

        let diagnostics = block_decoder.diagnostics().snapshot();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Partial);
    }

    #[test]
    fn test_metadata_bad_signature_keeps_parsing() {
        let mut odd = metadata_item(b"cust", &[1, 2, 3]);
        odd[..4].copy_from_slice(b"XXXX");

        let mut data = 2u32.to_be_bytes().to_vec();
        data.extend(odd);
        data.extend(metadata_item(b"tmln", &[4, 5]));

        let block_decoder = BlockDecoder::default();
        match run(&MetadataDecoder, &block_decoder, data).unwrap() {
            Decoded::Metadata(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].signature, TypeCode::new(*b"XXXX"));
                assert_eq!(items[0].data.as_ref(), &[1, 2, 3]);
                assert_eq!(items[1].key, TypeCode::new(*b"tmln"));
                assert_eq!(items[1].data.as_ref(), &[4, 5]);
            }
            other => panic!("expected metadata, got {:?}", other),
        }

        let diagnostics = block_decoder.diagnostics().snapshot();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Partial);
        assert!(diagnostics[0].message.contains("XXXX"));
    }

    fn type_tool(engine_data: &[u8]) -> Vec<u8> {
        let mut out = 1u16.to_be_bytes().to_vec();
        for v in [1.0f64, 0.0, 0.0, 1.0, 10.0, 20.0] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out.extend_from_slice(&50u16.to_be_bytes());
        out.extend_from_slice(&16u32.to_be_bytes());
        out.extend(descriptor(1, Some(("EngineData", engine_data))));
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&16u32.to_be_bytes());
        out.extend(descriptor(0, None));
        for v in [0i32, 0, 100, 50] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    #[test]
    fn test_type_tool_parses_engine_data() {
        let data = type_tool(b"<< /Editor << /Text (Hello) >> >>");
        match run(&TypeToolDecoder, &BlockDecoder::default(), data).unwrap() {
            Decoded::TypeToolObjectSetting(setting) => {
                assert_eq!(setting.transform[4], 10.0);
                assert_eq!(setting.bounds, [0, 0, 100, 50]);
                match setting.text.get("EngineData") {
                    Some(DescriptorValue::EngineData(engine)) => {
                        assert!(engine.get("Editor").is_some());
                    }
                    other => panic!("expected parsed engine data, got {:?}", other),
                }
            }
            other => panic!("expected type tool, got {:?}", other),
        }
    }

    #[test]
    fn test_type_tool_keeps_unparseable_engine_data() {
        let block_decoder = BlockDecoder::default();
        let data = type_tool(b"<< /Editor");
        match run(&TypeToolDecoder, &block_decoder, data).unwrap() {
            Decoded::TypeToolObjectSetting(setting) => {
                assert!(matches!(
                    setting.text.get("EngineData"),
                    Some(DescriptorValue::RawData(_))
                ));
            }
            other => panic!("expected type tool, got {:?}", other),
        }
        assert_eq!(block_decoder.diagnostics().len(), 1);
    }

    #[test]
    fn test_type_tool_version_gate() {
        let mut data = type_tool(b"<< >>");
        data[1] = 2;
        assert!(matches!(
            run(&TypeToolDecoder, &BlockDecoder::default(), data),
            Err(BlockError::UnsupportedVersion { version: 2, .. })
        ));
    }

    #[test]
    fn test_text_engine_data() {
        let data = b"<< /DocumentResources << >> >>".to_vec();
        assert!(matches!(
            run(&TextEngineDataDecoder, &BlockDecoder::default(), data).unwrap(),
            Decoded::TextEngineData(_)
        ));
        assert!(matches!(
            run(&TextEngineDataDecoder, &BlockDecoder::default(), b"[".to_vec()),
            Err(BlockError::EngineData(_))
        ));
    }
}
