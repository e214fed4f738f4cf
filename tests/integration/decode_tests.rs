//! Structured decoding through the standard registry.
//!
//! Tests verify:
//! - Each block family decodes to its record type
//! - Output order and length match the input
//! - Sequential and parallel decoding agree

use bytes::Bytes;

use psd_tagged_blocks::blocks::PathRecord;
use psd_tagged_blocks::format::SectionDividerType;
use psd_tagged_blocks::{
    BlockDecoder, Chunk, Decoded, DecodeOptions, DescriptorValue, FormatVersion, TypeCode,
};

use super::test_utils::{
    curves_v1, descriptor_block, descriptor_with_integer, levels, path_record, pattern,
    vector_mask,
};

fn decode_one(code: &[u8; 4], payload: Vec<u8>) -> Decoded {
    let decoder = BlockDecoder::default();
    decoder
        .parse_tagged_block(&Chunk::new(*code, payload), FormatVersion::Psd)
        .unwrap()
        .payload
}

// =============================================================================
// Adjustment Layers
// =============================================================================

#[test]
fn test_levels_gamma() {
    match decode_one(b"levl", levels(150)) {
        Decoded::Levels(levels) => {
            assert_eq!(levels.records.len(), 29);
            assert!(levels.records.iter().all(|r| r.gamma == 1.5));
        }
        other => panic!("expected levels, got {:?}", other),
    }
}

#[test]
fn test_curves_population_count() {
    match decode_one(b"curv", curves_v1(0b101, &[(0, 0), (128, 64), (255, 255)])) {
        Decoded::Curves(curves) => {
            assert_eq!(curves.curves.len(), 2);
            assert_eq!(curves.curves[0].points[1], [128, 64]);
        }
        other => panic!("expected curves, got {:?}", other),
    }
}

#[test]
fn test_both_hue_saturation_codes() {
    let mut payload = vec![0, 2, 0, 0];
    payload.extend(std::iter::repeat(0).take(6 + 6 + 6 * 14));
    for code in [b"hue ", b"hue2"] {
        assert!(matches!(
            decode_one(code, payload.clone()),
            Decoded::HueSaturation(_)
        ));
    }
}

// =============================================================================
// Descriptor-Backed Settings
// =============================================================================

#[test]
fn test_descriptor_backed_blocks() {
    let descriptor = descriptor_with_integer("null", "Amnt", 40);
    let cases: [(&[u8; 4], fn(&Decoded) -> bool); 4] = [
        (b"SoCo", |d| matches!(d, Decoded::SolidColor(_))),
        (b"vibA", |d| matches!(d, Decoded::Vibrance(_))),
        (b"blwh", |d| matches!(d, Decoded::BlackAndWhite(_))),
        (b"extd", |d| matches!(d, Decoded::ExportData(_))),
    ];

    for (code, check) in cases {
        let decoded = decode_one(code, descriptor_block(16, &descriptor));
        assert!(check(&decoded), "{:?} decoded to {:?}", code, decoded);
    }

    match decode_one(b"vibA", descriptor_block(16, &descriptor)) {
        Decoded::Vibrance(block) => {
            assert_eq!(block.descriptor.get("Amnt"), Some(&DescriptorValue::Integer(40)));
        }
        other => panic!("expected vibrance, got {:?}", other),
    }
}

#[test]
fn test_object_effects() {
    let mut payload = 0u32.to_be_bytes().to_vec();
    payload.extend(descriptor_block(16, &descriptor_with_integer("null", "Scl ", 100)));
    for code in [b"lfx2", b"lmfx"] {
        assert!(matches!(
            decode_one(code, payload.clone()),
            Decoded::ObjectEffects(_)
        ));
    }
}

// =============================================================================
// Layer Settings
// =============================================================================

#[test]
fn test_layer_settings() {
    assert_eq!(decode_one(b"lyid", vec![0, 0, 1, 0]), Decoded::LayerId(256));
    assert_eq!(decode_one(b"iOpa", vec![77, 0, 0, 0]), Decoded::FillOpacity(77));
    assert_eq!(decode_one(b"knko", vec![0, 0, 0, 1]), Decoded::Boolean(true));
    assert_eq!(
        decode_one(b"luni", vec![0, 0, 0, 1, 0, b'A']),
        Decoded::UnicodeLayerName("A".to_string())
    );
    match decode_one(b"lspf", vec![0, 0, 0, 0x80 | 0x02]) {
        Decoded::Protected(protected) => {
            assert!(!protected.transparency);
            assert!(protected.composite);
            assert!(!protected.position);
        }
        other => panic!("expected protected setting, got {:?}", other),
    }
}

#[test]
fn test_section_divider_codes() {
    for code in [b"lsct", b"lsdk"] {
        match decode_one(code, b"\x00\x00\x00\x028BIMpass".to_vec()) {
            Decoded::Divider(divider) => {
                assert_eq!(divider.block, TypeCode::new(*code));
                assert_eq!(divider.kind, Some(SectionDividerType::ClosedFolder));
                assert_eq!(divider.blend_mode, Some(TypeCode::new(*b"pass")));
            }
            other => panic!("expected divider, got {:?}", other),
        }
    }
}

#[test]
fn test_vector_mask() {
    let payload = vector_mask(
        0b100,
        &[
            path_record(6, &[]),
            path_record(3, &[0x0001_0000]),
            path_record(4, &[16_777_216, 8_388_608, 0, 0, 0, 0]),
        ],
    );
    match decode_one(b"vsms", payload) {
        Decoded::VectorMask(mask) => {
            assert!(mask.disable);
            assert!(!mask.invert);
            assert_eq!(mask.path.len(), 3);
            assert_eq!(
                mask.path[1],
                PathRecord::SubpathLength {
                    closed: false,
                    knot_count: 1
                }
            );
            match mask.path[2] {
                PathRecord::Knot { knot, closed, linked } => {
                    assert!(!closed);
                    assert!(linked);
                    assert_eq!(knot.preceding, [1.0, 0.5]);
                }
                other => panic!("expected knot, got {:?}", other),
            }
        }
        other => panic!("expected vector mask, got {:?}", other),
    }
}

// =============================================================================
// Embedded Data
// =============================================================================

#[test]
fn test_patterns_block() {
    let mut payload = pattern("Dots", &[1, 2, 3]);
    payload.extend(pattern("Lines", &[4]));
    match decode_one(b"Pat2", payload) {
        Decoded::Patterns(patterns) => {
            let names: Vec<_> = patterns.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, ["Dots", "Lines"]);
            assert_eq!(patterns[0].data.channels[0].data.as_ref(), &[1, 2, 3]);
        }
        other => panic!("expected patterns, got {:?}", other),
    }
}

#[test]
fn test_text_engine_data() {
    match decode_one(b"Txt2", b"<< /Root << /Count 3 >> >>".to_vec()) {
        Decoded::TextEngineData(engine) => assert!(engine.get("Root").is_some()),
        other => panic!("expected engine data, got {:?}", other),
    }
}

// =============================================================================
// Ordering and Parallelism
// =============================================================================

fn mixed_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new(*b"levl", levels(100)),
        Chunk::new(*b"Anno", vec![1, 2, 3]),
        Chunk::new(*b"lyid", vec![0, 0, 0, 4]),
        Chunk::new(*b"curv", curves_v1(0b1, &[(1, 1)])),
        Chunk::new(*b"zzzz", Bytes::new()),
        Chunk::new(*b"iOpa", vec![10, 0, 0, 0]),
    ]
}

#[test]
fn test_order_and_length_preserved() {
    let chunks = mixed_chunks();
    let decoded = BlockDecoder::default()
        .decode(&chunks, FormatVersion::Psd)
        .unwrap();

    assert_eq!(decoded.len(), chunks.len());
    for (chunk, decoded) in chunks.iter().zip(&decoded) {
        assert_eq!(chunk.code, decoded.code);
    }
    let kinds: Vec<_> = decoded.iter().map(|d| d.payload.kind()).collect();
    assert_eq!(kinds, ["Levels", "Raw", "LayerId", "Curves", "Raw", "FillOpacity"]);
}

#[test]
fn test_parallel_matches_sequential() {
    let mut chunks = Vec::new();
    for _ in 0..20 {
        chunks.extend(mixed_chunks());
    }

    let sequential = BlockDecoder::new(DecodeOptions::default());
    let parallel = BlockDecoder::new(DecodeOptions::default().with_parallel(true));
    let a = sequential.decode(&chunks, FormatVersion::Psd).unwrap();
    let b = parallel.decode_parallel(&chunks, FormatVersion::Psd).unwrap();
    assert_eq!(a, b);
    assert_eq!(sequential.diagnostics().len(), parallel.diagnostics().len());
    assert_eq!(parallel.diagnostics().len(), 40);
}
