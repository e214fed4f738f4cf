//! Raw fallback policy.
//!
//! Tests verify:
//! - Unknown and undecoded codes pass through unchanged with one diagnostic
//! - Decoder failures keep the original payload
//! - A failing chunk never affects its siblings

use bytes::Bytes;

use psd_tagged_blocks::{BlockDecoder, Chunk, Decoded, DiagnosticKind, FormatVersion, TypeCode};

use super::test_utils::{
    curves_with_version, levels, path_record, pattern, push_id, push_u32, push_unicode,
    vector_mask,
};

/// Decode one chunk and check it degraded to its exact original payload.
fn assert_raw(code: &[u8; 4], payload: Vec<u8>) -> BlockDecoder {
    let decoder = BlockDecoder::default();
    let payload = Bytes::from(payload);
    let decoded = decoder
        .parse_tagged_block(&Chunk::new(*code, payload.clone()), FormatVersion::Psd)
        .unwrap();
    assert_eq!(decoded.code, TypeCode::new(*code));
    assert_eq!(decoded.payload, Decoded::Raw(payload));
    decoder
}

// =============================================================================
// Unrecognized Codes
// =============================================================================

#[test]
fn test_unknown_code_passthrough() {
    let decoder = assert_raw(b"qqqq", vec![9, 8, 7, 6, 5]);

    let diagnostics = decoder.diagnostics().snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnrecognizedChunkType);
    assert_eq!(diagnostics[0].code, TypeCode::new(*b"qqqq"));
}

#[test]
fn test_known_but_undecoded_code() {
    let decoder = assert_raw(b"Anno", vec![0, 1, 0, 2]);

    let diagnostics = decoder.diagnostics().snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnrecognizedChunkType);
    assert!(diagnostics[0].message.contains("not decoded"));
}

#[test]
fn test_empty_unknown_payload() {
    let decoder = assert_raw(b"zzzz", Vec::new());
    assert_eq!(decoder.diagnostics().len(), 1);
}

// =============================================================================
// Decoder Failures
// =============================================================================

#[test]
fn test_unsupported_curves_version() {
    let decoder = assert_raw(b"curv", curves_with_version(7));

    let diagnostics = decoder.diagnostics().take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::Fallback);
    assert!(diagnostics[0].message.contains("version 7"));
}

#[test]
fn test_truncated_levels() {
    let mut payload = levels(100);
    payload.truncate(40);
    assert_raw(b"levl", payload);
}

#[test]
fn test_unsupported_gradient_parameters() {
    let mut payload = vec![0, 1, 0, 0];
    // Empty name, no stops
    payload.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
    // Expansion 1, interpolation 4096, length 32, mode 0
    payload.extend_from_slice(&[0, 1, 0x10, 0, 0, 32, 0, 0]);
    payload.extend(std::iter::repeat(0).take(8 + 4 * 4 + 4 * 2));
    let decoder = assert_raw(b"grdm", payload);

    let diagnostics = decoder.diagnostics().snapshot();
    assert!(diagnostics[0].message.contains("expansion 1 with length 32"));
}

#[test]
fn test_unknown_path_selector() {
    let payload = vector_mask(0, &[path_record(6, &[]), path_record(42, &[])]);
    assert_raw(b"vmsk", payload);
}

#[test]
fn test_pattern_length_overrun() {
    let mut payload = pattern("Dots", &[1, 2, 3]);
    let declared = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    payload[..4].copy_from_slice(&(declared + 100).to_be_bytes());
    assert_raw(b"Patt", payload);
}

#[test]
fn test_deeply_nested_descriptor_list() {
    let mut payload = Vec::new();
    push_u32(&mut payload, 16);
    push_unicode(&mut payload, "");
    push_id(&mut payload, "null");
    push_u32(&mut payload, 1);
    push_id(&mut payload, "Clr ");
    payload.extend_from_slice(b"VlLs");
    for _ in 0..200_000 {
        push_u32(&mut payload, 1);
        payload.extend_from_slice(b"VlLs");
    }
    push_u32(&mut payload, 0);

    let decoder = BlockDecoder::default();
    let chunks = vec![
        Chunk::new(*b"SoCo", payload.clone()),
        Chunk::new(*b"lyid", vec![0, 0, 0, 5]),
    ];
    let decoded = decoder.decode(&chunks, FormatVersion::Psd).unwrap();
    assert_eq!(decoded[0].payload, Decoded::Raw(Bytes::from(payload)));
    assert_eq!(decoded[1].payload, Decoded::LayerId(5));

    let diagnostics = decoder.diagnostics().snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::Fallback);
}

#[test]
fn test_bad_divider_signature() {
    assert_raw(b"lsct", b"\x00\x00\x00\x01XXXXnorm".to_vec());
}

// =============================================================================
// Isolation
// =============================================================================

#[test]
fn test_failure_does_not_affect_siblings() {
    let decoder = BlockDecoder::default();
    let chunks = vec![
        Chunk::new(*b"lyid", vec![0, 0, 0, 1]),
        Chunk::new(*b"curv", curves_with_version(7)),
        Chunk::new(*b"lyid", vec![0, 0, 0, 2]),
        Chunk::new(*b"qqqq", vec![1]),
        Chunk::new(*b"levl", levels(100)),
    ];

    let decoded = decoder.decode(&chunks, FormatVersion::Psd).unwrap();
    assert_eq!(decoded[0].payload, Decoded::LayerId(1));
    assert!(decoded[1].is_raw());
    assert_eq!(decoded[2].payload, Decoded::LayerId(2));
    assert!(decoded[3].is_raw());
    assert!(matches!(decoded[4].payload, Decoded::Levels(_)));

    let kinds: Vec<_> = decoder
        .diagnostics()
        .take()
        .into_iter()
        .map(|d| d.kind)
        .collect();
    assert_eq!(
        kinds,
        [DiagnosticKind::Fallback, DiagnosticKind::UnrecognizedChunkType]
    );
    assert_eq!(decoder.diagnostics().len(), 0);
}
