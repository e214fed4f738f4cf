//! Nested layer containers.
//!
//! Tests verify:
//! - Blocks of layers inside `Lr16`/`Lr32` are decoded recursively
//! - Exceeding the configured depth aborts the whole pass

use psd_tagged_blocks::{
    BlockDecoder, BlockError, Chunk, DecodeOptions, Decoded, DiagnosticKind, FormatVersion,
};

use super::test_utils::{curves_with_version, layer_container, TestLayer};

fn nested(payload: &Decoded) -> &psd_tagged_blocks::blocks::NestedLayers {
    match payload {
        Decoded::NestedLayers(nested) => nested,
        other => panic!("expected nested layers, got {:?}", other),
    }
}

#[test]
fn test_single_level() {
    let payload = layer_container(
        &[
            TestLayer::new("Background").with_block(b"lyid", vec![0, 0, 0, 3]),
            TestLayer::new("Shape")
                .with_block(b"lyid", vec![0, 0, 0, 4])
                .with_block(b"iOpa", vec![128, 0, 0, 0])
                .with_channel(&[0xAA, 0xBB]),
        ],
        false,
    );

    let decoder = BlockDecoder::default();
    let decoded = decoder
        .parse_tagged_block(&Chunk::new(*b"Lr16", payload), FormatVersion::Psd)
        .unwrap();
    let nested = nested(&decoded.payload);

    assert_eq!(nested.channel_depth, 16);
    assert_eq!(nested.layers.len(), 2);
    assert_eq!(nested.layers[0].name, "Background");
    assert_eq!(nested.layers[0].blocks[0].payload, Decoded::LayerId(3));
    assert_eq!(nested.layers[1].blocks[1].payload, Decoded::FillOpacity(128));
    assert_eq!(nested.layers[1].channel_data[0].data.as_ref(), &[0xAA, 0xBB]);
    assert_eq!(decoder.diagnostics().len(), 0);
}

#[test]
fn test_two_levels() {
    let inner = layer_container(
        &[TestLayer::new("inner").with_block(b"lyid", vec![0, 0, 0, 42])],
        false,
    );
    let outer = layer_container(
        &[TestLayer::new("outer").with_block(b"Lr32", inner)],
        false,
    );

    let decoded = BlockDecoder::default()
        .parse_tagged_block(&Chunk::new(*b"Lr16", outer), FormatVersion::Psd)
        .unwrap();
    let outer = nested(&decoded.payload);
    let inner = nested(&outer.layers[0].blocks[0].payload);

    assert_eq!(inner.channel_depth, 32);
    assert_eq!(inner.layers[0].name, "inner");
    assert_eq!(inner.layers[0].blocks[0].payload, Decoded::LayerId(42));
}

#[test]
fn test_nested_failure_stays_local() {
    let payload = layer_container(
        &[TestLayer::new("a")
            .with_block(b"curv", curves_with_version(9))
            .with_block(b"lyid", vec![0, 0, 0, 1])],
        false,
    );

    let decoder = BlockDecoder::default();
    let decoded = decoder
        .parse_tagged_block(&Chunk::new(*b"Lr16", payload), FormatVersion::Psd)
        .unwrap();
    let layer = &nested(&decoded.payload).layers[0];

    assert!(layer.blocks[0].is_raw());
    assert_eq!(layer.blocks[1].payload, Decoded::LayerId(1));
    assert_eq!(decoder.diagnostics().snapshot()[0].kind, DiagnosticKind::Fallback);
}

#[test]
fn test_depth_exceeded_is_fatal() {
    let inner = layer_container(&[TestLayer::new("inner")], false);
    let outer = layer_container(&[TestLayer::new("outer").with_block(b"Lr32", inner)], false);
    let chunks = vec![
        Chunk::new(*b"lyid", vec![0, 0, 0, 1]),
        Chunk::new(*b"Lr16", outer),
    ];

    let decoder = BlockDecoder::new(DecodeOptions::default().with_max_depth(1));
    let result = decoder.decode(&chunks, FormatVersion::Psd);
    assert_eq!(result, Err(BlockError::DepthExceeded { limit: 1 }));
}

#[test]
fn test_malformed_container_is_raw() {
    let mut payload = layer_container(&[TestLayer::new("a")], false);
    // Blend signature of the first record, after its single channel entry
    payload[26..30].copy_from_slice(b"XXXX");

    let decoder = BlockDecoder::default();
    let decoded = decoder
        .parse_tagged_block(&Chunk::new(*b"Lr16", payload), FormatVersion::Psd)
        .unwrap();
    assert!(decoded.is_raw());
    assert_eq!(decoder.diagnostics().len(), 1);
}
