//! Complete documents.
//!
//! Tests verify:
//! - PSD and PSB files are read and every layer's blocks decoded
//! - Global blocks after the layer info are decoded like layer blocks
//! - Parallel document decoding matches sequential
//! - The decoded document serializes to JSON

use bytes::Bytes;

use psd_tagged_blocks::{
    read_document, BlockDecoder, DecodeOptions, Decoded, DocumentError, FormatVersion,
    StringEncoding, TypeCode,
};

use super::test_utils::{document, layer_container, levels, pattern, TestLayer};

fn sample_layers() -> Vec<TestLayer> {
    vec![
        TestLayer::new("Background")
            .with_block(b"lyid", vec![0, 0, 0, 7])
            .with_block(b"luni", vec![0, 0, 0, 2, 0, b'B', 0, b'g'])
            .with_channel(&[1, 2, 3]),
        TestLayer::new("Levels 1")
            .with_block(b"levl", levels(100))
            .with_block(b"qqqq", vec![5, 5]),
    ]
}

#[test]
fn test_psd_document() {
    let data = Bytes::from(document(false, &sample_layers(), &[]));
    let doc = read_document(&data, StringEncoding::Latin1).unwrap();
    assert_eq!(doc.header.version, FormatVersion::Psd);
    assert_eq!(doc.header.width, 4);

    let decoder = BlockDecoder::default();
    let decoded = decoder.decode_document(doc).unwrap();
    assert_eq!(decoded.layers.len(), 2);

    let background = &decoded.layers[0];
    assert_eq!(background.name, "Background");
    assert_eq!(background.blocks[0].payload, Decoded::LayerId(7));
    assert_eq!(
        background.blocks[1].payload,
        Decoded::UnicodeLayerName("Bg".to_string())
    );
    assert_eq!(background.channel_data[0].data.as_ref(), &[1, 2, 3]);

    let adjustment = &decoded.layers[1];
    assert!(matches!(adjustment.blocks[0].payload, Decoded::Levels(_)));
    assert_eq!(
        adjustment.blocks[1].payload,
        Decoded::Raw(Bytes::from_static(&[5, 5]))
    );
    assert_eq!(decoder.diagnostics().len(), 1);
}

#[test]
fn test_psb_document_with_wide_blocks() {
    let nested = layer_container(
        &[TestLayer::new("deep").with_block(b"lyid", vec![0, 0, 0, 9])],
        true,
    );
    let layers = [TestLayer::new("holder").with_block(b"Lr16", nested)];
    let data = Bytes::from(document(true, &layers, &[]));

    let doc = read_document(&data, StringEncoding::Latin1).unwrap();
    assert_eq!(doc.header.version, FormatVersion::Psb);

    let decoded = BlockDecoder::default().decode_document(doc).unwrap();
    match &decoded.layers[0].blocks[0].payload {
        Decoded::NestedLayers(nested) => {
            assert_eq!(nested.layers[0].name, "deep");
            assert_eq!(nested.layers[0].blocks[0].payload, Decoded::LayerId(9));
        }
        other => panic!("expected nested layers, got {:?}", other),
    }
}

#[test]
fn test_global_blocks() {
    let data = Bytes::from(document(
        false,
        &[TestLayer::new("only")],
        &[
            (*b"Patt", pattern("Global", &[0xFF])),
            (*b"Txt2", b"<< /Count 1 >>".to_vec()),
        ],
    ));

    let doc = read_document(&data, StringEncoding::Latin1).unwrap();
    assert_eq!(doc.global_blocks.len(), 2);
    assert_eq!(doc.global_blocks[0].code, TypeCode::new(*b"Patt"));

    let decoded = BlockDecoder::default().decode_document(doc).unwrap();
    match &decoded.global_blocks[0].payload {
        Decoded::Patterns(patterns) => assert_eq!(patterns[0].name, "Global"),
        other => panic!("expected patterns, got {:?}", other),
    }
    assert!(matches!(
        decoded.global_blocks[1].payload,
        Decoded::TextEngineData(_)
    ));
}

#[test]
fn test_parallel_document_decode() {
    let data = Bytes::from(document(false, &sample_layers(), &[]));
    let sequential = BlockDecoder::default()
        .decode_document(read_document(&data, StringEncoding::Latin1).unwrap())
        .unwrap();
    let parallel = BlockDecoder::new(DecodeOptions::default().with_parallel(true))
        .decode_document(read_document(&data, StringEncoding::Latin1).unwrap())
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_json_output() {
    let data = Bytes::from(document(false, &sample_layers(), &[]));
    let doc = read_document(&data, StringEncoding::Latin1).unwrap();
    let decoded = BlockDecoder::default().decode_document(doc).unwrap();

    let json = serde_json::to_value(&decoded).unwrap();
    let blocks = &json["layers"][0]["blocks"];
    assert_eq!(blocks[0]["code"], "lyid");
    assert_eq!(blocks[0]["payload"]["kind"], "LayerId");
    assert_eq!(blocks[0]["payload"]["data"], 7);

    let raw = &json["layers"][1]["blocks"][1]["payload"];
    assert_eq!(raw["kind"], "Raw");
    assert_eq!(raw["data"], "0505");
}

#[test]
fn test_invalid_documents() {
    let mut data = document(false, &[], &[]);
    data[..4].copy_from_slice(b"8BPX");
    assert_eq!(
        read_document(&Bytes::from(data), StringEncoding::Latin1).map(|_| ()),
        Err(DocumentError::InvalidSignature(TypeCode::new(*b"8BPX")))
    );

    let mut data = document(false, &sample_layers(), &[]);
    data.truncate(60);
    assert!(read_document(&Bytes::from(data), StringEncoding::Latin1).is_err());
}
