//! Test utilities for integration tests.
//!
//! Byte-level builders for tagged-block payloads, layer containers and
//! complete PSD/PSB files. Everything is big-endian.

use psd_tagged_blocks::{BlockKey, TypeCode};

// =============================================================================
// Primitives
// =============================================================================

pub fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn push_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn push_unicode(out: &mut Vec<u8>, value: &str) {
    let units: Vec<u16> = value.encode_utf16().collect();
    push_u32(out, units.len() as u32);
    for unit in units {
        push_u16(out, unit);
    }
}

/// Descriptor key or class id: 4-character ids use the short form.
pub fn push_id(out: &mut Vec<u8>, id: &str) {
    if id.len() == 4 {
        push_u32(out, 0);
    } else {
        push_u32(out, id.len() as u32);
    }
    out.extend_from_slice(id.as_bytes());
}

fn pad_to(out: &mut Vec<u8>, multiple: usize) {
    while out.len() % multiple != 0 {
        out.push(0);
    }
}

// =============================================================================
// Block Payloads
// =============================================================================

/// A descriptor with a single integer item.
pub fn descriptor_with_integer(class_id: &str, key: &str, value: i32) -> Vec<u8> {
    let mut out = Vec::new();
    push_unicode(&mut out, "");
    push_id(&mut out, class_id);
    push_u32(&mut out, 1);
    push_id(&mut out, key);
    out.extend_from_slice(b"long");
    push_i32(&mut out, value);
    out
}

/// `u32 version` followed by a descriptor.
pub fn descriptor_block(version: u32, descriptor: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, version);
    out.extend_from_slice(descriptor);
    out
}

/// A levels payload whose every record has the given raw gamma.
pub fn levels(gamma: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, 2);
    for _ in 0..29 {
        for value in [0, 255, 0, 255, gamma] {
            push_u16(&mut out, value);
        }
    }
    out
}

/// A version-1 curves payload with a channel bitmask and one curve per
/// set bit.
pub fn curves_v1(bitmask: u32, points: &[(u16, u16)]) -> Vec<u8> {
    let mut out = vec![0];
    push_u16(&mut out, 1);
    push_u32(&mut out, bitmask);
    for _ in 0..bitmask.count_ones() {
        push_u16(&mut out, points.len() as u16);
        for &(output, input) in points {
            push_u16(&mut out, output);
            push_u16(&mut out, input);
        }
    }
    out
}

/// A curves payload with an arbitrary version word.
pub fn curves_with_version(version: u16) -> Vec<u8> {
    let mut out = vec![0];
    push_u16(&mut out, version);
    push_u32(&mut out, 1);
    push_u16(&mut out, 0);
    out
}

/// A 26-byte path record.
pub fn path_record(selector: u16, fields: &[i32]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, selector);
    for &field in fields {
        push_i32(&mut out, field);
    }
    out.resize(26, 0);
    out
}

/// A version-3 vector mask payload.
pub fn vector_mask(flags: u32, records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, 3);
    push_u32(&mut out, flags);
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

/// One length-prefixed RGB pattern with a single populated channel.
pub fn pattern(name: &str, pixels: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, 1);
    push_u32(&mut body, 3);
    body.extend_from_slice(&[0, 0, 0, 0]);
    push_unicode(&mut body, name);
    body.push(2);
    body.extend_from_slice(b"id");

    push_u32(&mut body, 3);
    push_u32(&mut body, 0);
    for value in [0, 0, 1, 1, 1] {
        push_u32(&mut body, value);
    }
    push_u32(&mut body, 1);
    push_u32(&mut body, (23 + pixels.len()) as u32);
    for value in [8, 0, 0, 1, 1] {
        push_u32(&mut body, value);
    }
    push_u16(&mut body, 8);
    body.push(0);
    body.extend_from_slice(pixels);
    push_u32(&mut body, 0);
    push_u32(&mut body, 0);

    let mut out = Vec::new();
    push_u32(&mut out, body.len() as u32);
    out.extend(body);
    out
}

// =============================================================================
// Layer Containers
// =============================================================================

/// Encode one tagged block, padded to 4 bytes.
pub fn tagged_block(key: &[u8; 4], payload: &[u8], large: bool) -> Vec<u8> {
    let mut out = b"8BIM".to_vec();
    out.extend_from_slice(key);
    if large && BlockKey::has_wide_length(TypeCode::new(*key)) {
        out.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    } else {
        push_u32(&mut out, payload.len() as u32);
    }
    out.extend_from_slice(payload);
    pad_to(&mut out, 4);
    out
}

/// A layer to be encoded by [`layer_container`].
pub struct TestLayer {
    pub name: String,
    pub blocks: Vec<([u8; 4], Vec<u8>)>,

    /// Compressed bytes of the single channel, after the compression word
    pub channel: Vec<u8>,
}

impl TestLayer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            blocks: Vec::new(),
            channel: Vec::new(),
        }
    }

    pub fn with_block(mut self, key: &[u8; 4], payload: Vec<u8>) -> Self {
        self.blocks.push((*key, payload));
        self
    }

    pub fn with_channel(mut self, data: &[u8]) -> Self {
        self.channel = data.to_vec();
        self
    }
}

fn layer_record(layer: &TestLayer, large: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for value in [0, 0, 4, 4] {
        push_i32(&mut out, value);
    }

    // One channel: id 0, length counts the compression word
    push_u16(&mut out, 1);
    push_u16(&mut out, 0);
    let channel_len = (layer.channel.len() + 2) as u64;
    if large {
        out.extend_from_slice(&channel_len.to_be_bytes());
    } else {
        push_u32(&mut out, channel_len as u32);
    }

    out.extend_from_slice(b"8BIMnorm");
    out.extend_from_slice(&[255, 0, 0, 0]);

    let mut extra = Vec::new();
    push_u32(&mut extra, 0);
    push_u32(&mut extra, 0);
    extra.push(layer.name.len() as u8);
    extra.extend_from_slice(layer.name.as_bytes());
    while (extra.len() - 8) % 4 != 0 {
        extra.push(0);
    }
    for (key, payload) in &layer.blocks {
        extra.extend(tagged_block(key, payload, large));
    }
    push_u32(&mut out, extra.len() as u32);
    out.extend(extra);
    out
}

/// A layer container: count, records, then channel data.
pub fn layer_container(layers: &[TestLayer], large: bool) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(layers.len() as i16).to_be_bytes());
    for layer in layers {
        out.extend(layer_record(layer, large));
    }
    for layer in layers {
        push_u16(&mut out, 0);
        out.extend_from_slice(&layer.channel);
    }
    out
}

// =============================================================================
// Documents
// =============================================================================

/// A complete file with the given layers and global blocks.
pub fn document(
    large: bool,
    layers: &[TestLayer],
    global_blocks: &[([u8; 4], Vec<u8>)],
) -> Vec<u8> {
    let mut out = b"8BPS".to_vec();
    push_u16(&mut out, if large { 2 } else { 1 });
    out.extend_from_slice(&[0; 6]);
    push_u16(&mut out, 3);
    push_u32(&mut out, 4);
    push_u32(&mut out, 4);
    push_u16(&mut out, 8);
    push_u16(&mut out, 3);

    // Color mode data and image resources
    push_u32(&mut out, 0);
    push_u32(&mut out, 4);
    out.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

    let mut info = layer_container(layers, large);
    pad_to(&mut info, 2);

    let mut section = Vec::new();
    push_length(&mut section, info.len(), large);
    section.extend(info);
    push_u32(&mut section, 0);
    for (key, payload) in global_blocks {
        section.extend(tagged_block(key, payload, large));
    }

    push_length(&mut out, section.len(), large);
    out.extend(section);

    // Merged image data, ignored by the reader
    push_u16(&mut out, 0);
    out
}

fn push_length(out: &mut Vec<u8>, len: usize, large: bool) {
    if large {
        out.extend_from_slice(&(len as u64).to_be_bytes());
    } else {
        push_u32(out, len as u32);
    }
}
