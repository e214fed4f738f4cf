//! Action descriptor decoding.
//!
//! Descriptors are self-describing key/value trees used by most modern
//! settings blocks. Each item is a key, a 4-byte OSType naming the value
//! kind, and the value itself, which may recursively hold further
//! descriptors or lists.
//!
//! # Layout
//!
//! ```text
//! Descriptor:
//!   unicode string   name
//!   key id           class id (u32 length, 0 means a 4-byte id follows)
//!   u32              item count
//!   items:
//!     key id         item key
//!     [u8; 4]        OSType
//!     ...            value (layout depends on the OSType)
//! ```

use bytes::Bytes;
use serde::Serialize;

use crate::error::DescriptorError;
use crate::format::engine_data::EngineData;
use crate::io::{hex_bytes, Cursor, StringEncoding};

/// Nesting depth the engine follows before giving up.
const MAX_NESTING: usize = 64;

// =============================================================================
// Value Types
// =============================================================================

/// A decoded descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    /// Display name, often empty
    pub name: String,

    /// Class identifier
    pub class_id: String,

    /// Items in file order
    pub items: Vec<(String, DescriptorValue)>,
}

impl Descriptor {
    /// Find the first item with the given key.
    pub fn get(&self, key: &str) -> Option<&DescriptorValue> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Find the first item with the given key, mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut DescriptorValue> {
        self.items
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// A descriptor item value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum DescriptorValue {
    Descriptor(Descriptor),
    GlobalObject(Descriptor),
    ObjectArray { count: u32, descriptor: Descriptor },
    List(Vec<DescriptorValue>),
    Reference(Vec<ReferenceItem>),
    Double(f64),
    UnitFloat { unit: String, value: f64 },
    UnitFloats { unit: String, values: Vec<f64> },
    String(String),
    Enumerated { type_id: String, value: String },
    Integer(i32),
    LargeInteger(i64),
    Boolean(bool),
    Class { name: String, class_id: String },
    Alias(#[serde(serialize_with = "hex_bytes")] Bytes),
    RawData(#[serde(serialize_with = "hex_bytes")] Bytes),
    Path(#[serde(serialize_with = "hex_bytes")] Bytes),
    /// Parsed text engine data, substituted for a raw field after decoding
    EngineData(EngineData),
}

/// An element of a reference value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ReferenceItem {
    Property {
        name: String,
        class_id: String,
        key_id: String,
    },
    Class {
        name: String,
        class_id: String,
    },
    EnumeratedReference {
        name: String,
        class_id: String,
        type_id: String,
        value: String,
    },
    Offset {
        name: String,
        class_id: String,
        value: u32,
    },
    Identifier {
        value: i32,
    },
    Index {
        value: i32,
    },
    Name {
        value: String,
    },
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a descriptor at the cursor position.
///
/// # Errors
/// - `UnrecognizedFieldType` if an item uses an OSType the engine does not know
/// - `Cursor` if the data ends early
pub fn decode_descriptor(cursor: &mut Cursor<'_>) -> Result<Descriptor, DescriptorError> {
    read_descriptor(cursor, 0)
}

/// Read a class or key identifier: a u32 length, or 0 for a 4-byte id.
fn read_id(cursor: &mut Cursor<'_>) -> Result<String, DescriptorError> {
    let len = match cursor.read_u32()? {
        0 => 4,
        n => n as usize,
    };
    Ok(StringEncoding::Latin1.decode(cursor.read_bytes(len)?))
}

fn read_class(cursor: &mut Cursor<'_>) -> Result<(String, String), DescriptorError> {
    let name = cursor.read_unicode_string()?;
    let class_id = read_id(cursor)?;
    Ok((name, class_id))
}

fn read_length_block(cursor: &mut Cursor<'_>) -> Result<Bytes, DescriptorError> {
    let len = cursor.read_u32()? as usize;
    Ok(Bytes::copy_from_slice(cursor.read_bytes(len)?))
}

fn read_descriptor(cursor: &mut Cursor<'_>, depth: usize) -> Result<Descriptor, DescriptorError> {
    if depth > MAX_NESTING {
        return Err(DescriptorError::NestingTooDeep(MAX_NESTING));
    }

    let (name, class_id) = read_class(cursor)?;
    let count = cursor.read_u32()?;
    let mut items = Vec::new();
    for _ in 0..count {
        let key = read_id(cursor)?;
        let ostype = cursor.read_key()?;
        let value = read_value(cursor, ostype.as_bytes(), depth)?;
        items.push((key, value));
    }

    Ok(Descriptor {
        name,
        class_id,
        items,
    })
}

fn read_value(
    cursor: &mut Cursor<'_>,
    ostype: &[u8; 4],
    depth: usize,
) -> Result<DescriptorValue, DescriptorError> {
    if depth > MAX_NESTING {
        return Err(DescriptorError::NestingTooDeep(MAX_NESTING));
    }

    let value = match ostype {
        b"Objc" => DescriptorValue::Descriptor(read_descriptor(cursor, depth + 1)?),
        b"GlbO" => DescriptorValue::GlobalObject(read_descriptor(cursor, depth + 1)?),
        b"ObAr" => {
            let count = cursor.read_u32()?;
            let descriptor = read_descriptor(cursor, depth + 1)?;
            DescriptorValue::ObjectArray { count, descriptor }
        }
        b"VlLs" => {
            let count = cursor.read_u32()?;
            let mut values = Vec::new();
            for _ in 0..count {
                let ostype = cursor.read_key()?;
                values.push(read_value(cursor, ostype.as_bytes(), depth + 1)?);
            }
            DescriptorValue::List(values)
        }
        b"obj " => DescriptorValue::Reference(read_reference(cursor)?),
        b"doub" => DescriptorValue::Double(cursor.read_f64()?),
        b"UntF" => {
            let unit = StringEncoding::Latin1.decode(&cursor.read_array::<4>()?);
            let value = cursor.read_f64()?;
            DescriptorValue::UnitFloat { unit, value }
        }
        b"UnFl" => {
            let unit = StringEncoding::Latin1.decode(&cursor.read_array::<4>()?);
            let count = cursor.read_u32()?;
            let mut values = Vec::new();
            for _ in 0..count {
                values.push(cursor.read_f64()?);
            }
            DescriptorValue::UnitFloats { unit, values }
        }
        b"TEXT" => DescriptorValue::String(cursor.read_unicode_string()?),
        b"enum" => {
            let type_id = read_id(cursor)?;
            let value = read_id(cursor)?;
            DescriptorValue::Enumerated { type_id, value }
        }
        b"long" => DescriptorValue::Integer(cursor.read_i32()?),
        b"comp" => DescriptorValue::LargeInteger(cursor.read_i64()?),
        b"bool" => DescriptorValue::Boolean(cursor.read_bool()?),
        b"type" | b"GlbC" => {
            let (name, class_id) = read_class(cursor)?;
            DescriptorValue::Class { name, class_id }
        }
        b"alis" => DescriptorValue::Alias(read_length_block(cursor)?),
        b"tdta" => DescriptorValue::RawData(read_length_block(cursor)?),
        b"Pth " => DescriptorValue::Path(read_length_block(cursor)?),
        other => {
            return Err(DescriptorError::UnrecognizedFieldType(
                StringEncoding::Latin1.decode(other),
            ))
        }
    };
    Ok(value)
}

fn read_reference(cursor: &mut Cursor<'_>) -> Result<Vec<ReferenceItem>, DescriptorError> {
    let count = cursor.read_u32()?;
    let mut items = Vec::new();
    for _ in 0..count {
        let ostype = cursor.read_key()?;
        let item = match ostype.as_bytes() {
            b"prop" => {
                let (name, class_id) = read_class(cursor)?;
                let key_id = read_id(cursor)?;
                ReferenceItem::Property {
                    name,
                    class_id,
                    key_id,
                }
            }
            b"Clss" => {
                let (name, class_id) = read_class(cursor)?;
                ReferenceItem::Class { name, class_id }
            }
            b"Enmr" => {
                let (name, class_id) = read_class(cursor)?;
                let type_id = read_id(cursor)?;
                let value = read_id(cursor)?;
                ReferenceItem::EnumeratedReference {
                    name,
                    class_id,
                    type_id,
                    value,
                }
            }
            b"rele" => {
                let (name, class_id) = read_class(cursor)?;
                let value = cursor.read_u32()?;
                ReferenceItem::Offset {
                    name,
                    class_id,
                    value,
                }
            }
            b"Idnt" => ReferenceItem::Identifier {
                value: cursor.read_i32()?,
            },
            b"indx" => ReferenceItem::Index {
                value: cursor.read_i32()?,
            },
            b"name" => ReferenceItem::Name {
                value: cursor.read_unicode_string()?,
            },
            other => {
                return Err(DescriptorError::UnrecognizedReferenceType(
                    StringEncoding::Latin1.decode(other),
                ))
            }
        };
        items.push(item);
    }
    Ok(items)
}

// =============================================================================
// Tests
// =============================================================================
