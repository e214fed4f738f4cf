//! Linked-layer (embedded smart object) records.
//!
//! `lnkD`, `lnk2`, `lnk3` and `lnkE` all carry a sequence of records:
//!
//! ```text
//! u64        record length (bytes after this field)
//! [u8; 4]    record type, 'liFD' for embedded file data
//! u32        record version
//! pascal     unique id
//! unicode    original file name
//! [u8; 4]    file type
//! [u8; 4]    file creator
//! u64        embedded data length
//! u8         file-open descriptor present
//!   u32 + descriptor   (when present)
//! ...        embedded file bytes
//! unicode    child document id (when bytes remain in the record)
//! ```
//!
//! Each record is padded so the next one starts on a 4-byte boundary.

use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

use crate::error::BlockError;
use crate::format::descriptor::{decode_descriptor, Descriptor};
use crate::format::TypeCode;
use crate::io::{hex_bytes, Cursor, StringEncoding};

const EMBEDDED_FILE_RECORD: TypeCode = TypeCode::new(*b"liFD");

/// One embedded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedLayer {
    pub version: u32,
    pub unique_id: String,
    pub filename: String,
    pub filetype: TypeCode,
    pub creator: TypeCode,

    /// Parameters used when the file was opened, if recorded
    pub open_descriptor: Option<Descriptor>,

    /// The embedded file itself
    #[serde(serialize_with = "hex_bytes")]
    pub data: Bytes,

    /// Child document id, absent in older records
    pub uuid: Option<String>,
}

/// Parse every linked-layer record in `data`.
///
/// A record of a type other than `liFD` ends the list; the records read so
/// far are returned.
pub fn decode_linked_layers(data: &Bytes) -> Result<Vec<LinkedLayer>, BlockError> {
    let mut cursor = Cursor::new(data);
    let mut layers = Vec::new();

    while cursor.remaining() >= 8 {
        let length = cursor.read_u64()?;
        let length = usize::try_from(length)
            .map_err(|_| BlockError::InvalidValue(format!("linked layer length {}", length)))?;
        if length == 0 {
            break;
        }
        let mut record = cursor.sub_cursor(length)?;

        let kind = record.read_key()?;
        if kind != EMBEDDED_FILE_RECORD {
            warn!(kind = %kind, "Unsupported linked layer record type, stopping");
            break;
        }

        let version = record.read_u32()?;
        let unique_id = record.read_pascal_string(StringEncoding::Latin1, 1)?;
        let filename = record.read_unicode_string()?;
        let filetype = record.read_key()?;
        let creator = record.read_key()?;
        let data_length = record.read_u64()?;
        let open_descriptor = if record.read_bool()? {
            let _descriptor_version = record.read_u32()?;
            Some(decode_descriptor(&mut record)?)
        } else {
            None
        };
        let data_length = usize::try_from(data_length).map_err(|_| {
            BlockError::InvalidValue(format!("linked layer data length {}", data_length))
        })?;
        let body = record.read_bytes(data_length)?;
        let uuid = if record.remaining() >= 4 {
            Some(record.read_unicode_string()?)
        } else {
            None
        };

        layers.push(LinkedLayer {
            version,
            unique_id,
            filename,
            filetype,
            creator,
            open_descriptor,
            data: data.slice_ref(body),
            uuid,
        });

        let pad = (4 - length % 4) % 4;
        cursor.skip(pad.min(cursor.remaining()))?;
    }

    Ok(layers)
}
