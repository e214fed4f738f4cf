//! Serialize byte payloads as lowercase hex strings.
//!
//! Used through `#[serde(serialize_with = "...")]` on every opaque byte
//! field so JSON output stays readable.

use bytes::Bytes;
use serde::Serializer;

/// Serialize a byte buffer as a hex string.
pub fn hex_bytes<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}
