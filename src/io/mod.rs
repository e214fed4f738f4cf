mod cursor;
mod serde_hex;

pub use cursor::{Cursor, StringEncoding};
pub use serde_hex::hex_bytes;
