//! Bounds-checked sequential reader over an immutable byte slice.
//!
//! Every multi-byte value in a layered document is big-endian. All reads
//! return [`CursorError::OutOfRange`] instead of panicking when the buffer
//! is too short, so a malformed length prefix can never take the process
//! down.

use crate::error::CursorError;
use crate::format::TypeCode;

// =============================================================================
// String Encoding
// =============================================================================

/// Encoding of single-byte Pascal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEncoding {
    /// ISO-8859-1, every byte maps to the code point of the same value
    #[default]
    Latin1,

    /// UTF-8 with lossy replacement of invalid sequences
    Utf8,
}

impl StringEncoding {
    /// Decode a byte run with this encoding.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            StringEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            StringEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Sequential big-endian reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_be {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self) -> Result<$ty, CursorError> {
            Ok(<$ty>::from_be_bytes(self.read_array()?))
        }
    };
}

macro_rules! read_be_array {
    ($(#[$doc:meta])* $name:ident, $read:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name<const N: usize>(&mut self) -> Result<[$ty; N], CursorError> {
            let mut out = [<$ty>::default(); N];
            for value in out.iter_mut() {
                *value = self.$read()?;
            }
            Ok(out)
        }
    };
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the position and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Whether every byte has been consumed.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    fn out_of_range(&self, requested: usize) -> CursorError {
        CursorError::OutOfRange {
            offset: self.pos,
            requested,
            available: self.remaining(),
        }
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CursorError> {
        if len > self.remaining() {
            return Err(self.out_of_range(len));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Split off the next `len` bytes as an independent cursor.
    ///
    /// Reads on the returned cursor are bounded by `len`, not by the
    /// parent buffer; the parent advances past the whole run.
    pub fn sub_cursor(&mut self, len: usize) -> Result<Cursor<'a>, CursorError> {
        Ok(Cursor::new(self.read_bytes(len)?))
    }

    /// Advance by `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), CursorError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Move the position by a signed offset.
    pub fn seek_relative(&mut self, delta: i64) -> Result<(), CursorError> {
        let target = self.pos as i64 + delta;
        if target < 0 || target as usize > self.data.len() {
            return Err(self.out_of_range(delta.unsigned_abs() as usize));
        }
        self.pos = target as usize;
        Ok(())
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a byte and interpret any non-zero value as `true`.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool, CursorError> {
        Ok(self.read_u8()? != 0)
    }

    read_be!(
        /// Read a big-endian u16.
        read_u16, u16
    );
    read_be!(
        /// Read a big-endian i16.
        read_i16, i16
    );
    read_be!(
        /// Read a big-endian u32.
        read_u32, u32
    );
    read_be!(
        /// Read a big-endian i32.
        read_i32, i32
    );
    read_be!(
        /// Read a big-endian u64.
        read_u64, u64
    );
    read_be!(
        /// Read a big-endian i64.
        read_i64, i64
    );
    read_be!(
        /// Read a big-endian IEEE 754 single.
        read_f32, f32
    );
    read_be!(
        /// Read a big-endian IEEE 754 double.
        read_f64, f64
    );

    read_be_array!(
        /// Read `N` consecutive big-endian u16 values.
        read_u16s, read_u16, u16
    );
    read_be_array!(
        /// Read `N` consecutive big-endian i16 values.
        read_i16s, read_i16, i16
    );
    read_be_array!(
        /// Read `N` consecutive big-endian u32 values.
        read_u32s, read_u32, u32
    );
    read_be_array!(
        /// Read `N` consecutive big-endian i32 values.
        read_i32s, read_i32, i32
    );

    /// Read a 4-byte type code or signature.
    #[inline]
    pub fn read_key(&mut self) -> Result<TypeCode, CursorError> {
        Ok(TypeCode::new(self.read_array()?))
    }

    /// Read a length field that is 4 bytes wide, or 8 bytes when `wide`.
    pub fn read_length(&mut self, wide: bool) -> Result<u64, CursorError> {
        if wide {
            self.read_u64()
        } else {
            self.read_u32().map(u64::from)
        }
    }

    /// Read a Pascal string: one length byte followed by that many bytes.
    ///
    /// The total size including the length byte is padded to a multiple of
    /// `padding`.
    pub fn read_pascal_string(
        &mut self,
        encoding: StringEncoding,
        padding: usize,
    ) -> Result<String, CursorError> {
        let len = self.read_u8()? as usize;
        let value = encoding.decode(self.read_bytes(len)?);
        let padding = padding.max(1);
        let consumed = len + 1;
        let padded = consumed.div_ceil(padding) * padding;
        self.skip(padded - consumed)?;
        Ok(value)
    }

    /// Read a UTF-16 string: a u32 count of code units, then the units.
    ///
    /// No trailing NUL is expected or stripped.
    pub fn read_unicode_string(&mut self) -> Result<String, CursorError> {
        let count = self.read_u32()? as usize;
        let byte_len = count
            .checked_mul(2)
            .ok_or_else(|| self.out_of_range(usize::MAX))?;
        let bytes = self.read_bytes(byte_len)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

// =============================================================================
// Tests
// =============================================================================
