//! Wire format constants and length headers.
//!
//! Every optional element (nested object, string, collection) is preceded
//! by a 4-byte length header:
//! ```text
//! ┌──────────────────────┬──────────────────────────┐
//! │ Length               │ Body                     │
//! │ int32 LE             │ Length bytes / elements  │
//! │ -1 null, 0 empty     │ absent when -1 or 0      │
//! └──────────────────────┴──────────────────────────┘
//! ```
//!
//! All multi-byte integers are Little Endian. The root object carries no
//! header: the buffer is the concatenation of its own field writes.

/// Length header size in bytes (fixed, exactly 4).
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Header value marking an absent (null) element.
pub const NULL_LENGTH: i32 = -1;

/// Default maximum nesting depth for nested objects.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default initial writer buffer size (1 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Absolute maximum buffer size (max i32, since every header is an int32).
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;

/// Encoded size of a GUID.
pub const GUID_SIZE: usize = 16;

/// Encoded size of a decimal (four packed 32-bit words).
pub const DECIMAL_SIZE: usize = 16;

/// Encoded size of a timestamp (int32 kind + int64 ticks).
pub const TIMESTAMP_SIZE: usize = 4 + 8;

/// Encoded size of a timestamp with offset (int64 ticks + int64 offset ticks).
pub const TIMESTAMP_OFFSET_SIZE: usize = 8 + 8;

/// Decoded meaning of a length header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// Sentinel -1 (any negative value is read as null).
    Null,
    /// Present but zero-length.
    Empty,
    /// Present with a positive byte length or element count.
    Present(usize),
}

impl Length {
    /// Classify a raw header value.
    #[inline]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Length::Empty,
            n if n > 0 => Length::Present(n as usize),
            _ => Length::Null,
        }
    }

    /// Raw header value for this length.
    ///
    /// Lengths beyond `i32::MAX` cannot occur because buffers are capped at
    /// [`MAX_BUFFER_SIZE`]; they saturate instead of wrapping.
    #[inline]
    pub fn to_raw(self) -> i32 {
        match self {
            Length::Null => NULL_LENGTH,
            Length::Empty => 0,
            Length::Present(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }

    /// Length header for an optional collection or string of `len` units.
    #[inline]
    pub fn of(len: Option<usize>) -> Self {
        match len {
            None => Length::Null,
            Some(0) => Length::Empty,
            Some(n) => Length::Present(n),
        }
    }

    /// Check if this header marks a null element.
    #[inline]
    pub fn is_null(self) -> bool {
        self == Length::Null
    }
}

/// Encode a length header to bytes (Little Endian).
#[inline]
pub fn encode_length(raw: i32) -> [u8; LENGTH_HEADER_SIZE] {
    raw.to_le_bytes()
}

/// Decode a length header from bytes.
///
/// Returns `None` if buffer is too short.
#[inline]
pub fn decode_length(buf: &[u8]) -> Option<i32> {
    let bytes: [u8; LENGTH_HEADER_SIZE] = buf.get(..LENGTH_HEADER_SIZE)?.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}
