//! Text encodings for string fields.
//!
//! The length header of a string is the encoded byte count, except for
//! [`StringEncoding::Ascii`] where it is the UTF-16 code unit count of the
//! source text. Characters outside ASCII are replaced by `?`, and a
//! surrogate pair collapses to a single `?` while still counting as two
//! units, so the body is zero-padded up to the header length.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Replacement byte for characters the narrow encoding cannot represent.
const ASCII_REPLACEMENT: u8 = b'?';

/// Supported string encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StringEncoding {
    /// UTF-8 (default).
    #[default]
    Utf8,
    /// Single-byte ASCII, header holds the character count.
    Ascii,
    /// UTF-16 Little Endian code units.
    Utf16,
    /// UTF-32 Little Endian scalar values.
    Utf32,
}

impl StringEncoding {
    /// Value written to the length header for `value`.
    pub fn header_len(self, value: &str) -> usize {
        match self {
            StringEncoding::Utf8 => value.len(),
            StringEncoding::Ascii => value.encode_utf16().count(),
            StringEncoding::Utf16 => value.encode_utf16().count() * 2,
            StringEncoding::Utf32 => value.chars().count() * 4,
        }
    }

    /// Append the encoded body of `value` to `buf`.
    ///
    /// Always writes exactly `header_len(value)` bytes.
    pub fn encode_into<B: BufMut>(self, value: &str, buf: &mut B) {
        match self {
            StringEncoding::Utf8 => buf.put_slice(value.as_bytes()),
            StringEncoding::Ascii => {
                let mut written = 0;
                for c in value.chars() {
                    buf.put_u8(if c.is_ascii() { c as u8 } else { ASCII_REPLACEMENT });
                    written += 1;
                }
                buf.put_bytes(0, self.header_len(value) - written);
            }
            StringEncoding::Utf16 => {
                for unit in value.encode_utf16() {
                    buf.put_u16_le(unit);
                }
            }
            StringEncoding::Utf32 => {
                for c in value.chars() {
                    buf.put_u32_le(c as u32);
                }
            }
        }
    }

    /// Decode a string body. Invalid sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            StringEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            StringEncoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { ASCII_REPLACEMENT as char })
                .collect(),
            StringEncoding::Utf16 => {
                let chunks = bytes.chunks_exact(2);
                let tail = !chunks.remainder().is_empty();
                let units = chunks.map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                let mut text: String = char::decode_utf16(units)
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                if tail {
                    text.push(char::REPLACEMENT_CHARACTER);
                }
                text
            }
            StringEncoding::Utf32 => {
                let chunks = bytes.chunks_exact(4);
                let tail = !chunks.remainder().is_empty();
                let mut text: String = chunks
                    .map(|quad| u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
                    .map(|scalar| char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                if tail {
                    text.push(char::REPLACEMENT_CHARACTER);
                }
                text
            }
        }
    }
}
