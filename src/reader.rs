//! Binary reader reconstructing object graphs from writer output.
//!
//! Every nested object opens a frame holding its declared body size. Reads
//! are charged against the innermost frame (or against the whole buffer at
//! root level) and never cross it:
//!
//! ```text
//! [size=N] ─┬─ fields this reader knows ─┬─ fields it does not ─┬─ next sibling
//!           └──── read, budget shrinks ──┴──── skipped on pop ──┘
//! ```
//!
//! Reads are fail-soft: a read that needs more bytes than the frame holds
//! returns the type's default value and exhausts the frame, so every later
//! read at that level also yields defaults. No input makes the reader
//! panic; malformed headers are clamped, not reported.

use std::collections::HashMap;
use std::hash::Hash;
use std::mem::size_of;

use bytemuck::Pod;
use chrono::TimeDelta;
use half::f16;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::{
    decode_length, delta_from_ticks, DepthStack, Length, StringEncoding, Timestamp, TimestampKind,
    TimestampOffset, DECIMAL_SIZE, DEFAULT_MAX_DEPTH, GUID_SIZE, LENGTH_HEADER_SIZE,
    TIMESTAMP_OFFSET_SIZE, TIMESTAMP_SIZE,
};
use crate::serializable::Serializable;

#[cfg(target_endian = "big")]
compile_error!("flat values are reinterpreted in place and require a little-endian target");

/// Configuration for a [`BinaryReader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Nested objects deeper than this are skipped and read as `None`.
    pub max_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReaderConfig {
    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Reader for the length-prefixed binary format.
///
/// Borrows the input for its whole lifetime; decoded slices and strings
/// are copied out.
pub struct BinaryReader<'a> {
    /// Input bytes.
    data: &'a [u8],
    /// Next unread offset.
    offset: usize,
    /// Remaining byte budget per nesting level; slot 0 is unused.
    frames: DepthStack,
    /// Number of object reads currently in progress.
    scope: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a reader over `data` with default settings.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, ReaderConfig::default())
    }

    /// Create a reader over `data` with custom settings.
    pub fn with_config(data: &'a [u8], config: ReaderConfig) -> Self {
        Self {
            data,
            offset: 0,
            frames: DepthStack::new(config.max_depth),
            scope: 0,
        }
    }

    /// Offset of the next unread byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes readable at the current level.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.available()
    }

    /// Current nesting level (0 = root).
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.level()
    }

    /// Rewind to the start of the input.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.scope = 0;
        self.frames.reset();
    }

    /// Rebind to new input, rewind, and read its root object.
    pub fn deserialize_from<T: Serializable + Default>(&mut self, data: &'a [u8]) -> T {
        self.data = data;
        self.reset();
        self.read_root()
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    /// Read a boolean. Any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> bool {
        self.take_array::<1>().is_some_and(|b| b[0] != 0)
    }

    /// Read an unsigned byte.
    pub fn read_u8(&mut self) -> u8 {
        self.take_array().map_or(0, u8::from_le_bytes)
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> i8 {
        self.take_array().map_or(0, i8::from_le_bytes)
    }

    /// Read a 16-bit signed integer.
    pub fn read_i16(&mut self) -> i16 {
        self.take_array().map_or(0, i16::from_le_bytes)
    }

    /// Read a 16-bit unsigned integer.
    pub fn read_u16(&mut self) -> u16 {
        self.take_array().map_or(0, u16::from_le_bytes)
    }

    /// Read a 32-bit signed integer.
    pub fn read_i32(&mut self) -> i32 {
        self.take_array().map_or(0, i32::from_le_bytes)
    }

    /// Read a 32-bit unsigned integer.
    pub fn read_u32(&mut self) -> u32 {
        self.take_array().map_or(0, u32::from_le_bytes)
    }

    /// Read a 64-bit signed integer.
    pub fn read_i64(&mut self) -> i64 {
        self.take_array().map_or(0, i64::from_le_bytes)
    }

    /// Read a 64-bit unsigned integer.
    pub fn read_u64(&mut self) -> u64 {
        self.take_array().map_or(0, u64::from_le_bytes)
    }

    /// Read a 32-bit float.
    pub fn read_f32(&mut self) -> f32 {
        self.take_array().map_or(0.0, f32::from_le_bytes)
    }

    /// Read a 64-bit float.
    pub fn read_f64(&mut self) -> f64 {
        self.take_array().map_or(0.0, f64::from_le_bytes)
    }

    /// Read a 16-bit half float.
    pub fn read_f16(&mut self) -> f16 {
        self.take_array()
            .map_or(f16::ZERO, |b| f16::from_bits(u16::from_le_bytes(b)))
    }

    /// Read a decimal stored as lo, mid, hi, flags.
    pub fn read_decimal(&mut self) -> Decimal {
        let Some(words) = self.take_array::<DECIMAL_SIZE>() else {
            return Decimal::ZERO;
        };
        let mut raw = [0u8; DECIMAL_SIZE];
        raw[0..4].copy_from_slice(&words[12..16]);
        raw[4..16].copy_from_slice(&words[0..12]);
        Decimal::deserialize(raw)
    }

    /// Read a GUID.
    pub fn read_guid(&mut self) -> Uuid {
        self.take_array::<GUID_SIZE>()
            .map_or(Uuid::nil(), |b| Uuid::from_bytes_le(b))
    }

    /// Read a timestamp. An unknown kind tag reads as `Unspecified`.
    pub fn read_timestamp(&mut self) -> Timestamp {
        let Some(raw) = self.take_array::<TIMESTAMP_SIZE>() else {
            return Timestamp::default();
        };
        let kind = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let ticks = i64::from_le_bytes([raw[4], raw[5], raw[6], raw[7], raw[8], raw[9], raw[10], raw[11]]);
        Timestamp::new(ticks, TimestampKind::try_from(kind).unwrap_or_default())
    }

    /// Read a timestamp with offset.
    pub fn read_timestamp_offset(&mut self) -> TimestampOffset {
        let Some(raw) = self.take_array::<TIMESTAMP_OFFSET_SIZE>() else {
            return TimestampOffset::default();
        };
        let ticks = i64::from_le_bytes([raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]]);
        let offset = i64::from_le_bytes([raw[8], raw[9], raw[10], raw[11], raw[12], raw[13], raw[14], raw[15]]);
        TimestampOffset::new(ticks, offset)
    }

    /// Read a duration.
    pub fn read_duration(&mut self) -> TimeDelta {
        self.take_array()
            .map_or(TimeDelta::zero(), |b| delta_from_ticks(i64::from_le_bytes(b)))
    }

    /// Read a 16-bit character. Lone surrogates read as U+FFFD.
    pub fn read_char(&mut self) -> char {
        self.take_array().map_or('\0', |b| {
            char::from_u32(u32::from(u16::from_le_bytes(b))).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
    }

    /// Read an enumeration from its 32-bit value. Unknown values read as `E::default()`.
    pub fn read_enum<E: TryFrom<i32> + Default>(&mut self) -> E {
        self.take_array()
            .and_then(|b| E::try_from(i32::from_le_bytes(b)).ok())
            .unwrap_or_default()
    }

    /// Read `len` raw bytes with no header. Empty if not enough remain.
    pub fn read_raw(&mut self, len: usize) -> &'a [u8] {
        self.take(len).unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Read an optional UTF-8 string.
    pub fn read_string(&mut self) -> Option<String> {
        self.read_string_encoded(StringEncoding::Utf8)
    }

    /// Read an optional string with the given encoding.
    pub fn read_string_encoded(&mut self, encoding: StringEncoding) -> Option<String> {
        match self.read_length() {
            Length::Null => None,
            Length::Empty => Some(String::new()),
            Length::Present(size) => self.take(size).map(|bytes| encoding.decode(bytes)),
        }
    }

    // ------------------------------------------------------------------
    // Objects and flat values
    // ------------------------------------------------------------------

    /// Read the root object: no header, bounded by the whole input.
    pub fn read_root<T: Serializable + Default>(&mut self) -> T {
        let mut value = T::default();
        self.scope += 1;
        value.deserialize(self);
        self.scope -= 1;
        value
    }

    /// Read an object.
    ///
    /// Outside of any object read (call depth 0) this is the root object and
    /// no header is read. Inside one, it reads a nested object: `None` for
    /// a null header, otherwise the object's fields within its declared
    /// size, skipping whatever it leaves unread.
    pub fn read_object<T: Serializable + Default>(&mut self) -> Option<T> {
        if self.scope == 0 {
            return Some(self.read_root());
        }
        self.read_nested()
    }

    /// Read a flat value. Missing or short data reads as all-zero.
    ///
    /// A smaller declared size fills the leading bytes and zeroes the rest;
    /// a larger one is skipped past.
    pub fn read_struct<T: Pod>(&mut self) -> T {
        let Length::Present(size) = self.read_length() else {
            return T::zeroed();
        };
        self.take(size).map_or_else(T::zeroed, pod_from_prefix)
    }

    // ------------------------------------------------------------------
    // Arrays and lists
    // ------------------------------------------------------------------

    /// Read an optional sequence of nested objects. Null elements read as `T::default()`.
    pub fn read_objects<T: Serializable + Default>(&mut self) -> Option<Vec<T>> {
        self.read_sequence(|r| r.read_nested().unwrap_or_default())
    }

    /// Read an optional sequence of nested objects, keeping null elements.
    pub fn read_nullable_objects<T: Serializable + Default>(&mut self) -> Option<Vec<Option<T>>> {
        self.read_sequence(|r| r.read_nested())
    }

    /// Read an optional sequence of flat values from one contiguous block.
    pub fn read_values<T: Pod>(&mut self) -> Option<Vec<T>> {
        let count = match self.read_length() {
            Length::Null => return None,
            Length::Empty => return Some(Vec::new()),
            Length::Present(count) => count,
        };

        let item_size = size_of::<T>();
        if item_size == 0 {
            return Some(vec![T::zeroed(); count]);
        }
        let Some(size) = count.checked_mul(item_size) else {
            self.short_read(usize::MAX);
            return None;
        };
        self.take(size).map(|bytes| {
            bytes
                .chunks_exact(item_size)
                .map(bytemuck::pod_read_unaligned)
                .collect()
        })
    }

    /// Read an optional sequence of strings. Null elements read as `""`.
    pub fn read_strings(&mut self, encoding: StringEncoding) -> Option<Vec<String>> {
        self.read_sequence(|r| r.read_string_encoded(encoding).unwrap_or_default())
    }

    /// Read an optional sequence of strings, keeping null elements.
    pub fn read_nullable_strings(&mut self, encoding: StringEncoding) -> Option<Vec<Option<String>>> {
        self.read_sequence(|r| r.read_string_encoded(encoding))
    }

    // ------------------------------------------------------------------
    // Dictionaries
    // ------------------------------------------------------------------

    /// Read a map of flat keys to nested objects.
    pub fn read_flat_object_map<K, V>(&mut self) -> Option<HashMap<K, V>>
    where
        K: Pod + Eq + Hash,
        V: Serializable + Default,
    {
        self.read_map(|r| (r.read_struct(), r.read_nested().unwrap_or_default()))
    }

    /// Read a map of flat keys to flat values.
    pub fn read_flat_flat_map<K, V>(&mut self) -> Option<HashMap<K, V>>
    where
        K: Pod + Eq + Hash,
        V: Pod,
    {
        self.read_map(|r| (r.read_struct(), r.read_struct()))
    }

    /// Read a map of flat keys to strings.
    pub fn read_flat_string_map<K>(&mut self, encoding: StringEncoding) -> Option<HashMap<K, String>>
    where
        K: Pod + Eq + Hash,
    {
        self.read_map(|r| (r.read_struct(), r.read_string_encoded(encoding).unwrap_or_default()))
    }

    /// Read a map of string keys to nested objects.
    pub fn read_string_object_map<V>(&mut self) -> Option<HashMap<String, V>>
    where
        V: Serializable + Default,
    {
        self.read_map(|r| (r.read_string().unwrap_or_default(), r.read_nested().unwrap_or_default()))
    }

    /// Read a map of string keys to flat values.
    pub fn read_string_flat_map<V: Pod>(&mut self) -> Option<HashMap<String, V>> {
        self.read_map(|r| (r.read_string().unwrap_or_default(), r.read_struct()))
    }

    /// Read a map of string keys to strings. Keys are UTF-8, values use `encoding`.
    pub fn read_string_string_map(&mut self, encoding: StringEncoding) -> Option<HashMap<String, String>> {
        self.read_map(|r| {
            (
                r.read_string().unwrap_or_default(),
                r.read_string_encoded(encoding).unwrap_or_default(),
            )
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Bytes the current level may still yield.
    #[inline]
    fn available(&self) -> usize {
        let in_buffer = self.data.len().saturating_sub(self.offset);
        if self.frames.is_root() {
            in_buffer
        } else {
            self.frames.current().min(in_buffer)
        }
    }

    /// Consume `size` bytes from the current level, or exhaust it.
    #[inline]
    fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        if size > self.available() {
            self.short_read(size);
            return None;
        }
        let data = self.data;
        let bytes = &data[self.offset..self.offset + size];
        self.offset += size;
        self.frames.consume(size);
        Some(bytes)
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N).and_then(|bytes| bytes.try_into().ok())
    }

    /// Skip everything left at the current level after a failed read.
    fn short_read(&mut self, requested: usize) {
        let available = self.available();
        tracing::trace!(
            requested,
            available,
            depth = self.frames.level(),
            offset = self.offset,
            "Short read, returning default"
        );
        self.offset += available;
        self.frames.consume(available);
    }

    fn read_length(&mut self) -> Length {
        self.take(LENGTH_HEADER_SIZE)
            .and_then(decode_length)
            .map_or(Length::Null, Length::from_raw)
    }

    /// Header-prefixed object read, regardless of call depth.
    fn read_nested<T: Serializable + Default>(&mut self) -> Option<T> {
        let size = match self.read_length() {
            Length::Null => return None,
            Length::Empty => 0,
            Length::Present(size) => size.min(self.available()),
        };

        if self.frames.push(size).is_err() {
            tracing::warn!(
                depth = self.frames.level(),
                size,
                "Skipping object nested beyond the maximum depth"
            );
            self.offset += size;
            self.frames.consume(size);
            return None;
        }

        let mut value = T::default();
        self.scope += 1;
        value.deserialize(self);
        self.scope -= 1;

        // Trailing fields this reader does not know about.
        let unread = self.frames.pop().unwrap_or_default();
        self.offset += unread;
        self.frames.consume(size);
        Some(value)
    }

    fn read_sequence<E>(&mut self, mut read_element: impl FnMut(&mut Self) -> E) -> Option<Vec<E>> {
        let count = match self.read_length() {
            Length::Null => return None,
            Length::Empty => return Some(Vec::new()),
            Length::Present(count) => count,
        };

        let mut items = Vec::with_capacity(count.min(self.available() / LENGTH_HEADER_SIZE));
        for _ in 0..count {
            if self.available() < LENGTH_HEADER_SIZE {
                self.short_read(LENGTH_HEADER_SIZE);
                break;
            }
            items.push(read_element(self));
        }
        Some(items)
    }

    fn read_map<K, V>(&mut self, mut read_entry: impl FnMut(&mut Self) -> (K, V)) -> Option<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        let count = match self.read_length() {
            Length::Null => return None,
            Length::Empty => return Some(HashMap::new()),
            Length::Present(count) => count,
        };

        let mut map = HashMap::with_capacity(count.min(self.available() / LENGTH_HEADER_SIZE));
        for _ in 0..count {
            if self.available() < LENGTH_HEADER_SIZE {
                self.short_read(LENGTH_HEADER_SIZE);
                break;
            }
            let (key, value) = read_entry(self);
            map.insert(key, value);
        }
        Some(map)
    }
}

impl std::fmt::Debug for BinaryReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryReader")
            .field("len", &self.data.len())
            .field("position", &self.offset)
            .field("depth", &self.frames.level())
            .field("remaining", &self.available())
            .finish()
    }
}

/// Build a `T` from up to `size_of::<T>()` leading bytes, zero-filling the rest.
fn pod_from_prefix<T: Pod>(bytes: &[u8]) -> T {
    let size = size_of::<T>();
    if bytes.len() >= size {
        return bytemuck::pod_read_unaligned(&bytes[..size]);
    }
    let mut value = T::zeroed();
    bytemuck::bytes_of_mut(&mut value)[..bytes.len()].copy_from_slice(bytes);
    value
}
