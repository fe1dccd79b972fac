//! Binary writer producing one linear buffer per object graph.
//!
//! The writer appends fixed-width Little Endian values to a pooled
//! `BytesMut` and keeps one byte counter per nesting level. A nested object
//! is written as a 4-byte placeholder, the object's own fields, and then
//! the placeholder is back-patched with the body size:
//!
//! ```text
//! parent fields ─┬─ [size placeholder] ─ child fields ... ─┬─ parent fields
//!                └──────────── back-patched ◄──────────────┘
//! ```
//!
//! The root object carries no header; call [`BinaryWriter::write_root`]
//! (or `value.serialize(&mut writer)`) to emit it.

use std::sync::Arc;

use bytemuck::Pod;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::TimeDelta;
use half::f16;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LBinaryError, Result};
use crate::pool::BufferPool;
use crate::protocol::{
    encode_length, ticks_from_delta, DepthStack, Length, StringEncoding, Timestamp,
    TimestampOffset, DECIMAL_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH, GUID_SIZE,
    LENGTH_HEADER_SIZE, TIMESTAMP_OFFSET_SIZE, TIMESTAMP_SIZE,
};
use crate::serializable::Serializable;

/// Configuration for a [`BinaryWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Capacity requested from the pool at construction.
    pub initial_capacity: usize,
    /// Maximum nesting depth of nested objects.
    pub max_depth: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_BUFFER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl WriterConfig {
    /// Set the initial buffer capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Writer for the length-prefixed binary format.
///
/// A writer owns one pooled buffer for its whole lifetime and gives it
/// back on [`dispose`](Self::dispose) or drop. Use [`reset`](Self::reset)
/// to encode several graphs with the same allocation.
pub struct BinaryWriter {
    /// Output bytes; `None` once disposed.
    buffer: Option<BytesMut>,
    /// Pool the buffer came from.
    pool: Arc<BufferPool>,
    /// Bytes written per nesting level.
    frames: DepthStack,
}

impl BinaryWriter {
    /// Create a writer with default settings on the shared pool.
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    /// Create a writer with a custom initial capacity on the shared pool.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(WriterConfig::default().with_initial_capacity(capacity))
    }

    /// Create a writer with custom settings on the shared pool.
    pub fn with_config(config: WriterConfig) -> Self {
        Self::with_pool(BufferPool::shared(), config)
    }

    /// Create a writer drawing its buffer from `pool`.
    pub fn with_pool(pool: Arc<BufferPool>, config: WriterConfig) -> Self {
        let buffer = pool.acquire(config.initial_capacity);
        Self {
            buffer: Some(buffer),
            pool,
            frames: DepthStack::new(config.max_depth),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, BytesMut::len)
    }

    /// Check if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().map_or(0, BytesMut::capacity)
    }

    /// Current nesting level (0 = root).
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.level()
    }

    /// Check if the writer has been disposed.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.buffer.is_none()
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    /// Write a boolean as one byte (0 or 1).
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.put(1, |buf| buf.put_u8(u8::from(value)))
    }

    /// Write an unsigned byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put(1, |buf| buf.put_u8(value))
    }

    /// Write a signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.put(1, |buf| buf.put_i8(value))
    }

    /// Write a 16-bit signed integer.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.put(2, |buf| buf.put_i16_le(value))
    }

    /// Write a 16-bit unsigned integer.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.put(2, |buf| buf.put_u16_le(value))
    }

    /// Write a 32-bit signed integer.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.put(4, |buf| buf.put_i32_le(value))
    }

    /// Write a 32-bit unsigned integer.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.put(4, |buf| buf.put_u32_le(value))
    }

    /// Write a 64-bit signed integer.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.put(8, |buf| buf.put_i64_le(value))
    }

    /// Write a 64-bit unsigned integer.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.put(8, |buf| buf.put_u64_le(value))
    }

    /// Write a 32-bit float.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.put(4, |buf| buf.put_f32_le(value))
    }

    /// Write a 64-bit float.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.put(8, |buf| buf.put_f64_le(value))
    }

    /// Write a 16-bit half float.
    pub fn write_f16(&mut self, value: f16) -> Result<()> {
        self.put(2, |buf| buf.put_u16_le(value.to_bits()))
    }

    /// Write a decimal as four 32-bit words: lo, mid, hi, flags.
    pub fn write_decimal(&mut self, value: Decimal) -> Result<()> {
        // serialize() yields flags, lo, mid, hi.
        let raw = value.serialize();
        self.put(DECIMAL_SIZE, |buf| {
            buf.put_slice(&raw[4..16]);
            buf.put_slice(&raw[0..4]);
        })
    }

    /// Write a GUID in its mixed-endian byte layout.
    pub fn write_guid(&mut self, value: Uuid) -> Result<()> {
        self.put(GUID_SIZE, |buf| buf.put_slice(&value.to_bytes_le()))
    }

    /// Write a timestamp as int32 kind followed by int64 ticks.
    pub fn write_timestamp(&mut self, value: Timestamp) -> Result<()> {
        self.put(TIMESTAMP_SIZE, |buf| {
            buf.put_i32_le(i32::from(value.kind));
            buf.put_i64_le(value.ticks);
        })
    }

    /// Write a timestamp with offset as int64 ticks followed by int64 offset ticks.
    pub fn write_timestamp_offset(&mut self, value: TimestampOffset) -> Result<()> {
        self.put(TIMESTAMP_OFFSET_SIZE, |buf| {
            buf.put_i64_le(value.ticks);
            buf.put_i64_le(value.offset_ticks);
        })
    }

    /// Write a duration as int64 ticks.
    pub fn write_duration(&mut self, value: TimeDelta) -> Result<()> {
        self.write_i64(ticks_from_delta(value))
    }

    /// Write a character as one 16-bit code unit.
    ///
    /// # Errors
    ///
    /// Returns `UnrepresentableChar` for characters outside the Basic Multilingual Plane.
    pub fn write_char(&mut self, value: char) -> Result<()> {
        if value.len_utf16() != 1 {
            return Err(LBinaryError::UnrepresentableChar(value));
        }
        let mut unit = [0u16; 1];
        value.encode_utf16(&mut unit);
        self.write_u16(unit[0])
    }

    /// Write an enumeration as its 32-bit underlying value.
    pub fn write_enum<E: Into<i32>>(&mut self, value: E) -> Result<()> {
        self.write_i32(value.into())
    }

    /// Write raw bytes with no length header.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.put(value.len(), |buf| buf.put_slice(value))
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Write an optional UTF-8 string.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<()> {
        self.write_string_encoded(value, StringEncoding::Utf8)
    }

    /// Write an optional string with the given encoding.
    ///
    /// `None` writes -1, `""` writes 0, anything else writes the header
    /// followed by the encoded body.
    pub fn write_string_encoded(&mut self, value: Option<&str>, encoding: StringEncoding) -> Result<()> {
        let value = match value {
            None => return self.write_length(Length::Null),
            Some("") => return self.write_length(Length::Empty),
            Some(value) => value,
        };

        let size = encoding.header_len(value);
        let header = self.checked_header(size)?;
        self.put(LENGTH_HEADER_SIZE + size, |buf| {
            buf.put_slice(&encode_length(header));
            encoding.encode_into(value, buf);
        })
    }

    // ------------------------------------------------------------------
    // Objects and flat values
    // ------------------------------------------------------------------

    /// Write the root object: its fields only, no header.
    pub fn write_root<T: Serializable>(&mut self, value: &T) -> Result<()> {
        self.live()?;
        value.serialize(self)
    }

    /// Write an optional nested object.
    ///
    /// `None` writes -1. Otherwise a 4-byte size placeholder is reserved,
    /// the object writes itself one level deeper, and the placeholder is
    /// back-patched with the body size.
    ///
    /// # Errors
    ///
    /// Returns `DepthExceeded` when nesting is deeper than `max_depth`,
    /// plus any error raised while writing the body.
    pub fn write_object<T: Serializable>(&mut self, value: Option<&T>) -> Result<()> {
        let Some(value) = value else {
            return self.write_length(Length::Null);
        };

        let header_pos = {
            let buf = self.buffer.as_mut().ok_or(LBinaryError::Disposed)?;
            let offset = buf.len();
            self.pool.ensure_capacity(buf, offset, LENGTH_HEADER_SIZE)?;
            buf.put_i32_le(0);
            offset
        };

        if let Err(e) = self.frames.push(0) {
            if let Some(buf) = self.buffer.as_mut() {
                buf.truncate(header_pos);
            }
            return Err(e);
        }

        let result = value.serialize(self);
        let body_size = self.frames.pop().unwrap_or_default();
        result?;

        if !self.frames.is_root() {
            self.frames.add(body_size + LENGTH_HEADER_SIZE);
        }

        let header = self.checked_header(body_size)?;
        let buf = self.buffer.as_mut().ok_or(LBinaryError::Disposed)?;
        buf[header_pos..header_pos + LENGTH_HEADER_SIZE].copy_from_slice(&encode_length(header));
        Ok(())
    }

    /// Write a flat value: its byte size as a header, then its raw bytes.
    pub fn write_struct<T: Pod>(&mut self, value: &T) -> Result<()> {
        let bytes = bytemuck::bytes_of(value);
        let header = self.checked_header(bytes.len())?;
        self.put(LENGTH_HEADER_SIZE + bytes.len(), |buf| {
            buf.put_slice(&encode_length(header));
            buf.put_slice(bytes);
        })
    }

    // ------------------------------------------------------------------
    // Arrays and lists
    // ------------------------------------------------------------------

    /// Write an optional sequence of nested objects.
    pub fn write_objects<T: Serializable>(&mut self, value: Option<&[T]>) -> Result<()> {
        if !self.write_count(value.map(<[T]>::len))? {
            return Ok(());
        }
        for item in value.unwrap_or_default() {
            self.write_object(Some(item))?;
        }
        Ok(())
    }

    /// Write an optional sequence of nested objects whose elements may be null.
    pub fn write_nullable_objects<T: Serializable>(&mut self, value: Option<&[Option<T>]>) -> Result<()> {
        if !self.write_count(value.map(<[Option<T>]>::len))? {
            return Ok(());
        }
        for item in value.unwrap_or_default() {
            self.write_object(item.as_ref())?;
        }
        Ok(())
    }

    /// Write an optional sequence of flat values as one contiguous block.
    pub fn write_values<T: Pod>(&mut self, value: Option<&[T]>) -> Result<()> {
        if !self.write_count(value.map(<[T]>::len))? {
            return Ok(());
        }
        let bytes: &[u8] = bytemuck::cast_slice(value.unwrap_or_default());
        self.put(bytes.len(), |buf| buf.put_slice(bytes))
    }

    /// Write an optional sequence of strings.
    pub fn write_strings<S: AsRef<str>>(&mut self, value: Option<&[S]>, encoding: StringEncoding) -> Result<()> {
        if !self.write_count(value.map(<[S]>::len))? {
            return Ok(());
        }
        for item in value.unwrap_or_default() {
            self.write_string_encoded(Some(item.as_ref()), encoding)?;
        }
        Ok(())
    }

    /// Write an optional sequence of strings whose elements may be null.
    pub fn write_nullable_strings<S: AsRef<str>>(
        &mut self,
        value: Option<&[Option<S>]>,
        encoding: StringEncoding,
    ) -> Result<()> {
        if !self.write_count(value.map(<[Option<S>]>::len))? {
            return Ok(());
        }
        for item in value.unwrap_or_default() {
            self.write_string_encoded(item.as_ref().map(AsRef::as_ref), encoding)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dictionaries
    // ------------------------------------------------------------------

    /// Write a map of flat keys to nested objects.
    pub fn write_flat_object_map<'m, K, V, M>(&mut self, value: Option<M>) -> Result<()>
    where
        K: Pod + 'm,
        V: Serializable + 'm,
        M: IntoIterator<Item = (&'m K, &'m V)>,
        M::IntoIter: ExactSizeIterator,
    {
        self.write_map(value, |w, key, item| {
            w.write_struct(key)?;
            w.write_object(Some(item))
        })
    }

    /// Write a map of flat keys to flat values.
    pub fn write_flat_flat_map<'m, K, V, M>(&mut self, value: Option<M>) -> Result<()>
    where
        K: Pod + 'm,
        V: Pod + 'm,
        M: IntoIterator<Item = (&'m K, &'m V)>,
        M::IntoIter: ExactSizeIterator,
    {
        self.write_map(value, |w, key, item| {
            w.write_struct(key)?;
            w.write_struct(item)
        })
    }

    /// Write a map of flat keys to strings.
    pub fn write_flat_string_map<'m, K, V, M>(&mut self, value: Option<M>, encoding: StringEncoding) -> Result<()>
    where
        K: Pod + 'm,
        V: AsRef<str> + 'm,
        M: IntoIterator<Item = (&'m K, &'m V)>,
        M::IntoIter: ExactSizeIterator,
    {
        self.write_map(value, |w, key, item| {
            w.write_struct(key)?;
            w.write_string_encoded(Some(item.as_ref()), encoding)
        })
    }

    /// Write a map of string keys to nested objects.
    pub fn write_string_object_map<'m, K, V, M>(&mut self, value: Option<M>) -> Result<()>
    where
        K: AsRef<str> + 'm,
        V: Serializable + 'm,
        M: IntoIterator<Item = (&'m K, &'m V)>,
        M::IntoIter: ExactSizeIterator,
    {
        self.write_map(value, |w, key, item| {
            w.write_string(Some(key.as_ref()))?;
            w.write_object(Some(item))
        })
    }

    /// Write a map of string keys to flat values.
    pub fn write_string_flat_map<'m, K, V, M>(&mut self, value: Option<M>) -> Result<()>
    where
        K: AsRef<str> + 'm,
        V: Pod + 'm,
        M: IntoIterator<Item = (&'m K, &'m V)>,
        M::IntoIter: ExactSizeIterator,
    {
        self.write_map(value, |w, key, item| {
            w.write_string(Some(key.as_ref()))?;
            w.write_struct(item)
        })
    }

    /// Write a map of string keys to strings. Keys are UTF-8, values use `encoding`.
    pub fn write_string_string_map<'m, K, V, M>(&mut self, value: Option<M>, encoding: StringEncoding) -> Result<()>
    where
        K: AsRef<str> + 'm,
        V: AsRef<str> + 'm,
        M: IntoIterator<Item = (&'m K, &'m V)>,
        M::IntoIter: ExactSizeIterator,
    {
        self.write_map(value, |w, key, item| {
            w.write_string(Some(key.as_ref()))?;
            w.write_string_encoded(Some(item.as_ref()), encoding)
        })
    }

    // ------------------------------------------------------------------
    // Snapshot and lifecycle
    // ------------------------------------------------------------------

    /// Zero-copy view of the bytes written so far.
    ///
    /// Valid until the next write or reset.
    pub fn as_slice(&self) -> Result<&[u8]> {
        self.buffer.as_deref().ok_or(LBinaryError::Disposed)
    }

    /// Owned copy of the bytes written so far.
    pub fn to_bytes(&self) -> Result<Bytes> {
        self.as_slice().map(Bytes::copy_from_slice)
    }

    /// Hand the written bytes off without copying.
    ///
    /// The buffer leaves the pool for good.
    pub fn into_bytes(mut self) -> Result<Bytes> {
        self.buffer
            .take()
            .map(BytesMut::freeze)
            .ok_or(LBinaryError::Disposed)
    }

    /// Rewind to an empty buffer, keeping its allocation.
    pub fn reset(&mut self) -> Result<()> {
        self.live()?.clear();
        self.frames.reset();
        Ok(())
    }

    /// Return the buffer to the pool. Later writes fail with `Disposed`.
    ///
    /// Calling this more than once has no further effect.
    pub fn dispose(&mut self) {
        if let Some(buf) = self.buffer.take() {
            tracing::debug!(capacity = buf.capacity(), "Writer disposed");
            self.pool.release(buf);
            self.frames.reset();
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn live(&mut self) -> Result<&mut BytesMut> {
        self.buffer.as_mut().ok_or(LBinaryError::Disposed)
    }

    /// Grow, write `size` bytes through `f`, and count them at the current level.
    #[inline]
    fn put(&mut self, size: usize, f: impl FnOnce(&mut BytesMut)) -> Result<()> {
        let buf = self.buffer.as_mut().ok_or(LBinaryError::Disposed)?;
        let offset = buf.len();
        self.pool.ensure_capacity(buf, offset, size)?;
        f(buf);
        debug_assert_eq!(buf.len(), offset + size);
        self.frames.add(size);
        Ok(())
    }

    #[inline]
    fn write_length(&mut self, length: Length) -> Result<()> {
        self.write_i32(length.to_raw())
    }

    /// Write the header of an optional collection; `true` if elements follow.
    fn write_count(&mut self, len: Option<usize>) -> Result<bool> {
        let length = Length::of(len);
        if let Length::Present(count) = length {
            self.checked_header(count)?;
        }
        self.write_length(length)?;
        Ok(matches!(length, Length::Present(_)))
    }

    fn checked_header(&self, size: usize) -> Result<i32> {
        i32::try_from(size).map_err(|_| LBinaryError::CapacityExceeded {
            required: size,
            max: i32::MAX as usize,
        })
    }

    fn write_map<'m, K, V, M, F>(&mut self, value: Option<M>, mut write_entry: F) -> Result<()>
    where
        K: 'm,
        V: 'm,
        M: IntoIterator<Item = (&'m K, &'m V)>,
        M::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, &'m K, &'m V) -> Result<()>,
    {
        let Some(entries) = value else {
            return self.write_length(Length::Null);
        };
        let entries = entries.into_iter();
        if !self.write_count(Some(entries.len()))? {
            return Ok(());
        }
        for (key, item) in entries {
            write_entry(self, key, item)?;
        }
        Ok(())
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BinaryWriter {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for BinaryWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryWriter")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("depth", &self.frames.level())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
