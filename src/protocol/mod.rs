//! Protocol module - wire constants, length headers, encodings and value types.
//!
//! This module holds everything the writer and reader must agree on:
//! - 4-byte length header encoding/decoding and the null/empty sentinels
//! - String encodings
//! - The per-level depth frame stack
//! - Tick-based calendar types

mod depth;
mod encoding;
mod types;
mod wire_format;

pub use depth::DepthStack;
pub use encoding::StringEncoding;
pub use types::{
    delta_from_ticks, ticks_from_delta, Timestamp, TimestampKind, TimestampOffset,
    TICKS_PER_SECOND, UNIX_EPOCH_TICKS,
};
pub use wire_format::{
    decode_length, encode_length, Length, DECIMAL_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH,
    GUID_SIZE, LENGTH_HEADER_SIZE, MAX_BUFFER_SIZE, NULL_LENGTH, TIMESTAMP_OFFSET_SIZE,
    TIMESTAMP_SIZE,
};
