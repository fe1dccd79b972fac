//! Codec module - one-shot helpers over the writer and reader.
//!
//! - [`LBinaryCodec`] - encode a root object to `Bytes`, decode one back
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects.
//! Each call borrows a pooled buffer for the duration of the encode and
//! hands it back before returning, so repeated one-shot calls reuse the
//! same allocations.
//!
//! # Example
//!
//! ```
//! use lbinary::codec::LBinaryCodec;
//! use lbinary::{BinaryReader, BinaryWriter, Result, Serializable};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Serializable for Point {
//!     fn serialize(&self, writer: &mut BinaryWriter) -> Result<()> {
//!         writer.write_i32(self.x)?;
//!         writer.write_i32(self.y)
//!     }
//!
//!     fn deserialize(&mut self, reader: &mut BinaryReader<'_>) {
//!         self.x = reader.read_i32();
//!         self.y = reader.read_i32();
//!     }
//! }
//!
//! let encoded = LBinaryCodec::encode(&Point { x: 1, y: -2 }).unwrap();
//! assert_eq!(encoded.len(), 8);
//! let decoded: Point = LBinaryCodec::decode(&encoded);
//! assert_eq!(decoded, Point { x: 1, y: -2 });
//! ```

mod binary;

pub use binary::LBinaryCodec;
