//! # lbinary
//!
//! Compact, length-prefixed binary serialization for object graphs that
//! tolerates schema drift between writer and reader.
//!
//! Record types implement [`Serializable`] by hand: they write their fields
//! in order to a [`BinaryWriter`] and read them back in the same order from
//! a [`BinaryReader`]. Every nested object carries a 4-byte size header, so
//! a reader built against an older type skips fields it does not know, and
//! a reader built against a newer type sees defaults for fields the writer
//! never produced.
//!
//! ## Wire format
//!
//! - All integers little-endian; lengths are 32-bit signed.
//! - `-1` is null, `0` is empty; the root object has no header.
//! - Nested objects: `[size][fields...]`, size back-patched after writing.
//! - Strings: `[byte length][bytes]` in the chosen [`StringEncoding`].
//! - Sequences: `[count][elements...]`; flat values in one contiguous block.
//!
//! ## Example
//!
//! ```
//! use lbinary::{BinaryReader, BinaryWriter, Result, Serializable};
//!
//! #[derive(Default)]
//! struct Order {
//!     id: i64,
//!     note: Option<String>,
//!     lines: Option<Vec<Line>>,
//! }
//!
//! #[derive(Default)]
//! struct Line {
//!     sku: u32,
//!     qty: u16,
//! }
//!
//! impl Serializable for Order {
//!     fn serialize(&self, writer: &mut BinaryWriter) -> Result<()> {
//!         writer.write_i64(self.id)?;
//!         writer.write_string(self.note.as_deref())?;
//!         writer.write_objects(self.lines.as_deref())
//!     }
//!
//!     fn deserialize(&mut self, reader: &mut BinaryReader<'_>) {
//!         self.id = reader.read_i64();
//!         self.note = reader.read_string();
//!         self.lines = reader.read_objects();
//!     }
//! }
//!
//! impl Serializable for Line {
//!     fn serialize(&self, writer: &mut BinaryWriter) -> Result<()> {
//!         writer.write_u32(self.sku)?;
//!         writer.write_u16(self.qty)
//!     }
//!
//!     fn deserialize(&mut self, reader: &mut BinaryReader<'_>) {
//!         self.sku = reader.read_u32();
//!         self.qty = reader.read_u16();
//!     }
//! }
//!
//! let order = Order {
//!     id: 7,
//!     note: None,
//!     lines: Some(vec![Line { sku: 100, qty: 2 }]),
//! };
//!
//! let mut writer = BinaryWriter::new();
//! writer.write_root(&order).unwrap();
//! let bytes = writer.into_bytes().unwrap();
//!
//! let decoded: Order = BinaryReader::new(&bytes).read_root();
//! assert_eq!(decoded.id, 7);
//! assert!(decoded.note.is_none());
//! assert_eq!(decoded.lines.unwrap()[0].qty, 2);
//! ```

pub mod codec;
pub mod error;
pub mod pool;
pub mod protocol;

mod reader;
mod serializable;
mod writer;

pub use codec::LBinaryCodec;
pub use error::{LBinaryError, Result};
pub use pool::{BufferPool, PoolConfig};
pub use protocol::{StringEncoding, Timestamp, TimestampKind, TimestampOffset};
pub use reader::{BinaryReader, ReaderConfig};
pub use serializable::Serializable;
pub use writer::{BinaryWriter, WriterConfig};
