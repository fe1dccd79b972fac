//! The capability record types implement to take part in encoding.
//!
//! # Example
//!
//! ```
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
//! let mut writer = BinaryWriter::new();
//! writer.write_root(&Point { x: 3, y: -4 }).unwrap();
//! let bytes = writer.to_bytes().unwrap();
//! assert_eq!(bytes.len(), 8);
//!
//! let point: Point = BinaryReader::new(&bytes).read_root();
//! assert_eq!(point, Point { x: 3, y: -4 });
//! ```

use crate::error::Result;
use crate::reader::BinaryReader;
use crate::writer::BinaryWriter;

/// A record that writes and reads its own fields.
///
/// `serialize` and `deserialize` must issue the same sequence of calls.
/// Fields may only be appended at the end over time: older readers skip
/// trailing fields they do not know, newer readers get defaults for
/// fields an older writer did not produce.
pub trait Serializable {
    /// Write every field of `self`, in order.
    fn serialize(&self, writer: &mut BinaryWriter) -> Result<()>;

    /// Read fields into `self`, which starts as `Default::default()`.
    fn deserialize(&mut self, reader: &mut BinaryReader<'_>);
}
