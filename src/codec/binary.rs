//! Binary codec - root object to bytes and back.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::pool::BufferPool;
use crate::reader::{BinaryReader, ReaderConfig};
use crate::serializable::Serializable;
use crate::writer::{BinaryWriter, WriterConfig};

/// One-shot codec for [`Serializable`] root objects.
pub struct LBinaryCodec;

impl LBinaryCodec {
    /// Encode `value` as a root object using the shared pool.
    ///
    /// # Errors
    ///
    /// Returns any error raised while writing, e.g. `CapacityExceeded`
    /// or `DepthExceeded`.
    #[inline]
    pub fn encode<T: Serializable>(value: &T) -> Result<Bytes> {
        Self::encode_with(BufferPool::shared(), WriterConfig::default(), value)
    }

    /// Encode `value` as a root object using a specific pool and config.
    pub fn encode_with<T: Serializable>(
        pool: Arc<BufferPool>,
        config: WriterConfig,
        value: &T,
    ) -> Result<Bytes> {
        let mut writer = BinaryWriter::with_pool(pool, config);
        writer.write_root(value)?;
        // Copy out so the buffer goes back to the pool on drop.
        writer.to_bytes()
    }

    /// Decode a root object. Never fails; missing data reads as defaults.
    #[inline]
    pub fn decode<T: Serializable + Default>(bytes: &[u8]) -> T {
        BinaryReader::new(bytes).read_root()
    }

    /// Decode a root object with a custom reader config.
    pub fn decode_with<T: Serializable + Default>(config: ReaderConfig, bytes: &[u8]) -> T {
        BinaryReader::with_config(bytes, config).read_root()
    }
}
