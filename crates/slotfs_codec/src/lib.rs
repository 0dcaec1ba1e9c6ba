//! # SlotFS Codec
//!
//! Snapshot serialization and compression for SlotFS.
//!
//! A snapshot travels through two stages before it is partitioned into
//! slot blocks:
//!
//! ```text
//! value --serialize (CBOR)--> bytes --compress (zstd)--> blob
//! ```
//!
//! Decoding runs the same stages in reverse. Every stage reports failures
//! through its own [`CodecError`] variant.
//!
//! ## Usage
//!
//! ```
//! use slotfs_codec::SnapshotCodec;
//! use std::collections::BTreeMap;
//!
//! let codec = SnapshotCodec::default();
//! let mut tree = BTreeMap::new();
//! tree.insert("a".to_string(), vec![1u64, 123, 123_456]);
//!
//! let blob = codec.encode(&tree).unwrap();
//! let decoded: BTreeMap<String, Vec<u64>> = codec.decode(&blob).unwrap();
//! assert_eq!(tree, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;

pub use decoder::{decompress, deserialize};
pub use encoder::{compress, serialize};
pub use error::{CodecError, CodecResult};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Default zstd compression level.
///
/// Snapshots are tiny and written rarely, so the codec trades CPU for every
/// byte of slot capacity.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 21;

/// Serializes and compresses snapshots at a fixed compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCodec {
    level: i32,
}

impl Default for SnapshotCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl SnapshotCodec {
    /// Creates a codec compressing at `level`.
    #[must_use]
    pub const fn new(level: i32) -> Self {
        Self { level }
    }

    /// Returns the compression level.
    #[must_use]
    pub const fn level(&self) -> i32 {
        self.level
    }

    /// Serializes and compresses `value` into a blob.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Serialization`] or [`CodecError::Compression`]
    /// depending on which stage failed.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        let bytes = serialize(value)?;
        compress(&bytes, self.level)
    }

    /// Decompresses and deserializes a blob produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decompression`] or [`CodecError::Deserialization`]
    /// depending on which stage failed.
    pub fn decode<T: DeserializeOwned>(&self, blob: &[u8]) -> CodecResult<T> {
        let bytes = decompress(blob)?;
        deserialize(&bytes)
    }

    /// Encodes then decodes `value` and reports whether the result is equal.
    ///
    /// # Errors
    ///
    /// Returns any error raised by either direction.
    pub fn verify_roundtrip<T>(&self, value: &T) -> CodecResult<bool>
    where
        T: Serialize + DeserializeOwned + PartialEq,
    {
        let blob = self.encode(value)?;
        let decoded: T = self.decode(&blob)?;
        Ok(&decoded == value)
    }
}
