//! Snapshot decoder: zstd decompression followed by CBOR deserialization.

use crate::encoder::ratio;
use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;

/// Deserialize a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::Deserialization`] if the bytes are not valid CBOR
/// for `T`.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::deserialization(e.to_string()))
}

/// Decompress a zstd frame.
///
/// # Errors
///
/// Returns [`CodecError::Decompression`] if the input is not a valid frame.
pub fn decompress(data: &[u8]) -> CodecResult<Vec<u8>> {
    let decompressed =
        zstd::decode_all(data).map_err(|e| CodecError::decompression(e.to_string()))?;

    tracing::debug!(
        compressed = data.len(),
        raw = decompressed.len(),
        ratio = ratio(data.len(), decompressed.len()),
        "decompressed snapshot"
    );
    Ok(decompressed)
}
