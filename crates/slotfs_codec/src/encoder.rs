//! Snapshot encoder: CBOR serialization followed by zstd compression.

use crate::error::{CodecError, CodecResult};
use serde::Serialize;

/// Serialize a value to CBOR bytes.
///
/// Output is deterministic for values whose containers iterate in a fixed
/// order (`BTreeMap`, `Vec`, structs). `HashMap` fields break this.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the value cannot be represented.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(value, &mut buffer)
        .map_err(|e| CodecError::serialization(e.to_string()))?;
    Ok(buffer)
}

/// Compress bytes with zstd at the given level.
///
/// # Errors
///
/// Returns [`CodecError::Compression`] if zstd rejects the input or level.
pub fn compress(data: &[u8], level: i32) -> CodecResult<Vec<u8>> {
    let compressed =
        zstd::encode_all(data, level).map_err(|e| CodecError::compression(e.to_string()))?;

    tracing::debug!(
        raw = data.len(),
        compressed = compressed.len(),
        ratio = ratio(compressed.len(), data.len()),
        "compressed snapshot"
    );
    Ok(compressed)
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
