//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding a snapshot.
///
/// Each stage of the pipeline has its own variant so a failure can be traced
/// to the layer that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to serialize a value to CBOR.
    #[error("serialization failed: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// Failed to deserialize CBOR bytes.
    #[error("deserialization failed: {message}")]
    Deserialization {
        /// Description of the deserialization error.
        message: String,
    },

    /// Failed to compress serialized bytes.
    #[error("compression failed: {message}")]
    Compression {
        /// Description of the compression error.
        message: String,
    },

    /// Failed to decompress bytes.
    #[error("decompression failed: {message}")]
    Decompression {
        /// Description of the decompression error.
        message: String,
    },
}

impl CodecError {
    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    /// Create a compression error.
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression {
            message: message.into(),
        }
    }

    /// Create a decompression error.
    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }
}
