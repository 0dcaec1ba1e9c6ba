//! Error types for slot gateway operations.

use crate::slot::SlotId;
use std::io;
use thiserror::Error;

/// Result type for gateway operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while talking to the hardware slot gateway.
///
/// These are passed through the engine unmodified; the engine never retries
/// a failed gateway call.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A privileged operation was attempted without authentication.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the refused operation.
        message: String,
    },

    /// The supplied credential was rejected.
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the failure.
        message: String,
    },

    /// The slot has never been written.
    #[error("slot {0} is empty")]
    SlotEmpty(SlotId),

    /// The slot identifier is not valid for this gateway.
    #[error("unknown slot: {0}")]
    UnknownSlot(String),

    /// A block of the wrong size was handed to the gateway.
    #[error("invalid block size for slot {slot}: expected at most {max}, got {actual}")]
    InvalidBlockSize {
        /// The target slot.
        slot: SlotId,
        /// The largest block the slot accepts.
        max: usize,
        /// The size that was supplied.
        actual: usize,
    },

    /// Any other device-level failure.
    #[error("device error: {0}")]
    Device(String),
}

impl StorageError {
    /// Creates a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Creates an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Creates an unknown slot error from the offending text.
    pub fn invalid_slot(raw: impl Into<String>) -> Self {
        Self::UnknownSlot(raw.into())
    }

    /// Creates a generic device error.
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device(message.into())
    }
}
