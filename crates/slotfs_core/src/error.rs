//! Error types for SlotFS core.

use slotfs_storage::SlotId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for namespace operations.
pub type NamespaceResult<T> = Result<T, NamespaceError>;

/// Errors that can occur in SlotFS core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error outside the gateway, such as spawning the flush worker.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Hardware gateway error, passed through unmodified.
    #[error("hardware error: {0}")]
    Storage(#[from] slotfs_storage::StorageError),

    /// Snapshot codec error.
    #[error("codec error: {0}")]
    Codec(#[from] slotfs_codec::CodecError),

    /// Namespace operation error.
    #[error("namespace error: {0}")]
    Namespace(#[from] NamespaceError),

    /// The serialized snapshot does not fit in the slots.
    #[error("no space: snapshot needs {required} bytes, capacity is {capacity}")]
    NoSpace {
        /// Serialized snapshot length in bytes.
        required: usize,
        /// Capacity in bytes.
        capacity: usize,
    },

    /// A block read from hardware failed authenticated decryption.
    #[error("authentication failed for slot {slot}: block tampered, corrupted, or wrong key")]
    Authentication {
        /// The slot whose block was rejected.
        slot: SlotId,
    },

    /// The engine has been closed.
    #[error("engine is closed")]
    EngineClosed,

    /// The engine is read-only.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the refused operation.
        message: String,
    },

    /// Decrypted blocks do not form a valid store.
    #[error("corrupted store: {message}")]
    CorruptedStore {
        /// Description of the corruption.
        message: String,
    },

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// The encryption key could not be derived.
    #[error("key derivation failed: {message}")]
    KeyDerivation {
        /// Description of the failure.
        message: String,
    },

    /// A construction-time round-trip check failed.
    #[error("self-check failed: {check}")]
    SelfCheckFailed {
        /// Name of the failed check.
        check: &'static str,
    },

    /// Invalid engine configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a no space error.
    pub fn no_space(required: usize, capacity: usize) -> Self {
        Self::NoSpace { required, capacity }
    }

    /// Creates a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Creates a corrupted store error.
    pub fn corrupted_store(message: impl Into<String>) -> Self {
        Self::CorruptedStore {
            message: message.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a key derivation error.
    pub fn key_derivation(message: impl Into<String>) -> Self {
        Self::KeyDerivation {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Errors raised by namespace operations.
///
/// These are filesystem-level conditions. Translating them into OS error
/// codes is left to the filesystem adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    /// No entry exists at the path.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The operation is not allowed on this entry.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The destination of a move already exists.
    #[error("destination exists: {0}")]
    DestinationExists(String),

    /// A file already exists at the path.
    #[error("file exists: {0}")]
    FileExists(String),

    /// A directory already exists at the path.
    #[error("directory exists: {0}")]
    DirectoryExists(String),

    /// A file was expected but something else was found.
    #[error("file expected: {0}")]
    FileExpected(String),

    /// A directory was expected but something else was found.
    #[error("directory expected: {0}")]
    DirectoryExpected(String),

    /// The directory still has entries.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// The path is malformed or would create a cycle.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The file would grow past the namespace's size limit.
    #[error("file too large: {path} would be {size} bytes, limit is {max}")]
    FileTooLarge {
        /// Path of the file.
        path: String,
        /// Requested size in bytes.
        size: u64,
        /// Size limit in bytes.
        max: u64,
    },

    /// The extended attribute does not exist.
    #[error("attribute {name} not found on {path}")]
    AttributeNotFound {
        /// Path of the entry.
        path: String,
        /// Name of the missing attribute.
        name: String,
    },
}
