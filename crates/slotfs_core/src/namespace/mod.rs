//! The hierarchical namespace persisted by the engine.
//!
//! The engine treats the namespace as one opaque value: it serializes the
//! whole tree on every record and replaces the whole tree on every load.
//! [`Namespace`] is the capability the engine and the filesystem adapter
//! need; [`MemoryNamespace`] is the default arena-backed implementation.

mod memory;

pub use memory::{MemoryNamespace, NodeId};

use crate::error::NamespaceResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Largest regular file a namespace accepts, in bytes.
///
/// Far above what any slot layout can store, even for highly compressible
/// content; it only keeps a single `write_at` or `truncate` from allocating
/// without bound before the snapshot size is checked.
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Kind of a namespace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileKind {
    /// File type bits as found in `st_mode`.
    #[must_use]
    pub const fn type_bits(self) -> u32 {
        match self {
            Self::File => 0o100_000,
            Self::Directory => 0o040_000,
            Self::Symlink => 0o120_000,
        }
    }
}

/// A point in time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub secs: i64,
    /// Sub-second nanoseconds.
    pub nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp.
    #[must_use]
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Self {
                secs: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
                nanos: d.subsec_nanos(),
            })
            .unwrap_or_default()
    }
}

/// Attributes of a namespace entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    /// Entry kind.
    pub kind: FileKind,
    /// Permission bits (without file type bits).
    pub mode: u32,
    /// Number of hard links.
    pub nlink: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Size in bytes: content length for files, target length for symlinks,
    /// zero for directories.
    pub size: u64,
    /// Last access time.
    pub atime: Timestamp,
    /// Last modification time.
    pub mtime: Timestamp,
    /// Last status change time.
    pub ctime: Timestamp,
}

impl Stat {
    /// Full `st_mode` value: file type bits plus permission bits.
    #[must_use]
    pub const fn st_mode(&self) -> u32 {
        self.kind.type_bits() | self.mode
    }
}

/// A hierarchical file/directory/symlink store.
///
/// Paths are absolute and `/`-separated. Symbolic links are stored, never
/// followed; resolving them is the caller's business.
///
/// Implementations must serialize deterministically: an unchanged tree must
/// produce identical bytes so the engine can skip rewriting its blocks.
pub trait Namespace:
    Serialize + DeserializeOwned + Clone + Default + PartialEq + Send + 'static
{
    /// Returns the attributes of the entry at `path`.
    fn stat(&self, path: &str) -> NamespaceResult<Stat>;

    /// Creates an empty regular file.
    fn create_file(&mut self, path: &str, mode: u32) -> NamespaceResult<()>;

    /// Creates an empty directory.
    fn make_dir(&mut self, path: &str, mode: u32) -> NamespaceResult<()>;

    /// Creates a symbolic link at `path` pointing to `target`.
    fn make_symlink(&mut self, path: &str, target: &str) -> NamespaceResult<()>;

    /// Returns the target of the symbolic link at `path`.
    fn read_link(&self, path: &str) -> NamespaceResult<String>;

    /// Returns the full contents of the file at `path`.
    fn read_bytes(&self, path: &str) -> NamespaceResult<&[u8]>;

    /// Replaces the contents of the file at `path`, creating it if needed.
    ///
    /// Contents longer than [`MAX_FILE_SIZE`] are refused with
    /// [`NamespaceError::FileTooLarge`](crate::NamespaceError::FileTooLarge).
    fn write_bytes(&mut self, path: &str, data: Vec<u8>) -> NamespaceResult<()>;

    /// Writes `data` at `offset`, zero-filling any gap, and returns the
    /// number of bytes written.
    ///
    /// Refuses with
    /// [`NamespaceError::FileTooLarge`](crate::NamespaceError::FileTooLarge)
    /// if the file would grow past [`MAX_FILE_SIZE`].
    fn write_at(&mut self, path: &str, offset: u64, data: &[u8]) -> NamespaceResult<usize>;

    /// Shrinks or zero-extends the file at `path` to `len` bytes.
    ///
    /// Refuses with
    /// [`NamespaceError::FileTooLarge`](crate::NamespaceError::FileTooLarge)
    /// if `len` exceeds [`MAX_FILE_SIZE`].
    fn truncate(&mut self, path: &str, len: u64) -> NamespaceResult<()>;

    /// Lists the names in the directory at `path`, sorted.
    fn list_dir(&self, path: &str) -> NamespaceResult<Vec<String>>;

    /// Removes a file or symbolic link.
    fn remove_file(&mut self, path: &str) -> NamespaceResult<()>;

    /// Removes an empty directory.
    fn remove_dir(&mut self, path: &str) -> NamespaceResult<()>;

    /// Moves the entry at `from` to `to`.
    ///
    /// With `overwrite`, an existing compatible destination is replaced.
    fn rename(&mut self, from: &str, to: &str, overwrite: bool) -> NamespaceResult<()>;

    /// Sets the permission bits.
    fn set_mode(&mut self, path: &str, mode: u32) -> NamespaceResult<()>;

    /// Sets the owner user and group.
    fn set_owner(&mut self, path: &str, uid: u32, gid: u32) -> NamespaceResult<()>;

    /// Sets access and modification times; `None` means now.
    fn set_times(
        &mut self,
        path: &str,
        atime: Option<Timestamp>,
        mtime: Option<Timestamp>,
    ) -> NamespaceResult<()>;

    /// Returns the value of an extended attribute.
    fn get_xattr(&self, path: &str, name: &str) -> NamespaceResult<Vec<u8>>;

    /// Sets an extended attribute.
    fn set_xattr(&mut self, path: &str, name: &str, value: &[u8]) -> NamespaceResult<()>;

    /// Removes an extended attribute.
    fn remove_xattr(&mut self, path: &str, name: &str) -> NamespaceResult<()>;

    /// Lists extended attribute names, sorted.
    fn list_xattrs(&self, path: &str) -> NamespaceResult<Vec<String>>;
}
