//! Property-based test generators using proptest.
//!
//! Names are drawn from a tiny pool so that generated operations collide:
//! creating over existing entries, renaming onto each other, removing
//! non-empty directories.

use slotfs_core::namespace::{MemoryNamespace, Namespace};
use slotfs_core::NamespaceResult;
use proptest::prelude::*;

/// One namespace mutation.
#[derive(Debug, Clone)]
pub enum TreeOp {
    /// Replace (or create) a file's contents.
    WriteFile {
        /// Target path.
        path: String,
        /// New contents.
        data: Vec<u8>,
    },
    /// Write at an offset inside an existing file.
    WriteAt {
        /// Target path.
        path: String,
        /// Byte offset.
        offset: u64,
        /// Bytes to write.
        data: Vec<u8>,
    },
    /// Create a directory.
    MakeDir {
        /// Target path.
        path: String,
    },
    /// Create a symlink.
    Symlink {
        /// Link path.
        path: String,
        /// Link target.
        target: String,
    },
    /// Remove a file or symlink.
    RemoveFile {
        /// Target path.
        path: String,
    },
    /// Remove an empty directory.
    RemoveDir {
        /// Target path.
        path: String,
    },
    /// Move an entry.
    Rename {
        /// Source path.
        from: String,
        /// Destination path.
        to: String,
        /// Replace an existing destination.
        overwrite: bool,
    },
    /// Set an extended attribute.
    SetXattr {
        /// Target path.
        path: String,
        /// Attribute name.
        name: String,
        /// Attribute value.
        value: Vec<u8>,
    },
}

impl TreeOp {
    /// Applies the operation to `ns`.
    ///
    /// # Errors
    ///
    /// Returns whatever the namespace rejects; generated sequences are
    /// expected to hit errors.
    pub fn apply<N: Namespace>(&self, ns: &mut N) -> NamespaceResult<()> {
        match self {
            Self::WriteFile { path, data } => ns.write_bytes(path, data.clone()),
            Self::WriteAt { path, offset, data } => ns.write_at(path, *offset, data).map(|_| ()),
            Self::MakeDir { path } => ns.make_dir(path, 0o755),
            Self::Symlink { path, target } => ns.make_symlink(path, target),
            Self::RemoveFile { path } => ns.remove_file(path),
            Self::RemoveDir { path } => ns.remove_dir(path),
            Self::Rename {
                from,
                to,
                overwrite,
            } => ns.rename(from, to, *overwrite),
            Self::SetXattr { path, name, value } => ns.set_xattr(path, name, value),
        }
    }
}

/// Strategy for paths one or two levels deep over a small name pool.
pub fn path_strategy() -> impl Strategy<Value = String> {
    let name = prop::sample::select(vec!["a", "b", "c", "d"]);
    prop::collection::vec(name, 1..=2).prop_map(|parts| format!("/{}", parts.join("/")))
}

/// Strategy for file contents.
pub fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for a single namespace mutation.
pub fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        (path_strategy(), content_strategy())
            .prop_map(|(path, data)| TreeOp::WriteFile { path, data }),
        (path_strategy(), 0u64..32, content_strategy())
            .prop_map(|(path, offset, data)| TreeOp::WriteAt { path, offset, data }),
        path_strategy().prop_map(|path| TreeOp::MakeDir { path }),
        (path_strategy(), path_strategy())
            .prop_map(|(path, target)| TreeOp::Symlink { path, target }),
        path_strategy().prop_map(|path| TreeOp::RemoveFile { path }),
        path_strategy().prop_map(|path| TreeOp::RemoveDir { path }),
        (path_strategy(), path_strategy(), any::<bool>())
            .prop_map(|(from, to, overwrite)| TreeOp::Rename { from, to, overwrite }),
        (
            path_strategy(),
            prop::sample::select(vec!["user.x", "user.y"]),
            prop::collection::vec(any::<u8>(), 0..8)
        )
            .prop_map(|(path, name, value)| TreeOp::SetXattr {
                path,
                name: name.to_string(),
                value,
            }),
    ]
}

/// Strategy for a sequence of mutations.
pub fn tree_ops_strategy(max: usize) -> impl Strategy<Value = Vec<TreeOp>> {
    prop::collection::vec(tree_op_strategy(), 0..max)
}

/// Strategy for a namespace built from random mutations, failures skipped.
pub fn namespace_strategy() -> impl Strategy<Value = MemoryNamespace> {
    tree_ops_strategy(32).prop_map(|ops| {
        let mut ns = MemoryNamespace::default();
        for op in &ops {
            let _ = op.apply(&mut ns);
        }
        ns
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotfs_codec::SnapshotCodec;

    proptest! {
        #[test]
        fn generated_paths_are_absolute(path in path_strategy()) {
            prop_assert!(path.starts_with('/'));
            prop_assert!(!path.ends_with('/'));
        }

        #[test]
        fn generated_namespaces_roundtrip(ns in namespace_strategy()) {
            let codec = SnapshotCodec::new(3);
            let decoded: MemoryNamespace = codec.decode(&codec.encode(&ns).unwrap()).unwrap();
            prop_assert_eq!(decoded, ns);
        }

        #[test]
        fn failed_ops_leave_tree_intact(ops in tree_ops_strategy(32)) {
            let mut ns = MemoryNamespace::default();
            for op in &ops {
                let before = ns.clone();
                if op.apply(&mut ns).is_err() {
                    prop_assert_eq!(&ns, &before);
                }
            }
        }
    }
}
