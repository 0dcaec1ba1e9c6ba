//! Arena-backed namespace.

use super::{FileKind, Namespace, Stat, Timestamp, MAX_FILE_SIZE};
use crate::error::{NamespaceError, NamespaceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ROOT: NodeId = NodeId(0);
const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;
const SYMLINK_MODE: u32 = 0o777;
const PERMISSION_BITS: u32 = 0o7777;

/// Stable index of a node in the arena.
///
/// Ids of removed nodes are recycled by later insertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the raw index.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Metadata {
    mode: u32,
    uid: u32,
    gid: u32,
    nlink: u32,
    atime: Timestamp,
    mtime: Timestamp,
    ctime: Timestamp,
    xattrs: BTreeMap<String, Vec<u8>>,
}

impl Metadata {
    fn new(mode: u32, nlink: u32, uid: u32, gid: u32) -> Self {
        let now = Timestamp::now();
        Self {
            mode: mode & PERMISSION_BITS,
            uid,
            gid,
            nlink,
            atime: now,
            mtime: now,
            ctime: now,
            xattrs: BTreeMap::new(),
        }
    }

    fn touch(&mut self) {
        let now = Timestamp::now();
        self.mtime = now;
        self.ctime = now;
    }

    fn changed(&mut self) {
        self.ctime = Timestamp::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Content {
    File(#[serde(with = "serde_bytes")] Vec<u8>),
    Directory(BTreeMap<String, NodeId>),
    Symlink(String),
}

impl Content {
    const fn kind(&self) -> FileKind {
        match self {
            Self::File(_) => FileKind::File,
            Self::Directory(_) => FileKind::Directory,
            Self::Symlink(_) => FileKind::Symlink,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Node {
    parent: NodeId,
    name: String,
    meta: Metadata,
    content: Content,
}

/// In-memory namespace stored as an arena of nodes.
///
/// Node 0 is the root directory; its parent is itself. Every directory keeps
/// a name-ordered index of its children, so serialization is deterministic.
///
/// # Example
///
/// ```
/// use slotfs_core::namespace::{MemoryNamespace, Namespace};
///
/// let mut ns = MemoryNamespace::default();
/// ns.make_dir("/docs", 0o755).unwrap();
/// ns.write_bytes("/docs/readme", b"hello".to_vec()).unwrap();
/// assert_eq!(ns.read_bytes("/docs/readme").unwrap(), b"hello");
/// assert_eq!(ns.list_dir("/").unwrap(), vec!["docs".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryNamespace {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
}

impl Default for MemoryNamespace {
    fn default() -> Self {
        Self::with_root(DEFAULT_DIR_MODE, 0, 0)
    }
}

impl MemoryNamespace {
    /// Creates an empty namespace whose root has the given mode and owner.
    ///
    /// New entries inherit the root's owner.
    #[must_use]
    pub fn with_root(mode: u32, uid: u32, gid: u32) -> Self {
        let root = Node {
            parent: ROOT,
            name: String::new(),
            meta: Metadata::new(mode, 2, uid, gid),
            content: Content::Directory(BTreeMap::new()),
        };
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
        }
    }

    /// Number of live entries, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Returns the arena id of the entry at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed or does not exist.
    pub fn lookup(&self, path: &str) -> NamespaceResult<NodeId> {
        let parts = components(path)?;
        self.resolve(&parts, path)
    }

    fn node(&self, id: NodeId) -> NamespaceResult<&Node> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| NamespaceError::ResourceNotFound(format!("node {}", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> NamespaceResult<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| NamespaceError::ResourceNotFound(format!("node {}", id.0)))
    }

    fn resolve(&self, parts: &[&str], path: &str) -> NamespaceResult<NodeId> {
        let mut current = ROOT;
        for part in parts {
            let Content::Directory(entries) = &self.node(current)?.content else {
                return Err(NamespaceError::DirectoryExpected(path.to_owned()));
            };
            current = *entries
                .get(*part)
                .ok_or_else(|| NamespaceError::ResourceNotFound(path.to_owned()))?;
        }
        Ok(current)
    }

    /// Resolves the parent directory of `path` and the final name.
    /// `None` means `path` is the root.
    fn split<'p>(&self, path: &'p str) -> NamespaceResult<Option<(NodeId, &'p str)>> {
        let parts = components(path)?;
        let Some((name, parents)) = parts.split_last() else {
            return Ok(None);
        };
        let parent = self.resolve(parents, path)?;
        if self.node(parent)?.content.kind() != FileKind::Directory {
            return Err(NamespaceError::DirectoryExpected(path.to_owned()));
        }
        Ok(Some((parent, *name)))
    }

    fn child(&self, dir: NodeId, name: &str) -> NamespaceResult<Option<NodeId>> {
        match &self.node(dir)?.content {
            Content::Directory(entries) => Ok(entries.get(name).copied()),
            _ => Ok(None),
        }
    }

    fn exists_error(&self, id: NodeId, path: &str) -> NamespaceError {
        match self.node(id) {
            Ok(node) if node.content.kind() == FileKind::Directory => {
                NamespaceError::DirectoryExists(path.to_owned())
            }
            Ok(_) => NamespaceError::FileExists(path.to_owned()),
            Err(e) => e,
        }
    }

    /// Resolves the parent of a path that must not exist yet.
    fn vacant<'p>(&self, path: &'p str) -> NamespaceResult<(NodeId, &'p str)> {
        let Some((parent, name)) = self.split(path)? else {
            return Err(NamespaceError::DirectoryExists(path.to_owned()));
        };
        if let Some(existing) = self.child(parent, name)? {
            return Err(self.exists_error(existing, path));
        }
        Ok((parent, name))
    }

    fn owner(&self) -> (u32, u32) {
        self.node(ROOT)
            .map(|root| (root.meta.uid, root.meta.gid))
            .unwrap_or_default()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        while let Some(id) = self.free.pop() {
            match self.nodes.get_mut(id.index()) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(node);
                    return id;
                }
                _ => {}
            }
        }
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Some(node));
        id
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = None;
            self.free.push(id);
        }
    }

    fn attach(&mut self, id: NodeId, parent: NodeId, name: &str) -> NamespaceResult<()> {
        let node = self.node_mut(id)?;
        node.parent = parent;
        node.name = name.to_owned();
        let is_dir = node.content.kind() == FileKind::Directory;

        let parent_node = self.node_mut(parent)?;
        if let Content::Directory(entries) = &mut parent_node.content {
            entries.insert(name.to_owned(), id);
        }
        parent_node.meta.touch();
        if is_dir {
            parent_node.meta.nlink = parent_node.meta.nlink.saturating_add(1);
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) -> NamespaceResult<()> {
        let node = self.node(id)?;
        let parent = node.parent;
        let name = node.name.clone();
        let is_dir = node.content.kind() == FileKind::Directory;

        let parent_node = self.node_mut(parent)?;
        if let Content::Directory(entries) = &mut parent_node.content {
            entries.remove(&name);
        }
        parent_node.meta.touch();
        if is_dir {
            parent_node.meta.nlink = parent_node.meta.nlink.saturating_sub(1);
        }
        Ok(())
    }

    fn add(
        &mut self,
        parent: NodeId,
        name: &str,
        meta: Metadata,
        content: Content,
    ) -> NamespaceResult<NodeId> {
        let id = self.alloc(Node {
            parent,
            name: name.to_owned(),
            meta,
            content,
        });
        self.attach(id, parent, name)?;
        Ok(id)
    }

    /// Returns true if `id` is `ancestor` or lies beneath it.
    fn is_within(&self, mut id: NodeId, ancestor: NodeId) -> NamespaceResult<bool> {
        for _ in 0..=self.nodes.len() {
            if id == ancestor {
                return Ok(true);
            }
            if id == ROOT {
                return Ok(false);
            }
            id = self.node(id)?.parent;
        }
        Ok(false)
    }

    fn meta(&self, path: &str) -> NamespaceResult<&Metadata> {
        let id = self.lookup(path)?;
        Ok(&self.node(id)?.meta)
    }

    fn meta_mut(&mut self, path: &str) -> NamespaceResult<&mut Metadata> {
        let id = self.lookup(path)?;
        Ok(&mut self.node_mut(id)?.meta)
    }

    fn file_mut(&mut self, path: &str) -> NamespaceResult<(&mut Metadata, &mut Vec<u8>)> {
        let id = self.lookup(path)?;
        let node = self.node_mut(id)?;
        match &mut node.content {
            Content::File(data) => Ok((&mut node.meta, data)),
            _ => Err(NamespaceError::FileExpected(path.to_owned())),
        }
    }

    fn remove_entry(&mut self, path: &str, want_dir: bool) -> NamespaceResult<()> {
        let parts = components(path)?;
        if parts.is_empty() {
            return Err(NamespaceError::PermissionDenied(path.to_owned()));
        }
        let id = self.resolve(&parts, path)?;
        match (&self.node(id)?.content, want_dir) {
            (Content::Directory(entries), true) if !entries.is_empty() => {
                return Err(NamespaceError::DirectoryNotEmpty(path.to_owned()));
            }
            (Content::Directory(_), true) | (Content::File(_) | Content::Symlink(_), false) => {}
            (_, true) => return Err(NamespaceError::DirectoryExpected(path.to_owned())),
            (Content::Directory(_), false) => {
                return Err(NamespaceError::FileExpected(path.to_owned()));
            }
        }
        self.detach(id)?;
        self.release(id);
        Ok(())
    }
}

/// Converts a requested file size to `usize`, refusing sizes past
/// [`MAX_FILE_SIZE`].
fn checked_size(path: &str, size: u64) -> NamespaceResult<usize> {
    if size > MAX_FILE_SIZE {
        return Err(NamespaceError::FileTooLarge {
            path: path.to_owned(),
            size,
            max: MAX_FILE_SIZE,
        });
    }
    usize::try_from(size).map_err(|_| NamespaceError::InvalidPath(path.to_owned()))
}

/// Splits an absolute path into normalized components.
fn components(path: &str) -> NamespaceResult<Vec<&str>> {
    if !path.starts_with('/') || path.contains('\0') {
        return Err(NamespaceError::InvalidPath(path.to_owned()));
    }
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(NamespaceError::InvalidPath(path.to_owned()));
                }
            }
            name => parts.push(name),
        }
    }
    Ok(parts)
}

impl Namespace for MemoryNamespace {
    fn stat(&self, path: &str) -> NamespaceResult<Stat> {
        let node = self.node(self.lookup(path)?)?;
        let size = match &node.content {
            Content::File(data) => data.len(),
            Content::Symlink(target) => target.len(),
            Content::Directory(_) => 0,
        };
        Ok(Stat {
            kind: node.content.kind(),
            mode: node.meta.mode,
            nlink: node.meta.nlink,
            uid: node.meta.uid,
            gid: node.meta.gid,
            size: size as u64,
            atime: node.meta.atime,
            mtime: node.meta.mtime,
            ctime: node.meta.ctime,
        })
    }

    fn create_file(&mut self, path: &str, mode: u32) -> NamespaceResult<()> {
        let (parent, name) = self.vacant(path)?;
        let (uid, gid) = self.owner();
        self.add(parent, name, Metadata::new(mode, 1, uid, gid), Content::File(Vec::new()))?;
        Ok(())
    }

    fn make_dir(&mut self, path: &str, mode: u32) -> NamespaceResult<()> {
        let (parent, name) = self.vacant(path)?;
        let (uid, gid) = self.owner();
        self.add(
            parent,
            name,
            Metadata::new(mode, 2, uid, gid),
            Content::Directory(BTreeMap::new()),
        )?;
        Ok(())
    }

    fn make_symlink(&mut self, path: &str, target: &str) -> NamespaceResult<()> {
        let (parent, name) = self.vacant(path)?;
        let (uid, gid) = self.owner();
        self.add(
            parent,
            name,
            Metadata::new(SYMLINK_MODE, 1, uid, gid),
            Content::Symlink(target.to_owned()),
        )?;
        Ok(())
    }

    fn read_link(&self, path: &str) -> NamespaceResult<String> {
        match &self.node(self.lookup(path)?)?.content {
            Content::Symlink(target) => Ok(target.clone()),
            _ => Err(NamespaceError::InvalidPath(path.to_owned())),
        }
    }

    fn read_bytes(&self, path: &str) -> NamespaceResult<&[u8]> {
        match &self.node(self.lookup(path)?)?.content {
            Content::File(data) => Ok(data),
            _ => Err(NamespaceError::FileExpected(path.to_owned())),
        }
    }

    fn write_bytes(&mut self, path: &str, data: Vec<u8>) -> NamespaceResult<()> {
        checked_size(path, data.len() as u64)?;
        if matches!(self.lookup(path), Err(NamespaceError::ResourceNotFound(_))) {
            self.create_file(path, DEFAULT_FILE_MODE)?;
        }
        let (meta, content) = self.file_mut(path)?;
        *content = data;
        meta.touch();
        Ok(())
    }

    fn write_at(&mut self, path: &str, offset: u64, data: &[u8]) -> NamespaceResult<usize> {
        let end = checked_size(path, offset.saturating_add(data.len() as u64))?;
        let start = end - data.len();

        let (meta, content) = self.file_mut(path)?;
        if content.len() < end {
            content.resize(end, 0);
        }
        content[start..end].copy_from_slice(data);
        meta.touch();
        Ok(data.len())
    }

    fn truncate(&mut self, path: &str, len: u64) -> NamespaceResult<()> {
        let len = checked_size(path, len)?;
        let (meta, content) = self.file_mut(path)?;
        content.resize(len, 0);
        meta.touch();
        Ok(())
    }

    fn list_dir(&self, path: &str) -> NamespaceResult<Vec<String>> {
        match &self.node(self.lookup(path)?)?.content {
            Content::Directory(entries) => Ok(entries.keys().cloned().collect()),
            _ => Err(NamespaceError::DirectoryExpected(path.to_owned())),
        }
    }

    fn remove_file(&mut self, path: &str) -> NamespaceResult<()> {
        self.remove_entry(path, false)
    }

    fn remove_dir(&mut self, path: &str) -> NamespaceResult<()> {
        self.remove_entry(path, true)
    }

    fn rename(&mut self, from: &str, to: &str, overwrite: bool) -> NamespaceResult<()> {
        let parts = components(from)?;
        if parts.is_empty() {
            return Err(NamespaceError::PermissionDenied(from.to_owned()));
        }
        let src = self.resolve(&parts, from)?;
        let Some((dst_parent, dst_name)) = self.split(to)? else {
            return Err(NamespaceError::PermissionDenied(to.to_owned()));
        };
        if self.is_within(dst_parent, src)? {
            return Err(NamespaceError::InvalidPath(to.to_owned()));
        }

        if let Some(existing) = self.child(dst_parent, dst_name)? {
            if existing == src {
                return Ok(());
            }
            if !overwrite {
                return Err(NamespaceError::DestinationExists(to.to_owned()));
            }
            let src_is_dir = self.node(src)?.content.kind() == FileKind::Directory;
            match (src_is_dir, &self.node(existing)?.content) {
                (true, Content::Directory(entries)) if !entries.is_empty() => {
                    return Err(NamespaceError::DirectoryNotEmpty(to.to_owned()));
                }
                (true, Content::Directory(_)) | (false, Content::File(_) | Content::Symlink(_)) => {
                }
                (true, _) => return Err(NamespaceError::DirectoryExpected(to.to_owned())),
                (false, Content::Directory(_)) => {
                    return Err(NamespaceError::FileExpected(to.to_owned()));
                }
            }
            self.detach(existing)?;
            self.release(existing);
        }

        self.detach(src)?;
        self.attach(src, dst_parent, dst_name)?;
        self.node_mut(src)?.meta.changed();
        Ok(())
    }

    fn set_mode(&mut self, path: &str, mode: u32) -> NamespaceResult<()> {
        let meta = self.meta_mut(path)?;
        meta.mode = mode & PERMISSION_BITS;
        meta.changed();
        Ok(())
    }

    fn set_owner(&mut self, path: &str, uid: u32, gid: u32) -> NamespaceResult<()> {
        let meta = self.meta_mut(path)?;
        meta.uid = uid;
        meta.gid = gid;
        meta.changed();
        Ok(())
    }

    fn set_times(
        &mut self,
        path: &str,
        atime: Option<Timestamp>,
        mtime: Option<Timestamp>,
    ) -> NamespaceResult<()> {
        let meta = self.meta_mut(path)?;
        meta.atime = atime.unwrap_or_else(Timestamp::now);
        meta.mtime = mtime.unwrap_or_else(Timestamp::now);
        meta.changed();
        Ok(())
    }

    fn get_xattr(&self, path: &str, name: &str) -> NamespaceResult<Vec<u8>> {
        self.meta(path)?
            .xattrs
            .get(name)
            .cloned()
            .ok_or_else(|| NamespaceError::AttributeNotFound {
                path: path.to_owned(),
                name: name.to_owned(),
            })
    }

    fn set_xattr(&mut self, path: &str, name: &str, value: &[u8]) -> NamespaceResult<()> {
        let meta = self.meta_mut(path)?;
        meta.xattrs.insert(name.to_owned(), value.to_vec());
        meta.changed();
        Ok(())
    }

    fn remove_xattr(&mut self, path: &str, name: &str) -> NamespaceResult<()> {
        let meta = self.meta_mut(path)?;
        if meta.xattrs.remove(name).is_none() {
            return Err(NamespaceError::AttributeNotFound {
                path: path.to_owned(),
                name: name.to_owned(),
            });
        }
        meta.changed();
        Ok(())
    }

    fn list_xattrs(&self, path: &str) -> NamespaceResult<Vec<String>> {
        Ok(self.meta(path)?.xattrs.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotfs_codec::SnapshotCodec;

    fn sample() -> MemoryNamespace {
        let mut ns = MemoryNamespace::default();
        ns.make_dir("/a", 0o755).unwrap();
        ns.write_bytes("/a/one", b"first".to_vec()).unwrap();
        ns.make_symlink("/link", "/a/one").unwrap();
        ns
    }

    #[test]
    fn root_is_a_directory() {
        let ns = MemoryNamespace::default();
        let stat = ns.stat("/").unwrap();
        assert_eq!(stat.kind, FileKind::Directory);
        assert_eq!(stat.st_mode(), 0o040_755);
        assert_eq!(stat.nlink, 2);
        assert!(ns.is_empty());
    }

    #[test]
    fn paths_are_normalized() {
        let ns = sample();
        assert_eq!(ns.lookup("/a/./one").unwrap(), ns.lookup("//a/one/").unwrap());
        assert_eq!(ns.lookup("/a/../a/one").unwrap(), ns.lookup("/a/one").unwrap());
        assert!(matches!(ns.lookup("a/one"), Err(NamespaceError::InvalidPath(_))));
        assert!(matches!(ns.lookup("/.."), Err(NamespaceError::InvalidPath(_))));
    }

    #[test]
    fn create_and_read_file() {
        let mut ns = MemoryNamespace::default();
        ns.create_file("/f", 0o600).unwrap();
        let stat = ns.stat("/f").unwrap();
        assert_eq!(stat.kind, FileKind::File);
        assert_eq!(stat.mode, 0o600);
        assert_eq!(stat.size, 0);
        assert!(ns.read_bytes("/f").unwrap().is_empty());
    }

    #[test]
    fn create_existing_fails() {
        let mut ns = sample();
        assert_eq!(
            ns.create_file("/a/one", 0o644),
            Err(NamespaceError::FileExists("/a/one".into()))
        );
        assert_eq!(
            ns.make_dir("/a", 0o755),
            Err(NamespaceError::DirectoryExists("/a".into()))
        );
        assert_eq!(
            ns.make_dir("/", 0o755),
            Err(NamespaceError::DirectoryExists("/".into()))
        );
    }

    #[test]
    fn create_under_missing_parent_fails() {
        let mut ns = MemoryNamespace::default();
        assert!(matches!(
            ns.create_file("/missing/f", 0o644),
            Err(NamespaceError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn create_under_file_fails() {
        let mut ns = sample();
        assert!(matches!(
            ns.create_file("/a/one/f", 0o644),
            Err(NamespaceError::DirectoryExpected(_))
        ));
    }

    #[test]
    fn directories_track_parent_nlink() {
        let mut ns = MemoryNamespace::default();
        ns.make_dir("/x", 0o755).unwrap();
        ns.make_dir("/y", 0o755).unwrap();
        assert_eq!(ns.stat("/").unwrap().nlink, 4);
        assert_eq!(ns.stat("/x").unwrap().nlink, 2);

        ns.remove_dir("/y").unwrap();
        assert_eq!(ns.stat("/").unwrap().nlink, 3);
    }

    #[test]
    fn write_at_zero_fills_gap() {
        let mut ns = MemoryNamespace::default();
        ns.write_bytes("/f", b"ab".to_vec()).unwrap();
        assert_eq!(ns.write_at("/f", 4, b"cd").unwrap(), 2);
        assert_eq!(ns.read_bytes("/f").unwrap(), b"ab\0\0cd");

        ns.write_at("/f", 1, b"X").unwrap();
        assert_eq!(ns.read_bytes("/f").unwrap(), b"aX\0\0cd");
    }

    #[test]
    fn oversized_files_are_refused_before_allocating() {
        let mut ns = sample();
        let before = ns.clone();

        let result = ns.truncate("/a/one", 1 << 63);
        assert!(matches!(
            result,
            Err(NamespaceError::FileTooLarge { size, max, .. }) if size == 1 << 63 && max == MAX_FILE_SIZE
        ));
        assert!(matches!(
            ns.write_at("/a/one", u64::MAX, b"x"),
            Err(NamespaceError::FileTooLarge { .. })
        ));
        assert!(matches!(
            ns.write_at("/a/one", MAX_FILE_SIZE, b"x"),
            Err(NamespaceError::FileTooLarge { .. })
        ));
        assert_eq!(ns, before);

        ns.truncate("/a/one", 0).unwrap();
        assert_eq!(ns.write_at("/a/one", MAX_FILE_SIZE - 1, b"x").unwrap(), 1);
        assert_eq!(ns.stat("/a/one").unwrap().size, MAX_FILE_SIZE);
    }

    #[test]
    fn truncate_shrinks_and_extends() {
        let mut ns = sample();
        ns.truncate("/a/one", 2).unwrap();
        assert_eq!(ns.read_bytes("/a/one").unwrap(), b"fi");
        ns.truncate("/a/one", 4).unwrap();
        assert_eq!(ns.read_bytes("/a/one").unwrap(), b"fi\0\0");
        assert_eq!(ns.stat("/a/one").unwrap().size, 4);
    }

    #[test]
    fn file_operations_reject_directories() {
        let mut ns = sample();
        assert!(matches!(ns.read_bytes("/a"), Err(NamespaceError::FileExpected(_))));
        assert!(matches!(ns.truncate("/a", 0), Err(NamespaceError::FileExpected(_))));
        assert!(matches!(ns.read_bytes("/link"), Err(NamespaceError::FileExpected(_))));
        assert!(matches!(ns.list_dir("/a/one"), Err(NamespaceError::DirectoryExpected(_))));
    }

    #[test]
    fn symlinks_are_stored_not_followed() {
        let ns = sample();
        assert_eq!(ns.read_link("/link").unwrap(), "/a/one");
        let stat = ns.stat("/link").unwrap();
        assert_eq!(stat.kind, FileKind::Symlink);
        assert_eq!(stat.size, 6);
        assert!(matches!(ns.read_link("/a/one"), Err(NamespaceError::InvalidPath(_))));
    }

    #[test]
    fn list_dir_is_sorted() {
        let mut ns = MemoryNamespace::default();
        for name in ["c", "a", "b"] {
            ns.create_file(&format!("/{name}"), 0o644).unwrap();
        }
        assert_eq!(ns.list_dir("/").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_file_and_dir() {
        let mut ns = sample();
        assert!(matches!(ns.remove_file("/a"), Err(NamespaceError::FileExpected(_))));
        assert!(matches!(ns.remove_dir("/a"), Err(NamespaceError::DirectoryNotEmpty(_))));
        assert!(matches!(ns.remove_dir("/link"), Err(NamespaceError::DirectoryExpected(_))));

        ns.remove_file("/a/one").unwrap();
        ns.remove_file("/link").unwrap();
        ns.remove_dir("/a").unwrap();
        assert!(ns.is_empty());
        assert_eq!(ns.stat("/").unwrap().nlink, 2);
    }

    #[test]
    fn root_cannot_be_removed_or_moved() {
        let mut ns = sample();
        assert!(matches!(ns.remove_dir("/"), Err(NamespaceError::PermissionDenied(_))));
        assert!(matches!(ns.rename("/", "/b", false), Err(NamespaceError::PermissionDenied(_))));
        assert!(matches!(ns.rename("/a", "/", true), Err(NamespaceError::PermissionDenied(_))));
    }

    #[test]
    fn freed_ids_are_recycled() {
        let mut ns = MemoryNamespace::default();
        ns.create_file("/x", 0o644).unwrap();
        let id = ns.lookup("/x").unwrap();
        ns.remove_file("/x").unwrap();
        ns.create_file("/y", 0o644).unwrap();
        assert_eq!(ns.lookup("/y").unwrap(), id);
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn rename_moves_between_directories() {
        let mut ns = sample();
        ns.make_dir("/b", 0o755).unwrap();
        ns.rename("/a/one", "/b/uno", false).unwrap();
        assert_eq!(ns.read_bytes("/b/uno").unwrap(), b"first");
        assert!(ns.list_dir("/a").unwrap().is_empty());
    }

    #[test]
    fn rename_directory_moves_subtree_and_nlink() {
        let mut ns = sample();
        ns.make_dir("/b", 0o755).unwrap();
        ns.rename("/a", "/b/a", false).unwrap();
        assert_eq!(ns.read_bytes("/b/a/one").unwrap(), b"first");
        assert_eq!(ns.stat("/").unwrap().nlink, 3);
        assert_eq!(ns.stat("/b").unwrap().nlink, 3);
    }

    #[test]
    fn rename_respects_overwrite_flag() {
        let mut ns = sample();
        ns.write_bytes("/two", b"second".to_vec()).unwrap();
        assert_eq!(
            ns.rename("/two", "/a/one", false),
            Err(NamespaceError::DestinationExists("/a/one".into()))
        );
        ns.rename("/two", "/a/one", true).unwrap();
        assert_eq!(ns.read_bytes("/a/one").unwrap(), b"second");
        assert!(ns.lookup("/two").is_err());
    }

    #[test]
    fn rename_overwrite_checks_kinds() {
        let mut ns = sample();
        ns.make_dir("/d", 0o755).unwrap();
        assert!(matches!(
            ns.rename("/a/one", "/d", true),
            Err(NamespaceError::FileExpected(_))
        ));
        assert!(matches!(
            ns.rename("/d", "/a/one", true),
            Err(NamespaceError::DirectoryExpected(_))
        ));
        assert!(matches!(
            ns.rename("/d", "/a", true),
            Err(NamespaceError::DirectoryNotEmpty(_))
        ));
        ns.make_dir("/e", 0o755).unwrap();
        ns.rename("/d", "/e", true).unwrap();
        assert_eq!(ns.stat("/").unwrap().nlink, 4);
    }

    #[test]
    fn rename_into_own_subtree_fails() {
        let mut ns = sample();
        assert!(matches!(
            ns.rename("/a", "/a/inner", false),
            Err(NamespaceError::InvalidPath(_))
        ));
    }

    #[test]
    fn rename_onto_itself_is_noop() {
        let mut ns = sample();
        ns.rename("/a/one", "/a/one", false).unwrap();
        assert_eq!(ns.read_bytes("/a/one").unwrap(), b"first");
    }

    #[test]
    fn metadata_updates() {
        let mut ns = sample();
        ns.set_mode("/a/one", 0o100_600).unwrap();
        ns.set_owner("/a/one", 1000, 100).unwrap();
        let at = Timestamp::new(10, 5);
        ns.set_times("/a/one", Some(at), Some(at)).unwrap();

        let stat = ns.stat("/a/one").unwrap();
        assert_eq!(stat.mode, 0o600);
        assert_eq!((stat.uid, stat.gid), (1000, 100));
        assert_eq!(stat.atime, at);
        assert_eq!(stat.mtime, at);
    }

    #[test]
    fn new_entries_inherit_root_owner() {
        let mut ns = MemoryNamespace::with_root(0o700, 501, 20);
        ns.create_file("/f", 0o644).unwrap();
        let stat = ns.stat("/f").unwrap();
        assert_eq!((stat.uid, stat.gid), (501, 20));
    }

    #[test]
    fn extended_attributes() {
        let mut ns = sample();
        ns.set_xattr("/a", "user.b", b"2").unwrap();
        ns.set_xattr("/a", "user.a", b"1").unwrap();
        assert_eq!(ns.get_xattr("/a", "user.a").unwrap(), b"1");
        assert_eq!(ns.list_xattrs("/a").unwrap(), vec!["user.a", "user.b"]);

        ns.remove_xattr("/a", "user.a").unwrap();
        assert_eq!(
            ns.get_xattr("/a", "user.a"),
            Err(NamespaceError::AttributeNotFound {
                path: "/a".into(),
                name: "user.a".into()
            })
        );
        assert!(ns.remove_xattr("/a", "user.a").is_err());
    }

    #[test]
    fn codec_roundtrip_preserves_tree() {
        let codec = SnapshotCodec::new(3);
        let ns = sample();
        let bytes = codec.encode(&ns).unwrap();
        let decoded: MemoryNamespace = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, ns);
    }

    #[test]
    fn serialization_is_deterministic() {
        let codec = SnapshotCodec::new(3);
        let ns = sample();
        assert_eq!(codec.encode(&ns).unwrap(), codec.encode(&ns.clone()).unwrap());
    }

    #[test]
    fn file_contents_serialize_compactly() {
        let mut ns = MemoryNamespace::default();
        ns.write_bytes("/big", vec![0xFF; 1024]).unwrap();
        let raw = slotfs_codec::serialize(&ns).unwrap();
        assert!(raw.len() < 1024 + 256, "{} bytes", raw.len());
    }
}
