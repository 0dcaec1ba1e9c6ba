//! Test fixtures and engine helpers.
//!
//! Provides a small slot layout that keeps tests fast, engine builders on
//! top of [`InMemorySlots`], and a timestamp-free view of a namespace for
//! comparing trees.

use slotfs_core::namespace::{FileKind, MemoryNamespace, Namespace};
use slotfs_core::{EngineConfig, NamespaceResult, StorageEngine};
use slotfs_storage::{
    CredentialType, DirectorySlots, InMemorySlots, SlotId, DEFAULT_MANAGEMENT_KEY,
};
use std::collections::BTreeMap;
use std::sync::Once;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Number of slots in the test layout.
pub const TEST_SLOTS: u8 = 4;

/// Block size of the test layout.
pub const TEST_BLOCK_SIZE: usize = 512;

/// Debounce delay of the test layout.
pub const TEST_FLUSH_DELAY: Duration = Duration::from_millis(50);

/// Installs a `tracing` subscriber for tests, once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// The first `TEST_SLOTS` retired slots, in order.
pub fn test_slots() -> Vec<SlotId> {
    (1..=TEST_SLOTS).filter_map(SlotId::retired).collect()
}

/// Small, fast engine configuration.
pub fn test_config() -> EngineConfig {
    EngineConfig::new()
        .data_slots(test_slots())
        .block_size(TEST_BLOCK_SIZE)
        .flush_delay(TEST_FLUSH_DELAY)
        .compression_level(3)
}

/// Formats `token` with an empty namespace.
pub fn format_engine(token: &InMemorySlots, config: EngineConfig) -> StorageEngine<InMemorySlots> {
    init_tracing();
    StorageEngine::format(
        token.clone(),
        MemoryNamespace::default(),
        config,
        &DEFAULT_MANAGEMENT_KEY,
        CredentialType::Tdes,
    )
    .expect("Failed to format slots")
}

/// Opens a read-only engine on a fresh session of `token`.
pub fn open_engine(token: &InMemorySlots, config: EngineConfig) -> StorageEngine<InMemorySlots> {
    init_tracing();
    StorageEngine::open(token.session(), MemoryNamespace::default(), config)
        .expect("Failed to open engine")
}

/// Opens an engine on a fresh session of `token` and enables writes.
pub fn open_writable(token: &InMemorySlots, config: EngineConfig) -> StorageEngine<InMemorySlots> {
    let engine = open_engine(token, config);
    engine
        .enable_write(&DEFAULT_MANAGEMENT_KEY, CredentialType::Tdes)
        .expect("Failed to enable write");
    engine
}

/// Opens directory-backed slots in a fresh temporary directory.
///
/// Keep the returned [`TempDir`] alive for as long as the slots are used.
pub fn temp_slots(secret: [u8; 32]) -> (TempDir, DirectorySlots) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let slots = DirectorySlots::open(dir.path(), secret).expect("Failed to open slot directory");
    (dir, slots)
}

/// Populates a three-entry tree: a directory, a file inside it, and a
/// symlink at the root.
///
/// # Errors
///
/// Returns an error if any of the entries already exists.
pub fn populate<N: Namespace>(ns: &mut N) -> NamespaceResult<()> {
    ns.make_dir("/docs", 0o755)?;
    ns.write_bytes("/docs/readme.txt", b"slots all the way down".to_vec())?;
    ns.make_symlink("/latest", "/docs/readme.txt")
}

/// A [`MemoryNamespace`] holding the [`populate`] tree.
pub fn sample_tree() -> MemoryNamespace {
    let mut ns = MemoryNamespace::default();
    populate(&mut ns).expect("Failed to build sample tree");
    ns
}

/// What a path holds, without timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listed {
    /// A regular file and its contents.
    File(Vec<u8>),
    /// A directory.
    Directory,
    /// A symlink and its target.
    Symlink(String),
}

/// Walks `ns` from the root and lists every entry by absolute path.
pub fn listing<N: Namespace>(ns: &N) -> BTreeMap<String, Listed> {
    let mut out = BTreeMap::new();
    let mut pending = vec![String::from("/")];
    while let Some(dir) = pending.pop() {
        let Ok(names) = ns.list_dir(&dir) else {
            continue;
        };
        for name in names {
            let path = if dir == "/" {
                format!("/{name}")
            } else {
                format!("{dir}/{name}")
            };
            let Ok(stat) = ns.stat(&path) else {
                continue;
            };
            let entry = match stat.kind {
                FileKind::File => Listed::File(ns.read_bytes(&path).unwrap_or_default().to_vec()),
                FileKind::Directory => {
                    pending.push(path.clone());
                    Listed::Directory
                }
                FileKind::Symlink => Listed::Symlink(ns.read_link(&path).unwrap_or_default()),
            };
            out.insert(path, entry);
        }
    }
    out
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Deterministic incompressible bytes.
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_tree_has_three_entries() {
        let tree = sample_tree();
        let listed = listing(&tree);
        assert_eq!(listed.len(), 3);
        assert_eq!(listed["/docs"], Listed::Directory);
        assert_eq!(listed["/latest"], Listed::Symlink("/docs/readme.txt".into()));
    }

    #[test]
    fn test_config_is_valid() {
        let config = test_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.data_slots.len(), usize::from(TEST_SLOTS));
    }

    #[test]
    fn noise_is_deterministic() {
        assert_eq!(noise(64, 7), noise(64, 7));
        assert_ne!(noise(64, 7), noise(64, 8));
    }

    #[test]
    fn format_then_open() {
        let token = InMemorySlots::new();
        drop(format_engine(&token, test_config()));
        let engine = open_engine(&token, test_config());
        assert!(engine.read(MemoryNamespace::is_empty).unwrap());
    }
}
