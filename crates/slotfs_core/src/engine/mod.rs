//! The slot-backed storage engine.
//!
//! The engine keeps the whole namespace in memory and persists it as one
//! encrypted snapshot spread across the configured slots:
//!
//! ```text
//! mutate ──▶ record (in memory) ──▶ debounce ──▶ flush (hardware) ──▶ load
//! ```
//!
//! `record` only touches memory. `flush` encrypts and writes the slots whose
//! payload changed and always finishes by reading the slots back, so the
//! in-memory copy reflects what the hardware actually holds even after a
//! partial write.
//!
//! ## Concurrency
//!
//! All state sits behind one mutex. A background worker runs the debounced
//! flush; it takes the same mutex and only flushes if no newer mutation has
//! re-armed the timer in the meantime.

mod debounce;
mod state;

use self::debounce::Debouncer;
use self::state::EngineState;
use crate::config::EngineConfig;
use crate::crypto::{Cipher, EncryptionKey};
use crate::error::{CoreResult, NamespaceResult};
use crate::namespace::{MemoryNamespace, Namespace};
use crate::partition::Geometry;
use crate::selfcheck;
use crate::stats::{EngineStats, StatsSnapshot};
use parking_lot::{Mutex, MutexGuard};
use slotfs_codec::SnapshotCodec;
use slotfs_storage::{CredentialType, SlotGateway};
use std::sync::Arc;

/// Space accounting in slot blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Size of one block in bytes.
    pub block_size: usize,
    /// Number of blocks (one per slot).
    pub total_blocks: usize,
    /// Blocks occupied by the current snapshot.
    pub used_blocks: usize,
    /// Blocks still free.
    pub available_blocks: usize,
    /// Largest snapshot, in bytes, the slots can hold.
    pub capacity_bytes: usize,
    /// Length of the current snapshot in bytes.
    pub used_bytes: usize,
}

struct Inner<G, N> {
    state: Mutex<EngineState<G, N>>,
    debounce: Debouncer,
    stats: EngineStats,
    geometry: Geometry,
}

impl<G: SlotGateway, N: Namespace> Inner<G, N> {
    fn fire(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.armed != Some(generation) {
            return;
        }
        state.armed = None;
        if let Err(error) = state.flush(false, &self.stats) {
            self.stats.record_error();
            tracing::error!(%error, "background flush failed");
        }
    }
}

/// Storage engine persisting a [`Namespace`] across hardware slots.
///
/// A new engine is read-only and divergent: the first access reads the
/// slots, and nothing is written until [`enable_write`](Self::enable_write)
/// succeeds.
///
/// # Example
///
/// ```
/// use slotfs_core::{EngineConfig, StorageEngine};
/// use slotfs_core::namespace::{MemoryNamespace, Namespace};
/// use slotfs_storage::{CredentialType, InMemorySlots, DEFAULT_MANAGEMENT_KEY};
///
/// let token = InMemorySlots::new();
/// let engine = StorageEngine::format(
///     token,
///     MemoryNamespace::default(),
///     EngineConfig::default(),
///     &DEFAULT_MANAGEMENT_KEY,
///     CredentialType::Tdes,
/// )
/// .unwrap();
///
/// engine
///     .mutate(|ns| ns.write_bytes("/hello", b"world".to_vec()))
///     .unwrap();
/// engine.sync().unwrap();
///
/// let data = engine.read(|ns| ns.read_bytes("/hello").map(<[u8]>::to_vec)).unwrap();
/// assert_eq!(data.unwrap(), b"world");
/// ```
pub struct StorageEngine<G: SlotGateway + 'static, N: Namespace = MemoryNamespace> {
    inner: Arc<Inner<G, N>>,
}

impl<G: SlotGateway + 'static, N: Namespace> StorageEngine<G, N> {
    /// Opens an engine over `gateway`.
    ///
    /// Derives the encryption key from the token, runs the self-checks and
    /// starts the flush worker. The slots are not read until first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, key derivation
    /// fails, a self-check fails, or the worker cannot be spawned.
    pub fn open(gateway: G, namespace: N, config: EngineConfig) -> CoreResult<Self> {
        config.validate()?;
        let geometry = config.geometry();

        let key = EncryptionKey::derive(&gateway, &config.key_label())?;
        let cipher = Cipher::new(&key);
        drop(key);
        let codec = SnapshotCodec::new(config.compression_level);
        selfcheck::run::<N>(&cipher, &codec, &geometry)?;

        let state = EngineState::new(
            gateway,
            namespace,
            cipher,
            codec,
            geometry,
            config.data_slots.clone(),
        );
        let inner = Arc::new(Inner {
            state: Mutex::new(state),
            debounce: Debouncer::new(config.flush_delay),
            stats: EngineStats::new(),
            geometry,
        });

        let weak = Arc::downgrade(&inner);
        inner.debounce.start(move |generation| {
            if let Some(inner) = weak.upgrade() {
                inner.fire(generation);
            }
        })?;

        tracing::info!(
            slots = geometry.slots(),
            block_size = geometry.block_size(),
            capacity = geometry.capacity(),
            "storage engine opened"
        );
        Ok(Self { inner })
    }

    /// Initializes fresh hardware with `namespace` and returns the engine.
    ///
    /// Authenticates, writes every slot and reads them back.
    ///
    /// # Errors
    ///
    /// Returns an error if opening, authentication, encoding or any slot
    /// write fails.
    pub fn format(
        gateway: G,
        namespace: N,
        config: EngineConfig,
        credential: &[u8],
        credential_type: CredentialType,
    ) -> CoreResult<Self> {
        let engine = Self::open(gateway, namespace, config)?;
        engine.enable_write(credential, credential_type)?;
        {
            let mut state = engine.inner.state.lock();
            state.record(&engine.inner.stats)?;
            state.flush(true, &engine.inner.stats)?;
        }
        tracing::info!("slots formatted");
        Ok(engine)
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, EngineState<G, N>>> {
        let state = self.inner.state.lock();
        state.ensure_open()?;
        Ok(state)
    }

    /// Reads the slots into memory if the in-memory copy may be stale.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Authentication`](crate::CoreError::Authentication)
    /// naming the first block that fails to decrypt, or a storage, corruption
    /// or codec error. The namespace is untouched on any error.
    pub fn load(&self) -> CoreResult<()> {
        self.lock()?.load(&self.inner.stats)
    }

    /// Encodes the namespace into the ephemeral store without touching
    /// hardware.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSpace`](crate::CoreError::NoSpace) if the
    /// snapshot exceeds the capacity.
    pub fn record(&self) -> CoreResult<()> {
        self.lock()?.record(&self.inner.stats)
    }

    /// Writes changed slots (every slot with `force`) and reloads.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PermissionDenied`](crate::CoreError::PermissionDenied)
    /// while read-only, otherwise the first write error or, if all writes
    /// succeeded, the reload error.
    pub fn flush(&self, force: bool) -> CoreResult<()> {
        self.lock()?.flush(force, &self.inner.stats)
    }

    /// Records the namespace and (re)arms the debounced flush.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSpace`](crate::CoreError::NoSpace) if the
    /// snapshot exceeds the capacity; the timer is not armed.
    pub fn schedule_flush(&self) -> CoreResult<()> {
        let mut state = self.lock()?;
        state.record(&self.inner.stats)?;
        state.armed = Some(self.inner.debounce.arm());
        Ok(())
    }

    /// Applies `f` to the namespace and schedules a flush.
    ///
    /// The mutation is all-or-nothing: if `f` fails or the result does not
    /// fit, the namespace is restored and the error returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PermissionDenied`](crate::CoreError::PermissionDenied)
    /// while read-only, [`CoreError::Namespace`](crate::CoreError::Namespace)
    /// if `f` fails, [`CoreError::NoSpace`](crate::CoreError::NoSpace) if the
    /// result does not fit, or a load error.
    pub fn mutate<R, F>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut N) -> NamespaceResult<R>,
    {
        let mut state = self.lock()?;
        state.ensure_writable()?;
        state.load(&self.inner.stats)?;

        let before = state.namespace.clone();
        let value = match f(&mut state.namespace) {
            Ok(value) => value,
            Err(error) => {
                state.namespace = before;
                return Err(error.into());
            }
        };
        if let Err(error) = state.record(&self.inner.stats) {
            state.namespace = before;
            return Err(error);
        }

        state.armed = Some(self.inner.debounce.arm());
        Ok(value)
    }

    /// Runs `f` against the namespace, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Returns a load error.
    pub fn read<R, F>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&N) -> R,
    {
        let mut state = self.lock()?;
        state.load(&self.inner.stats)?;
        Ok(f(&state.namespace))
    }

    /// Cancels any pending debounced flush and flushes now.
    ///
    /// # Errors
    ///
    /// Returns the flush error.
    pub fn sync(&self) -> CoreResult<()> {
        let mut state = self.lock()?;
        state.armed = None;
        self.inner.debounce.cancel();
        state.flush(false, &self.inner.stats)
    }

    /// Authenticates on the token and enables writes.
    ///
    /// # Errors
    ///
    /// Returns the gateway's authentication error; the engine stays
    /// read-only.
    pub fn enable_write(&self, credential: &[u8], credential_type: CredentialType) -> CoreResult<()> {
        self.lock()?.enable_write(credential, credential_type)
    }

    /// Stops the flush worker, flushing first if a flush was pending.
    ///
    /// Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the error of the final flush.
    pub fn close(&self) -> CoreResult<()> {
        self.inner.debounce.shutdown();

        let mut state = self.inner.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        if state.armed.take().is_some() {
            state.flush(false, &self.inner.stats)?;
        }
        tracing::info!("storage engine closed");
        Ok(())
    }

    /// Blocks occupied by the current snapshot, trailer included.
    ///
    /// # Errors
    ///
    /// Returns a load error; see [`usage`](Self::usage).
    pub fn capacity_blocks_used(&self) -> CoreResult<usize> {
        Ok(self.usage()?.used_blocks)
    }

    /// Blocks not occupied by the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns a load error; see [`usage`](Self::usage).
    pub fn capacity_blocks_available(&self) -> CoreResult<usize> {
        Ok(self.usage()?.available_blocks)
    }

    /// Filesystem-level space accounting.
    ///
    /// Loads the slots first if the in-memory copy may be stale, so a fresh
    /// engine reports what the hardware holds.
    ///
    /// # Errors
    ///
    /// Returns a load error.
    pub fn usage(&self) -> CoreResult<Usage> {
        let geometry = self.inner.geometry;
        let used_bytes = {
            let mut state = self.lock()?;
            state.load(&self.inner.stats)?;
            state.recorded_len()
        };
        let used_blocks = geometry.blocks_used(used_bytes);
        Ok(Usage {
            block_size: geometry.block_size(),
            total_blocks: geometry.slots(),
            used_blocks,
            available_blocks: geometry.slots().saturating_sub(used_blocks),
            capacity_bytes: geometry.capacity(),
            used_bytes,
        })
    }

    /// Returns true until [`enable_write`](Self::enable_write) succeeds.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.state.lock().read_only
    }

    /// Returns true if the in-memory copy may not match the hardware.
    #[must_use]
    pub fn is_divergent(&self) -> bool {
        self.inner.state.lock().divergent
    }

    /// Returns the slot layout.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.inner.geometry
    }

    /// Returns a snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl<G: SlotGateway + 'static, N: Namespace> std::fmt::Debug for StorageEngine<G, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("geometry", &self.inner.geometry)
            .field("read_only", &self.is_read_only())
            .field("divergent", &self.is_divergent())
            .finish_non_exhaustive()
    }
}

impl<G: SlotGateway + 'static, N: Namespace> Drop for StorageEngine<G, N> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            tracing::warn!(%error, "flush on close failed");
        }
    }
}
