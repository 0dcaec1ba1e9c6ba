//! Fault injection for slot gateways.
//!
//! [`CrashableSlots`] wraps any gateway and fails writes or reads on
//! demand, simulating a token pulled out mid-flush. The engine owns the
//! gateway, so the failure switches live in a shared [`CrashControl`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let slots = CrashableSlots::new(InMemorySlots::new());
//! let control = slots.control();
//! let engine = StorageEngine::format(slots, ...)?;
//!
//! control.crash_after_writes(1);
//! control.set_fail_reads(true);
//! assert!(engine.flush(true).is_err());
//! ```

use slotfs_storage::{CredentialType, SlotGateway, SlotId, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared failure switches for a [`CrashableSlots`].
#[derive(Debug)]
pub struct CrashControl {
    writes_left: AtomicUsize,
    fail_reads: AtomicBool,
    crashed: AtomicBool,
}

impl Default for CrashControl {
    fn default() -> Self {
        Self {
            writes_left: AtomicUsize::new(usize::MAX),
            fail_reads: AtomicBool::new(false),
            crashed: AtomicBool::new(false),
        }
    }
}

impl CrashControl {
    /// Lets `writes` more slot writes through, then fails every write.
    pub fn crash_after_writes(&self, writes: usize) {
        self.writes_left.store(writes, Ordering::SeqCst);
    }

    /// Sets whether slot reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Clears every failure switch.
    pub fn reset(&self) {
        self.writes_left.store(usize::MAX, Ordering::SeqCst);
        self.fail_reads.store(false, Ordering::SeqCst);
        self.crashed.store(false, Ordering::SeqCst);
    }

    /// Returns whether a write has been refused.
    pub fn has_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    fn take_write(&self) -> bool {
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

/// A gateway wrapper that can simulate hardware failures.
#[derive(Debug)]
pub struct CrashableSlots<G> {
    inner: G,
    control: Arc<CrashControl>,
}

impl<G> CrashableSlots<G> {
    /// Wraps `inner` with all failure switches off.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            control: Arc::new(CrashControl::default()),
        }
    }

    /// Returns the failure switches.
    pub fn control(&self) -> Arc<CrashControl> {
        Arc::clone(&self.control)
    }
}

impl<G: SlotGateway> SlotGateway for CrashableSlots<G> {
    fn read(&self, slot: SlotId) -> StorageResult<Vec<u8>> {
        if self.control.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::device(format!(
                "simulated failure reading slot {slot}"
            )));
        }
        self.inner.read(slot)
    }

    fn write(&mut self, slot: SlotId, data: &[u8]) -> StorageResult<()> {
        if !self.control.take_write() {
            self.control.crashed.store(true, Ordering::SeqCst);
            return Err(StorageError::device(format!(
                "simulated crash writing slot {slot}"
            )));
        }
        self.inner.write(slot, data)
    }

    fn hash(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        self.inner.hash(data)
    }

    fn authenticate(&mut self, credential: &[u8], credential_type: CredentialType) -> StorageResult<()> {
        self.inner.authenticate(credential, credential_type)
    }
}
