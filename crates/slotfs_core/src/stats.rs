//! Engine statistics.
//!
//! Counters for hardware traffic and engine activity, readable while
//! operations are in progress.
//!
//! # Usage
//!
//! ```rust,ignore
//! let stats = engine.stats();
//! println!("Slot writes: {}", stats.slot_writes);
//! println!("Flushes: {}", stats.flushes);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Engine statistics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct EngineStats {
    // Hardware traffic
    slot_reads: AtomicU64,
    slot_writes: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,

    // Engine activity
    records: AtomicU64,
    loads: AtomicU64,
    flushes: AtomicU64,
    no_space: AtomicU64,
    errors: AtomicU64,
}

impl EngineStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one block read from a slot.
    pub(crate) fn record_slot_read(&self, bytes: u64) {
        self.slot_reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records one block written to a slot.
    pub(crate) fn record_slot_write(&self, bytes: u64) {
        self.slot_writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a snapshot recorded into the ephemeral store.
    pub(crate) fn record_record(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed load from hardware.
    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a flush attempt.
    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a mutation rejected for lack of space.
    pub(crate) fn record_no_space(&self) {
        self.no_space.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an error.
    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of blocks read from slots.
    pub fn slot_reads(&self) -> u64 {
        self.slot_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of blocks written to slots.
    pub fn slot_writes(&self) -> u64 {
        self.slot_writes.load(Ordering::Relaxed)
    }

    /// Returns the total bytes read from slots.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns the total bytes written to slots.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of recorded snapshots.
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Returns the number of completed loads.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Returns the number of flush attempts.
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Returns the number of mutations rejected for lack of space.
    pub fn no_space(&self) -> u64 {
        self.no_space.load(Ordering::Relaxed)
    }

    /// Returns the number of errors.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            slot_reads: self.slot_reads(),
            slot_writes: self.slot_writes(),
            bytes_read: self.bytes_read(),
            bytes_written: self.bytes_written(),
            records: self.records(),
            loads: self.loads(),
            flushes: self.flushes(),
            no_space: self.no_space(),
            errors: self.errors(),
        }
    }
}

/// A point-in-time snapshot of engine statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Blocks read from slots.
    pub slot_reads: u64,
    /// Blocks written to slots.
    pub slot_writes: u64,
    /// Bytes read from slots.
    pub bytes_read: u64,
    /// Bytes written to slots.
    pub bytes_written: u64,
    /// Snapshots recorded into the ephemeral store.
    pub records: u64,
    /// Completed loads.
    pub loads: u64,
    /// Flush attempts.
    pub flushes: u64,
    /// Mutations rejected for lack of space.
    pub no_space: u64,
    /// Errors.
    pub errors: u64,
}
