//! Engine configuration.

use crate::crypto::BLOCK_OVERHEAD;
use crate::error::{CoreError, CoreResult};
use crate::partition::{Geometry, TRAILER_SIZE};
use slotfs_codec::DEFAULT_COMPRESSION_LEVEL;
use slotfs_storage::SlotId;
use std::collections::HashSet;
use std::time::Duration;

/// Default size of one slot block in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 2048;

/// Default quiet period before a debounced flush runs.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_secs(1);

/// Configuration for opening a storage engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Slots holding the filesystem, in partition order.
    pub data_slots: Vec<SlotId>,

    /// Size of the block written to each slot, including cipher overhead.
    pub block_size: usize,

    /// Quiet period after the last mutation before changes are flushed.
    pub flush_delay: Duration,

    /// zstd compression level for snapshots.
    pub compression_level: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_slots: SlotId::all_retired(),
            block_size: DEFAULT_BLOCK_SIZE,
            flush_delay: DEFAULT_FLUSH_DELAY,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the data slots.
    #[must_use]
    pub fn data_slots(mut self, slots: Vec<SlotId>) -> Self {
        self.data_slots = slots;
        self
    }

    /// Sets the block size.
    #[must_use]
    pub const fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the debounce delay.
    #[must_use]
    pub const fn flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    /// Sets the compression level.
    #[must_use]
    pub const fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Checks that the configuration describes a usable slot layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if:
    /// - No data slots are configured, or a slot is listed twice
    /// - A block cannot hold the cipher overhead plus at least one byte
    /// - The combined payload cannot hold the length trailer
    pub fn validate(&self) -> CoreResult<()> {
        if self.data_slots.is_empty() {
            return Err(CoreError::invalid_config("no data slots configured"));
        }

        let mut seen = HashSet::with_capacity(self.data_slots.len());
        for slot in &self.data_slots {
            if !seen.insert(*slot) {
                return Err(CoreError::invalid_config(format!(
                    "slot {slot} listed more than once"
                )));
            }
        }

        if self.block_size <= BLOCK_OVERHEAD {
            return Err(CoreError::invalid_config(format!(
                "block size {} does not exceed cipher overhead {BLOCK_OVERHEAD}",
                self.block_size
            )));
        }

        let payload = (self.block_size - BLOCK_OVERHEAD) * self.data_slots.len();
        if payload <= TRAILER_SIZE {
            return Err(CoreError::invalid_config(format!(
                "total payload {payload} cannot hold the {TRAILER_SIZE}-byte length trailer"
            )));
        }

        Ok(())
    }

    /// Returns the slot layout this configuration describes.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.data_slots.len(), self.block_size, BLOCK_OVERHEAD)
    }

    /// Returns the label the encryption key is derived from.
    ///
    /// The label names every data slot in order, so a different slot set
    /// yields a different key.
    #[must_use]
    pub fn key_label(&self) -> String {
        self.data_slots
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}
