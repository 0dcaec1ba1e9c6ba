//! Splitting snapshot blobs into fixed-size slot payloads.
//!
//! A blob is laid out across the slots like this:
//!
//! ```text
//! | blob bytes ... | zero padding ... | len (u32 LE) |
//! |<- slot 0 ->|<- slot 1 ->| ... |<- slot N-1 ->|
//! ```
//!
//! The trailer always sits at the very end of the last slot, so joining the
//! payloads in slot order and reading the final four bytes recovers the
//! original length, whatever the blob size.

use crate::error::{CoreError, CoreResult};
use std::ops::Range;

/// Width of the length trailer in bytes.
pub const TRAILER_SIZE: usize = 4;

/// Slot layout: how many slots, how big each block is, and how much of each
/// block the cipher consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    slots: usize,
    block_size: usize,
    overhead: usize,
}

impl Geometry {
    /// Creates a geometry.
    ///
    /// `block_size` must exceed `overhead`; see
    /// [`EngineConfig::validate`](crate::EngineConfig::validate).
    #[must_use]
    pub const fn new(slots: usize, block_size: usize, overhead: usize) -> Self {
        Self {
            slots,
            block_size,
            overhead,
        }
    }

    /// Number of slots.
    #[must_use]
    pub const fn slots(&self) -> usize {
        self.slots
    }

    /// Size of an encrypted block.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Per-block cipher overhead.
    #[must_use]
    pub const fn overhead(&self) -> usize {
        self.overhead
    }

    /// Plaintext bytes one block carries.
    #[must_use]
    pub const fn payload_size(&self) -> usize {
        self.block_size.saturating_sub(self.overhead)
    }

    /// Largest blob, in bytes, that fits across all slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        (self.slots * self.payload_size()).saturating_sub(TRAILER_SIZE)
    }

    /// Length of an in-memory store buffer (`slots * block_size`).
    #[must_use]
    pub const fn store_len(&self) -> usize {
        self.slots * self.block_size
    }

    /// Rejects blobs longer than [`capacity`](Self::capacity).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSpace`] if `len` exceeds the capacity.
    pub fn check_fits(&self, len: usize) -> CoreResult<()> {
        if len > self.capacity() {
            return Err(CoreError::no_space(len, self.capacity()));
        }
        Ok(())
    }

    /// Number of blocks a blob of `len` bytes occupies, trailer included.
    #[must_use]
    pub const fn blocks_used(&self, len: usize) -> usize {
        (len + TRAILER_SIZE).div_ceil(self.payload_size())
    }

    /// Byte range of slot `index`'s payload inside a store buffer.
    ///
    /// The remaining `overhead` bytes of each slot region stay zero.
    #[must_use]
    pub const fn payload_range(&self, index: usize) -> Range<usize> {
        let start = index * self.block_size;
        start..start + self.payload_size()
    }

    /// Builds a zero-padded store buffer from per-slot payloads.
    ///
    /// # Panics
    ///
    /// Panics if a payload is longer than [`payload_size`](Self::payload_size)
    /// or more than [`slots`](Self::slots) payloads are given.
    #[must_use]
    pub fn assemble<B: AsRef<[u8]>>(&self, payloads: &[B]) -> Vec<u8> {
        assert!(payloads.len() <= self.slots, "more payloads than slots");
        let mut store = vec![0u8; self.store_len()];
        for (index, payload) in payloads.iter().enumerate() {
            let payload = payload.as_ref();
            let range = self.payload_range(index);
            assert!(payload.len() <= range.len(), "payload larger than slot");
            store[range.start..range.start + payload.len()].copy_from_slice(payload);
        }
        store
    }

    /// Returns slot `index`'s payload within a store buffer.
    #[must_use]
    pub fn payload<'a>(&self, store: &'a [u8], index: usize) -> &'a [u8] {
        &store[self.payload_range(index)]
    }
}

/// Splits `blob` into exactly `slots` payloads of `payload_size` bytes.
///
/// The blob is zero-padded to `slots * payload_size - TRAILER_SIZE` bytes and
/// followed by its true length as a little-endian `u32`.
///
/// # Panics
///
/// Panics if the blob does not fit. Callers enforce capacity first with
/// [`Geometry::check_fits`].
#[must_use]
pub fn to_blocks(blob: &[u8], slots: usize, payload_size: usize) -> Vec<Vec<u8>> {
    let total = slots * payload_size;
    assert!(
        blob.len() + TRAILER_SIZE <= total,
        "blob of {} bytes exceeds partition capacity",
        blob.len()
    );
    let len = u32::try_from(blob.len()).unwrap_or(u32::MAX);

    let mut padded = Vec::with_capacity(total);
    padded.extend_from_slice(blob);
    padded.resize(total - TRAILER_SIZE, 0);
    padded.extend_from_slice(&len.to_le_bytes());

    padded
        .chunks(payload_size)
        .map(<[u8]>::to_vec)
        .collect()
}

/// Joins payloads in slot order and trims them to the trailer length.
///
/// # Errors
///
/// Returns [`CoreError::CorruptedStore`] if the payloads are too short to
/// hold a trailer or the trailer claims more bytes than are present.
pub fn from_blocks<B: AsRef<[u8]>>(blocks: &[B]) -> CoreResult<Vec<u8>> {
    let mut joined = Vec::with_capacity(blocks.iter().map(|b| b.as_ref().len()).sum());
    for block in blocks {
        joined.extend_from_slice(block.as_ref());
    }

    if joined.len() < TRAILER_SIZE {
        return Err(CoreError::corrupted_store(format!(
            "{} bytes cannot hold a length trailer",
            joined.len()
        )));
    }

    let body = joined.len() - TRAILER_SIZE;
    let mut trailer = [0u8; TRAILER_SIZE];
    trailer.copy_from_slice(&joined[body..]);
    let len = u32::from_le_bytes(trailer) as usize;

    if len > body {
        return Err(CoreError::corrupted_store(format!(
            "trailer claims {len} bytes but only {body} are available"
        )));
    }

    joined.truncate(len);
    Ok(joined)
}
