//! Engine state guarded by the engine lock.

use crate::crypto::Cipher;
use crate::error::{CoreError, CoreResult};
use crate::namespace::Namespace;
use crate::partition::{self, Geometry};
use crate::stats::EngineStats;
use slotfs_codec::SnapshotCodec;
use slotfs_storage::{CredentialType, SlotGateway, SlotId};

/// Everything the engine mutates, owned by one engine behind one mutex.
///
/// `permanent` mirrors the last blocks read back from hardware and
/// `ephemeral` the last recorded snapshot. Both are `slots * block_size`
/// bytes with each slot's payload at the start of its region.
pub(crate) struct EngineState<G, N> {
    pub(crate) gateway: G,
    pub(crate) namespace: N,
    cipher: Cipher,
    codec: SnapshotCodec,
    geometry: Geometry,
    slots: Vec<SlotId>,
    permanent: Vec<u8>,
    ephemeral: Vec<u8>,
    recorded_len: usize,
    has_snapshot: bool,
    pub(crate) divergent: bool,
    pub(crate) read_only: bool,
    pub(crate) closed: bool,
    /// Generation of the pending debounced flush, if one is armed.
    pub(crate) armed: Option<u64>,
}

impl<G: SlotGateway, N: Namespace> EngineState<G, N> {
    pub(crate) fn new(
        gateway: G,
        namespace: N,
        cipher: Cipher,
        codec: SnapshotCodec,
        geometry: Geometry,
        slots: Vec<SlotId>,
    ) -> Self {
        Self {
            gateway,
            namespace,
            cipher,
            codec,
            geometry,
            slots,
            permanent: vec![0; geometry.store_len()],
            ephemeral: vec![0; geometry.store_len()],
            recorded_len: 0,
            has_snapshot: false,
            divergent: true,
            read_only: true,
            closed: false,
            armed: None,
        }
    }

    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::EngineClosed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_writable(&self) -> CoreResult<()> {
        if self.read_only {
            Err(CoreError::permission_denied(
                "engine is read-only; enable write first",
            ))
        } else {
            Ok(())
        }
    }

    /// Length of the last recorded or loaded snapshot blob.
    pub(crate) const fn recorded_len(&self) -> usize {
        self.recorded_len
    }

    pub(crate) fn enable_write(
        &mut self,
        credential: &[u8],
        credential_type: CredentialType,
    ) -> CoreResult<()> {
        self.gateway.authenticate(credential, credential_type)?;
        self.read_only = false;
        tracing::info!(%credential_type, "write access enabled");
        Ok(())
    }

    /// Re-reads every slot if the in-memory copy may be stale.
    ///
    /// Nothing is installed until every block decrypts and the joined blob
    /// decodes, so a failure leaves namespace and stores untouched.
    pub(crate) fn load(&mut self, stats: &EngineStats) -> CoreResult<()> {
        if !self.divergent {
            return Ok(());
        }

        let payload_size = self.geometry.payload_size();
        let mut payloads = Vec::with_capacity(self.slots.len());
        for &slot in &self.slots {
            let block = self.gateway.read(slot)?;
            stats.record_slot_read(block.len() as u64);

            let payload = self
                .cipher
                .decrypt(&block)
                .map_err(|_| CoreError::Authentication { slot })?;
            if payload.len() != payload_size {
                return Err(CoreError::corrupted_store(format!(
                    "slot {slot} holds {} payload bytes, expected {payload_size}",
                    payload.len()
                )));
            }
            payloads.push(payload);
        }

        let blob = partition::from_blocks(&payloads)?;
        let namespace: N = self.codec.decode(&blob)?;
        let store = self.geometry.assemble(&payloads);

        self.namespace = namespace;
        self.permanent.clone_from(&store);
        self.ephemeral = store;
        self.recorded_len = blob.len();
        self.has_snapshot = true;
        self.divergent = false;
        stats.record_load();
        tracing::debug!(blob_len = blob.len(), "namespace loaded from slots");
        Ok(())
    }

    /// Encodes the namespace into the ephemeral store. No hardware access.
    pub(crate) fn record(&mut self, stats: &EngineStats) -> CoreResult<()> {
        let blob = self.codec.encode(&self.namespace)?;
        if let Err(e) = self.geometry.check_fits(blob.len()) {
            stats.record_no_space();
            tracing::warn!(
                blob_len = blob.len(),
                capacity = self.geometry.capacity(),
                "snapshot does not fit"
            );
            return Err(e);
        }

        let blocks =
            partition::to_blocks(&blob, self.geometry.slots(), self.geometry.payload_size());
        self.ephemeral = self.geometry.assemble(&blocks);
        self.recorded_len = blob.len();
        self.has_snapshot = true;
        stats.record_record();
        tracing::trace!(blob_len = blob.len(), "snapshot recorded");
        Ok(())
    }

    /// Writes changed slots, then reloads.
    ///
    /// A write error wins over a reload error. Nothing is retried.
    pub(crate) fn flush(&mut self, force: bool, stats: &EngineStats) -> CoreResult<()> {
        self.ensure_writable()?;
        stats.record_flush();

        // Without a snapshot the ephemeral store is all zeros; writing it
        // would wipe the slots.
        let written = if self.has_snapshot {
            self.write_blocks(force, stats)
        } else {
            Ok(0)
        };
        let reloaded = self.load(stats);

        match (written, reloaded) {
            (Err(error), reloaded) => {
                if let Err(reload_error) = reloaded {
                    tracing::warn!(%reload_error, "reload after failed flush also failed");
                }
                Err(error)
            }
            (Ok(count), reloaded) => {
                reloaded?;
                tracing::debug!(slots_written = count, "flush complete");
                Ok(())
            }
        }
    }

    fn write_blocks(&mut self, force: bool, stats: &EngineStats) -> CoreResult<usize> {
        let mut written = 0;
        for (index, &slot) in self.slots.iter().enumerate() {
            let range = self.geometry.payload_range(index);
            if !force && self.ephemeral[range.clone()] == self.permanent[range.clone()] {
                continue;
            }

            let block = self.cipher.encrypt(&self.ephemeral[range])?;
            self.divergent = true;
            self.gateway.write(slot, &block)?;
            stats.record_slot_write(block.len() as u64);
            written += 1;
        }
        Ok(written)
    }
}
