//! Hardware slot gateway trait definition.

use crate::error::StorageResult;
use crate::slot::{CredentialType, SlotId};

/// Access to the fixed set of storage slots on a hardware token.
///
/// Gateways are **opaque block stores**. They read and write whole slots and
/// expose the token's one-way hash. They do not know about snapshots,
/// encryption, or partitioning - the engine owns all interpretation.
///
/// # Invariants
///
/// - `read` returns exactly the bytes last passed to `write` for that slot
/// - `write` fails with [`StorageError::PermissionDenied`] until
///   `authenticate` has succeeded
/// - `hash` is deterministic for a given token
/// - Gateways never retry internally on behalf of the engine
///
/// # Implementors
///
/// - [`super::InMemorySlots`] - For testing
/// - [`super::DirectorySlots`] - Slots backed by files, for development
///
/// [`StorageError::PermissionDenied`]: crate::StorageError::PermissionDenied
pub trait SlotGateway: Send {
    /// Reads the full contents of `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The slot has never been written
    /// - The slot is not known to the gateway
    /// - The device fails
    fn read(&self, slot: SlotId) -> StorageResult<Vec<u8>>;

    /// Replaces the contents of `slot` with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The privileged channel is not authenticated
    /// - `data` does not fit the slot
    /// - The device fails
    fn write(&mut self, slot: SlotId, data: &[u8]) -> StorageResult<()>;

    /// Passes `data` through the token's one-way hash primitive.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails.
    fn hash(&self, data: &[u8]) -> StorageResult<Vec<u8>>;

    /// Authenticates the privileged write channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is rejected.
    fn authenticate(
        &mut self,
        credential: &[u8],
        credential_type: CredentialType,
    ) -> StorageResult<()>;
}

impl<G: SlotGateway + ?Sized> SlotGateway for Box<G> {
    fn read(&self, slot: SlotId) -> StorageResult<Vec<u8>> {
        (**self).read(slot)
    }

    fn write(&mut self, slot: SlotId, data: &[u8]) -> StorageResult<()> {
        (**self).write(slot, data)
    }

    fn hash(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        (**self).hash(data)
    }

    fn authenticate(
        &mut self,
        credential: &[u8],
        credential_type: CredentialType,
    ) -> StorageResult<()> {
        (**self).authenticate(credential, credential_type)
    }
}
