//! In-memory slot gateway for testing.

use crate::error::{StorageError, StorageResult};
use crate::gateway::SlotGateway;
use crate::slot::{CredentialType, SlotId};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory default management key of a PIV token.
pub const DEFAULT_MANAGEMENT_KEY: [u8; 24] = [
    1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8,
];

/// Largest data object a slot holds by default.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 3052;

/// Slot contents and counters shared by every handle onto one token.
#[derive(Debug)]
struct Token {
    slots: HashMap<SlotId, Vec<u8>>,
    secret: [u8; 32],
    management_key: Vec<u8>,
    management_key_type: CredentialType,
    max_block_size: usize,
    reads: u64,
    writes: u64,
    writes_per_slot: HashMap<SlotId, u64>,
}

/// An in-memory slot gateway.
///
/// This gateway simulates a hardware token and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Counting hardware traffic
///
/// # Sharing
///
/// Cloning an `InMemorySlots` yields another handle onto the **same** token:
/// slot contents and counters are shared. The authenticated state belongs to
/// the handle, so [`session`](Self::session) gives an unauthenticated view of
/// the same slots, like a second process opening the same device.
///
/// # Example
///
/// ```rust
/// use slotfs_storage::{InMemorySlots, SlotGateway, SlotId, CredentialType, DEFAULT_MANAGEMENT_KEY};
///
/// let mut slots = InMemorySlots::new();
/// let slot = SlotId::retired(1).unwrap();
/// slots.authenticate(&DEFAULT_MANAGEMENT_KEY, CredentialType::Tdes).unwrap();
/// slots.write(slot, b"block").unwrap();
/// assert_eq!(slots.read(slot).unwrap(), b"block");
/// assert_eq!(slots.write_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct InMemorySlots {
    token: Arc<RwLock<Token>>,
    authenticated: bool,
}

impl Default for InMemorySlots {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySlots {
    /// Creates an empty token with the factory default management key.
    #[must_use]
    pub fn new() -> Self {
        Self::with_secret([0x5a; 32])
    }

    /// Creates an empty token whose hash primitive is keyed by `secret`.
    ///
    /// Two tokens with different secrets derive different encryption keys
    /// for the same slot set.
    #[must_use]
    pub fn with_secret(secret: [u8; 32]) -> Self {
        Self {
            token: Arc::new(RwLock::new(Token {
                slots: HashMap::new(),
                secret,
                management_key: DEFAULT_MANAGEMENT_KEY.to_vec(),
                management_key_type: CredentialType::Tdes,
                max_block_size: DEFAULT_MAX_BLOCK_SIZE,
                reads: 0,
                writes: 0,
                writes_per_slot: HashMap::new(),
            })),
            authenticated: false,
        }
    }

    /// Replaces the management key the token accepts.
    #[must_use]
    pub fn with_management_key(self, key: &[u8], key_type: CredentialType) -> Self {
        {
            let mut token = self.token.write();
            token.management_key = key.to_vec();
            token.management_key_type = key_type;
        }
        self
    }

    /// Sets the largest block a slot accepts.
    #[must_use]
    pub fn with_max_block_size(self, max: usize) -> Self {
        self.token.write().max_block_size = max;
        self
    }

    /// Returns a new unauthenticated handle onto the same token.
    #[must_use]
    pub fn session(&self) -> Self {
        Self {
            token: Arc::clone(&self.token),
            authenticated: false,
        }
    }

    /// Returns `true` if this handle has authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns a copy of the raw bytes stored in `slot`.
    ///
    /// Useful for tampering with stored blocks in tests.
    #[must_use]
    pub fn raw(&self, slot: SlotId) -> Option<Vec<u8>> {
        self.token.read().slots.get(&slot).cloned()
    }

    /// Overwrites the raw bytes of `slot` without authentication or counting.
    pub fn set_raw(&self, slot: SlotId, data: Vec<u8>) {
        self.token.write().slots.insert(slot, data);
    }

    /// Total number of successful writes across all slots.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.token.read().writes
    }

    /// Number of successful writes to `slot`.
    #[must_use]
    pub fn writes_to(&self, slot: SlotId) -> u64 {
        self.token
            .read()
            .writes_per_slot
            .get(&slot)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of successful reads across all slots.
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.token.read().reads
    }

    /// Resets the read and write counters.
    pub fn reset_counters(&self) {
        let mut token = self.token.write();
        token.reads = 0;
        token.writes = 0;
        token.writes_per_slot.clear();
    }
}

impl SlotGateway for InMemorySlots {
    fn read(&self, slot: SlotId) -> StorageResult<Vec<u8>> {
        let mut token = self.token.write();
        let data = token
            .slots
            .get(&slot)
            .cloned()
            .ok_or(StorageError::SlotEmpty(slot))?;
        token.reads += 1;
        Ok(data)
    }

    fn write(&mut self, slot: SlotId, data: &[u8]) -> StorageResult<()> {
        if !self.authenticated {
            return Err(StorageError::permission_denied(format!(
                "unauthenticated write to slot {slot}"
            )));
        }

        let mut token = self.token.write();
        if data.len() > token.max_block_size {
            return Err(StorageError::InvalidBlockSize {
                slot,
                max: token.max_block_size,
                actual: data.len(),
            });
        }

        token.slots.insert(slot, data.to_vec());
        token.writes += 1;
        *token.writes_per_slot.entry(slot).or_insert(0) += 1;
        Ok(())
    }

    fn hash(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        let token = self.token.read();
        let mut hasher = Sha256::new();
        hasher.update(token.secret);
        hasher.update(data);
        Ok(hasher.finalize().to_vec())
    }

    fn authenticate(
        &mut self,
        credential: &[u8],
        credential_type: CredentialType,
    ) -> StorageResult<()> {
        let token = self.token.read();
        if !token
            .management_key_type
            .accepts(&token.management_key, credential, credential_type)
        {
            self.authenticated = false;
            return Err(StorageError::authentication_failed(format!(
                "{credential_type} management key rejected"
            )));
        }
        self.authenticated = true;
        Ok(())
    }
}
