//! Directory-backed slot gateway for development without a token.

use crate::error::{StorageError, StorageResult};
use crate::gateway::SlotGateway;
use crate::memory::{DEFAULT_MANAGEMENT_KEY, DEFAULT_MAX_BLOCK_SIZE};
use crate::slot::{CredentialType, SlotId};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// A slot gateway that keeps each slot in its own file.
///
/// Layout inside the directory:
/// ```text
/// slot-82.bin   - contents of RETIRED1
/// slot-83.bin   - contents of RETIRED2
/// ...
/// ```
///
/// # Durability
///
/// Each `write` goes to a temporary file which is synced and then renamed
/// over the slot file, so a slot is either fully old or fully new.
///
/// # Example
///
/// ```no_run
/// use slotfs_storage::{DirectorySlots, SlotGateway, SlotId};
/// use std::path::Path;
///
/// let slots = DirectorySlots::open(Path::new("token"), [7u8; 32]).unwrap();
/// let data = slots.read(SlotId::retired(1).unwrap());
/// ```
#[derive(Debug)]
pub struct DirectorySlots {
    root: PathBuf,
    secret: [u8; 32],
    management_key: Vec<u8>,
    management_key_type: CredentialType,
    max_block_size: usize,
    authenticated: bool,
}

impl DirectorySlots {
    /// Opens or creates a slot directory.
    ///
    /// `secret` keys the hash primitive and stands in for the token's
    /// internal device key.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(path: &Path, secret: [u8; 32]) -> StorageResult<Self> {
        fs::create_dir_all(path)?;
        Ok(Self {
            root: path.to_path_buf(),
            secret,
            management_key: DEFAULT_MANAGEMENT_KEY.to_vec(),
            management_key_type: CredentialType::Tdes,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            authenticated: false,
        })
    }

    /// Replaces the management key the directory accepts.
    #[must_use]
    pub fn with_management_key(mut self, key: &[u8], key_type: CredentialType) -> Self {
        self.management_key = key.to_vec();
        self.management_key_type = key_type;
        self
    }

    /// Returns the directory holding the slot files.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, slot: SlotId) -> PathBuf {
        self.root.join(format!("slot-{:02x}.bin", slot.as_u8()))
    }
}

impl SlotGateway for DirectorySlots {
    fn read(&self, slot: SlotId) -> StorageResult<Vec<u8>> {
        match fs::read(self.slot_path(slot)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::SlotEmpty(slot)),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, slot: SlotId, data: &[u8]) -> StorageResult<()> {
        if !self.authenticated {
            return Err(StorageError::permission_denied(format!(
                "unauthenticated write to slot {slot}"
            )));
        }
        if data.len() > self.max_block_size {
            return Err(StorageError::InvalidBlockSize {
                slot,
                max: self.max_block_size,
                actual: data.len(),
            });
        }

        let target = self.slot_path(slot);
        let staging = target.with_extension("tmp");
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &target)?;
        tracing::trace!(%slot, len = data.len(), "slot file replaced");
        Ok(())
    }

    fn hash(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        let mut hasher = Sha256::new();
        hasher.update(self.secret);
        hasher.update(data);
        Ok(hasher.finalize().to_vec())
    }

    fn authenticate(
        &mut self,
        credential: &[u8],
        credential_type: CredentialType,
    ) -> StorageResult<()> {
        if !self
            .management_key_type
            .accepts(&self.management_key, credential, credential_type)
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
