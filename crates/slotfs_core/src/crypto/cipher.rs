//! Block encryption using AES-256-GCM.

use crate::error::{CoreError, CoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use slotfs_storage::SlotGateway;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// Bytes every encrypted block spends on the nonce and tag.
pub const BLOCK_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// A ciphertext failed authentication.
///
/// Deliberately carries no detail: tampering, corruption, truncation and a
/// wrong key are indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ciphertext failed authentication")]
pub struct AuthenticationError;

/// Encryption key for AES-256-GCM.
///
/// The key is automatically zeroized when dropped and never persisted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::key_derivation(format!(
                "invalid key size: expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives the key by hashing `label` on the hardware token.
    ///
    /// The hash output is truncated to [`KEY_SIZE`] bytes. The key therefore
    /// only exists while the token that produced it is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway's hash fails or yields fewer than
    /// [`KEY_SIZE`] bytes.
    pub fn derive<G: SlotGateway + ?Sized>(gateway: &G, label: &str) -> CoreResult<Self> {
        let mut digest = gateway.hash(label.as_bytes())?;
        if digest.len() < KEY_SIZE {
            let len = digest.len();
            digest.zeroize();
            return Err(CoreError::key_derivation(format!(
                "hash output of {len} bytes is shorter than the {KEY_SIZE}-byte key"
            )));
        }

        let key = Self::from_bytes(&digest[..KEY_SIZE]);
        digest.zeroize();
        key
    }

    /// Returns the key as a byte slice.
    ///
    /// # Security
    ///
    /// Be careful with this method - don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Authenticated encryption of single block payloads.
pub struct Cipher {
    cipher: Aes256Gcm,
}

impl Cipher {
    /// Creates a cipher with the given key.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        let key_array = GenericArray::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key_array),
        }
    }

    /// Encrypts a payload under a fresh random nonce.
    ///
    /// The output format is: `nonce (12 bytes) || ciphertext || tag (16 bytes)`,
    /// i.e. exactly [`BLOCK_OVERHEAD`] bytes longer than the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the AEAD implementation rejects the input.
    pub fn encrypt(&self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CoreError::encryption_failed("AES-GCM encryption error"))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);
        Ok(result)
    }

    /// Decrypts data produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError`] on any tampering, corruption,
    /// truncation, or wrong key. No partial plaintext is ever returned.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, AuthenticationError> {
        if ciphertext.len() < BLOCK_OVERHEAD {
            return Err(AuthenticationError);
        }

        let nonce = Nonce::from_slice(&ciphertext[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &ciphertext[NONCE_SIZE..])
            .map_err(|_| AuthenticationError)
    }

    /// Round-trips a small payload to confirm the cipher is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SelfCheckFailed`] if the round trip fails.
    pub fn self_check(&self) -> CoreResult<()> {
        let plaintext = b"123456";
        let ciphertext = self.encrypt(plaintext)?;
        match self.decrypt(&ciphertext) {
            Ok(decrypted) if decrypted == plaintext => Ok(()),
            _ => Err(CoreError::SelfCheckFailed { check: "crypto" }),
        }
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("cipher", &"Aes256Gcm").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slotfs_storage::InMemorySlots;

    fn cipher() -> Cipher {
        Cipher::new(&EncryptionKey::from_bytes(&[0x42; KEY_SIZE]).unwrap())
    }

    #[test]
    fn key_from_bytes() {
        let bytes = [42u8; KEY_SIZE];
        let key = EncryptionKey::from_bytes(&bytes).unwrap();
        assert_eq!(key.as_bytes(), &bytes);
    }

    #[test]
    fn key_wrong_size() {
        assert!(EncryptionKey::from_bytes(&[0u8; 16]).is_err());
        assert!(EncryptionKey::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn key_debug_is_redacted() {
        let key = EncryptionKey::from_bytes(&[7u8; KEY_SIZE]).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains('7'));
    }

    #[test]
    fn derive_is_stable_per_token_and_label() {
        let token = InMemorySlots::with_secret([1; 32]);
        let a = EncryptionKey::derive(&token, "RETIRED1,RETIRED2").unwrap();
        let b = EncryptionKey::derive(&token.session(), "RETIRED1,RETIRED2").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let other_label = EncryptionKey::derive(&token, "RETIRED1").unwrap();
        assert_ne!(a.as_bytes(), other_label.as_bytes());

        let other_token = InMemorySlots::with_secret([2; 32]);
        let c = EncryptionKey::derive(&other_token, "RETIRED1,RETIRED2").unwrap();
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = cipher();
        let plaintext = b"Hello, slots!";
        let ciphertext = cipher.encrypt(plaintext).unwrap();

        assert_eq!(ciphertext.len(), plaintext.len() + BLOCK_OVERHEAD);
        assert_ne!(&ciphertext[NONCE_SIZE..NONCE_SIZE + plaintext.len()], plaintext);
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn encrypt_produces_different_ciphertext() {
        let cipher = cipher();
        let ct1 = cipher.encrypt(b"same data").unwrap();
        let ct2 = cipher.encrypt(b"same data").unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn decrypt_wrong_key_fails() {
        let other = Cipher::new(&EncryptionKey::from_bytes(&[0x43; KEY_SIZE]).unwrap());
        let ciphertext = cipher().encrypt(b"secret").unwrap();
        assert_eq!(other.decrypt(&ciphertext), Err(AuthenticationError));
    }

    #[test]
    fn decrypt_too_short_fails() {
        assert_eq!(cipher().decrypt(&[0u8; 10]), Err(AuthenticationError));
    }

    #[test]
    fn self_check_passes() {
        assert!(cipher().self_check().is_ok());
    }

    #[test]
    fn every_bit_flip_is_detected() {
        let cipher = cipher();
        let ciphertext = cipher.encrypt(&[0xAB; 64]).unwrap();
        for bit in 0..ciphertext.len() * 8 {
            let mut tampered = ciphertext.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            assert_eq!(cipher.decrypt(&tampered), Err(AuthenticationError), "bit {bit}");
        }
    }

    proptest! {
        #[test]
        fn prop_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
            let cipher = cipher();
            let ciphertext = cipher.encrypt(&payload).unwrap();
            prop_assert_eq!(cipher.decrypt(&ciphertext).unwrap(), payload);
        }

        #[test]
        fn prop_single_bit_flip_rejected(
            payload in prop::collection::vec(any::<u8>(), 1..256),
            bit in any::<prop::sample::Index>(),
        ) {
            let cipher = cipher();
            let mut ciphertext = cipher.encrypt(&payload).unwrap();
            let bit = bit.index(ciphertext.len() * 8);
            ciphertext[bit / 8] ^= 1 << (bit % 8);
            prop_assert_eq!(cipher.decrypt(&ciphertext), Err(AuthenticationError));
        }
    }
}
