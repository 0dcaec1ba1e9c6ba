//! Cryptographic operations for SlotFS.
//!
//! Every slot block is encrypted independently with AES-256-GCM.
//!
//! ## Security Model
//!
//! - Authenticated encryption: tampering is detected, never decrypted
//! - Fresh random nonce per block write
//! - The key is derived from the token's one-way hash and never stored
//! - Keys are zeroized on drop
//!
//! ## Usage
//!
//! ```ignore
//! use slotfs_core::crypto::{Cipher, EncryptionKey};
//!
//! let key = EncryptionKey::derive(&gateway, "RETIRED1,RETIRED2")?;
//! let cipher = Cipher::new(&key);
//!
//! let block = cipher.encrypt(b"payload")?;
//! let payload = cipher.decrypt(&block)?;
//! ```

mod cipher;

pub use cipher::*;
