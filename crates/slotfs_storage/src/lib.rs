//! # SlotFS Storage
//!
//! Hardware slot gateway trait and implementations for SlotFS.
//!
//! This crate provides the lowest-level storage abstraction for SlotFS: a
//! small, fixed set of slots on a hardware token, each holding one block.
//! Gateways are **opaque block stores** - they do not interpret the data
//! they store.
//!
//! ## Design Principles
//!
//! - Gateways read and write whole slots, nothing smaller
//! - Writes require an authenticated privileged channel
//! - The token's one-way hash is exposed for key derivation
//! - No retries: failures surface to the caller unmodified
//!
//! ## Available Gateways
//!
//! - [`InMemorySlots`] - For testing; counts reads and writes
//! - [`DirectorySlots`] - One file per slot, for development
//!
//! ## Example
//!
//! ```rust
//! use slotfs_storage::{SlotGateway, InMemorySlots, SlotId, CredentialType, DEFAULT_MANAGEMENT_KEY};
//!
//! let mut slots = InMemorySlots::new();
//! slots.authenticate(&DEFAULT_MANAGEMENT_KEY, CredentialType::Tdes).unwrap();
//! let slot = SlotId::retired(1).unwrap();
//! slots.write(slot, b"hello world").unwrap();
//! assert_eq!(&slots.read(slot).unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod gateway;
mod memory;
mod slot;

pub use directory::DirectorySlots;
pub use error::{StorageError, StorageResult};
pub use gateway::SlotGateway;
pub use memory::{InMemorySlots, DEFAULT_MANAGEMENT_KEY, DEFAULT_MAX_BLOCK_SIZE};
pub use slot::{CredentialType, SlotId};
