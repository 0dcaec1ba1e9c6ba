//! # SlotFS Core
//!
//! Storage engine for a filesystem whose only persistent medium is a small,
//! fixed set of hardware slots.
//!
//! This crate provides:
//! - [`namespace`]: the in-memory file tree and its capability trait
//! - [`crypto`]: per-block AES-256-GCM with a token-derived key
//! - [`partition`]: splitting one snapshot blob into exactly N slot payloads
//! - [`StorageEngine`]: the dual-buffer engine with debounced flushing
//!
//! A snapshot is stored as
//! `encrypt(partition(compress(serialize(namespace))))`, one block per slot.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crypto;
mod engine;
mod error;
pub mod namespace;
pub mod partition;
mod selfcheck;
mod stats;

pub use config::{EngineConfig, DEFAULT_BLOCK_SIZE, DEFAULT_FLUSH_DELAY};
pub use engine::{StorageEngine, Usage};
pub use error::{CoreError, CoreResult, NamespaceError, NamespaceResult};
pub use stats::{EngineStats, StatsSnapshot};
