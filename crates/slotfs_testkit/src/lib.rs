//! # SlotFS Testkit
//!
//! Test utilities for SlotFS.
//!
//! This crate provides:
//! - Fixtures: a small slot layout, engine builders, tree listings
//! - Fault injection: a gateway that fails writes or reads on demand
//! - Property-based generators for namespace mutations
//! - End-to-end scenarios: reopen, recovery after failures, concurrency
//!
//! ## Usage
//!
//! ```rust,ignore
//! use slotfs_testkit::prelude::*;
//!
//! #[test]
//! fn roundtrip() {
//!     let token = InMemorySlots::new();
//!     let engine = format_engine(&token, test_config());
//!     engine.mutate(populate).unwrap();
//!     engine.sync().unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod recovery;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::recovery::*;
    pub use crate::stress::*;
    pub use slotfs_storage::InMemorySlots;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use recovery::*;
pub use stress::*;
