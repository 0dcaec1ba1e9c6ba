//! Failure scenarios: tampered blocks, torn flushes, oversized snapshots.
//!
//! [`format_crashable`] formats an engine over a [`CrashableSlots`] token
//! and hands back the switches that make it fail.

use crate::crash::{CrashControl, CrashableSlots};
use crate::fixtures::init_tracing;
use slotfs_core::namespace::MemoryNamespace;
use slotfs_core::{EngineConfig, StorageEngine};
use slotfs_storage::{CredentialType, InMemorySlots, DEFAULT_MANAGEMENT_KEY};
use std::sync::Arc;

/// Engine over a token that fails on demand.
pub type CrashableEngine = StorageEngine<CrashableSlots<InMemorySlots>>;

/// Formats `token` behind a [`CrashableSlots`] with every switch off.
///
/// # Panics
///
/// Panics if the format fails.
pub fn format_crashable(
    token: &InMemorySlots,
    config: EngineConfig,
) -> (CrashableEngine, Arc<CrashControl>) {
    init_tracing();
    let slots = CrashableSlots::new(token.clone());
    let control = slots.control();
    let engine = StorageEngine::format(
        slots,
        MemoryNamespace::default(),
        config,
        &DEFAULT_MANAGEMENT_KEY,
        CredentialType::Tdes,
    )
    .expect("Failed to format crashable engine");
    (engine, control)
}
