//! End-to-end engine scenarios.
//!
//! Helpers for looking at a token the way a second process would: reopen
//! it with a fresh engine, or tamper with a stored block first.

use crate::fixtures::{listing, open_engine, Listed};
use slotfs_core::{CoreResult, EngineConfig};
use slotfs_storage::{InMemorySlots, SlotId};
use std::collections::BTreeMap;

/// Lists the tree stored on `token` through a fresh read-only engine.
///
/// # Errors
///
/// Returns the load error of the fresh engine.
pub fn reopen_listing(
    token: &InMemorySlots,
    config: EngineConfig,
) -> CoreResult<BTreeMap<String, Listed>> {
    open_engine(token, config).read(listing)
}

/// Flips the lowest bit of byte `offset` in the block stored in `slot` and
/// returns the untouched block.
///
/// # Panics
///
/// Panics if the slot was never written or `offset` is out of range.
pub fn flip_bit(token: &InMemorySlots, slot: SlotId, offset: usize) -> Vec<u8> {
    let original = token.raw(slot).expect("Slot was never written");
    let mut tampered = original.clone();
    tampered[offset] ^= 0x01;
    token.set_raw(slot, tampered);
    original
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use proptest::prelude::*;
    use slotfs_core::namespace::{MemoryNamespace, Namespace};
    use slotfs_core::partition::Geometry;
    use slotfs_core::{CoreError, StorageEngine};
    use slotfs_storage::{CredentialType, DirectorySlots, SlotGateway, DEFAULT_MANAGEMENT_KEY};
    use std::time::Duration;

    #[test]
    fn three_entry_tree_survives_reopen() {
        let token = InMemorySlots::new();
        let writer = format_engine(&token, test_config());
        writer.mutate(populate).unwrap();
        writer.sync().unwrap();

        assert_eq!(
            reopen_listing(&token, test_config()).unwrap(),
            listing(&sample_tree())
        );

        let reader = open_engine(&token, test_config());
        assert_eq!(
            reader
                .read(|ns| ns.read_bytes("/docs/readme.txt").map(<[u8]>::to_vec))
                .unwrap(),
            Ok(b"slots all the way down".to_vec())
        );

        let written = writer.read(Clone::clone).unwrap();
        let loaded = reader.read(Clone::clone).unwrap();
        assert_eq!(written, loaded);
    }

    #[test]
    fn fresh_engine_reads_hardware_on_first_access() {
        let token = InMemorySlots::new();
        drop(format_engine(&token, test_config()));
        token.reset_counters();

        let engine = open_engine(&token, test_config());
        assert!(engine.is_divergent());
        assert_eq!(token.read_count(), 0);

        engine.read(|_| ()).unwrap();
        assert!(!engine.is_divergent());
        assert_eq!(token.read_count(), u64::from(TEST_SLOTS));

        engine.read(|_| ()).unwrap();
        assert_eq!(token.read_count(), u64::from(TEST_SLOTS));
    }

    #[test]
    fn read_only_until_write_enabled() {
        let token = InMemorySlots::new();
        drop(format_engine(&token, test_config()));
        token.reset_counters();

        let engine = open_engine(&token, test_config());
        assert!(engine.is_read_only());
        assert!(matches!(engine.flush(false), Err(CoreError::PermissionDenied { .. })));
        assert!(matches!(engine.flush(true), Err(CoreError::PermissionDenied { .. })));
        assert_eq!(token.write_count(), 0);

        engine
            .enable_write(&DEFAULT_MANAGEMENT_KEY, CredentialType::Tdes)
            .unwrap();
        assert!(!engine.is_read_only());
        engine.mutate(populate).unwrap();
        engine.flush(false).unwrap();
        assert!(token.write_count() > 0);
    }

    #[test]
    fn wrong_credential_keeps_engine_read_only() {
        let token = InMemorySlots::new();
        drop(format_engine(&token, test_config()));

        let engine = open_engine(&token, test_config());
        let result = engine.enable_write(&[0u8; 24], CredentialType::Tdes);
        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert!(engine.is_read_only());

        let result = engine.enable_write(&DEFAULT_MANAGEMENT_KEY, CredentialType::Aes256);
        assert!(result.is_err());
        assert!(engine.is_read_only());
    }

    #[test]
    fn open_does_not_touch_hardware() {
        let token = InMemorySlots::new();
        let engine = open_engine(&token, test_config());
        assert_eq!(token.read_count(), 0);
        assert_eq!(token.write_count(), 0);
        drop(engine);
        assert_eq!(token.write_count(), 0);
    }

    #[test]
    fn unformatted_token_fails_to_load() {
        let token = InMemorySlots::new();
        let engine = open_engine(&token, test_config());
        assert!(matches!(engine.load(), Err(CoreError::Storage(_))));
        assert!(engine.is_divergent());
    }

    #[test]
    fn only_changed_slots_are_written() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());
        token.reset_counters();

        engine
            .mutate(|ns| ns.write_bytes("/tiny", b"x".to_vec()))
            .unwrap();
        engine.sync().unwrap();

        let slots = test_slots();
        assert_eq!(token.writes_to(slots[1]), 0);
        assert_eq!(token.writes_to(slots[2]), 0);
        assert!(token.write_count() <= 2);
    }

    #[test]
    fn usage_tracks_snapshot_growth() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());
        let empty = engine.usage().unwrap();
        assert_eq!(empty.total_blocks, usize::from(TEST_SLOTS));
        assert_eq!(empty.used_blocks, 1);

        let payload = TEST_BLOCK_SIZE;
        engine
            .mutate(|ns| ns.write_bytes("/noise", noise(payload, 1)))
            .unwrap();
        let grown = engine.usage().unwrap();
        assert!(grown.used_bytes > payload);
        assert!(grown.used_blocks >= 2);
        assert_eq!(
            grown.available_blocks,
            usize::from(TEST_SLOTS) - grown.used_blocks
        );
        assert_eq!(engine.capacity_blocks_used().unwrap(), grown.used_blocks);
        assert_eq!(
            engine.capacity_blocks_available().unwrap(),
            grown.available_blocks
        );
    }

    #[test]
    fn default_capacity_example() {
        let geometry = Geometry::new(4, 2048, 40);
        assert_eq!(geometry.capacity(), 8028);
    }

    #[test]
    fn directory_slots_persist_across_processes() {
        init_tracing();
        let secret = [0x11; 32];
        let (dir, slots) = temp_slots(secret);

        let engine = StorageEngine::format(
            slots,
            MemoryNamespace::default(),
            test_config(),
            &DEFAULT_MANAGEMENT_KEY,
            CredentialType::Tdes,
        )
        .unwrap();
        engine.mutate(populate).unwrap();
        engine.close().unwrap();
        drop(engine);

        let reopened = DirectorySlots::open(dir.path(), secret).unwrap();
        let engine = StorageEngine::<_, MemoryNamespace>::open(
            reopened,
            MemoryNamespace::default(),
            test_config(),
        )
        .unwrap();
        assert_eq!(engine.read(listing).unwrap(), listing(&sample_tree()));
    }

    #[test]
    fn different_token_cannot_decrypt() {
        let token = InMemorySlots::with_secret([1; 32]);
        let engine = format_engine(&token, test_config());
        engine.mutate(populate).unwrap();
        engine.sync().unwrap();

        let other = InMemorySlots::with_secret([2; 32]);
        for slot in test_slots() {
            other.set_raw(slot, token.raw(slot).unwrap());
        }
        assert!(matches!(
            reopen_listing(&other, test_config()),
            Err(CoreError::Authentication { slot }) if slot == test_slots()[0]
        ));
    }

    #[test]
    fn different_slot_set_derives_different_key() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());
        engine.mutate(populate).unwrap();
        engine.sync().unwrap();

        let mut reversed = test_slots();
        reversed.reverse();
        let config = test_config().data_slots(reversed);
        assert!(matches!(
            reopen_listing(&token, config),
            Err(CoreError::Authentication { .. })
        ));
    }

    #[test]
    fn oversized_blocks_are_refused_by_gateway() {
        let token = InMemorySlots::new().with_max_block_size(256);
        let result = StorageEngine::format(
            token.clone(),
            MemoryNamespace::default(),
            test_config(),
            &DEFAULT_MANAGEMENT_KEY,
            CredentialType::Tdes,
        );
        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert_eq!(token.write_count(), 0);
    }

    #[test]
    fn stats_count_hardware_traffic() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());
        let stats = engine.stats();
        assert_eq!(stats.slot_writes, u64::from(TEST_SLOTS));
        assert_eq!(stats.slot_reads, u64::from(TEST_SLOTS));
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.flushes, 1);
        assert_eq!(
            stats.bytes_written,
            (usize::from(TEST_SLOTS) * TEST_BLOCK_SIZE) as u64
        );
    }

    #[test]
    fn default_layout_formats_all_twenty_slots() {
        init_tracing();
        let token = InMemorySlots::new();
        let engine = StorageEngine::format(
            token.clone(),
            MemoryNamespace::default(),
            EngineConfig::default().flush_delay(Duration::from_millis(10)),
            &DEFAULT_MANAGEMENT_KEY,
            CredentialType::Tdes,
        )
        .unwrap();
        assert_eq!(token.write_count(), 20);
        assert_eq!(engine.geometry().block_size(), 2048);

        let gateway = token.session();
        for slot in SlotId::all_retired() {
            assert_eq!(gateway.read(slot).unwrap().len(), 2048);
        }
    }

    #[test]
    fn flip_bit_returns_original_block() {
        let token = InMemorySlots::new();
        drop(format_engine(&token, test_config()));
        let slot = test_slots()[0];
        let before = token.raw(slot).unwrap();

        let original = flip_bit(&token, slot, 0);
        assert_eq!(original, before);
        assert_ne!(token.raw(slot).unwrap(), before);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn accepted_mutations_survive_reopen(ops in tree_ops_strategy(24)) {
            let token = InMemorySlots::new();
            let engine = format_engine(&token, test_config());
            let mut model = MemoryNamespace::default();

            for op in &ops {
                match engine.mutate(|ns| op.apply(ns)) {
                    Ok(()) => op.apply(&mut model).unwrap(),
                    Err(CoreError::Namespace(_) | CoreError::NoSpace { .. }) => {}
                    Err(other) => panic!("unexpected engine error: {other}"),
                }
            }
            engine.sync().unwrap();

            let stored = reopen_listing(&token, test_config()).unwrap();
            prop_assert_eq!(&stored, &listing(&model));
            prop_assert_eq!(stored, engine.read(listing).unwrap());
        }

        #[test]
        fn usage_never_exceeds_capacity(ops in tree_ops_strategy(24)) {
            let token = InMemorySlots::new();
            let engine = format_engine(&token, test_config());
            for op in &ops {
                let _ = engine.mutate(|ns| op.apply(ns));
                let usage = engine.usage().unwrap();
                prop_assert!(usage.used_bytes <= usage.capacity_bytes);
                prop_assert!(usage.used_blocks <= usage.total_blocks);
            }
        }
    }
}
