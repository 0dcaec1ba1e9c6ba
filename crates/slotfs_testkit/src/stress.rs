//! Concurrency and debounced flushing.

use slotfs_core::namespace::Namespace;
use slotfs_core::{CoreResult, StorageEngine};
use slotfs_storage::SlotGateway;
use std::thread;

/// Runs `threads` writers at once, each creating `per_thread` two-byte
/// files named `/t{thread}-{i}` holding `[thread, i]`.
///
/// # Errors
///
/// Returns the first mutation error any writer hit.
///
/// # Panics
///
/// Panics if a writer thread panics.
pub fn concurrent_writes<G>(
    engine: &StorageEngine<G>,
    threads: u8,
    per_thread: u8,
) -> CoreResult<()>
where
    G: SlotGateway + 'static,
{
    thread::scope(|scope| {
        let writers: Vec<_> = (0..threads)
            .map(|t| {
                scope.spawn(move || -> CoreResult<()> {
                    for i in 0..per_thread {
                        engine.mutate(|ns| ns.write_bytes(&format!("/t{t}-{i}"), vec![t, i]))?;
                    }
                    Ok(())
                })
            })
            .collect();
        writers
            .into_iter()
            .map(|writer| writer.join().expect("Writer thread panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::reopen_listing;
    use crate::prelude::*;
    use slotfs_core::CoreError;
    use std::time::Duration;

    const BURST_FLUSH_DELAY: Duration = Duration::from_millis(200);
    const PATIENCE: Duration = Duration::from_secs(5);

    #[test]
    fn burst_of_mutations_is_flushed_once() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config().flush_delay(BURST_FLUSH_DELAY));
        token.reset_counters();
        let flushes = engine.stats().flushes;

        for i in 0..10 {
            engine
                .mutate(|ns| ns.write_bytes(&format!("/f{i}"), vec![i; 4]))
                .unwrap();
        }
        assert_eq!(engine.stats().flushes, flushes);
        assert_eq!(token.write_count(), 0);

        assert!(wait_until(PATIENCE, || engine.stats().flushes == flushes + 1));
        thread::sleep(BURST_FLUSH_DELAY * 2);
        assert_eq!(engine.stats().flushes, flushes + 1);

        // Ten tiny files stay well inside the first two slots.
        assert_eq!(token.writes_to(test_slots()[2]), 0);

        assert_eq!(reopen_listing(&token, test_config()).unwrap().len(), 10);
    }

    #[test]
    fn sync_cancels_pending_flush() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());
        let flushes = engine.stats().flushes;

        engine.mutate(populate).unwrap();
        engine.sync().unwrap();
        assert_eq!(engine.stats().flushes, flushes + 1);

        thread::sleep(TEST_FLUSH_DELAY * 4);
        assert_eq!(engine.stats().flushes, flushes + 1);
    }

    #[test]
    fn schedule_flush_persists_recorded_state() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());
        token.reset_counters();

        engine.schedule_flush().unwrap();
        assert!(wait_until(PATIENCE, || engine.stats().flushes == 2));
        // Nothing changed since format.
        assert_eq!(token.write_count(), 0);
    }

    #[test]
    fn drop_flushes_pending_mutation() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config().flush_delay(Duration::from_secs(60)));
        engine.mutate(populate).unwrap();
        drop(engine);

        assert_eq!(
            reopen_listing(&token, test_config()).unwrap(),
            listing(&sample_tree())
        );
    }

    #[test]
    fn closed_engine_refuses_operations() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());
        engine.close().unwrap();

        assert!(matches!(engine.mutate(populate), Err(CoreError::EngineClosed)));
        assert!(matches!(engine.read(|_| ()), Err(CoreError::EngineClosed)));
        assert!(matches!(engine.sync(), Err(CoreError::EngineClosed)));
        assert!(matches!(
            concurrent_writes(&engine, 2, 1),
            Err(CoreError::EngineClosed)
        ));
        assert!(engine.close().is_ok());
    }

    #[test]
    fn concurrent_mutations_are_serialized() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config());

        concurrent_writes(&engine, 4, 5).unwrap();
        engine.sync().unwrap();

        let listed = reopen_listing(&token, test_config()).unwrap();
        assert_eq!(listed.len(), 20);
        assert_eq!(listed["/t3-4"], Listed::File(vec![3, 4]));
    }

    #[test]
    fn reads_during_pending_flush_see_mutation() {
        let token = InMemorySlots::new();
        let engine = format_engine(&token, test_config().flush_delay(Duration::from_secs(60)));
        engine
            .mutate(|ns| ns.write_bytes("/pending", b"not yet flushed".to_vec()))
            .unwrap();

        let data = engine
            .read(|ns| ns.read_bytes("/pending").map(<[u8]>::to_vec))
            .unwrap();
        assert_eq!(data, Ok(b"not yet flushed".to_vec()));

        let other = open_engine(&token, test_config());
        assert!(other.read(|ns| ns.stat("/pending").is_err()).unwrap());
    }
}
