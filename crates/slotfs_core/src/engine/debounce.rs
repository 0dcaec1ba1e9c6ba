//! Cancellable delayed flush.
//!
//! A single background thread sleeps until the current deadline passes and
//! then fires the callback with the generation that armed it. Re-arming
//! pushes the deadline out and bumps the generation, so a burst of arms
//! produces one fire. The callback decides whether its generation is still
//! current; the timer itself never touches engine state.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Schedule {
    generation: u64,
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    schedule: Mutex<Schedule>,
    wake: Condvar,
}

/// Debounce timer driving delayed flushes.
#[derive(Debug)]
pub(crate) struct Debouncer {
    delay: Duration,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Creates a stopped timer with the given quiet period.
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            shared: Arc::new(Shared::default()),
            worker: Mutex::new(None),
        }
    }

    /// Starts the worker thread.
    ///
    /// `on_fire` runs on the worker, without the schedule lock held.
    pub(crate) fn start<F>(&self, on_fire: F) -> io::Result<()>
    where
        F: Fn(u64) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("slotfs-flush".into())
            .spawn(move || run(&shared, &on_fire))?;
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// (Re)arms the timer and returns the new generation.
    pub(crate) fn arm(&self) -> u64 {
        let mut schedule = self.shared.schedule.lock();
        schedule.generation += 1;
        schedule.deadline = Some(Instant::now() + self.delay);
        self.shared.wake.notify_one();
        tracing::trace!(
            generation = schedule.generation,
            delay_ms = self.delay.as_millis() as u64,
            "flush scheduled"
        );
        schedule.generation
    }

    /// Cancels a pending fire, if any.
    pub(crate) fn cancel(&self) {
        let mut schedule = self.shared.schedule.lock();
        if schedule.deadline.take().is_some() {
            tracing::trace!(generation = schedule.generation, "scheduled flush cancelled");
        }
        self.shared.wake.notify_one();
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// A pending deadline is dropped without firing. Called from the worker
    /// itself, the thread is detached instead of joined.
    pub(crate) fn shutdown(&self) {
        {
            let mut schedule = self.shared.schedule.lock();
            schedule.shutdown = true;
            schedule.deadline = None;
            self.shared.wake.notify_one();
        }

        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("flush worker panicked");
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Shared, on_fire: &dyn Fn(u64)) {
    let mut schedule = shared.schedule.lock();
    loop {
        if schedule.shutdown {
            return;
        }
        match schedule.deadline {
            None => shared.wake.wait(&mut schedule),
            Some(deadline) if Instant::now() >= deadline => {
                schedule.deadline = None;
                let generation = schedule.generation;
                MutexGuard::unlocked(&mut schedule, || on_fire(generation));
            }
            Some(deadline) => {
                let _ = shared.wake.wait_until(&mut schedule, deadline);
            }
        }
    }
}
