use std::{
    sync::{
        atomic::{fence, AtomicBool, Ordering::*},
        OnceLock,
    },
    thread::{self, Thread},
    time::Duration,
};

use super::{Parker, DEFAULT_PARK_TIMEOUT};

/// Park/unpark guarded by an atomic `parked` flag.
///
/// The waker only pays for an `unpark` when the owner actually announced it
/// is going to sleep. Both sides issue a SeqCst fence between their write and
/// the read of the other side's state, so either the waiter sees the new work
/// in `ready()` or the waker sees `parked == true`.
#[derive(Debug)]
pub struct BlockParker {
    parked: AtomicBool,
    owner: OnceLock<Thread>,
    timeout: Duration,
}

impl BlockParker {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            parked: AtomicBool::new(false),
            owner: OnceLock::new(),
            timeout,
        }
    }

    pub fn is_parked(&self) -> bool {
        self.parked.load(Acquire)
    }
}

impl Default for BlockParker {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_PARK_TIMEOUT)
    }
}

impl Parker for BlockParker {
    fn wait(&self, ready: impl Fn() -> bool) {
        let owner = self.owner.get_or_init(thread::current);
        debug_assert_eq!(owner.id(), thread::current().id());

        self.parked.store(true, Relaxed);
        fence(SeqCst);

        if !ready() {
            thread::park_timeout(self.timeout);
        }

        self.parked.store(false, Release);
    }

    fn wake(&self) {
        fence(SeqCst);

        if !self.parked.load(Relaxed) {
            return;
        }

        if self.parked.swap(false, AcqRel) {
            if let Some(owner) = self.owner.get() {
                owner.unpark();
            }
        }
    }
}
