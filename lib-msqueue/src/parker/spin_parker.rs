use std::thread;

use super::Parker;

/// Spin-with-yield: gives the processor away once and returns.
#[derive(Default, Debug)]
pub struct SpinParker;

impl Parker for SpinParker {
    #[inline]
    fn wait(&self, ready: impl Fn() -> bool) {
        if !ready() {
            thread::yield_now();
        }
    }

    #[inline]
    fn wake(&self) {}
}
