use std::time::Duration;

pub mod block_parker;
pub mod spin_parker;

pub use block_parker::BlockParker;
pub use spin_parker::SpinParker;

/// Upper bound on a single blocking wait; a missed wake-up costs at most this.
pub const DEFAULT_PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// How an idle consumer waits for more work.
///
/// `wait` is called by the single thread that owns the parker once it has
/// found nothing to do. Implementations return when `ready()` holds, when
/// `wake` was called, or spuriously; callers always re-check their queue.
/// `wake` is called by any thread that just made work available and must not
/// block.
pub trait Parker: Default + Send + Sync {
    fn wait(&self, ready: impl Fn() -> bool);
    fn wake(&self);
}
