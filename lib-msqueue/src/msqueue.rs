use std::{
    fmt,
    marker::PhantomData,
    mem::MaybeUninit,
    sync::atomic::Ordering::*,
};

use crossbeam::{
    epoch::{self, Atomic, Guard, Owned, Shared},
    utils::{Backoff, CachePadded},
};

use crate::alloc::{try_box, AllocError};

struct Node<T> {
    /// Uninitialized in the sentinel, and in every node once it has become
    /// the head (its value was moved out by the dequeuer that unlinked it).
    value: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }

    fn new(value: T) -> Self {
        Self {
            value: MaybeUninit::new(value),
            // not yet reachable by any other thread
            next: Atomic::null(),
        }
    }
}

/// Michael-Scott lock-free unbounded FIFO queue.
///
/// The queue is always a chain of at least one node. `head` points at a node
/// whose value has already been consumed; the queue is empty iff the head has
/// no successor. `tail` may lag one link behind the real end of the chain and
/// is pushed forward by whichever thread notices.
///
/// Ordering is FIFO per enqueuing thread. Across threads the order is the
/// order in which each node's link CAS succeeded.
///
/// Unlinked nodes are retired through `crossbeam::epoch`: every operation
/// pins the current thread for its whole duration and old heads are only
/// freed once no pinned thread can still hold a reference to them.
pub struct MsQueue<T> {
    head: CachePadded<Atomic<Node<T>>>,
    tail: CachePadded<Atomic<Node<T>>>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for MsQueue<T> {}
unsafe impl<T: Send> Sync for MsQueue<T> {}

impl<T> MsQueue<T> {
    pub fn new() -> Self {
        let sentinel = Owned::new(Node::sentinel());
        Self::with_sentinel(sentinel)
    }

    /// Creates an empty queue, failing instead of aborting if the sentinel
    /// node cannot be allocated.
    pub fn try_new() -> Result<Self, AllocError<()>> {
        let sentinel = try_box(Node::sentinel()).map_err(|_| AllocError(()))?;
        Ok(Self::with_sentinel(Owned::from(sentinel)))
    }

    fn with_sentinel(sentinel: Owned<Node<T>>) -> Self {
        // nothing else can observe the queue yet
        let sentinel = unsafe { sentinel.into_shared(epoch::unprotected()) };

        Self {
            head: CachePadded::new(Atomic::from(sentinel)),
            tail: CachePadded::new(Atomic::from(sentinel)),
            _marker: PhantomData,
        }
    }

    pub fn push(&self, value: T) {
        let guard = &epoch::pin();
        let node = Owned::new(Node::new(value)).into_shared(guard);
        self.link(node, guard);
    }

    /// Like `push`, but gives the value back if its node cannot be allocated.
    pub fn try_push(&self, value: T) -> Result<(), AllocError<T>> {
        let node = match try_box(Node::new(value)) {
            Ok(node) => node,
            Err(node) => return Err(AllocError(unsafe { node.value.assume_init() })),
        };

        let guard = &epoch::pin();
        let node = Owned::<Node<T>>::from(node).into_shared(guard);
        self.link(node, guard);

        Ok(())
    }

    fn link<'g>(&self, node: Shared<'g, Node<T>>, guard: &'g Guard) {
        let backoff = Backoff::new();

        loop {
            let tail = self.tail.load(Acquire, guard);
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Acquire, guard);

            if tail != self.tail.load(Acquire, guard) {
                continue;
            }

            if next.is_null() {
                if tail_ref
                    .next
                    .compare_exchange(Shared::null(), node, Release, Relaxed, guard)
                    .is_ok()
                {
                    // best effort; a lagging tail is repaired by the next visitor
                    let _ = self.tail.compare_exchange(tail, node, Release, Relaxed, guard);
                    return;
                }
                backoff.spin();
            } else {
                // tail is lagging behind, help advance it
                let _ = self.tail.compare_exchange(tail, next, Release, Relaxed, guard);
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        let guard = &epoch::pin();
        self.pop_in(guard)
    }

    fn pop_in(&self, guard: &Guard) -> Option<T> {
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Acquire, guard);
            let tail = self.tail.load(Acquire, guard);
            let next = unsafe { head.deref() }.next.load(Acquire, guard);

            if head != self.head.load(Acquire, guard) {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                // tail is lagging, help advance it
                let _ = self.tail.compare_exchange(tail, next, Release, Relaxed, guard);
                continue;
            }

            let Some(next_ref) = (unsafe { next.as_ref() }) else {
                continue;
            };

            if self
                .head
                .compare_exchange(head, next, Release, Relaxed, guard)
                .is_ok()
            {
                unsafe {
                    // only the winner of the head CAS moves the value out, and
                    // the pin keeps `next` alive even if it is unlinked meanwhile
                    let value = next_ref.value.assume_init_read();
                    guard.defer_destroy(head);
                    return Some(value);
                }
            }

            backoff.spin();
        }
    }

    /// Racy snapshot; only meaningful as a hint unless the caller knows no
    /// other thread is touching the queue.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Acquire, guard);

        unsafe { head.deref() }.next.load(Acquire, guard).is_null()
    }
}

impl<T> Default for MsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MsQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsQueue")
            .field("is_empty", &self.is_empty())
            .finish()
    }
}

impl<T> Drop for MsQueue<T> {
    fn drop(&mut self) {
        unsafe {
            // `&mut self`: no other thread can reach the chain, destruction
            // under the unprotected guard happens immediately
            let guard = epoch::unprotected();

            while self.pop_in(guard).is_some() {}

            let sentinel = self.head.load(Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}
