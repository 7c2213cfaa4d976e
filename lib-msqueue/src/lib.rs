pub mod alloc;
pub mod msqueue;
pub mod parker;

#[cfg(test)]
mod unit_test;

use std::{collections::VecDeque, sync::Mutex};

use crossbeam::queue::SegQueue;

pub use crate::alloc::AllocError;
pub use crate::msqueue::MsQueue;

/// Unbounded multi-producer multi-consumer FIFO.
///
/// Neither operation may block waiting for the other side: `pop` on an empty
/// queue returns `None` immediately.
pub unsafe trait ConcurrentQueue<T>: Send + Sync
where
    T: Send,
{
    fn push(&self, value: T);
    fn pop(&self) -> Option<T>;
}

unsafe impl<T: Send> ConcurrentQueue<T> for MsQueue<T> {
    fn push(&self, value: T) {
        MsQueue::push(self, value)
    }

    fn pop(&self) -> Option<T> {
        MsQueue::pop(self)
    }
}

unsafe impl<T: Send> ConcurrentQueue<T> for SegQueue<T> {
    fn push(&self, value: T) {
        SegQueue::push(self, value)
    }

    fn pop(&self) -> Option<T> {
        SegQueue::pop(self)
    }
}

unsafe impl<T: Send> ConcurrentQueue<T> for Mutex<VecDeque<T>> {
    fn push(&self, value: T) {
        match self.lock() {
            Ok(mut queue) => queue.push_back(value),
            Err(poisoned) => poisoned.into_inner().push_back(value),
        }
    }

    fn pop(&self) -> Option<T> {
        match self.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}
