use libmsqueue::{parker::Parker, MsQueue};
use log::{debug, warn};

use crate::{
    lane::WorkLane,
    record::{Stamper, WorkItem},
    state::SharedState,
    transform::Transform,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    /// results handed to the result queue
    pub processed: u64,
    /// results lost because their queue node could not be allocated
    pub dropped: u64,
}

/// Drains one work lane, turning every item into a timestamped result.
pub struct Consumer<'a, X: Transform, P: Parker> {
    transform: X,
    lane: &'a WorkLane<P>,
    results: &'a MsQueue<X::Output>,
    state: &'a SharedState,
    stamper: Stamper,
}

impl<'a, X: Transform, P: Parker> Consumer<'a, X, P> {
    pub fn new(
        transform: X,
        lane: &'a WorkLane<P>,
        results: &'a MsQueue<X::Output>,
        state: &'a SharedState,
        stamper: Stamper,
    ) -> Self {
        Self {
            transform,
            lane,
            results,
            state,
            stamper,
        }
    }

    /// Runs until the producer has finished and the lane is empty.
    pub fn run(&self) -> ConsumerStats {
        let mut stats = ConsumerStats::default();

        loop {
            if let Some(item) = self.lane.queue().pop() {
                self.process(item, &mut stats);
                continue;
            }

            if self.state.is_finished() {
                // the flag is released after the producer's last push, so an
                // empty pop from here on is final
                match self.lane.queue().pop() {
                    Some(item) => self.process(item, &mut stats),
                    None => break,
                }
                continue;
            }

            if self.state.is_aborted() {
                warn!("consumer {}: run aborted, leaving lane", X::ROLE);
                break;
            }

            self.lane.parker().wait(|| {
                !self.lane.queue().is_empty()
                    || self.state.is_finished()
                    || self.state.is_aborted()
            });
        }

        debug!(
            "consumer {} finished: {} processed, {} dropped",
            X::ROLE,
            stats.processed,
            stats.dropped
        );

        stats
    }

    fn process(&self, WorkItem(number): WorkItem, stats: &mut ConsumerStats) {
        let result = self.transform.apply(number, self.stamper.now());

        match self.results.try_push(result) {
            Ok(()) => stats.processed += 1,
            Err(e) => {
                warn!("consumer {}: dropping result for {}: {}", X::ROLE, number, e);
                self.state.record_dropped();
                stats.dropped += 1;
            }
        }

        // after the push: in-flight reaching zero implies the result is visible
        self.state.complete();
    }
}
