use std::{convert::Infallible, time::Duration};

use libmsqueue::parker::Parker;
use log::{debug, warn};

use crate::{
    lane::WorkLane,
    record::{Role, WorkItem},
    state::SharedState,
    transform::classify,
};

/// Routes every incoming number to the lane of the role that handles it.
pub struct Producer<'a, P: Parker> {
    square: &'a WorkLane<P>,
    primality: &'a WorkLane<P>,
    state: &'a SharedState,
    delay: Duration,
}

impl<'a, P: Parker> Producer<'a, P> {
    pub fn new(
        square: &'a WorkLane<P>,
        primality: &'a WorkLane<P>,
        state: &'a SharedState,
        delay: Duration,
    ) -> Self {
        Self {
            square,
            primality,
            state,
            delay,
        }
    }

    fn lane(&self, role: Role) -> &'a WorkLane<P> {
        match role {
            Role::Square => self.square,
            Role::Primality => self.primality,
        }
    }

    pub fn run<I>(&self, numbers: I) -> u64
    where
        I: IntoIterator<Item = i32>,
    {
        match self.run_source(numbers.into_iter().map(Ok::<i32, Infallible>)) {
            Ok(admitted) => admitted,
            Err(never) => match never {},
        }
    }

    /// Admits items until the source is exhausted or yields an error, then
    /// publishes the finished flag with the number of admitted items. The
    /// flag is published on the error path too, so consumers and the merge
    /// still drain what was admitted.
    ///
    /// An item whose queue node cannot be allocated is skipped and not
    /// counted.
    pub fn run_source<I, E>(&self, items: I) -> Result<u64, E>
    where
        I: IntoIterator<Item = Result<i32, E>>,
    {
        let mut admitted = 0u64;
        let mut outcome = Ok(());

        for item in items {
            let number = match item {
                Ok(number) => number,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            };

            let lane = self.lane(classify(number));

            if let Err(e) = lane.queue().try_push(WorkItem(number)) {
                warn!("skipping {}: {}", number, e);
                self.state.record_skipped();
                continue;
            }

            self.state.admit();
            lane.parker().wake();
            admitted += 1;

            if !self.delay.is_zero() {
                spin_sleep::sleep(self.delay);
            }
        }

        self.state.publish_finished(admitted);
        self.square.parker().wake();
        self.primality.parker().wake();

        debug!("producer finished, {} items admitted", admitted);

        outcome.map(|_| admitted)
    }
}
