use std::time::Duration;

use libmsqueue::MsQueue;
use log::{debug, trace, warn};
use serde::Serialize;

use crate::{
    error::Result,
    record::{MergedResult, PrimalityResult, SquareResult, Stamper, Summary, Timestamp},
    sink::ResultSink,
    state::SharedState,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub emitted_square: u64,
    pub emitted_primality: u64,
    /// results emitted with a timestamp earlier than the one emitted before
    pub reordered: u64,
    pub summary: Option<Summary>,
}

impl MergeReport {
    pub fn emitted(&self) -> u64 {
        self.emitted_square + self.emitted_primality
    }
}

/// Streams both result queues into one sink, earliest timestamp first.
///
/// Holds at most one pending result per queue. When only one side has
/// something pending it is emitted right away, so a result that is stamped
/// earlier but not yet visible on the other queue comes out late. Such
/// inversions are counted in [`MergeReport::reordered`], not prevented.
pub struct MergeCoordinator<'a> {
    squares: &'a MsQueue<SquareResult>,
    primes: &'a MsQueue<PrimalityResult>,
    state: &'a SharedState,
    stamper: Stamper,
    poll_interval: Duration,
}

impl<'a> MergeCoordinator<'a> {
    pub fn new(
        squares: &'a MsQueue<SquareResult>,
        primes: &'a MsQueue<PrimalityResult>,
        state: &'a SharedState,
        stamper: Stamper,
        poll_interval: Duration,
    ) -> Self {
        Self {
            squares,
            primes,
            state,
            stamper,
            poll_interval,
        }
    }

    /// Producer done, nothing in flight, nothing pending, nothing queued.
    ///
    /// In-flight is read before the queues: a consumer decrements only after
    /// its push, so observing zero makes every pushed result visible.
    fn is_complete(
        &self,
        square: &Option<SquareResult>,
        prime: &Option<PrimalityResult>,
    ) -> bool {
        self.state.is_drained()
            && square.is_none()
            && prime.is_none()
            && self.squares.is_empty()
            && self.primes.is_empty()
    }

    pub fn run<S: ResultSink>(&self, mut sink: S) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        let mut square: Option<SquareResult> = None;
        let mut prime: Option<PrimalityResult> = None;
        let mut last: Option<Timestamp> = None;

        loop {
            let mut did_work = false;

            if square.is_none() {
                square = self.squares.pop();
                did_work |= square.is_some();
            }
            if prime.is_none() {
                prime = self.primes.pop();
                did_work |= prime.is_some();
            }

            let take_square = match (&square, &prime) {
                // ties go to the square side
                (Some(a), Some(b)) => Some(a.created <= b.created),
                (Some(_), None) => Some(true),
                (None, Some(_)) => Some(false),
                (None, None) => None,
            };

            let next: Option<MergedResult> = match take_square {
                Some(true) => square.take().map(Into::into),
                Some(false) => prime.take().map(Into::into),
                None => None,
            };

            if let Some(result) = next {
                if last.is_some_and(|last| result.created() < last) {
                    trace!("{} emitted out of timestamp order", result.number());
                    report.reordered += 1;
                }
                last = Some(result.created());

                sink.emit(&result)?;
                match result {
                    MergedResult::Square(_) => report.emitted_square += 1,
                    MergedResult::Primality(_) => report.emitted_primality += 1,
                }
            }

            if report.summary.is_none() && self.is_complete(&square, &prime) {
                let summary = Summary {
                    total: self.state.total(),
                    created: self.stamper.now(),
                };
                sink.summary(&summary)?;
                report.summary = Some(summary);
            }

            // observed again after the summary went out
            if report.summary.is_some() && self.is_complete(&square, &prime) {
                break;
            }

            if !did_work {
                if self.state.is_aborted() {
                    warn!("merge stopped: a worker died before the run completed");
                    break;
                }
                spin_sleep::sleep(self.poll_interval);
            }
        }

        debug!(
            "merge finished: {} square, {} primality, {} reordered",
            report.emitted_square, report.emitted_primality, report.reordered
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::sink::VecSink;

    fn at(micros: i64) -> Timestamp {
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Timestamp::from(base + chrono::Duration::microseconds(micros))
    }

    fn sq(number: i32, micros: i64) -> SquareResult {
        SquareResult {
            number,
            square: number as i64 * number as i64,
            created: at(micros),
        }
    }

    fn pr(number: i32, micros: i64) -> PrimalityResult {
        PrimalityResult {
            number,
            is_prime: crate::transform::is_prime(number),
            created: at(micros),
        }
    }

    fn coordinator<'a>(
        squares: &'a MsQueue<SquareResult>,
        primes: &'a MsQueue<PrimalityResult>,
        state: &'a SharedState,
    ) -> MergeCoordinator<'a> {
        MergeCoordinator::new(
            squares,
            primes,
            state,
            Stamper::new(),
            Duration::from_micros(100),
        )
    }

    #[test]
    fn merges_queued_results_by_timestamp() {
        let squares = MsQueue::new();
        let primes = MsQueue::new();
        let state = SharedState::new();

        for (n, t) in [(2, 10), (4, 30), (6, 50)] {
            squares.push(sq(n, t));
        }
        for (n, t) in [(3, 20), (5, 40), (7, 60)] {
            primes.push(pr(n, t));
        }
        state.publish_finished(6);

        let mut sink = VecSink::default();
        let report = coordinator(&squares, &primes, &state).run(&mut sink).unwrap();

        let numbers: Vec<_> = sink.results.iter().map(|r| r.number()).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(report.emitted(), 6);
        assert_eq!(report.reordered, 0);
        assert_eq!(sink.summaries.len(), 1);
        assert_eq!(sink.summaries[0].total, 6);
    }

    #[test]
    fn equal_timestamps_prefer_square() {
        let squares = MsQueue::new();
        let primes = MsQueue::new();
        let state = SharedState::new();

        primes.push(pr(3, 5));
        squares.push(sq(2, 5));
        state.publish_finished(2);

        let mut sink = VecSink::default();
        coordinator(&squares, &primes, &state).run(&mut sink).unwrap();

        let numbers: Vec<_> = sink.results.iter().map(|r| r.number()).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn lone_side_is_emitted_without_waiting() {
        let squares = MsQueue::new();
        let primes = MsQueue::new();
        let state = SharedState::new();

        // 4 is pending alone; 3 shows up later despite its earlier stamp
        squares.push(sq(4, 20));
        state.admit();

        let mut sink = VecSink::default();
        let report = thread::scope(|scope| {
            let merge = scope.spawn(|| coordinator(&squares, &primes, &state).run(&mut sink));

            while !squares.is_empty() {
                thread::yield_now();
            }
            thread::sleep(Duration::from_millis(5));
            primes.push(pr(3, 10));
            state.publish_finished(1);
            state.complete();

            merge.join().unwrap().unwrap()
        });

        let numbers: Vec<_> = sink.results.iter().map(|r| r.number()).collect();
        assert_eq!(numbers, vec![4, 3]);
        assert_eq!(report.reordered, 1);
    }

    #[test]
    fn waits_for_in_flight_items() {
        let squares = MsQueue::new();
        let primes = MsQueue::new();
        let state = SharedState::new();

        state.admit();
        state.publish_finished(1);

        let mut sink = VecSink::default();
        let report = thread::scope(|scope| {
            let merge = scope.spawn(|| coordinator(&squares, &primes, &state).run(&mut sink));

            thread::sleep(Duration::from_millis(20));
            assert!(!merge.is_finished());

            squares.push(sq(8, 1));
            state.complete();

            merge.join().unwrap().unwrap()
        });

        assert_eq!(report.emitted_square, 1);
        assert_eq!(sink.results.len(), 1);
        assert_eq!(sink.summaries.len(), 1);
    }

    #[test]
    fn stops_without_summary_on_abort() {
        let squares = MsQueue::new();
        let primes = MsQueue::new();
        let state = SharedState::new();

        squares.push(sq(2, 1));
        state.admit();
        state.admit();
        state.abort();

        let mut sink = VecSink::default();
        let report = coordinator(&squares, &primes, &state).run(&mut sink).unwrap();

        assert_eq!(report.emitted_square, 1);
        assert!(report.summary.is_none());
        assert!(sink.summaries.is_empty());
    }

    #[test]
    fn empty_run_emits_only_the_summary() {
        let squares = MsQueue::new();
        let primes = MsQueue::new();
        let state = SharedState::new();
        state.publish_finished(0);

        let mut sink = VecSink::default();
        let report = coordinator(&squares, &primes, &state).run(&mut sink).unwrap();

        assert!(sink.results.is_empty());
        assert_eq!(report.summary.map(|s| s.total), Some(0));
    }
}
