use std::{
    path::Path,
    thread::{self, Scope, ScopedJoinHandle},
    time::Duration,
};

use clap::ValueEnum;
use core_affinity::CoreId;
use libmsqueue::{
    parker::{BlockParker, Parker, SpinParker},
    MsQueue,
};
use log::{info, warn};
use serde::Serialize;
use strum::{Display, EnumIter};

use crate::{
    consumer::Consumer,
    error::{PipelineError, Result},
    lane::WorkLane,
    merge::MergeCoordinator,
    producer::Producer,
    record::Stamper,
    sink::ResultSink,
    source,
    state::SharedState,
    transform::{PrimalityTester, Squarer},
};

/// How consumers wait while their lane is empty.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumIter, Serialize,
)]
pub enum WaiterType {
    /// yield the processor and poll again
    #[default]
    Spin,
    /// park until the producer wakes the consumer
    Block,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub waiter: WaiterType,
    /// sleep of the merge coordinator when a pass found nothing to do
    pub poll_interval: Duration,
    /// pause of the producer after each admitted item
    pub produce_delay: Duration,
    /// pin producer and consumers to distinct cores
    pub pin_cpus: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            waiter: WaiterType::Spin,
            poll_interval: Duration::from_millis(1),
            produce_delay: Duration::ZERO,
            pin_cpus: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// items enqueued by the producer; what the summary reports
    pub admitted: u64,
    /// items the producer could not enqueue
    pub skipped: u64,
    pub processed_square: u64,
    pub processed_primality: u64,
    /// results the consumers could not enqueue
    pub dropped: u64,
    pub emitted: u64,
    pub reordered: u64,
}

/// Runs one pipeline over an infallible source of numbers.
pub fn run_numbers<I, S>(
    config: &PipelineConfig,
    numbers: I,
    sink: S,
) -> Result<PipelineReport>
where
    I: IntoIterator<Item = i32>,
    I::IntoIter: Send,
    S: ResultSink,
{
    run(config, numbers.into_iter().map(Ok::<i32, PipelineError>), sink)
}

/// Opens `path` and runs one pipeline over its numbers. An input that cannot
/// be opened fails before any thread is started.
pub fn run_path<S: ResultSink>(
    config: &PipelineConfig,
    path: &Path,
    sink: S,
) -> Result<PipelineReport> {
    let numbers = source::open(path)?;
    run(config, numbers, sink)
}

/// Runs producer and both consumers on their own threads and the merge on
/// the calling thread; returns once every worker has been joined.
///
/// A source error stops the producer; whatever was admitted before it is
/// still processed and emitted, then the error is returned.
pub fn run<I, E, S>(config: &PipelineConfig, items: I, sink: S) -> Result<PipelineReport>
where
    I: IntoIterator<Item = std::result::Result<i32, E>> + Send,
    E: Into<PipelineError> + Send,
    S: ResultSink,
{
    info!("starting pipeline, {} waiter", config.waiter);

    let report = match config.waiter {
        WaiterType::Spin => run_with::<SpinParker, _, _, _>(config, items, sink)?,
        WaiterType::Block => run_with::<BlockParker, _, _, _>(config, items, sink)?,
    };

    info!(
        "pipeline finished: {} admitted, {} emitted, {} reordered",
        report.admitted, report.emitted, report.reordered
    );

    Ok(report)
}

fn run_with<P, I, E, S>(config: &PipelineConfig, items: I, sink: S) -> Result<PipelineReport>
where
    P: Parker,
    I: IntoIterator<Item = std::result::Result<i32, E>> + Send,
    E: Into<PipelineError> + Send,
    S: ResultSink,
{
    let square_lane =
        WorkLane::<P>::try_new().map_err(|_| PipelineError::QueueAlloc("square work"))?;
    let primality_lane =
        WorkLane::<P>::try_new().map_err(|_| PipelineError::QueueAlloc("primality work"))?;
    let square_results =
        MsQueue::try_new().map_err(|_| PipelineError::QueueAlloc("square result"))?;
    let primality_results =
        MsQueue::try_new().map_err(|_| PipelineError::QueueAlloc("primality result"))?;

    let state = SharedState::new();
    let stamper = Stamper::new();

    let cores = if config.pin_cpus {
        core_affinity::get_core_ids().unwrap_or_default()
    } else {
        vec![]
    };
    let mut cores = cores.into_iter().cycle();

    let producer = Producer::new(&square_lane, &primality_lane, &state, config.produce_delay);
    let square_consumer = Consumer::new(
        Squarer,
        &square_lane,
        &square_results,
        &state,
        stamper.clone(),
    );
    let primality_consumer = Consumer::new(
        PrimalityTester,
        &primality_lane,
        &primality_results,
        &state,
        stamper.clone(),
    );
    let merge = MergeCoordinator::new(
        &square_results,
        &primality_results,
        &state,
        stamper,
        config.poll_interval,
    );

    let state = &state;
    thread::scope(|scope| {
        // producer first: it terminates on its own, so the consumers that did
        // start can always exit even if a later spawn fails
        let producer_handle = spawn_worker(scope, "producer", cores.next(), state, move || {
            producer.run_source(items)
        })?;
        let square_handle = spawn_worker(scope, "consumer-a", cores.next(), state, move || {
            square_consumer.run()
        })?;
        let primality_handle = spawn_worker(scope, "consumer-b", cores.next(), state, move || {
            primality_consumer.run()
        })?;

        let merged = merge.run(sink);

        let produced = join_worker(producer_handle, "producer")?;
        let square_stats = join_worker(square_handle, "consumer-a")?;
        let primality_stats = join_worker(primality_handle, "consumer-b")?;

        let merged = merged?;
        let admitted = match produced {
            Ok(admitted) => admitted,
            Err(e) => return Err(e.into()),
        };

        Ok(PipelineReport {
            admitted,
            skipped: state.skipped(),
            processed_square: square_stats.processed,
            processed_primality: primality_stats.processed,
            dropped: state.dropped(),
            emitted: merged.emitted(),
            reordered: merged.reordered,
        })
    })
}

/// Aborts the run when the owning worker unwinds.
struct AbortOnPanic<'a>(&'a SharedState);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

fn spawn_worker<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    role: &'static str,
    core: Option<CoreId>,
    state: &'scope SharedState,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(role.to_owned())
        .spawn_scoped(scope, move || {
            let _abort = AbortOnPanic(state);
            if let Some(core) = core {
                if !core_affinity::set_for_current(core) {
                    warn!("{} could not be pinned to core {}", role, core.id);
                }
            }
            f()
        })
        .map_err(|source| PipelineError::Spawn { role, source })
}

fn join_worker<T>(handle: ScopedJoinHandle<'_, T>, role: &'static str) -> Result<T> {
    handle
        .join()
        .map_err(|_| PipelineError::WorkerPanicked(role))
}
