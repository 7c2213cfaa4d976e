use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering::*},
        Arc, Mutex,
    },
    thread,
};

use crossbeam::queue::SegQueue;
use itertools::Itertools;
use proptest::prelude::*;
use rand::Rng;
use serial_test::serial;

use crate::{
    parker::{BlockParker, Parker, SpinParker},
    ConcurrentQueue, MsQueue,
};

const ITEM_NUM: usize = 10_000;
const CONSUMER_NUM: usize = 8;
const PRODUCER_NUM: usize = 4;

#[test]
#[serial]
pub fn msqueue_spmc_test() {
    for consumers in [1, 2, 4, CONSUMER_NUM] {
        inner_spmc_test(Arc::new(MsQueue::new()), ITEM_NUM, consumers);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    #[serial]
    fn msqueue_spmc_any_size(items in 0usize..=ITEM_NUM, consumers in 1usize..=CONSUMER_NUM) {
        inner_spmc_test(Arc::new(MsQueue::new()), items, consumers);
    }
}

#[test]
#[serial]
pub fn msqueue_mpmc_test() {
    inner_mpmc_test(Arc::new(MsQueue::new()), PRODUCER_NUM, CONSUMER_NUM);
}

#[test]
#[serial]
pub fn reference_queues_mpmc_test() {
    inner_mpmc_test(Arc::new(SegQueue::new()), PRODUCER_NUM, CONSUMER_NUM);
    inner_mpmc_test(
        Arc::new(Mutex::new(VecDeque::new())),
        PRODUCER_NUM,
        CONSUMER_NUM,
    );
}

/// One producer, many consumers popping concurrently with the pushes. Every
/// value must come out exactly once.
pub fn inner_spmc_test<Q>(queue: Arc<Q>, items: usize, consumers: usize)
where
    Q: ConcurrentQueue<usize> + 'static,
{
    let done = Arc::new(AtomicBool::new(false));

    let handles = (0..consumers)
        .map(|i| {
            let queue = queue.clone();
            let done = done.clone();
            thread::Builder::new()
                .name(format!("consumer-{i}"))
                .spawn(move || {
                    let mut seen = vec![];
                    loop {
                        match queue.pop() {
                            Some(v) => seen.push(v),
                            None if done.load(Acquire) => match queue.pop() {
                                Some(v) => seen.push(v),
                                None => break,
                            },
                            None => thread::yield_now(),
                        }
                    }
                    seen
                })
                .unwrap()
        })
        .collect_vec();

    for i in 0..items {
        queue.push(i);
    }
    done.store(true, Release);

    let mut all = vec![];
    for handle in handles {
        let seen = handle.join().unwrap();
        // values pushed by one thread are observed in push order
        assert!(seen.iter().tuple_windows().all(|(a, b)| a < b));
        all.extend(seen);
    }

    assert_eq!(all.into_iter().sorted().collect_vec(), (0..items).collect_vec());
    assert!(queue.pop().is_none());
}

pub fn inner_mpmc_test<Q>(queue: Arc<Q>, producers: usize, consumers: usize)
where
    Q: ConcurrentQueue<(usize, usize)> + 'static,
{
    let remaining = Arc::new(AtomicUsize::new(producers));

    let producer_handles = (0..producers)
        .map(|p| {
            let queue = queue.clone();
            let remaining = remaining.clone();
            thread::spawn(move || {
                for i in 0..ITEM_NUM {
                    queue.push((p, i));
                }
                remaining.fetch_sub(1, Release);
            })
        })
        .collect_vec();

    let consumer_handles = (0..consumers)
        .map(|_| {
            let queue = queue.clone();
            let remaining = remaining.clone();
            thread::spawn(move || {
                let mut seen = vec![];
                loop {
                    if let Some(v) = queue.pop() {
                        seen.push(v);
                    } else if remaining.load(Acquire) == 0 {
                        match queue.pop() {
                            Some(v) => seen.push(v),
                            None => break,
                        }
                    } else {
                        thread::yield_now();
                    }
                }
                seen
            })
        })
        .collect_vec();

    for handle in producer_handles {
        handle.join().unwrap();
    }

    let mut all = vec![];
    for handle in consumer_handles {
        let seen = handle.join().unwrap();
        // per producer, each consumer sees an increasing subsequence
        for p in 0..producers {
            assert!(seen
                .iter()
                .filter(|(from, _)| *from == p)
                .tuple_windows()
                .all(|(a, b)| a.1 < b.1));
        }
        all.extend(seen);
    }

    let expected = (0..producers)
        .cartesian_product(0..ITEM_NUM)
        .collect_vec();
    assert_eq!(all.into_iter().sorted().collect_vec(), expected);
}

#[test]
#[serial]
pub fn random_interleaving_test() {
    let queue = Arc::new(MsQueue::new());
    let pushed = Arc::new(AtomicUsize::new(0));
    let popped = Arc::new(AtomicUsize::new(0));

    let handles = (0..CONSUMER_NUM)
        .map(|_| {
            let queue = queue.clone();
            let pushed = pushed.clone();
            let popped = popped.clone();
            thread::spawn(move || {
                let rng = &mut rand::thread_rng();
                for _ in 0..ITEM_NUM {
                    if rng.gen_bool(0.5) {
                        queue.push(rng.gen::<u32>());
                        pushed.fetch_add(1, Relaxed);
                    } else if queue.pop().is_some() {
                        popped.fetch_add(1, Relaxed);
                    }
                }
            })
        })
        .collect_vec();

    for handle in handles {
        handle.join().unwrap();
    }

    let leftover = std::iter::from_fn(|| queue.pop()).count();
    assert_eq!(
        popped.load(Relaxed) + leftover,
        pushed.load(Relaxed)
    );
    assert!(queue.is_empty());
}

fn parked_consumer_drains<P: Parker + 'static>() {
    let queue = Arc::new(MsQueue::new());
    let parker = Arc::new(P::default());
    let done = Arc::new(AtomicBool::new(false));

    let consumer = {
        let queue = queue.clone();
        let parker = parker.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut count = 0;
            loop {
                if queue.pop().is_some() {
                    count += 1;
                } else if done.load(Acquire) {
                    if queue.pop().is_none() {
                        break;
                    }
                    count += 1;
                } else {
                    parker.wait(|| !queue.is_empty() || done.load(Acquire));
                }
            }
            count
        })
    };

    for i in 0..ITEM_NUM {
        queue.push(i);
        parker.wake();
    }
    done.store(true, Release);
    parker.wake();

    assert_eq!(consumer.join().unwrap(), ITEM_NUM);
}

#[test]
#[serial]
pub fn parked_consumer_test() {
    parked_consumer_drains::<SpinParker>();
    parked_consumer_drains::<BlockParker>();
}

#[derive(Debug, Clone)]
enum Op {
    Push(i32),
    Pop,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![any::<i32>().prop_map(Op::Push), Just(Op::Pop)]
}

proptest! {
    #[test]
    fn behaves_like_vecdeque(ops in prop::collection::vec(op_strategy(), 0..512)) {
        let queue = MsQueue::new();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    queue.push(v);
                    model.push_back(v);
                }
                Op::Pop => prop_assert_eq!(queue.pop(), model.pop_front()),
            }
            prop_assert_eq!(queue.is_empty(), model.is_empty());
        }
    }
}
