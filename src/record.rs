use std::fmt;

use chrono::{DateTime, Local, Utc};
use quanta::Clock;
use serde::Serialize;
use strum::{Display, EnumIter};

/// One integer travelling from the producer to a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem(pub i32);

/// Which consumer an item is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum Role {
    /// even numbers, squared
    #[strum(serialize = "A")]
    Square,
    /// odd numbers, primality tested
    #[strum(serialize = "B")]
    Primality,
}

/// Wall-clock creation time of a result, totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S%.6f")
        )
    }
}

/// Hands out timestamps that are monotonic across threads.
///
/// The system clock may step backwards; the TSC-backed `quanta` clock does
/// not. Each stamp is the wall time of the stamper's creation plus the
/// monotonic time elapsed since then.
#[derive(Clone)]
pub struct Stamper {
    clock: Clock,
    origin: quanta::Instant,
    wall_origin: DateTime<Utc>,
}

impl Stamper {
    pub fn new() -> Self {
        let clock = Clock::new();
        let origin = clock.now();

        Self {
            clock,
            origin,
            wall_origin: Utc::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        let elapsed = self.clock.now().duration_since(self.origin);
        let elapsed =
            chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());

        Timestamp(self.wall_origin + elapsed)
    }
}

impl Default for Stamper {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SquareResult {
    pub number: i32,
    pub square: i64,
    pub created: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrimalityResult {
    pub number: i32,
    pub is_prime: bool,
    pub created: Timestamp,
}

/// A result as it leaves the merge, tagged with the role that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum MergedResult {
    Square(SquareResult),
    Primality(PrimalityResult),
}

impl MergedResult {
    pub fn role(&self) -> Role {
        match self {
            MergedResult::Square(_) => Role::Square,
            MergedResult::Primality(_) => Role::Primality,
        }
    }

    pub fn number(&self) -> i32 {
        match self {
            MergedResult::Square(r) => r.number,
            MergedResult::Primality(r) => r.number,
        }
    }

    pub fn created(&self) -> Timestamp {
        match self {
            MergedResult::Square(r) => r.created,
            MergedResult::Primality(r) => r.created,
        }
    }
}

impl From<SquareResult> for MergedResult {
    fn from(value: SquareResult) -> Self {
        MergedResult::Square(value)
    }
}

impl From<PrimalityResult> for MergedResult {
    fn from(value: PrimalityResult) -> Self {
        MergedResult::Primality(value)
    }
}

/// Emitted once, after every result of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: u64,
    pub created: Timestamp,
}
