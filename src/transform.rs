use crate::record::{MergedResult, PrimalityResult, Role, SquareResult, Timestamp};

/// Even numbers go to the squarer, odd numbers (negative ones included) to
/// the primality tester.
#[inline]
pub fn classify(number: i32) -> Role {
    if number % 2 == 0 {
        Role::Square
    } else {
        Role::Primality
    }
}

#[inline]
pub fn square(number: i32) -> i64 {
    let number = number as i64;
    number * number
}

/// Trial division by odd divisors up to the integer square root.
pub fn is_prime(number: i32) -> bool {
    if number < 2 {
        return false;
    }
    if number == 2 {
        return true;
    }
    if number % 2 == 0 {
        return false;
    }

    let limit = isqrt(number as u32);
    let mut divisor = 3;

    while divisor <= limit {
        if number as u32 % divisor == 0 {
            return false;
        }
        divisor += 2;
    }

    true
}

fn isqrt(n: u32) -> u32 {
    let mut root = (n as f64).sqrt() as u32;

    // correct the float estimate in either direction
    while (root as u64) * (root as u64) > n as u64 {
        root -= 1;
    }
    while ((root + 1) as u64) * ((root + 1) as u64) <= n as u64 {
        root += 1;
    }

    root
}

/// Per-role computation applied by a consumer to every item it dequeues.
pub trait Transform: Send + Sync {
    type Output: Into<MergedResult> + Send;

    const ROLE: Role;

    fn apply(&self, number: i32, created: Timestamp) -> Self::Output;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Squarer;

impl Transform for Squarer {
    type Output = SquareResult;

    const ROLE: Role = Role::Square;

    fn apply(&self, number: i32, created: Timestamp) -> SquareResult {
        SquareResult {
            number,
            square: square(number),
            created,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PrimalityTester;

impl Transform for PrimalityTester {
    type Output = PrimalityResult;

    const ROLE: Role = Role::Primality;

    fn apply(&self, number: i32, created: Timestamp) -> PrimalityResult {
        PrimalityResult {
            number,
            is_prime: is_prime(number),
            created,
        }
    }
}
