//! Bounded-retry execution for flaky or eventually-consistent remote calls.
//!
//! The stop condition is a predicate over the last result, not an
//! exception-type allowlist: whether a response means "try again" or
//! "this is final" is usually a field inside a successful response (an
//! HTTP 5xx wrapped in a value, a job status that is not yet terminal).
//! Errors returned by the operation itself are fatal and propagate
//! immediately.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn new(timeout_seconds: u64, wait_seconds: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_seconds),
            wait: Duration::from_secs(wait_seconds),
        }
    }

    /// `timeout_seconds == 0` is the reserved "do not poll at all" sentinel.
    pub fn is_no_poll(&self) -> bool {
        self.timeout.is_zero()
    }
}

/// Repeatedly invoke `op` until `done` accepts its result or the wall-clock
/// deadline elapses.
///
/// The last obtained result is returned either way; timing out is not an
/// error here, callers inspect the result to detect it. Never sleeps after
/// the attempt whose result is returned.
pub fn execute<T, E, Op, Cond>(policy: RetryPolicy, mut op: Op, mut done: Cond) -> Result<T, E>
where
    Op: FnMut() -> Result<T, E>,
    Cond: FnMut(&T) -> bool,
{
    let started = Instant::now();
    loop {
        let result = op()?;
        if done(&result) || started.elapsed() >= policy.timeout {
            return Ok(result);
        }
        std::thread::sleep(policy.wait);
    }
}
