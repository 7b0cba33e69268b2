//! Clock sources used for calibration and measurement.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// `now` returns the time elapsed since an arbitrary, fixed origin. The
/// runner holds the clock exclusively for the whole run.
pub trait Clock {
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Production clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock that advances by a fixed tick on every read.
///
/// Calibration and measurement against it are fully repeatable, which makes
/// it the clock of choice in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Duration>,
    tick: Duration,
}

impl ManualClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            tick,
        }
    }

    /// Move the clock forward without a read, e.g. to simulate work.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Current time, without advancing.
    pub fn peek(&self) -> Duration {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let t = self.now.get();
        self.now.set(t + self.tick);
        t
    }
}

/// Elapsed time of `f` on `clock`, along with its result.
pub(crate) fn timed<C, F, R>(clock: &C, f: F) -> (Duration, R)
where
    C: Clock + ?Sized,
    F: FnOnce() -> R,
{
    let start = clock.now();
    let result = f();
    let end = clock.now();
    (end.saturating_sub(start), result)
}

/// Doubling stops here even if the time budget was not reached.
pub(crate) const MAX_ITERATIONS: u64 = 1 << 24;

/// Outcome of [`run_for_at_least`].
#[derive(Debug)]
pub(crate) struct Timing<R> {
    pub elapsed: Duration,
    pub iterations: u64,
    pub result: R,
}

/// Call `f(k)` with `k` doubling from `seed` until one call reports an
/// elapsed time of at least `how_long`.
///
/// `f` reports its own elapsed time so callers decide what is timed.
pub(crate) fn run_for_at_least<F, R, E>(
    how_long: Duration,
    seed: u64,
    mut f: F,
) -> Result<Timing<R>, E>
where
    F: FnMut(u64) -> Result<(Duration, R), E>,
{
    let mut iterations = seed.max(1);
    loop {
        let (elapsed, result) = f(iterations)?;
        if elapsed >= how_long || iterations >= MAX_ITERATIONS {
            return Ok(Timing {
                elapsed,
                iterations,
                result,
            });
        }
        iterations = iterations.saturating_mul(2);
    }
}
