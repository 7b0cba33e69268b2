//! One-time calibration of the clock.
//!
//! Before any benchmark runs the clock is warmed up, its resolution is
//! estimated from consecutive distinct readings, and the cost of a single
//! read is estimated. The resulting [`Environment`] is shared read-only by
//! every benchmark and parameter set of the run.

use crate::clock::{run_for_at_least, timed, Clock, MAX_ITERATIONS};
use crate::error::{Error, Result};
use crate::report::Reporter;
use crate::result::duration_serde;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A calibrated quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    /// Mean over all observations.
    #[serde(with = "duration_serde")]
    pub mean: Duration,
    /// Number of observations behind the mean.
    pub samples: usize,
}

/// Calibration result for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Smallest observable clock increment.
    pub clock_resolution: Estimate,
    /// Cost of one clock read.
    pub clock_cost: Estimate,
}

/// Time budgets for calibration.
#[derive(Debug, Clone)]
pub struct CalibrationSettings {
    pub warmup_time: Duration,
    pub warmup_seed: u64,
    pub resolution_time: Duration,
    pub cost_warmup_time: Duration,
    pub cost_time_limit: Duration,
    pub cost_tick_limit: u32,
    pub cost_seed: u64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            warmup_time: Duration::from_millis(100),
            warmup_seed: 10_000,
            resolution_time: Duration::from_millis(500),
            cost_warmup_time: Duration::from_millis(10),
            cost_time_limit: Duration::from_secs(1),
            cost_tick_limit: 100_000,
            cost_seed: 10_000,
        }
    }
}

impl CalibrationSettings {
    /// Small budgets, for tests and quick runs.
    pub fn quick() -> Self {
        Self {
            warmup_time: Duration::from_millis(1),
            warmup_seed: 100,
            resolution_time: Duration::from_millis(2),
            cost_warmup_time: Duration::from_micros(200),
            cost_time_limit: Duration::from_millis(2),
            cost_tick_limit: 1_000,
            cost_seed: 100,
        }
    }
}

/// Measures the clock once per run.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    settings: CalibrationSettings,
}

impl Calibrator {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self { settings }
    }

    /// Warm up, then estimate resolution and cost, each step bracketed by
    /// reporter notifications.
    pub fn measure(&self, clock: &dyn Clock, reporter: &mut dyn Reporter) -> Result<Environment> {
        reporter.warmup_start().map_err(Error::Reporter)?;
        let iterations = self.warmup(clock)?;
        reporter.warmup_end(iterations).map_err(Error::Reporter)?;

        reporter
            .estimate_clock_resolution_start()
            .map_err(Error::Reporter)?;
        let resolution = self.estimate_resolution(clock, iterations)?;
        reporter
            .estimate_clock_resolution_complete(&resolution)
            .map_err(Error::Reporter)?;

        reporter.estimate_clock_cost_start().map_err(Error::Reporter)?;
        let cost = self.estimate_cost(clock, resolution.mean)?;
        reporter
            .estimate_clock_cost_complete(&cost)
            .map_err(Error::Reporter)?;

        tracing::info!(
            resolution_ns = resolution.mean.as_nanos() as u64,
            cost_ns = cost.mean.as_nanos() as u64,
            "clock calibrated"
        );

        Ok(Environment {
            clock_resolution: resolution,
            clock_cost: cost,
        })
    }

    /// Read the clock in growing batches until the warmup budget is spent.
    fn warmup(&self, clock: &dyn Clock) -> Result<u64> {
        let timing = run_for_at_least::<_, _, Error>(
            self.settings.warmup_time,
            self.settings.warmup_seed.clamp(1, MAX_ITERATIONS),
            |k| Ok(timed(clock, || read_clock(clock, k))),
        )?;
        if timing.elapsed.is_zero() {
            return Err(Error::Calibration(format!(
                "clock did not advance over {} reads",
                timing.iterations
            )));
        }
        Ok(timing.iterations)
    }

    fn estimate_resolution(&self, clock: &dyn Clock, iterations: u64) -> Result<Estimate> {
        let deltas = run_for_at_least::<_, _, Error>(
            self.settings.resolution_time,
            iterations,
            |k| {
                let deltas = resolution_deltas(clock, k);
                let spanned: Duration = deltas.iter().sum();
                Ok((spanned, deltas))
            },
        )?
        .result;
        if deltas.is_empty() {
            return Err(Error::Calibration(
                "clock never advanced between readings".to_string(),
            ));
        }
        Ok(Estimate {
            mean: mean(&deltas),
            samples: deltas.len(),
        })
    }

    fn estimate_cost(&self, clock: &dyn Clock, resolution: Duration) -> Result<Estimate> {
        let time_limit = resolution
            .saturating_mul(self.settings.cost_tick_limit)
            .min(self.settings.cost_time_limit);
        let time_reads = |k: u64| timed(clock, || read_clock(clock, k)).0;

        time_reads(1);
        let timing = run_for_at_least::<_, _, Error>(
            self.settings.cost_warmup_time,
            self.settings.cost_seed.clamp(1, MAX_ITERATIONS),
            |k| Ok((time_reads(k), ())),
        )?;
        if timing.elapsed.is_zero() {
            return Err(Error::Calibration(
                "clock reads took no measurable time".to_string(),
            ));
        }

        let batches = (time_limit.as_secs_f64() / timing.elapsed.as_secs_f64())
            .ceil()
            .max(1.0) as usize;
        let per_read: Vec<Duration> = (0..batches)
            .map(|_| {
                let nanos = time_reads(timing.iterations).as_nanos() / timing.iterations as u128;
                Duration::from_nanos(nanos as u64)
            })
            .collect();
        Ok(Estimate {
            mean: mean(&per_read),
            samples: per_read.len(),
        })
    }
}

fn read_clock(clock: &dyn Clock, k: u64) {
    for _ in 0..k {
        std::hint::black_box(clock.now());
    }
}

/// Take `k + 1` readings and keep the gaps between distinct ones.
fn resolution_deltas(clock: &dyn Clock, k: u64) -> Vec<Duration> {
    let readings: Vec<Duration> = (0..=k).map(|_| clock.now()).collect();
    readings
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| w[1] - w[0])
        .collect()
}

fn mean(values: &[Duration]) -> Duration {
    if values.is_empty() {
        return Duration::ZERO;
    }
    let total: u128 = values.iter().map(Duration::as_nanos).sum();
    Duration::from_nanos((total / values.len() as u128) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::report::NullReporter;

    struct FrozenClock;

    impl Clock for FrozenClock {
        fn now(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    #[test]
    fn should_estimate_tick_when_manual_clock() {
        let clock = ManualClock::new(Duration::from_micros(1));
        let env = Calibrator::new(CalibrationSettings::quick())
            .measure(&clock, &mut NullReporter)
            .unwrap();

        assert_eq!(env.clock_resolution.mean, Duration::from_micros(1));
        assert!(env.clock_resolution.samples > 0);
        // k reads plus the closing read of the timer, divided by k
        assert!(env.clock_cost.mean >= Duration::from_micros(1));
        assert!(env.clock_cost.mean < Duration::from_micros(2));
    }

    #[test]
    fn should_fail_when_clock_frozen() {
        let err = Calibrator::new(CalibrationSettings::quick())
            .measure(&FrozenClock, &mut NullReporter)
            .unwrap_err();
        assert!(matches!(err, Error::Calibration(_)));
    }

    #[test]
    fn should_cap_seeds_when_larger_than_iteration_limit() {
        let clock = ManualClock::new(Duration::from_micros(1));
        let settings = CalibrationSettings {
            cost_seed: (u32::MAX as u64) + 1,
            ..CalibrationSettings::quick()
        };
        let env = Calibrator::new(settings)
            .measure(&clock, &mut NullReporter)
            .unwrap();

        assert_eq!(env.clock_resolution.mean, Duration::from_micros(1));
        assert!(env.clock_cost.mean >= Duration::from_micros(1));
        assert!(env.clock_cost.mean < Duration::from_micros(2));
    }

    #[test]
    fn should_ignore_repeated_readings_when_estimating_resolution() {
        struct Coarse(std::cell::Cell<u64>);
        impl Clock for Coarse {
            fn now(&self) -> Duration {
                let n = self.0.get();
                self.0.set(n + 1);
                // advances 10ns every fourth read
                Duration::from_nanos((n / 4) * 10)
            }
        }

        let deltas = resolution_deltas(&Coarse(std::cell::Cell::new(0)), 16);
        assert!(!deltas.is_empty());
        assert!(deltas.iter().all(|d| *d == Duration::from_nanos(10)));
    }

    #[test]
    fn should_average_durations() {
        let values = [Duration::from_nanos(10), Duration::from_nanos(30)];
        assert_eq!(mean(&values), Duration::from_nanos(20));
        assert_eq!(mean(&[]), Duration::ZERO);
    }
}
