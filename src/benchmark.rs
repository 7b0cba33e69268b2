//! Benchmarks, their plans, and the chronometer handed to benchmark code.
//!
//! A [`Benchmark`] is prepared once per parameter set into a [`Plan`], which
//! is then run exactly once to produce the [`Sample`]s for that pair. Plans
//! are owned by the execution that made them and consumed by `run`.
//!
//! Most benchmarks are plain functions wrapped in a [`FnBenchmark`]:
//!
//! ```rust,no_run
//! use cntryl_micro::{Chronometer, FnBenchmark};
//!
//! let bench = FnBenchmark::new("vec_push", |meter: &mut Chronometer<'_>| {
//!     let size: usize = meter.params().parse_or("size", 1024)?;
//!     meter.measure(|_| {
//!         let mut v = Vec::with_capacity(size);
//!         for i in 0..size {
//!             v.push(i);
//!         }
//!         v
//!     });
//!     Ok(())
//! });
//! ```

use crate::clock::{run_for_at_least, timed, Clock, MAX_ITERATIONS};
use crate::config::Configuration;
use crate::environment::Environment;
use crate::params::Parameters;
use crate::result::duration_serde;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Each sample should span at least this many clock ticks.
const MINIMUM_TICKS: u32 = 1_000;

/// One measurement: elapsed time per iteration, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample(f64);

impl Sample {
    pub fn from_nanos(nanos: f64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(self) -> f64 {
        self.0
    }
}

/// What a plan is about to do, as shown to reporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Iterations timed together to form one sample.
    pub iterations_per_sample: u64,
    /// Samples that will be collected.
    pub samples: usize,
    /// Warmup before the first sample.
    #[serde(with = "duration_serde")]
    pub warmup_time: Duration,
    /// Rough wall time of the whole measurement.
    #[serde(with = "duration_serde")]
    pub estimated_duration: Duration,
}

/// A prepared measurement, consumed by running it.
pub trait Plan {
    fn summary(&self) -> PlanSummary;

    fn run(
        self: Box<Self>,
        cfg: &Configuration,
        env: &Environment,
        clock: &dyn Clock,
    ) -> anyhow::Result<Vec<Sample>>;
}

/// A named, timed routine.
///
/// Names identify benchmarks and must be unique within a registry.
pub trait Benchmark {
    fn name(&self) -> &str;

    fn prepare<'a>(
        &'a self,
        cfg: &Configuration,
        params: &Parameters,
        env: &Environment,
        clock: &dyn Clock,
    ) -> anyhow::Result<Box<dyn Plan + 'a>>;
}

/// Timing handle passed to benchmark functions.
///
/// The function must call one of the `measure` methods exactly once; setup
/// before it and teardown after it are not timed.
pub struct Chronometer<'a> {
    clock: &'a dyn Clock,
    params: &'a Parameters,
    iterations: u64,
    elapsed: Option<Duration>,
}

impl<'a> Chronometer<'a> {
    pub(crate) fn new(clock: &'a dyn Clock, params: &'a Parameters, iterations: u64) -> Self {
        Self {
            clock,
            params,
            iterations,
            elapsed: None,
        }
    }

    /// Number of times the measured body will run.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Parameters of the current pass.
    pub fn params(&self) -> &Parameters {
        self.params
    }

    /// Run `body` once per iteration, timing the whole batch.
    ///
    /// The body receives the iteration index. Its result is passed through
    /// [`std::hint::black_box`] so the work is not optimized away.
    pub fn measure<F, R>(&mut self, mut body: F)
    where
        F: FnMut(u64) -> R,
    {
        let iterations = self.iterations;
        let (elapsed, ()) = timed(self.clock, || {
            for i in 0..iterations {
                std::hint::black_box(body(i));
            }
        });
        self.elapsed = Some(elapsed);
    }

    /// Like [`measure`](Self::measure), with per-iteration inputs built
    /// untimed up front.
    pub fn measure_with<S, I, F, R>(&mut self, mut setup: S, mut body: F)
    where
        S: FnMut(u64) -> I,
        F: FnMut(&mut I) -> R,
    {
        let mut inputs: Vec<I> = (0..self.iterations).map(&mut setup).collect();
        let (elapsed, ()) = timed(self.clock, || {
            for input in inputs.iter_mut() {
                std::hint::black_box(body(input));
            }
        });
        self.elapsed = Some(elapsed);
        drop(inputs);
    }

    /// Manually record the batch duration, for timing done elsewhere.
    pub fn record_duration(&mut self, duration: Duration) {
        self.elapsed = Some(duration);
    }

    fn finish(self) -> anyhow::Result<Duration> {
        self.elapsed.ok_or_else(|| {
            anyhow::anyhow!("benchmark did not call measure(); every benchmark must time its body")
        })
    }
}

/// A benchmark backed by a function taking a [`Chronometer`].
pub struct FnBenchmark<F> {
    name: String,
    func: F,
}

impl<F> FnBenchmark<F>
where
    F: Fn(&mut Chronometer<'_>) -> anyhow::Result<()>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Run one batch of `iterations`, returning the measured time.
    fn run_batch(
        &self,
        clock: &dyn Clock,
        params: &Parameters,
        iterations: u64,
    ) -> anyhow::Result<Duration> {
        let mut meter = Chronometer::new(clock, params, iterations);
        (self.func)(&mut meter)?;
        meter.finish()
    }
}

impl<F> Benchmark for FnBenchmark<F>
where
    F: Fn(&mut Chronometer<'_>) -> anyhow::Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare<'a>(
        &'a self,
        cfg: &Configuration,
        params: &Parameters,
        env: &Environment,
        clock: &dyn Clock,
    ) -> anyhow::Result<Box<dyn Plan + 'a>> {
        let min_time = env.clock_resolution.mean.saturating_mul(MINIMUM_TICKS);
        let probe = run_for_at_least(min_time, 1, |k| {
            self.run_batch(clock, params, k).map(|d| (d, ()))
        })?;

        let per_iteration = probe.elapsed.as_nanos() as f64 / probe.iterations as f64;
        let iterations_per_sample = if per_iteration > 0.0 {
            (min_time.as_nanos() as f64 / per_iteration)
                .ceil()
                .clamp(1.0, MAX_ITERATIONS as f64) as u64
        } else {
            probe.iterations
        };
        let estimated = Duration::from_nanos(
            (per_iteration * iterations_per_sample as f64 * cfg.samples as f64) as u64,
        );

        Ok(Box::new(TimedPlan {
            bench: self,
            params: params.clone(),
            summary: PlanSummary {
                iterations_per_sample,
                samples: cfg.samples,
                warmup_time: cfg.warmup_time,
                estimated_duration: estimated + cfg.warmup_time,
            },
        }))
    }
}

/// Plan produced by [`FnBenchmark`].
struct TimedPlan<'a, F> {
    bench: &'a FnBenchmark<F>,
    params: Parameters,
    summary: PlanSummary,
}

impl<F> Plan for TimedPlan<'_, F>
where
    F: Fn(&mut Chronometer<'_>) -> anyhow::Result<()>,
{
    fn summary(&self) -> PlanSummary {
        self.summary.clone()
    }

    fn run(
        self: Box<Self>,
        cfg: &Configuration,
        env: &Environment,
        clock: &dyn Clock,
    ) -> anyhow::Result<Vec<Sample>> {
        let iterations = self.summary.iterations_per_sample;

        if !cfg.warmup_time.is_zero() {
            run_for_at_least(cfg.warmup_time, iterations, |k| {
                self.bench
                    .run_batch(clock, &self.params, k)
                    .map(|d| (d, ()))
            })?;
        }

        let overhead = env.clock_cost.mean;
        let mut samples = Vec::with_capacity(self.summary.samples);
        for _ in 0..self.summary.samples {
            let elapsed = self.bench.run_batch(clock, &self.params, iterations)?;
            let net = elapsed.saturating_sub(overhead);
            samples.push(Sample::from_nanos(
                net.as_nanos() as f64 / iterations as f64,
            ));
        }
        Ok(samples)
    }
}

/// A benchmark registered in the process-wide [`BENCHMARKS`] slice.
pub struct BenchmarkEntry {
    pub name: &'static str,
    pub func: fn(&mut Chronometer<'_>) -> anyhow::Result<()>,
}

// Re-export linkme so registrations do not need their own dependency.
#[doc(hidden)]
pub use linkme;

/// Benchmarks registered anywhere in the final binary.
///
/// ```rust,ignore
/// use cntryl_micro::{linkme::distributed_slice, BenchmarkEntry, Chronometer, BENCHMARKS};
///
/// #[distributed_slice(BENCHMARKS)]
/// #[linkme(crate = cntryl_micro::linkme)]
/// static NOOP: BenchmarkEntry = BenchmarkEntry { name: "noop", func: noop };
///
/// fn noop(meter: &mut Chronometer<'_>) -> anyhow::Result<()> {
///     meter.measure(|_| ());
///     Ok(())
/// }
/// ```
#[linkme::distributed_slice]
pub static BENCHMARKS: [BenchmarkEntry];

/// The registered benchmarks, in link order, ready to run.
pub fn registered_benchmarks() -> Vec<Box<dyn Benchmark>> {
    BENCHMARKS
        .iter()
        .map(|entry| Box::new(FnBenchmark::new(entry.name, entry.func)) as Box<dyn Benchmark>)
        .collect()
}
