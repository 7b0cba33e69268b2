//! # cntryl-micro
//!
//! A calibrated micro-benchmark runner.
//!
//! A run calibrates the clock once, selects benchmarks by a whole-name
//! regular expression, optionally repeats the suite over a stepped
//! parameter, and measures every selected benchmark under every parameter
//! set. Progress is streamed to a [`Reporter`] as a strictly nested sequence
//! of events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cntryl_micro::{Benchmark, Chronometer, Configuration, FnBenchmark, Runner};
//! use cntryl_micro::ConsoleReporter;
//!
//! let benches: Vec<Box<dyn Benchmark>> = vec![Box::new(FnBenchmark::new(
//!     "vec_push",
//!     |meter: &mut Chronometer<'_>| {
//!         meter.measure(|i| {
//!             let mut v = Vec::new();
//!             v.push(i);
//!             v
//!         });
//!         Ok(())
//!     },
//! ))];
//!
//! let cfg = Configuration::from_env();
//! Runner::new()
//!     .run(&cfg, &benches, &mut ConsoleReporter::stdout())
//!     .unwrap();
//! ```
//!
//! Benchmarks registered in [`BENCHMARKS`] are run by [`harness::main`].

mod analysis;
mod benchmark;
mod clock;
mod config;
mod environment;
mod error;
mod params;
mod report;
mod result;
mod runner;

pub mod guard;
pub mod harness;
pub mod select;
pub mod sweep;

pub use analysis::{Analyzer, SampleAnalysis, SummaryAnalyzer};
pub use benchmark::{
    linkme, registered_benchmarks, Benchmark, BenchmarkEntry, Chronometer, FnBenchmark, Plan,
    PlanSummary, Sample, BENCHMARKS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Configuration, SweepRequest};
pub use environment::{CalibrationSettings, Calibrator, Environment, Estimate};
pub use error::{Error, Result};
pub use params::{
    InvalidValue, NumericSpec, ParamSpec, ParameterSpecStore, Parameters, StepOperator, Steppable,
};
pub use report::{
    format_duration, format_nanos, ConsoleReporter, JsonReporter, NullReporter, Reporter,
    ReporterRegistry,
};
pub use result::{BenchmarkRecord, RunRecord};
pub use runner::{run_default, Runner};
