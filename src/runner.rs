//! The execution orchestrator.
//!
//! A [`Runner`] owns the collaborators of a run (clock, calibrator,
//! parameter store, analyzer) and drives a registry of benchmarks through
//! calibration, selection, the parameter sweep and measurement, narrating
//! each step to a [`Reporter`].

use crate::analysis::{Analyzer, SummaryAnalyzer};
use crate::benchmark::{registered_benchmarks, Benchmark};
use crate::clock::{Clock, SystemClock};
use crate::config::Configuration;
use crate::environment::{CalibrationSettings, Calibrator, Environment};
use crate::error::{Error, Result};
use crate::guard::{guarded, Stage};
use crate::params::{ParameterSpecStore, Parameters};
use crate::report::{Reporter, ReporterRegistry};
use crate::{select, sweep};

/// Runs benchmarks and reports progress.
///
/// # Example
///
/// ```rust,no_run
/// use cntryl_micro::{Chronometer, Configuration, FnBenchmark, NullReporter, Runner};
/// use cntryl_micro::Benchmark;
///
/// let benches: Vec<Box<dyn Benchmark>> = vec![Box::new(FnBenchmark::new(
///     "sum",
///     |meter: &mut Chronometer<'_>| {
///         meter.measure(|i| (0..i).sum::<u64>());
///         Ok(())
///     },
/// ))];
///
/// Runner::new()
///     .run(&Configuration::new(), &benches, &mut NullReporter)
///     .unwrap();
/// ```
pub struct Runner {
    clock: Box<dyn Clock>,
    calibrator: Calibrator,
    store: ParameterSpecStore,
    analyzer: Box<dyn Analyzer>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// A runner on the system clock with default calibration, an empty
    /// parameter store and the summary analyzer.
    pub fn new() -> Self {
        Self {
            clock: Box::new(SystemClock::new()),
            calibrator: Calibrator::default(),
            store: ParameterSpecStore::new(),
            analyzer: Box::new(SummaryAnalyzer::new()),
        }
    }

    /// Use another clock for calibration and measurement.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Override calibration budgets.
    pub fn calibration(mut self, settings: CalibrationSettings) -> Self {
        self.calibrator = Calibrator::new(settings);
        self
    }

    /// Parameter specs available to sweeps.
    pub fn params(mut self, store: ParameterSpecStore) -> Self {
        self.store = store;
        self
    }

    pub fn analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzer = Box::new(analyzer);
        self
    }

    pub fn store(&self) -> &ParameterSpecStore {
        &self.store
    }

    /// Run `benchmarks` under `cfg`, reporting to `reporter`.
    ///
    /// Returns the first fault; nothing is reported after it.
    pub fn run(
        &mut self,
        cfg: &Configuration,
        benchmarks: &[Box<dyn Benchmark>],
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        select::validate(benchmarks)?;

        emit(reporter.configure(cfg))?;
        let env = self.calibrator.measure(self.clock.as_ref(), reporter)?;

        emit(reporter.suite_start())?;
        tracing::info!(title = %cfg.title, benchmarks = benchmarks.len(), "suite started");

        let selected = select::filter(benchmarks, &cfg.filter)?;
        let sweep = sweep::generate(cfg, &mut self.store)?;

        for params in &sweep {
            emit(reporter.params_start(params))?;
            tracing::debug!(%params, "parameter set started");
            for bench in &selected {
                self.run_one(cfg, *bench, params, &env, reporter)?;
            }
            emit(reporter.params_complete())?;
        }

        emit(reporter.suite_complete())?;
        tracing::info!(
            parameter_sets = sweep.len(),
            benchmarks = selected.len(),
            "suite completed"
        );
        Ok(())
    }

    /// Like [`run`](Self::run), taking the reporter by value and handing it
    /// back when the run succeeds.
    pub fn run_with<R: Reporter>(
        &mut self,
        cfg: &Configuration,
        benchmarks: &[Box<dyn Benchmark>],
        mut reporter: R,
    ) -> Result<R> {
        self.run(cfg, benchmarks, &mut reporter)?;
        Ok(reporter)
    }

    /// Run with the reporter named by `cfg.reporter` in `registry`.
    pub fn run_named(
        &mut self,
        cfg: &Configuration,
        registry: &ReporterRegistry,
        benchmarks: &[Box<dyn Benchmark>],
    ) -> Result<()> {
        let mut reporter = registry.create(&cfg.reporter, cfg)?;
        self.run(cfg, benchmarks, reporter.as_mut())
    }

    /// Run every benchmark in [`BENCHMARKS`](crate::BENCHMARKS).
    ///
    /// The reporter is resolved before the benchmark registry is read.
    pub fn run_registered(
        &mut self,
        cfg: &Configuration,
        registry: &ReporterRegistry,
    ) -> Result<()> {
        let mut reporter = registry.create(&cfg.reporter, cfg)?;
        let benchmarks = registered_benchmarks();
        self.run(cfg, &benchmarks, reporter.as_mut())
    }

    fn run_one(
        &self,
        cfg: &Configuration,
        bench: &dyn Benchmark,
        params: &Parameters,
        env: &Environment,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let name = bench.name();
        let clock = self.clock.as_ref();
        emit(reporter.benchmark_start(name))?;

        let plan = guarded(name, Stage::Prepare, reporter, || {
            bench.prepare(cfg, params, env, clock)
        })?;
        let summary = plan.summary();
        tracing::debug!(
            benchmark = name,
            iterations = summary.iterations_per_sample,
            samples = summary.samples,
            "plan ready"
        );

        emit(reporter.measurement_start(&summary))?;
        let samples = guarded(name, Stage::Run, reporter, || plan.run(cfg, env, clock))?;
        emit(reporter.measurement_complete(&samples))?;

        if cfg.analysis {
            emit(reporter.analysis_start())?;
            let analysis = self.analyzer.analyse(cfg, env, &samples);
            emit(reporter.analysis_complete(&analysis))?;
        }

        emit(reporter.benchmark_complete())
    }
}

/// Run the benchmarks in [`BENCHMARKS`](crate::BENCHMARKS) with the
/// reporter named by `cfg.reporter`, using default collaborators.
pub fn run_default(cfg: &Configuration) -> Result<()> {
    Runner::new().run_registered(cfg, &ReporterRegistry::default())
}

fn emit(result: anyhow::Result<()>) -> Result<()> {
    result.map_err(Error::Reporter)
}
