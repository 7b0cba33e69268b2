//! Pluggable reporters for benchmark progress and results.
//!
//! The runner calls a [`Reporter`] synchronously, in a fixed order:
//!
//! ```text
//! configure
//! warmup_start, warmup_end
//! estimate_clock_resolution_start, estimate_clock_resolution_complete
//! estimate_clock_cost_start, estimate_clock_cost_complete
//! suite_start
//!   params_start                          (once per parameter set)
//!     benchmark_start                     (once per selected benchmark)
//!       measurement_start, measurement_complete
//!       analysis_start, analysis_complete (when analysis is enabled)
//!     benchmark_complete
//!   params_complete
//! suite_complete
//! ```
//!
//! `benchmark_failure` replaces the rest of a benchmark's events when its
//! code faults; nothing follows it. The strict nesting lets a reporter
//! stream output without buffering the run.

use crate::analysis::SampleAnalysis;
use crate::benchmark::{PlanSummary, Sample};
use crate::config::Configuration;
use crate::environment::{Environment, Estimate};
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::result::{unix_millis, BenchmarkRecord, RunRecord};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Receiver of run progress.
///
/// Every callback defaults to doing nothing. An error returned from any
/// callback aborts the run.
#[allow(unused_variables)]
pub trait Reporter {
    fn configure(&mut self, cfg: &Configuration) -> anyhow::Result<()> {
        Ok(())
    }

    fn warmup_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn warmup_end(&mut self, iterations: u64) -> anyhow::Result<()> {
        Ok(())
    }

    fn estimate_clock_resolution_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn estimate_clock_resolution_complete(&mut self, estimate: &Estimate) -> anyhow::Result<()> {
        Ok(())
    }

    fn estimate_clock_cost_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn estimate_clock_cost_complete(&mut self, estimate: &Estimate) -> anyhow::Result<()> {
        Ok(())
    }

    fn suite_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn params_start(&mut self, params: &Parameters) -> anyhow::Result<()> {
        Ok(())
    }

    fn benchmark_start(&mut self, name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn measurement_start(&mut self, plan: &PlanSummary) -> anyhow::Result<()> {
        Ok(())
    }

    fn measurement_complete(&mut self, samples: &[Sample]) -> anyhow::Result<()> {
        Ok(())
    }

    fn analysis_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn analysis_complete(&mut self, analysis: &SampleAnalysis) -> anyhow::Result<()> {
        Ok(())
    }

    fn benchmark_failure(&mut self, error: &anyhow::Error) -> anyhow::Result<()> {
        Ok(())
    }

    fn benchmark_complete(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn params_complete(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn suite_complete(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Fixed width for benchmark name column in console output.
const NAME_WIDTH: usize = 40;
/// Fixed width for duration column in console output.
const DURATION_WIDTH: usize = 14;

const RULE: &str = "---------------------------------------------------------------";

/// Console reporter that streams one line per benchmark.
///
/// Registered as `standard`.
pub struct ConsoleReporter<W: Write = std::io::Stdout> {
    out: W,
    verbose: bool,
    title: String,
    samples: usize,
    resolution: Option<Estimate>,
    cost: Option<Estimate>,
    started: Option<Instant>,
    current: Option<String>,
    mean: Option<f64>,
    analysis: Option<SampleAnalysis>,
    completed: usize,
}

impl ConsoleReporter {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            verbose: false,
            title: String::new(),
            samples: 0,
            resolution: None,
            cost: None,
            started: None,
            current: None,
            mean: None,
            analysis: None,
            completed: 0,
        }
    }

    /// Print plans and calibration progress as well.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, message: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{}", message)?;
        self.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        self.current.as_deref().unwrap_or("<unknown>")
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn configure(&mut self, cfg: &Configuration) -> anyhow::Result<()> {
        self.title = cfg.title.clone();
        self.samples = cfg.samples;
        self.verbose |= cfg.verbose;
        Ok(())
    }

    fn warmup_start(&mut self) -> anyhow::Result<()> {
        if self.verbose {
            self.line("  warming up clock ...")?;
        }
        Ok(())
    }

    fn estimate_clock_resolution_complete(&mut self, estimate: &Estimate) -> anyhow::Result<()> {
        self.resolution = Some(*estimate);
        Ok(())
    }

    fn estimate_clock_cost_complete(&mut self, estimate: &Estimate) -> anyhow::Result<()> {
        self.cost = Some(*estimate);
        Ok(())
    }

    fn suite_start(&mut self) -> anyhow::Result<()> {
        self.started = Some(Instant::now());
        let mut header = format!(
            "{RULE}\nBenchmark Suite: {}\nSamples: {}",
            self.title, self.samples
        );
        if let (Some(res), Some(cost)) = (self.resolution, self.cost) {
            header.push_str(&format!(
                "\nClock resolution: {}, cost: {}",
                format_duration(res.mean),
                format_duration(cost.mean)
            ));
        }
        header.push_str(&format!("\n{RULE}"));
        self.line(&header)
    }

    fn params_start(&mut self, params: &Parameters) -> anyhow::Result<()> {
        if params.is_empty() {
            return Ok(());
        }
        self.line(&format!("  parameters {}", params))
    }

    fn benchmark_start(&mut self, name: &str) -> anyhow::Result<()> {
        self.current = Some(name.to_string());
        self.mean = None;
        self.analysis = None;
        Ok(())
    }

    fn measurement_start(&mut self, plan: &PlanSummary) -> anyhow::Result<()> {
        if self.verbose {
            let message = format!(
                "  {} ... {} samples x {} iterations, estimated {}",
                self.name(),
                plan.samples,
                plan.iterations_per_sample,
                format_duration(plan.estimated_duration)
            );
            self.line(&message)?;
        }
        Ok(())
    }

    fn measurement_complete(&mut self, samples: &[Sample]) -> anyhow::Result<()> {
        if !samples.is_empty() {
            let total: f64 = samples.iter().map(|s| s.as_nanos()).sum();
            self.mean = Some(total / samples.len() as f64);
        }
        Ok(())
    }

    fn analysis_complete(&mut self, analysis: &SampleAnalysis) -> anyhow::Result<()> {
        self.analysis = Some(analysis.clone());
        Ok(())
    }

    fn benchmark_failure(&mut self, error: &anyhow::Error) -> anyhow::Result<()> {
        let message = format!(
            "  {:<width$} {:>dur_width$}  ({:#})",
            self.name(),
            "FAILED",
            error,
            width = NAME_WIDTH,
            dur_width = DURATION_WIDTH
        );
        self.line(&message)
    }

    fn benchmark_complete(&mut self) -> anyhow::Result<()> {
        let mean = self
            .analysis
            .as_ref()
            .map(|a| a.mean)
            .or(self.mean)
            .map(format_nanos)
            .unwrap_or_else(|| "-".to_string());

        let mut message = format!(
            "  {:<width$} {:>dur_width$}",
            self.name(),
            mean,
            width = NAME_WIDTH,
            dur_width = DURATION_WIDTH
        );
        if let Some(a) = &self.analysis {
            message.push_str(&format!("  (± {}", format_nanos(a.std_dev)));
            let outliers = a.low_outliers + a.high_outliers;
            if outliers > 0 {
                message.push_str(&format!(", {} outliers", outliers));
            }
            message.push(')');
        }
        self.completed += 1;
        self.line(&message)
    }

    fn suite_complete(&mut self) -> anyhow::Result<()> {
        let total = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let footer = format!(
            "{RULE}\nCompleted {} benchmarks in {}\n{RULE}",
            self.completed,
            format_duration(total)
        );
        self.line(&footer)
    }
}

/// JSON reporter that writes a [`RunRecord`] when the suite completes.
///
/// Writes to the configured output file, or stdout without one. Registered
/// as `json`.
#[derive(Debug)]
pub struct JsonReporter {
    output: Option<PathBuf>,
    run: RunRecord,
    resolution: Option<Estimate>,
    params: Parameters,
    current: Option<BenchmarkRecord>,
}

impl JsonReporter {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            output,
            run: RunRecord::new(""),
            resolution: None,
            params: Parameters::new(),
            current: None,
        }
    }

    /// Records collected so far.
    pub fn record(&self) -> &RunRecord {
        &self.run
    }

    fn current(&mut self) -> anyhow::Result<&mut BenchmarkRecord> {
        self.current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("measurement event outside of a benchmark"))
    }

    fn write(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.run)?;
        match &self.output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, json)?;
                tracing::info!(path = %path.display(), "results written");
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", json)?;
            }
        }
        Ok(())
    }
}

impl Reporter for JsonReporter {
    fn configure(&mut self, cfg: &Configuration) -> anyhow::Result<()> {
        self.run.title = cfg.title.clone();
        self.run.git_sha = cfg.git_sha.clone();
        if self.output.is_none() {
            self.output = cfg.output.clone();
        }
        Ok(())
    }

    fn estimate_clock_resolution_complete(&mut self, estimate: &Estimate) -> anyhow::Result<()> {
        self.resolution = Some(*estimate);
        Ok(())
    }

    fn estimate_clock_cost_complete(&mut self, estimate: &Estimate) -> anyhow::Result<()> {
        if let Some(resolution) = self.resolution {
            self.run.environment = Some(Environment {
                clock_resolution: resolution,
                clock_cost: *estimate,
            });
        }
        Ok(())
    }

    fn suite_start(&mut self) -> anyhow::Result<()> {
        self.run.started_at = unix_millis();
        Ok(())
    }

    fn params_start(&mut self, params: &Parameters) -> anyhow::Result<()> {
        self.params = params.clone();
        Ok(())
    }

    fn benchmark_start(&mut self, name: &str) -> anyhow::Result<()> {
        self.current = Some(BenchmarkRecord::new(name, self.params.clone()));
        Ok(())
    }

    fn measurement_start(&mut self, plan: &PlanSummary) -> anyhow::Result<()> {
        self.current()?.plan = Some(plan.clone());
        Ok(())
    }

    fn measurement_complete(&mut self, samples: &[Sample]) -> anyhow::Result<()> {
        self.current()?.samples = samples.to_vec();
        Ok(())
    }

    fn analysis_complete(&mut self, analysis: &SampleAnalysis) -> anyhow::Result<()> {
        self.current()?.analysis = Some(analysis.clone());
        Ok(())
    }

    fn benchmark_failure(&mut self, error: &anyhow::Error) -> anyhow::Result<()> {
        // the run stops here, so flush what we have
        if let Some(mut record) = self.current.take() {
            record.error = Some(format!("{:#}", error));
            self.run.results.push(record);
        }
        self.write()
    }

    fn benchmark_complete(&mut self) -> anyhow::Result<()> {
        if let Some(record) = self.current.take() {
            self.run.results.push(record);
        }
        Ok(())
    }

    fn suite_complete(&mut self) -> anyhow::Result<()> {
        self.write()
    }
}

type ReporterFactory = Box<dyn Fn(&Configuration) -> Box<dyn Reporter>>;

/// Reporters available by name.
pub struct ReporterRegistry {
    factories: BTreeMap<String, ReporterFactory>,
}

impl ReporterRegistry {
    /// A registry with no reporters.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Add or replace a reporter factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Configuration) -> Box<dyn Reporter> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Build the named reporter.
    pub fn create(&self, name: &str, cfg: &Configuration) -> Result<Box<dyn Reporter>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::ReporterNotFound(name.to_string()))?;
        Ok(factory(cfg))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for ReporterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("standard", |cfg| {
                Box::new(ConsoleReporter::stdout().verbose(cfg.verbose))
            })
            .register("json", |cfg| Box::new(JsonReporter::new(cfg.output.clone())));
        registry
    }
}

/// Format a duration with consistent units: ns, us, ms, or s.
/// Always uses 2 decimal places, no scientific notation.
pub fn format_duration(d: Duration) -> String {
    format_nanos(d.as_nanos() as f64)
}

/// [`format_duration`] for fractional nanoseconds.
pub fn format_nanos(nanos: f64) -> String {
    let secs = nanos / 1e9;
    if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else if secs >= 0.001 {
        format!("{:.2}ms", secs * 1_000.0)
    } else if secs >= 0.000_001 {
        format!("{:.2}us", secs * 1_000_000.0)
    } else {
        format!("{:.2}ns", nanos)
    }
}
