//! Configuration for a benchmark run.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// A request to repeat the suite over a stepped parameter.
///
/// The operator is kept as written so that an unknown symbol surfaces as
/// [`Error::UnknownStepOperator`] when the sweep is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepRequest {
    /// Parameter name, looked up in the parameter store.
    pub name: String,
    /// `+`/`add` or `*`/`multiply`.
    pub operator: String,
    /// First value.
    pub init: String,
    /// Step applied between values.
    pub step: String,
    /// Number of values to produce.
    pub count: usize,
}

impl SweepRequest {
    pub fn new(
        name: impl Into<String>,
        operator: impl Into<String>,
        init: impl Into<String>,
        step: impl Into<String>,
        count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            operator: operator.into(),
            init: init.into(),
            step: step.into(),
            count,
        }
    }

    /// Parse `name:op:init:step:count`, e.g. `size:*:16:2:8`.
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split(':').collect();
        let [name, operator, init, step, count] = parts.as_slice() else {
            return Err(Error::InvalidSweep(text.to_string()));
        };
        if name.is_empty() {
            return Err(Error::InvalidSweep(text.to_string()));
        }
        let count = count
            .parse()
            .map_err(|_| Error::InvalidSweep(text.to_string()))?;
        Ok(Self::new(*name, *operator, *init, *step, count))
    }
}

/// Configuration for a benchmark run.
///
/// Built once before the run and never mutated while it executes.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Name of the reporter to resolve from the registry.
    pub reporter: String,
    /// Regular expression a benchmark name must match in full.
    pub filter: String,
    /// Run the analysis step after each measurement.
    pub analysis: bool,
    /// Optional parameter sweep.
    pub sweep: Option<SweepRequest>,
    /// Samples collected per benchmark and parameter set.
    pub samples: usize,
    /// Time spent running a benchmark before its samples are taken.
    pub warmup_time: Duration,
    /// Output file for reporters that write one.
    pub output: Option<PathBuf>,
    /// Title of the run, shown by reporters.
    pub title: String,
    /// Git SHA to include in results.
    pub git_sha: Option<String>,
    /// Verbose logging.
    pub verbose: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            reporter: "standard".to_string(),
            filter: ".*".to_string(),
            analysis: true,
            sweep: None,
            samples: 100,
            warmup_time: Duration::from_millis(100),
            output: None,
            title: "benchmarks".to_string(),
            git_sha: None,
            verbose: false,
        }
    }
}

impl Configuration {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `MICRO_REPORTER`: reporter name (default: standard)
    /// - `MICRO_FILTER`: benchmark name regex (default: `.*`)
    /// - `MICRO_NO_ANALYSIS`: skip analysis when set to anything but `0`/`false`
    /// - `MICRO_SAMPLES`: samples per benchmark (default: 100)
    /// - `MICRO_SWEEP`: sweep as `name:op:init:step:count`
    /// - `MICRO_OUTPUT`: output file
    /// - `MICRO_TITLE`: run title
    /// - `MICRO_GIT_SHA`: git commit hash
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("MICRO_REPORTER") {
            cfg.reporter = v;
        }
        if let Ok(v) = std::env::var("MICRO_FILTER") {
            cfg.filter = v;
        }
        if let Ok(v) = std::env::var("MICRO_NO_ANALYSIS") {
            cfg.analysis = v == "0" || v.eq_ignore_ascii_case("false");
        }
        if let Ok(v) = std::env::var("MICRO_SAMPLES") {
            if let Ok(n) = v.parse() {
                cfg.samples = n;
            }
        }
        if let Ok(v) = std::env::var("MICRO_SWEEP") {
            match SweepRequest::parse(&v) {
                Ok(sweep) => cfg.sweep = Some(sweep),
                Err(e) => tracing::warn!("ignoring MICRO_SWEEP: {}", e),
            }
        }
        if let Ok(v) = std::env::var("MICRO_OUTPUT") {
            cfg.output = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("MICRO_TITLE") {
            cfg.title = v;
        }
        if let Ok(v) = std::env::var("MICRO_GIT_SHA") {
            cfg.git_sha = Some(v);
        }

        if cfg.git_sha.is_none() {
            cfg.git_sha = detect_git_sha();
        }

        cfg
    }

    /// Set the reporter name.
    pub fn reporter(mut self, name: impl Into<String>) -> Self {
        self.reporter = name.into();
        self
    }

    /// Set the name filter.
    pub fn filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = pattern.into();
        self
    }

    /// Enable or disable analysis.
    pub fn analysis(mut self, enabled: bool) -> Self {
        self.analysis = enabled;
        self
    }

    /// Sweep a parameter.
    pub fn sweep(mut self, sweep: SweepRequest) -> Self {
        self.sweep = Some(sweep);
        self
    }

    /// Set the number of samples.
    pub fn samples(mut self, n: usize) -> Self {
        self.samples = n;
        self
    }

    /// Set the per-benchmark warmup time.
    pub fn warmup_time(mut self, d: Duration) -> Self {
        self.warmup_time = d;
        self
    }

    /// Set the output file.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Set the run title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set git SHA.
    pub fn git_sha(mut self, sha: impl Into<String>) -> Self {
        self.git_sha = Some(sha.into());
        self
    }

    /// Set verbose output.
    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }
}

fn detect_git_sha() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|o| {
            if o.status.success() {
                String::from_utf8(o.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_everything_by_default() {
        let cfg = Configuration::default();
        assert_eq!(cfg.reporter, "standard");
        assert_eq!(cfg.filter, ".*");
        assert!(cfg.analysis);
        assert!(cfg.sweep.is_none());
    }

    #[test]
    fn should_build_config_with_builder() {
        let cfg = Configuration::new()
            .reporter("json")
            .filter("vec_.*")
            .analysis(false)
            .samples(10)
            .sweep(SweepRequest::new("size", "*", "1", "2", 4));

        assert_eq!(cfg.reporter, "json");
        assert_eq!(cfg.filter, "vec_.*");
        assert!(!cfg.analysis);
        assert_eq!(cfg.samples, 10);
        assert_eq!(cfg.sweep.map(|s| s.count), Some(4));
    }

    #[test]
    fn should_parse_sweep_when_well_formed() {
        let sweep = SweepRequest::parse("size:*:16:2:8").unwrap();
        assert_eq!(sweep, SweepRequest::new("size", "*", "16", "2", 8));
    }

    #[test]
    fn should_keep_unknown_operator_for_later() {
        let sweep = SweepRequest::parse("size:^:1:2:3").unwrap();
        assert_eq!(sweep.operator, "^");
    }

    #[test]
    fn should_reject_sweep_when_malformed() {
        assert!(matches!(
            SweepRequest::parse("size:+:1:2"),
            Err(Error::InvalidSweep(_))
        ));
        assert!(matches!(
            SweepRequest::parse("size:+:1:2:many"),
            Err(Error::InvalidSweep(_))
        ));
        assert!(matches!(
            SweepRequest::parse(":+:1:2:3"),
            Err(Error::InvalidSweep(_))
        ));
    }
}
