//! Command-line entry point for benchmark binaries.
//!
//! A bench target with `harness = false` only needs:
//!
//! ```rust,ignore
//! fn main() {
//!     cntryl_micro::harness::main();
//! }
//! ```
//!
//! Settings come from `MICRO_*` environment variables first, then from the
//! command line.

use crate::benchmark::registered_benchmarks;
use crate::config::{Configuration, SweepRequest};
use crate::report::ReporterRegistry;
use crate::runner::Runner;
use crate::select;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "micro",
    about = "Run registered micro-benchmarks",
    long_about = "
Runs every benchmark registered in the binary, or those whose name fully
matches FILTER, after calibrating the clock.

Example:
    micro                          # Run everything
    micro 'vec_.*'                 # Whole-name regex filter
    micro --sweep size:*:16:2:6    # Repeat over size = 16, 32, ..., 512
    micro --reporter json -o run.json
"
)]
pub struct Args {
    /// Regular expression a benchmark name must match in full
    filter: Option<String>,

    /// Reporter to use (see --list-reporters)
    #[arg(long, short = 'r')]
    reporter: Option<String>,

    /// Samples per benchmark and parameter set
    #[arg(long, short = 's')]
    samples: Option<usize>,

    /// Skip the analysis step
    #[arg(long)]
    no_analysis: bool,

    /// Parameter sweep as name:op:init:step:count (op is + or *)
    #[arg(long)]
    sweep: Option<String>,

    /// Output file for reporters that write one
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Title of the run
    #[arg(long)]
    title: Option<String>,

    /// List matching benchmarks without running them
    #[arg(long)]
    list: bool,

    /// List available reporters
    #[arg(long)]
    list_reporters: bool,

    /// Verbose output
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    /// Layer the command line over `cfg`.
    pub fn apply(&self, mut cfg: Configuration) -> anyhow::Result<Configuration> {
        if let Some(filter) = &self.filter {
            cfg.filter = filter.clone();
        }
        if let Some(reporter) = &self.reporter {
            cfg.reporter = reporter.clone();
        }
        if let Some(samples) = self.samples {
            cfg.samples = samples;
        }
        if self.no_analysis {
            cfg.analysis = false;
        }
        if let Some(sweep) = &self.sweep {
            cfg.sweep = Some(SweepRequest::parse(sweep)?);
        }
        if let Some(output) = &self.output {
            cfg.output = Some(output.clone());
        }
        if let Some(title) = &self.title {
            cfg.title = title.clone();
        }
        cfg.verbose |= self.verbose;
        Ok(cfg)
    }
}

/// Parse the process arguments and run with the default reporters.
pub fn run_cli(runner: Runner) -> anyhow::Result<()> {
    run_cli_with(runner, &ReporterRegistry::default(), Args::parse())
}

/// Run with explicit arguments and reporters.
pub fn run_cli_with(
    mut runner: Runner,
    registry: &ReporterRegistry,
    args: Args,
) -> anyhow::Result<()> {
    let cfg = args.apply(Configuration::from_env())?;
    init_logging(cfg.verbose);

    if args.list_reporters {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    if args.list {
        let benchmarks = registered_benchmarks();
        for bench in select::filter(&benchmarks, &cfg.filter)? {
            println!("{}", bench.name());
        }
        return Ok(());
    }

    runner.run_registered(&cfg, registry)?;
    Ok(())
}

/// Entry point for bench binaries; exits non-zero on failure.
pub fn main() {
    if let Err(e) = run_cli(Runner::new()) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "cntryl_micro=debug"
    } else {
        "cntryl_micro=info"
    };
    // A subscriber may already be installed by the host binary.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("micro").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn should_keep_config_when_no_flags() {
        let base = Configuration::new().reporter("json").samples(7);
        let cfg = parse(&[]).apply(base).unwrap();
        assert_eq!(cfg.reporter, "json");
        assert_eq!(cfg.samples, 7);
        assert!(cfg.analysis);
        assert!(cfg.sweep.is_none());
    }

    #[test]
    fn should_override_config_when_flags_given() {
        let cfg = parse(&[
            "vec_.*",
            "--reporter",
            "json",
            "--samples",
            "5",
            "--no-analysis",
            "--sweep",
            "size:*:16:2:4",
            "-o",
            "out/run.json",
            "--title",
            "nightly",
            "-v",
        ])
        .apply(Configuration::new())
        .unwrap();

        assert_eq!(cfg.filter, "vec_.*");
        assert_eq!(cfg.reporter, "json");
        assert_eq!(cfg.samples, 5);
        assert!(!cfg.analysis);
        assert_eq!(
            cfg.sweep,
            Some(SweepRequest::new("size", "*", "16", "2", 4))
        );
        assert_eq!(cfg.output, Some(PathBuf::from("out/run.json")));
        assert_eq!(cfg.title, "nightly");
        assert!(cfg.verbose);
    }

    #[test]
    fn should_fail_when_sweep_malformed() {
        let err = parse(&["--sweep", "size:+:1"])
            .apply(Configuration::new())
            .unwrap_err();
        assert!(err.to_string().contains("invalid sweep"));
    }

    #[test]
    fn should_reject_unknown_flag() {
        assert!(Args::try_parse_from(["micro", "--runs", "3"]).is_err());
    }
}
