//! Isolation of benchmark code from the runner.
//!
//! Benchmark code may return an error or panic. Either way the fault is
//! shown to the reporter as a `benchmark_failure` event and then turned into
//! the matching [`Error`] so the run stops.

use crate::error::{Error, Result};
use crate::report::Reporter;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Which part of a benchmark is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    Run,
}

impl Stage {
    fn into_error(self, name: &str, source: anyhow::Error) -> Error {
        let name = name.to_string();
        match self {
            Stage::Prepare => Error::BenchmarkPrepareFailed { name, source },
            Stage::Run => Error::BenchmarkRunFailed { name, source },
        }
    }
}

/// Run benchmark code, converting errors and panics into a run failure.
pub fn guarded<T, F>(name: &str, stage: Stage, reporter: &mut dyn Reporter, f: F) -> Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    let fault = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e,
        Err(payload) => anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref())),
    };

    tracing::warn!(benchmark = name, ?stage, "benchmark failed: {:#}", fault);
    reporter.benchmark_failure(&fault).map_err(Error::Reporter)?;
    Err(stage.into_error(name, fault))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
