//! Error types for a benchmark run.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way a run can stop early.
///
/// All variants are fatal: the runner returns the first one it hits and
/// emits no further reporter events.
#[derive(Debug, Error)]
pub enum Error {
    /// No reporter with this name in the registry.
    #[error("reporter not found: {0}")]
    ReporterNotFound(String),

    /// A sweep named a variable the parameter store does not know.
    #[error("parameter spec not found: {0}")]
    ParameterSpecNotFound(String),

    /// A sweep used an operator other than add or multiply.
    #[error("unknown step operator '{0}' (expected '+', 'add', '*' or 'multiply')")]
    UnknownStepOperator(String),

    /// A parameter value could not be interpreted by its spec.
    #[error("invalid value '{value}' for parameter '{name}': {reason}")]
    InvalidParameterValue {
        name: String,
        value: String,
        reason: String,
    },

    /// A sweep request string did not have the `name:op:init:step:count` shape.
    #[error("invalid sweep '{0}' (expected name:op:init:step:count)")]
    InvalidSweep(String),

    /// The name filter is not a valid regular expression.
    #[error("invalid benchmark filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// Two registered benchmarks share a name.
    #[error("duplicate benchmark name: {0}")]
    DuplicateBenchmarkName(String),

    /// The clock could not be calibrated.
    #[error("clock calibration failed: {0}")]
    Calibration(String),

    /// Benchmark code faulted while building its plan.
    #[error("benchmark '{name}' failed to prepare")]
    BenchmarkPrepareFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Benchmark code faulted while being measured.
    #[error("benchmark '{name}' failed to run")]
    BenchmarkRunFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A reporter callback returned an error.
    #[error("reporter failed")]
    Reporter(#[source] anyhow::Error),
}

impl Error {
    /// True for faults raised by benchmark code rather than by the harness.
    pub fn is_benchmark_failure(&self) -> bool {
        matches!(
            self,
            Error::BenchmarkPrepareFailed { .. } | Error::BenchmarkRunFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_original_fault_as_source() {
        let err = Error::BenchmarkRunFailed {
            name: "vec_push".to_string(),
            source: anyhow::anyhow!("index out of bounds"),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("index out of bounds"));
        assert!(err.is_benchmark_failure());
    }

    #[test]
    fn should_name_operator_when_unknown() {
        let err = Error::UnknownStepOperator("^".to_string());
        assert!(err.to_string().contains("'^'"));
        assert!(!err.is_benchmark_failure());
    }
}
