//! Choosing which benchmarks run.

use crate::benchmark::Benchmark;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashSet;

/// Benchmarks whose whole name matches `pattern`, in registry order.
///
/// The pattern is a regular expression anchored at both ends, so `"a.*"`
/// selects `"abc"` but not `"bcd"`.
pub fn filter<'a>(
    benchmarks: &'a [Box<dyn Benchmark>],
    pattern: &str,
) -> Result<Vec<&'a dyn Benchmark>> {
    let re = Regex::new(&format!("^(?:{})$", pattern))?;
    let selected: Vec<&dyn Benchmark> = benchmarks
        .iter()
        .map(|b| &**b)
        .filter(|b| re.is_match(b.name()))
        .collect();
    tracing::debug!(
        pattern,
        selected = selected.len(),
        total = benchmarks.len(),
        "filtered benchmarks"
    );
    Ok(selected)
}

/// Fail if two benchmarks share a name.
pub fn validate(benchmarks: &[Box<dyn Benchmark>]) -> Result<()> {
    let mut seen = HashSet::new();
    for bench in benchmarks {
        if !seen.insert(bench.name()) {
            return Err(Error::DuplicateBenchmarkName(bench.name().to_string()));
        }
    }
    Ok(())
}
