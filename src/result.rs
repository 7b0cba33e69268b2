//! Serializable records of a run.

use crate::analysis::SampleAnalysis;
use crate::benchmark::{PlanSummary, Sample};
use crate::environment::Environment;
use crate::params::Parameters;
use serde::{Deserialize, Serialize};

/// Outcome of one benchmark under one parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Benchmark name
    pub name: String,
    /// Parameters of the pass
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub params: Parameters,
    /// Plan as announced before measuring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanSummary>,
    /// Per-iteration samples in nanoseconds
    pub samples: Vec<Sample>,
    /// Analysis, when enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SampleAnalysis>,
    /// Failure message, when the benchmark faulted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkRecord {
    pub fn new(name: impl Into<String>, params: Parameters) -> Self {
        Self {
            name: name.into(),
            params,
            plan: None,
            samples: Vec::new(),
            analysis: None,
            error: None,
        }
    }

    /// Mean from the analysis, or from the raw samples without one.
    pub fn mean_nanos(&self) -> Option<f64> {
        if let Some(a) = &self.analysis {
            return Some(a.mean);
        }
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(|s| s.as_nanos()).sum();
        Some(total / self.samples.len() as f64)
    }
}

/// Results for an entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run title
    pub title: String,
    /// Timestamp when the suite started (unix millis)
    pub started_at: String,
    /// Git commit hash (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    /// Clock calibration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// One record per benchmark and parameter set, in run order
    pub results: Vec<BenchmarkRecord>,
}

impl RunRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            started_at: String::new(),
            git_sha: None,
            environment: None,
            results: Vec::new(),
        }
    }

    /// Load a run record from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

pub(crate) fn unix_millis() -> String {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_millis())
}

pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_nanos().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let nanos = u128::deserialize(d)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Estimate;
    use std::time::Duration;

    #[test]
    fn should_fall_back_to_sample_mean_when_no_analysis() {
        let mut record = BenchmarkRecord::new("sum", Parameters::new());
        assert_eq!(record.mean_nanos(), None);

        record.samples = vec![Sample::from_nanos(2.0), Sample::from_nanos(4.0)];
        assert_eq!(record.mean_nanos(), Some(3.0));

        record.analysis = Some(SampleAnalysis {
            mean: 10.0,
            ..SampleAnalysis::default()
        });
        assert_eq!(record.mean_nanos(), Some(10.0));
    }

    #[test]
    fn should_write_durations_as_nanos() {
        let estimate = Estimate {
            mean: Duration::from_nanos(25),
            samples: 3,
        };
        let json = serde_json::to_value(estimate).unwrap();
        assert_eq!(json["mean"], 25);
    }

    #[test]
    fn should_omit_empty_params() {
        let record = BenchmarkRecord::new("sum", Parameters::new());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("params").is_none());

        let record = BenchmarkRecord::new("sum", Parameters::new().with("n", "8"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["params"]["n"], "8");
    }

    #[test]
    fn should_load_saved_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut run = RunRecord::new("suite");
        run.results.push(BenchmarkRecord::new("a", Parameters::new()));
        std::fs::write(&path, serde_json::to_string(&run).unwrap()).unwrap();

        let loaded = RunRecord::load(&path).unwrap();
        assert_eq!(loaded.title, "suite");
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.results[0].name, "a");
    }
}
