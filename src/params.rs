//! Benchmark parameters and the store of named stepping policies.

use crate::error::{Error, Result};
use num_traits::{CheckedAdd, CheckedMul};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Parameter values for one pass over the suite.
///
/// Values are kept as strings; benchmarks parse what they need. The empty
/// set means no sweep is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Parse a parameter, failing if it is missing or malformed.
    pub fn parse<T>(&self, name: &str) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw = self
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("parameter '{}' is not set", name))?;
        Ok(raw.parse()?)
    }

    /// Parse a parameter, falling back to `default` when it is not set.
    pub fn parse_or<T>(&self, name: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(name) {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(default),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
    }
}

/// A value a parameter spec could not interpret.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot use '{value}': {reason}")]
pub struct InvalidValue {
    pub value: String,
    pub reason: String,
}

/// Stepping policy over string-encoded values of one parameter.
pub trait ParamSpec {
    fn add(&self, value: &str, step: &str) -> Result<String, InvalidValue>;
    fn multiply(&self, value: &str, step: &str) -> Result<String, InvalidValue>;

    /// Check that `value` is well formed for this parameter.
    fn validate(&self, value: &str) -> Result<(), InvalidValue>;
}

/// Spec for any numeric type that parses from and prints to a string.
pub struct NumericSpec<T>(PhantomData<fn() -> T>);

impl<T> NumericSpec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for NumericSpec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NumericSpec<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn parse(raw: &str) -> Result<T, InvalidValue> {
        raw.trim().parse().map_err(|e: T::Err| InvalidValue {
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }
}

impl<T> ParamSpec for NumericSpec<T>
where
    T: FromStr + fmt::Display + Steppable,
    T::Err: fmt::Display,
{
    fn add(&self, value: &str, step: &str) -> Result<String, InvalidValue> {
        let next = Self::parse(value)?.checked_step_add(Self::parse(step)?);
        next.map(|v| v.to_string())
            .ok_or_else(|| overflow(value, "+", step))
    }

    fn multiply(&self, value: &str, step: &str) -> Result<String, InvalidValue> {
        let next = Self::parse(value)?.checked_step_mul(Self::parse(step)?);
        next.map(|v| v.to_string())
            .ok_or_else(|| overflow(value, "*", step))
    }

    fn validate(&self, value: &str) -> Result<(), InvalidValue> {
        Self::parse(value).map(|_| ())
    }
}

fn overflow(value: &str, op: &str, step: &str) -> InvalidValue {
    InvalidValue {
        value: value.to_string(),
        reason: format!("overflow stepping by {} {}", op, step),
    }
}

/// Numeric types [`NumericSpec`] can step without overflowing.
///
/// `None` means the result is not representable.
pub trait Steppable: Sized {
    fn checked_step_add(self, step: Self) -> Option<Self>;
    fn checked_step_mul(self, step: Self) -> Option<Self>;
}

macro_rules! steppable_int {
    ($($t:ty)*) => {$(
        impl Steppable for $t {
            fn checked_step_add(self, step: Self) -> Option<Self> {
                CheckedAdd::checked_add(&self, &step)
            }

            fn checked_step_mul(self, step: Self) -> Option<Self> {
                CheckedMul::checked_mul(&self, &step)
            }
        }
    )*};
}

steppable_int!(u8 u16 u32 u64 u128 usize i8 i16 i32 i64 i128 isize);

macro_rules! steppable_float {
    ($($t:ty)*) => {$(
        impl Steppable for $t {
            fn checked_step_add(self, step: Self) -> Option<Self> {
                Some(self + step).filter(|v| v.is_finite())
            }

            fn checked_step_mul(self, step: Self) -> Option<Self> {
                Some(self * step).filter(|v| v.is_finite())
            }
        }
    )*};
}

steppable_float!(f32 f64);

/// How successive sweep values are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOperator {
    Add,
    Multiply,
}

impl StepOperator {
    pub fn parse(symbol: &str) -> Result<Self> {
        match symbol {
            "+" | "add" => Ok(StepOperator::Add),
            "*" | "multiply" => Ok(StepOperator::Multiply),
            other => Err(Error::UnknownStepOperator(other.to_string())),
        }
    }
}

struct Entry {
    spec: Box<dyn ParamSpec>,
    current: String,
}

/// Named parameter specs, each with a current value.
///
/// Owned by the runner and passed to the sweep generator explicitly.
#[derive(Default)]
pub struct ParameterSpecStore {
    entries: BTreeMap<String, Entry>,
}

impl ParameterSpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter with its spec and default value.
    ///
    /// Re-registering a name replaces the earlier entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        spec: impl ParamSpec + 'static,
        default: impl Into<String>,
    ) -> Result<&mut Self> {
        let name = name.into();
        let default = default.into();
        spec.validate(&default)
            .map_err(|e| invalid_value(&name, e))?;
        self.entries.insert(
            name,
            Entry {
                spec: Box::new(spec),
                current: default,
            },
        );
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Current value of a parameter.
    pub fn current(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.current.as_str())
    }

    /// Overwrite the current value of a parameter.
    pub fn set_current(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| Error::ParameterSpecNotFound(name.to_string()))?;
        let value = value.into();
        entry
            .spec
            .validate(&value)
            .map_err(|e| invalid_value(name, e))?;
        entry.current = value;
        Ok(())
    }

    /// Apply one step to `value` using the named spec.
    pub fn step(&self, name: &str, op: StepOperator, value: &str, step: &str) -> Result<String> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::ParameterSpecNotFound(name.to_string()))?;
        let next = match op {
            StepOperator::Add => entry.spec.add(value, step),
            StepOperator::Multiply => entry.spec.multiply(value, step),
        };
        next.map_err(|e| invalid_value(name, e))
    }
}

impl fmt::Debug for ParameterSpecStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, e)| (k, &e.current)))
            .finish()
    }
}

fn invalid_value(name: &str, e: InvalidValue) -> Error {
    Error::InvalidParameterValue {
        name: name.to_string(),
        value: e.value,
        reason: e.reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_step_integers_when_numeric() {
        let spec = NumericSpec::<u64>::new();
        assert_eq!(spec.add("10", "5").unwrap(), "15");
        assert_eq!(spec.multiply("10", "5").unwrap(), "50");
    }

    #[test]
    fn should_step_floats_when_numeric() {
        let spec = NumericSpec::<f64>::new();
        assert_eq!(spec.add("0.5", "0.25").unwrap(), "0.75");
        assert_eq!(spec.multiply("1.5", "2").unwrap(), "3");
    }

    #[test]
    fn should_reject_step_when_result_overflows() {
        let spec = NumericSpec::<u8>::new();
        assert_eq!(spec.add("250", "5").unwrap(), "255");
        let err = spec.add("250", "6").unwrap_err();
        assert_eq!(err.value, "250");
        assert!(err.reason.contains("overflow"));
        assert!(spec.multiply("128", "2").is_err());
        assert!(NumericSpec::<f64>::new().multiply("1e308", "10").is_err());
    }

    #[test]
    fn should_reject_value_when_not_a_number() {
        let spec = NumericSpec::<i32>::new();
        let err = spec.add("ten", "1").unwrap_err();
        assert_eq!(err.value, "ten");
    }

    #[test]
    fn should_resolve_operator_symbols() {
        assert_eq!(StepOperator::parse("+").unwrap(), StepOperator::Add);
        assert_eq!(StepOperator::parse("add").unwrap(), StepOperator::Add);
        assert_eq!(StepOperator::parse("*").unwrap(), StepOperator::Multiply);
        assert_eq!(
            StepOperator::parse("multiply").unwrap(),
            StepOperator::Multiply
        );
        assert!(matches!(
            StepOperator::parse("/"),
            Err(Error::UnknownStepOperator(op)) if op == "/"
        ));
    }

    #[test]
    fn should_track_current_value_when_set() {
        let mut store = ParameterSpecStore::new();
        store
            .register("size", NumericSpec::<u64>::new(), "16")
            .unwrap();
        assert_eq!(store.current("size"), Some("16"));

        store.set_current("size", "32").unwrap();
        assert_eq!(store.current("size"), Some("32"));
    }

    #[test]
    fn should_reject_default_when_invalid() {
        let mut store = ParameterSpecStore::new();
        let err = store
            .register("size", NumericSpec::<u64>::new(), "-1")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameterValue { name, .. } if name == "size"));
    }

    #[test]
    fn should_fail_step_when_spec_missing() {
        let store = ParameterSpecStore::new();
        assert!(matches!(
            store.step("size", StepOperator::Add, "1", "1"),
            Err(Error::ParameterSpecNotFound(name)) if name == "size"
        ));
    }

    #[test]
    fn should_parse_typed_parameter() {
        let params = Parameters::new().with("size", "64");
        assert_eq!(params.parse::<usize>("size").unwrap(), 64);
        assert!(params.parse::<usize>("missing").is_err());
        assert_eq!(params.to_string(), "{size=64}");
        assert_eq!(Parameters::new().to_string(), "{}");
    }

    #[test]
    fn should_use_default_when_parameter_unset() {
        let params = Parameters::new().with("size", "abc");
        assert_eq!(Parameters::new().parse_or("size", 8usize).unwrap(), 8);
        assert!(params.parse_or("size", 8usize).is_err());
    }
}
