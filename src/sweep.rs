//! Expansion of a sweep request into parameter sets.

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::params::{ParameterSpecStore, Parameters, StepOperator};

/// Produce the parameter sets the suite is repeated over, in run order.
///
/// Without a sweep this is a single empty set. With one, the named spec and
/// operator are resolved, then `count` values are produced starting at the
/// initial value. The store's current value for the parameter ends up one
/// step past the last emitted value.
pub fn generate(cfg: &Configuration, store: &mut ParameterSpecStore) -> Result<Vec<Parameters>> {
    let Some(sweep) = &cfg.sweep else {
        return Ok(vec![Parameters::new()]);
    };

    if !store.contains(&sweep.name) {
        return Err(Error::ParameterSpecNotFound(sweep.name.clone()));
    }
    let op = StepOperator::parse(&sweep.operator)?;

    store.set_current(&sweep.name, sweep.init.as_str())?;

    let mut sets = Vec::with_capacity(sweep.count);
    let mut value = sweep.init.clone();
    for _ in 0..sweep.count {
        let next = store.step(&sweep.name, op, &value, &sweep.step)?;
        sets.push(Parameters::new().with(sweep.name.clone(), value));
        value = next;
    }
    store.set_current(&sweep.name, value)?;

    tracing::debug!(
        parameter = %sweep.name,
        operator = ?op,
        count = sets.len(),
        "generated parameter sweep"
    );
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepRequest;
    use crate::params::NumericSpec;

    fn store() -> ParameterSpecStore {
        let mut store = ParameterSpecStore::new();
        store
            .register("size", NumericSpec::<u64>::new(), "1")
            .unwrap();
        store
    }

    fn values(sets: &[Parameters]) -> Vec<&str> {
        sets.iter().map(|p| p.get("size").unwrap()).collect()
    }

    #[test]
    fn should_yield_single_empty_set_when_no_sweep() {
        let sets = generate(&Configuration::new(), &mut store()).unwrap();
        assert_eq!(sets, vec![Parameters::new()]);
    }

    #[test]
    fn should_step_additively_when_add() {
        let mut store = store();
        let cfg = Configuration::new().sweep(SweepRequest::new("size", "+", "10", "5", 4));
        let sets = generate(&cfg, &mut store).unwrap();
        assert_eq!(values(&sets), ["10", "15", "20", "25"]);
        assert_eq!(store.current("size"), Some("30"));
    }

    #[test]
    fn should_step_multiplicatively_when_multiply() {
        let mut store = store();
        let cfg = Configuration::new().sweep(SweepRequest::new("size", "multiply", "3", "2", 5));
        let sets = generate(&cfg, &mut store).unwrap();
        assert_eq!(values(&sets), ["3", "6", "12", "24", "48"]);
        assert_eq!(store.current("size"), Some("96"));
    }

    #[test]
    fn should_yield_nothing_when_count_zero() {
        let mut store = store();
        let cfg = Configuration::new().sweep(SweepRequest::new("size", "+", "7", "1", 0));
        let sets = generate(&cfg, &mut store).unwrap();
        assert!(sets.is_empty());
        assert_eq!(store.current("size"), Some("7"));
    }

    #[test]
    fn should_be_repeatable_when_generated_twice() {
        let mut store = store();
        let cfg = Configuration::new().sweep(SweepRequest::new("size", "*", "2", "2", 3));
        let first = generate(&cfg, &mut store).unwrap();
        let second = generate(&cfg, &mut store).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn should_fail_when_spec_missing() {
        let cfg = Configuration::new().sweep(SweepRequest::new("depth", "+", "1", "1", 2));
        assert!(matches!(
            generate(&cfg, &mut store()),
            Err(Error::ParameterSpecNotFound(name)) if name == "depth"
        ));
    }

    #[test]
    fn should_fail_when_operator_unknown() {
        let cfg = Configuration::new().sweep(SweepRequest::new("size", "-", "1", "1", 2));
        assert!(matches!(
            generate(&cfg, &mut store()),
            Err(Error::UnknownStepOperator(op)) if op == "-"
        ));
    }

    #[test]
    fn should_fail_instead_of_panicking_when_next_value_overflows() {
        let mut store = ParameterSpecStore::new();
        store
            .register("size", NumericSpec::<usize>::new(), "1024")
            .unwrap();
        // 1024^6 fits in 64 bits, the value after it does not
        let cfg = Configuration::new().sweep(SweepRequest::new("size", "*", "1024", "1024", 6));
        assert!(matches!(
            generate(&cfg, &mut store),
            Err(Error::InvalidParameterValue { name, reason, .. })
                if name == "size" && reason.contains("overflow")
        ));
    }

    #[test]
    fn should_fail_when_step_not_a_number() {
        let cfg = Configuration::new().sweep(SweepRequest::new("size", "+", "1", "x", 2));
        assert!(matches!(
            generate(&cfg, &mut store()),
            Err(Error::InvalidParameterValue { .. })
        ));
    }
}
