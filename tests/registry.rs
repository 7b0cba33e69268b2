//! Runs driven by the process-wide benchmark registry.
//!
//! This binary registers two benchmarks under the same name, so every
//! registry run here must fail validation.

use cntryl_micro::linkme::distributed_slice;
use cntryl_micro::{
    run_default, BenchmarkEntry, Chronometer, Configuration, Error, Reporter, ReporterRegistry,
    Runner, BENCHMARKS,
};
use std::cell::RefCell;
use std::rc::Rc;

#[distributed_slice(BENCHMARKS)]
#[linkme(crate = cntryl_micro::linkme)]
static FIRST: BenchmarkEntry = BenchmarkEntry {
    name: "twin",
    func: noop,
};

#[distributed_slice(BENCHMARKS)]
#[linkme(crate = cntryl_micro::linkme)]
static SECOND: BenchmarkEntry = BenchmarkEntry {
    name: "twin",
    func: noop,
};

fn noop(meter: &mut Chronometer<'_>) -> anyhow::Result<()> {
    meter.measure(|_| ());
    Ok(())
}

/// Counts every event it sees into a shared log.
struct Counting(Rc<RefCell<Vec<&'static str>>>);

impl Reporter for Counting {
    fn configure(&mut self, _cfg: &Configuration) -> anyhow::Result<()> {
        self.0.borrow_mut().push("configure");
        Ok(())
    }

    fn warmup_start(&mut self) -> anyhow::Result<()> {
        self.0.borrow_mut().push("warmup_start");
        Ok(())
    }

    fn suite_start(&mut self) -> anyhow::Result<()> {
        self.0.borrow_mut().push("suite_start");
        Ok(())
    }
}

#[test]
fn should_fail_before_any_event_when_registered_names_repeat() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut registry = ReporterRegistry::empty();
    let log = Rc::clone(&events);
    registry.register("counting", move |_| Box::new(Counting(Rc::clone(&log))));

    let err = Runner::new()
        .run_registered(&Configuration::new().reporter("counting"), &registry)
        .unwrap_err();

    assert!(matches!(err, Error::DuplicateBenchmarkName(ref name) if name == "twin"));
    assert!(events.borrow().is_empty());
}

#[test]
fn should_fail_when_registered_run_names_unknown_reporter() {
    let err = Runner::new()
        .run_registered(
            &Configuration::new().reporter("nonexistent"),
            &ReporterRegistry::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::ReporterNotFound(ref name) if name == "nonexistent"));
}

#[test]
fn should_fail_when_default_run_names_unknown_reporter() {
    let err = run_default(&Configuration::new().reporter("nonexistent")).unwrap_err();
    assert!(matches!(err, Error::ReporterNotFound(ref name) if name == "nonexistent"));
}

#[test]
fn should_report_duplicates_through_default_registry() {
    let err = run_default(&Configuration::new()).unwrap_err();
    assert!(matches!(err, Error::DuplicateBenchmarkName(ref name) if name == "twin"));
}
