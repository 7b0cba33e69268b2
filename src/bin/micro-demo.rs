//! Demo benchmarks for the micro harness.
//!
//! ```text
//! micro-demo
//! micro-demo 'vec_.*' --sweep size:*:64:4:4
//! micro-demo --reporter json -o target/micro.json
//! ```

use cntryl_micro::linkme::distributed_slice;
use cntryl_micro::{BenchmarkEntry, Chronometer, NumericSpec, ParameterSpecStore, Runner};
use cntryl_micro::BENCHMARKS;
use std::collections::HashMap;
use std::hint::black_box;

const DEFAULT_SIZE: usize = 1024;

#[distributed_slice(BENCHMARKS)]
#[linkme(crate = cntryl_micro::linkme)]
static VEC_PUSH: BenchmarkEntry = BenchmarkEntry {
    name: "vec_push",
    func: vec_push,
};

#[distributed_slice(BENCHMARKS)]
#[linkme(crate = cntryl_micro::linkme)]
static VEC_SORT: BenchmarkEntry = BenchmarkEntry {
    name: "vec_sort",
    func: vec_sort,
};

#[distributed_slice(BENCHMARKS)]
#[linkme(crate = cntryl_micro::linkme)]
static HASHMAP_INSERT: BenchmarkEntry = BenchmarkEntry {
    name: "hashmap_insert",
    func: hashmap_insert,
};

#[distributed_slice(BENCHMARKS)]
#[linkme(crate = cntryl_micro::linkme)]
static FIBONACCI: BenchmarkEntry = BenchmarkEntry {
    name: "fibonacci",
    func: fibonacci_20,
};

fn vec_push(meter: &mut Chronometer<'_>) -> anyhow::Result<()> {
    let size: usize = meter.params().parse_or("size", DEFAULT_SIZE)?;
    meter.measure(|_| {
        let mut v = Vec::with_capacity(size);
        for i in 0..size {
            v.push(i);
        }
        v
    });
    Ok(())
}

fn vec_sort(meter: &mut Chronometer<'_>) -> anyhow::Result<()> {
    let size: usize = meter.params().parse_or("size", DEFAULT_SIZE)?;
    // reversed input, sorted in place
    meter.measure_with(
        |_| (0..size).rev().collect::<Vec<_>>(),
        |v| v.sort_unstable(),
    );
    Ok(())
}

fn hashmap_insert(meter: &mut Chronometer<'_>) -> anyhow::Result<()> {
    let size: usize = meter.params().parse_or("size", DEFAULT_SIZE)?;
    meter.measure(|_| {
        let mut map = HashMap::with_capacity(size);
        for i in 0..size {
            map.insert(i, i * 2);
        }
        map
    });
    Ok(())
}

fn fibonacci_20(meter: &mut Chronometer<'_>) -> anyhow::Result<()> {
    meter.measure(|_| fibonacci(black_box(20)));
    Ok(())
}

fn fibonacci(n: u32) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}

fn main() -> anyhow::Result<()> {
    let mut store = ParameterSpecStore::new();
    store.register("size", NumericSpec::<usize>::new(), DEFAULT_SIZE.to_string())?;
    cntryl_micro::harness::run_cli(Runner::new().params(store))
}
